//! Treatments and their application to a [`SystemConfig`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{ConfigSection, SystemConfig};
use crate::error::{Error, Result};

/// Which half of the configuration tree a treatment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetKind {
    /// A pipeline stage, stored under `ops`.
    Asset,
    /// A shared resource, stored under `resources`.
    Resource,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Asset => "Asset",
            TargetKind::Resource => "Resource",
        }
    }

    pub fn section(&self) -> ConfigSection {
        match self {
            TargetKind::Asset => ConfigSection::Ops,
            TargetKind::Resource => ConfigSection::Resources,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Asset" => Ok(TargetKind::Asset),
            "Resource" => Ok(TargetKind::Resource),
            other => Err(Error::UnknownTargetKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for TargetKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TargetKind> for String {
    fn from(kind: TargetKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One factor override: set `factor` of stage/resource `key` to `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    /// Human-readable description, used only for logging and reports.
    pub name: String,
    #[serde(alias = "dagster_type")]
    pub target_kind: TargetKind,
    pub key: String,
    pub factor: String,
    pub value: Value,
}

impl Treatment {
    pub fn new(
        name: impl Into<String>,
        target_kind: TargetKind,
        key: impl Into<String>,
        factor: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            target_kind,
            key: key.into(),
            factor: factor.into(),
            value: value.into(),
        }
    }

    /// Override a pipeline stage field.
    pub fn asset(
        name: impl Into<String>,
        key: impl Into<String>,
        factor: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(name, TargetKind::Asset, key, factor, value)
    }

    /// Override a shared resource field.
    pub fn resource(
        name: impl Into<String>,
        key: impl Into<String>,
        factor: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(name, TargetKind::Resource, key, factor, value)
    }
}

/// Apply `treatments` in order to a copy of `base`.
///
/// `base` is never modified. Later treatments overwrite earlier ones on the
/// same field. Every treatment must name an existing stage and field; the
/// first one that does not aborts the whole application with
/// [`Error::StageNotFound`] or [`Error::FactorNotFound`].
pub fn introduce_treatment<'a>(
    base: &SystemConfig,
    treatments: impl IntoIterator<Item = &'a Treatment>,
) -> Result<SystemConfig> {
    let mut resolved = base.clone();
    for treatment in treatments {
        let section = treatment.target_kind.section();
        let config = resolved.stage_config_mut(section, &treatment.key)?;
        let Some(slot) = config.get_mut(&treatment.factor) else {
            return Err(Error::FactorNotFound {
                section: section.to_string(),
                key: treatment.key.clone(),
                factor: treatment.factor.clone(),
            });
        };
        *slot = treatment.value.clone();
        debug!(
            "[treatment] {}.{}.{} = {} ({})",
            section, treatment.key, treatment.factor, treatment.value, treatment.name
        );
    }
    Ok(resolved)
}
