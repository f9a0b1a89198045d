//! Experiment designs: one base configuration, many named variants.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalog::TreatmentGroup;
use super::treatment::{Treatment, introduce_treatment};
use crate::config::SystemConfig;
use crate::error::Result;
use crate::tracking::{RUN_CONFIGURATION, Tracker, record_or_warn};

/// A named list of treatments applied on top of the design's base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub treatments: Vec<Treatment>,
}

/// A variant with its fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVariant {
    pub name: String,
    pub config: SystemConfig,
}

impl ResolvedVariant {
    /// Record the resolved configuration as [`RUN_CONFIGURATION`].
    ///
    /// Tracking failures are logged, not returned.
    pub fn record(&self, tracker: &dyn Tracker) -> Result<bool> {
        Ok(record_or_warn(
            tracker,
            &self.config.to_json()?,
            RUN_CONFIGURATION,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDesign {
    pub base: SystemConfig,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl ExperimentDesign {
    pub fn new(base: SystemConfig) -> Self {
        Self {
            base,
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, name: impl Into<String>, treatments: Vec<Treatment>) -> Self {
        self.variants.push(Variant {
            name: name.into(),
            treatments,
        });
        self
    }

    /// Add a catalog group as a variant named after the group.
    pub fn with_group(self, group: TreatmentGroup) -> Self {
        self.with_variant(group.as_str(), group.treatments())
    }

    /// Resolve every variant against the base, in order.
    ///
    /// The first variant that fails to apply aborts resolution.
    pub fn resolve(&self) -> Result<Vec<ResolvedVariant>> {
        self.variants
            .iter()
            .map(|variant| {
                let config = introduce_treatment(&self.base, &variant.treatments)?;
                info!(
                    "[experiment] resolved variant '{}' ({} treatments)",
                    variant.name,
                    variant.treatments.len()
                );
                Ok(ResolvedVariant {
                    name: variant.name.clone(),
                    config,
                })
            })
            .collect()
    }
}
