//! The resolved, persisted configuration tree.
//!
//! ```text
//! {"ops":       {stage:    {"config": {field: value}}},
//!  "resources": {resource: {"config": {field: value}}}}
//! ```
//!
//! A [`SystemConfig`] is plain JSON so treatments can override any field by
//! name. Typed views are read back with [`SystemConfig::asset`] and
//! [`SystemConfig::resource`].

use std::fmt;
use std::path::Path;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::assets::{
    AssetConfigurations, ChunkingConfig, FeedbackGenerationPromptConfig, RetrievalConfig,
    TeacherModelBaseConfig, TeacherModelUpdateConfig, stage,
};
use super::resources::{
    BucketConfig, EmbeddingModelConfig, EmbeddingPreprocessorConfig, LlmConfig,
    ResourceConfigurations, TrackingClientConfig, VectorStoreConfig, resource,
};
use crate::error::{Error, Result};
use crate::json_schema_for;

/// Top-level section of a [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    /// Pipeline stages.
    Ops,
    /// Shared resources.
    Resources,
}

impl ConfigSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSection::Ops => "ops",
            ConfigSection::Resources => "resources",
        }
    }
}

impl fmt::Display for ConfigSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved run configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub ops: Map<String, Value>,
    #[serde(default)]
    pub resources: Map<String, Value>,
}

/// Combine exported asset and resource defaults into one tree.
pub fn build_system_config(
    assets: &AssetConfigurations,
    resources: &ResourceConfigurations,
) -> Result<SystemConfig> {
    Ok(SystemConfig {
        ops: assets.export()?,
        resources: resources.export()?,
    })
}

impl SystemConfig {
    /// Tree built from the default asset and resource configurations.
    pub fn defaults() -> Result<Self> {
        build_system_config(
            &AssetConfigurations::default(),
            &ResourceConfigurations::default(),
        )
    }

    pub fn section(&self, section: ConfigSection) -> &Map<String, Value> {
        match section {
            ConfigSection::Ops => &self.ops,
            ConfigSection::Resources => &self.resources,
        }
    }

    pub fn section_mut(&mut self, section: ConfigSection) -> &mut Map<String, Value> {
        match section {
            ConfigSection::Ops => &mut self.ops,
            ConfigSection::Resources => &mut self.resources,
        }
    }

    /// The `config` block of `key` in `section`.
    pub fn stage_config(&self, section: ConfigSection, key: &str) -> Result<&Map<String, Value>> {
        self.section(section)
            .get(key)
            .and_then(|block| block.get("config"))
            .and_then(Value::as_object)
            .ok_or_else(|| Error::StageNotFound {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    pub(crate) fn stage_config_mut(
        &mut self,
        section: ConfigSection,
        key: &str,
    ) -> Result<&mut Map<String, Value>> {
        self.section_mut(section)
            .get_mut(key)
            .and_then(|block| block.get_mut("config"))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::StageNotFound {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Typed view of the stage `key` under `ops`.
    pub fn asset<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.typed(ConfigSection::Ops, key)
    }

    /// Typed view of the resource `key` under `resources`.
    pub fn resource<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.typed(ConfigSection::Resources, key)
    }

    fn typed<T: DeserializeOwned>(&self, section: ConfigSection, key: &str) -> Result<T> {
        let config = self.stage_config(section, key)?;
        Ok(T::deserialize(Value::Object(config.clone()))?)
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Write the tree as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("[config] saved system config to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: SystemConfig = serde_json::from_str(&data)?;
        debug!(
            "[config] loaded system config from {} ({} ops, {} resources)",
            path.display(),
            config.ops.len(),
            config.resources.len()
        );
        Ok(config)
    }

    /// Check every known stage and resource against the JSON Schema of its
    /// typed config. Unknown keys are ignored. All violations are reported
    /// together.
    pub fn validate(&self) -> Result<()> {
        self.validate_against(known_schemas())
    }

    fn validate_against(&self, schemas: Vec<(ConfigSection, &'static str, Value)>) -> Result<()> {
        let mut problems = Vec::new();

        for (section, key, schema) in schemas {
            let Some(block) = self.section(section).get(key) else {
                continue;
            };
            let Some(config) = block.get("config") else {
                problems.push(format!("  - /{section}/{key}: missing 'config' block"));
                continue;
            };
            let validator = match jsonschema::validator_for(&schema) {
                Ok(validator) => validator,
                Err(e) => {
                    problems.push(format!("  - /{section}/{key}: schema does not compile: {e}"));
                    continue;
                }
            };
            problems.extend(
                validator
                    .iter_errors(config)
                    .map(|e| format!("  - /{section}/{key}/config{}: {e}", e.instance_path())),
            );
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::SchemaViolation(problems))
        }
    }
}

fn known_schemas() -> Vec<(ConfigSection, &'static str, Value)> {
    use ConfigSection::{Ops, Resources};

    fn entry<T: JsonSchema>(
        section: ConfigSection,
        key: &'static str,
    ) -> (ConfigSection, &'static str, Value) {
        (section, key, json_schema_for::<T>())
    }

    vec![
        entry::<ChunkingConfig>(Ops, stage::CHUNKED_CLASS_DOCUMENTS),
        entry::<ChunkingConfig>(Ops, stage::CHUNKED_FEEDBACK),
        entry::<TeacherModelBaseConfig>(Ops, stage::TEACHER_MODEL_BASE),
        entry::<TeacherModelUpdateConfig>(Ops, stage::TEACHER_MODEL_UPDATE_PROMPT),
        entry::<RetrievalConfig>(Ops, stage::FEEDBACK_RETRIEVAL),
        entry::<RetrievalConfig>(Ops, stage::CLASS_CONTEXT_RETRIEVAL),
        entry::<FeedbackGenerationPromptConfig>(Ops, stage::FEEDBACK_GENERATION_PROMPT),
        entry::<BucketConfig>(Resources, resource::BUCKET),
        entry::<LlmConfig>(Resources, resource::LLM),
        entry::<EmbeddingModelConfig>(Resources, resource::EMBEDDING_MODEL),
        entry::<EmbeddingPreprocessorConfig>(Resources, resource::EMBEDDING_PREPROCESSOR),
        entry::<TrackingClientConfig>(Resources, resource::TRACKING_CLIENT),
        entry::<VectorStoreConfig>(Resources, resource::VECTOR_STORE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_have_both_sections() {
        let config = SystemConfig::defaults().unwrap();
        assert_eq!(config.ops.len(), stage::ALL.len());
        assert_eq!(config.resources.len(), resource::ALL.len());
    }

    #[test]
    fn typed_read_back_matches_defaults() {
        let config = SystemConfig::defaults().unwrap();
        let base: TeacherModelBaseConfig = config.asset(stage::TEACHER_MODEL_BASE).unwrap();
        assert_eq!(base, TeacherModelBaseConfig::default());
        let retrieval: RetrievalConfig = config.asset(stage::CLASS_CONTEXT_RETRIEVAL).unwrap();
        assert!(!retrieval.enabled);
        let llm: LlmConfig = config.resource(resource::LLM).unwrap();
        assert_eq!(llm.model_name, "gpt-4o");
    }

    #[test]
    fn unknown_stage_is_stage_not_found() {
        let config = SystemConfig::defaults().unwrap();
        let err = config.asset::<RetrievalConfig>("essay_retrieval").unwrap_err();
        assert!(
            matches!(err, Error::StageNotFound { ref section, ref key } if section == "ops" && key == "essay_retrieval")
        );
    }

    #[test]
    fn json_shape_is_ops_and_resources() {
        let config = SystemConfig::defaults().unwrap();
        let value = config.to_json().unwrap();
        assert_eq!(value["ops"]["feedback_retrieval"]["config"]["threshold"], 0.6);
        assert_eq!(SystemConfig::from_json(value).unwrap(), config);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("config.json");
        let config = SystemConfig::defaults().unwrap();
        config.save(&path).unwrap();
        assert_eq!(SystemConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn defaults_validate() {
        SystemConfig::defaults().unwrap().validate().unwrap();
    }

    #[test]
    fn validate_reports_every_violation() {
        let mut config = SystemConfig::defaults().unwrap();
        config.ops["teacher_model_base"]["config"]["include_onboarding"] = json!("yes");
        config.ops["feedback_retrieval"]["config"]["top_k"] = json!(-1);
        let err = config.validate().unwrap_err();
        match err {
            Error::SchemaViolation(problems) => {
                assert_eq!(problems.len(), 2, "{problems:?}");
                assert!(problems.iter().any(|p| p.contains("/ops/teacher_model_base/config/include_onboarding")));
                assert!(problems.iter().any(|p| p.contains("/ops/feedback_retrieval/config/top_k")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn uncompilable_schema_is_reported() {
        let config = SystemConfig::defaults().unwrap();
        let schemas = vec![
            (ConfigSection::Ops, stage::FEEDBACK_RETRIEVAL, json!({"type": "nonsense"})),
            (
                ConfigSection::Ops,
                stage::TEACHER_MODEL_BASE,
                json_schema_for::<TeacherModelBaseConfig>(),
            ),
        ];
        match config.validate_against(schemas).unwrap_err() {
            Error::SchemaViolation(problems) => {
                assert_eq!(problems.len(), 1, "{problems:?}");
                assert!(problems[0].starts_with("  - /ops/feedback_retrieval: schema does not compile"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
