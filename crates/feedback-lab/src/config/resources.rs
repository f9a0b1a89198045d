//! Shared resources: storage, models, preprocessing, tracking.
//!
//! Secret-bearing fields hold the *name* of the environment variable that
//! supplies the value (`"OPENAI_API_KEY"`), never the secret itself. On
//! export, any string field naming a currently set, non-empty variable is
//! dropped so persisted run configurations carry no secrets, and the
//! `tracking_client` dependency link is always dropped.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::assets::wrap_config;
use crate::error::Result;

/// Resource keys of the `resources` section.
pub mod resource {
    pub const BUCKET: &str = "bucket";
    pub const LLM: &str = "llm";
    pub const EMBEDDING_MODEL: &str = "embedding_model";
    pub const EMBEDDING_PREPROCESSOR: &str = "embedding_preprocessor";
    pub const TRACKING_CLIENT: &str = "tracking_client";
    pub const VECTOR_STORE: &str = "vector_store";

    pub const ALL: [&str; 6] = [
        BUCKET,
        LLM,
        EMBEDDING_MODEL,
        EMBEDDING_PREPROCESSOR,
        TRACKING_CLIENT,
        VECTOR_STORE,
    ];
}

/// Field linking a resource to the tracking resource; never exported.
const TRACKING_LINK_FIELD: &str = "tracking_client";

/// File store holding datasets and artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BucketConfig {
    /// Env var naming the storage region. Default: `"AWS_REGION"`.
    pub region: String,
    /// Default: `"local"`.
    pub source: String,
    /// Default: `"dummy"`.
    pub dataset: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            region: "AWS_REGION".into(),
            source: "local".into(),
            dataset: "dummy".into(),
        }
    }
}

/// Text-generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LlmConfig {
    /// Default: `"gpt-4o"`.
    pub model_name: String,
    /// Default: `600`.
    pub max_tokens: u32,
    /// Default: `0.8`.
    pub temperature: f64,
    /// Default: `1.0`.
    pub top_p: f64,
    /// Answer with canned responses instead of calling the model. Default: `false`.
    pub cost_estimation_mode: bool,
    /// Default: `"OPENAI_API_KEY"`.
    pub openai_api_key: String,
    /// Default: `"GOOGLE_API_KEY"`.
    pub gemini_api_key: String,
    /// Tracking resource this model reports to. Default: `"tracking_client"`.
    pub tracking_client: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".into(),
            max_tokens: 600,
            temperature: 0.8,
            top_p: 1.0,
            cost_estimation_mode: false,
            openai_api_key: "OPENAI_API_KEY".into(),
            gemini_api_key: "GOOGLE_API_KEY".into(),
            tracking_client: Some(resource::TRACKING_CLIENT.into()),
        }
    }
}

/// Embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmbeddingModelConfig {
    /// Default: `"text-embedding-ada-002"`.
    pub model_name: String,
    /// Default: `"OPENAI_API_KEY"`.
    pub openai_api_key: String,
    /// Default: `false`.
    pub cost_estimation_mode: bool,
    /// Default: `"AWS_ACCESS_KEY_ID"`.
    pub aws_access_key_id: String,
    /// Default: `"AWS_SECRET_ACCESS_KEY"`.
    pub aws_secret_access_key: String,
    /// Default: `"us-east-1"`.
    pub region_name: String,
    pub tracking_client: Option<String>,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            model_name: "text-embedding-ada-002".into(),
            openai_api_key: "OPENAI_API_KEY".into(),
            cost_estimation_mode: false,
            aws_access_key_id: "AWS_ACCESS_KEY_ID".into(),
            aws_secret_access_key: "AWS_SECRET_ACCESS_KEY".into(),
            region_name: "us-east-1".into(),
            tracking_client: Some(resource::TRACKING_CLIENT.into()),
        }
    }
}

/// Which texts make up the feedback index and search queries.
///
/// See [`crate::retrieval::query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmbeddingPreprocessorConfig {
    /// Default: `true`.
    pub include_essay_text: bool,
    /// Default: `false`.
    pub include_essay_context: bool,
    /// Index only. Default: `false`.
    pub include_teacher_feedback: bool,
    /// Search only. Default: `false`.
    pub include_teacher_instruction: bool,
}

impl Default for EmbeddingPreprocessorConfig {
    fn default() -> Self {
        Self {
            include_essay_text: true,
            include_essay_context: false,
            include_teacher_feedback: false,
            include_teacher_instruction: false,
        }
    }
}

/// Experiment tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrackingClientConfig {
    /// Default: `true`.
    pub enabled: bool,
    /// Also report to a remote tracking server. Default: `true`.
    pub mlflow_tracking: bool,
    /// Default: `"http://127.0.0.1:5000"`.
    pub mlflow_tracking_uri: String,
    /// Default: `"dummy"`.
    pub experiment_name: String,
    /// Default: `None`.
    pub run_name: Option<String>,
    /// Default: `"AWS_ACCESS_KEY_ID"`.
    pub aws_access_key_id: String,
    /// Default: `"AWS_SECRET_ACCESS_KEY"`.
    pub aws_secret_access_key: String,
}

impl Default for TrackingClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mlflow_tracking: true,
            mlflow_tracking_uri: "http://127.0.0.1:5000".into(),
            experiment_name: "dummy".into(),
            run_name: None,
            aws_access_key_id: "AWS_ACCESS_KEY_ID".into(),
            aws_secret_access_key: "AWS_SECRET_ACCESS_KEY".into(),
        }
    }
}

/// Vector store backing similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Default: `"parquet"`.
    pub name: String,
    /// Default: `"local"`.
    pub source: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            name: "parquet".into(),
            source: "local".into(),
        }
    }
}

/// Default configuration of every shared resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfigurations {
    pub bucket: BucketConfig,
    pub llm: LlmConfig,
    pub embedding_model: EmbeddingModelConfig,
    pub embedding_preprocessor: EmbeddingPreprocessorConfig,
    pub tracking_client: TrackingClientConfig,
    pub vector_store: VectorStoreConfig,
}

impl ResourceConfigurations {
    /// Export against the process environment.
    pub fn export(&self) -> Result<Map<String, Value>> {
        self.export_with(|name| std::env::var(name).ok())
    }

    /// Export with an explicit environment lookup.
    ///
    /// A string field is dropped when `lookup` returns a non-empty value for
    /// it. The `tracking_client` link is always dropped.
    pub fn export_with<F>(&self, lookup: F) -> Result<Map<String, Value>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Value::Object(resources) = serde_json::to_value(self)? else {
            return Ok(Map::new());
        };

        Ok(resources
            .into_iter()
            .map(|(key, config)| {
                let config = match config {
                    Value::Object(fields) => Value::Object(
                        fields
                            .into_iter()
                            .filter(|(field, value)| {
                                field != TRACKING_LINK_FIELD && !names_set_var(value, &lookup)
                            })
                            .collect(),
                    ),
                    other => other,
                };
                (key, wrap_config(config))
            })
            .collect())
    }
}

fn names_set_var<F>(value: &Value, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    value
        .as_str()
        .and_then(lookup)
        .is_some_and(|resolved| !resolved.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn set_env_var_fields_are_dropped() {
        let exported = ResourceConfigurations::default()
            .export_with(env(&[("OPENAI_API_KEY", "sk-test")]))
            .unwrap();
        let llm = exported["llm"]["config"].as_object().unwrap();
        assert!(!llm.contains_key("openai_api_key"));
        assert_eq!(llm["gemini_api_key"], "GOOGLE_API_KEY");
        assert_eq!(llm["model_name"], "gpt-4o");
        let embedding = exported["embedding_model"]["config"].as_object().unwrap();
        assert!(!embedding.contains_key("openai_api_key"));
    }

    #[test]
    fn empty_env_var_is_kept() {
        let exported = ResourceConfigurations::default()
            .export_with(env(&[("AWS_REGION", "")]))
            .unwrap();
        assert_eq!(exported["bucket"]["config"]["region"], "AWS_REGION");
    }

    #[test]
    fn tracking_link_is_always_dropped() {
        let exported = ResourceConfigurations::default()
            .export_with(|_| None)
            .unwrap();
        for key in [resource::LLM, resource::EMBEDDING_MODEL] {
            let cfg = exported[key]["config"].as_object().unwrap();
            assert!(!cfg.contains_key("tracking_client"), "{key}");
        }
        // The tracking resource itself is still exported.
        assert_eq!(
            exported["tracking_client"]["config"]["experiment_name"],
            "dummy"
        );
    }

    #[test]
    fn non_string_fields_are_never_redacted() {
        let exported = ResourceConfigurations::default()
            .export_with(|_| Some("set".into()))
            .unwrap();
        let llm = exported["llm"]["config"].as_object().unwrap();
        assert!(!llm.contains_key("model_name"));
        assert_eq!(llm["max_tokens"], 600);
        assert_eq!(llm["cost_estimation_mode"], false);
    }

    #[test]
    fn process_environment_export_keeps_unset_names() {
        // PATH is always set; no default field is named PATH, so nothing of
        // ours should be affected by it.
        let exported = ResourceConfigurations::default().export().unwrap();
        assert_eq!(exported["vector_store"]["config"]["name"], "parquet");
        assert_eq!(exported.len(), resource::ALL.len());
    }
}
