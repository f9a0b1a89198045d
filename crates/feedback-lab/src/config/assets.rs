//! Per-stage configuration for the pipeline's assets.
//!
//! Every stage config is a flat struct with `#[serde(default)]`, so a stage
//! block in a persisted [`SystemConfig`](super::SystemConfig) may omit any
//! field. Style and format fields stay strings in the persisted form; the
//! directors parse them at construction.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Stage keys of the `ops` section.
pub mod stage {
    pub const CHUNKED_CLASS_DOCUMENTS: &str = "chunked_class_documents";
    pub const CHUNKED_FEEDBACK: &str = "chunked_feedback";
    pub const TEACHER_MODEL_BASE: &str = "teacher_model_base";
    pub const TEACHER_MODEL_UPDATE_PROMPT: &str = "teacher_model_update_prompt";
    pub const FEEDBACK_RETRIEVAL: &str = "feedback_retrieval";
    pub const CLASS_CONTEXT_RETRIEVAL: &str = "class_context_retrieval";
    pub const FEEDBACK_GENERATION_PROMPT: &str = "feedback_generation_prompt";

    pub const ALL: [&str; 7] = [
        CHUNKED_CLASS_DOCUMENTS,
        CHUNKED_FEEDBACK,
        TEACHER_MODEL_BASE,
        TEACHER_MODEL_UPDATE_PROMPT,
        FEEDBACK_RETRIEVAL,
        CLASS_CONTEXT_RETRIEVAL,
        FEEDBACK_GENERATION_PROMPT,
    ];
}

/// How documents are split before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    #[default]
    RecursiveTextSplitting,
    NltkTextSplitting,
    SemanticChunking,
}

/// Document chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Characters per chunk. Default: `500`.
    pub chunk_size: u32,
    /// Characters shared by adjacent chunks. Default: `100`.
    pub overlap: u32,
    /// Default: `recursive_text_splitting`.
    pub strategy: ChunkingStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
            strategy: ChunkingStrategy::default(),
        }
    }
}

/// Persona creation (`teacher_model_base`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TeacherModelBaseConfig {
    /// Template version. Default: `1`.
    pub version: u32,
    /// Default: `false`.
    pub include_class_context: bool,
    /// Default: `true`.
    pub include_onboarding: bool,
    /// Summarize each class document with the text generator. Default: `false`.
    pub summarize_class_context: bool,
    /// Default: `"DESCRIBE"`.
    pub instruction_style: String,
    /// Default: `"BULLET_POINTS"`.
    pub output_format: String,
    /// Default: `2000`.
    pub max_class_context_tokens: usize,
}

impl Default for TeacherModelBaseConfig {
    fn default() -> Self {
        Self {
            version: 1,
            include_class_context: false,
            include_onboarding: true,
            summarize_class_context: false,
            instruction_style: "DESCRIBE".into(),
            output_format: "BULLET_POINTS".into(),
            max_class_context_tokens: 2000,
        }
    }
}

/// Persona update (`teacher_model_update_prompt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TeacherModelUpdateConfig {
    /// Default: `1`.
    pub version: u32,
    /// Whether the persona is updated at all. Default: `true`.
    pub enabled: bool,
    /// Feedback examples sampled per update. Default: `3`.
    pub max_examples: usize,
    /// Default: `"DESCRIBE"`.
    pub instruction_style: String,
    /// Default: `1500`.
    pub max_feedback_example_tokens: usize,
}

impl Default for TeacherModelUpdateConfig {
    fn default() -> Self {
        Self {
            version: 1,
            enabled: true,
            max_examples: 3,
            instruction_style: "DESCRIBE".into(),
            max_feedback_example_tokens: 1500,
        }
    }
}

/// Similarity search over an embedded index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default: `true`.
    pub enabled: bool,
    /// Similarity metric name. Default: `"cosine"`.
    pub similarity_score: String,
    /// Minimum score for a match. Default: `0.6`.
    pub threshold: f64,
    /// Default: `3`.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_score: "cosine".into(),
            threshold: 0.6,
            top_k: 3,
        }
    }
}

impl RetrievalConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Feedback generation (`feedback_generation_prompt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeedbackGenerationPromptConfig {
    /// Default: `1`.
    pub version: u32,
    /// Default: `true`.
    pub include_teacher_model: bool,
    /// Default: `true`.
    pub include_essay_context: bool,
    /// Default: `"DESCRIBE"`.
    pub instruction_style: String,
    /// Default: `5000`.
    pub max_essay_context_tokens: usize,
    /// Default: `1500`.
    pub max_class_context_tokens: usize,
    /// Default: `2000`.
    pub max_feedback_example_tokens: usize,
}

impl Default for FeedbackGenerationPromptConfig {
    fn default() -> Self {
        Self {
            version: 1,
            include_teacher_model: true,
            include_essay_context: true,
            instruction_style: "DESCRIBE".into(),
            max_essay_context_tokens: 5000,
            max_class_context_tokens: 1500,
            max_feedback_example_tokens: 2000,
        }
    }
}

/// Default configuration of every asset stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfigurations {
    pub chunked_class_documents: ChunkingConfig,
    pub chunked_feedback: ChunkingConfig,
    pub teacher_model_base: TeacherModelBaseConfig,
    pub teacher_model_update_prompt: TeacherModelUpdateConfig,
    pub feedback_retrieval: RetrievalConfig,
    /// Disabled by default.
    pub class_context_retrieval: RetrievalConfig,
    pub feedback_generation_prompt: FeedbackGenerationPromptConfig,
}

impl Default for AssetConfigurations {
    fn default() -> Self {
        Self {
            chunked_class_documents: ChunkingConfig::default(),
            chunked_feedback: ChunkingConfig::default(),
            teacher_model_base: TeacherModelBaseConfig::default(),
            teacher_model_update_prompt: TeacherModelUpdateConfig::default(),
            feedback_retrieval: RetrievalConfig::default(),
            class_context_retrieval: RetrievalConfig::disabled(),
            feedback_generation_prompt: FeedbackGenerationPromptConfig::default(),
        }
    }
}

impl AssetConfigurations {
    /// `{stage: {"config": {...}}}` for every stage. Nothing is redacted.
    pub fn export(&self) -> Result<Map<String, Value>> {
        let Value::Object(stages) = serde_json::to_value(self)? else {
            return Ok(Map::new());
        };
        Ok(stages
            .into_iter()
            .map(|(key, config)| (key, wrap_config(config)))
            .collect())
    }
}

pub(crate) fn wrap_config(config: Value) -> Value {
    let mut block = Map::new();
    block.insert("config".into(), config);
    Value::Object(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_context_retrieval_is_disabled_by_default() {
        let assets = AssetConfigurations::default();
        assert!(!assets.class_context_retrieval.enabled);
        assert!(assets.feedback_retrieval.enabled);
        assert_eq!(assets.feedback_retrieval.top_k, 3);
    }

    #[test]
    fn export_wraps_every_stage_in_config() {
        let exported = AssetConfigurations::default().export().unwrap();
        let mut keys: Vec<&str> = exported.keys().map(String::as_str).collect();
        keys.sort();
        let mut expected = stage::ALL.to_vec();
        expected.sort();
        assert_eq!(keys, expected);
        assert_eq!(
            exported["teacher_model_base"]["config"]["output_format"],
            "BULLET_POINTS"
        );
        assert_eq!(
            exported["chunked_feedback"]["config"]["strategy"],
            "recursive_text_splitting"
        );
    }

    #[test]
    fn partial_stage_block_fills_defaults() {
        let cfg: TeacherModelBaseConfig =
            serde_json::from_str(r#"{"include_class_context": true}"#).unwrap();
        assert!(cfg.include_class_context);
        assert!(cfg.include_onboarding);
        assert_eq!(cfg.max_class_context_tokens, 2000);
    }

    #[test]
    fn chunking_strategy_names() {
        let cfg: ChunkingConfig =
            serde_json::from_str(r#"{"strategy": "semantic_chunking"}"#).unwrap();
        assert_eq!(cfg.strategy, ChunkingStrategy::SemanticChunking);
        assert_eq!(cfg.chunk_size, 500);
    }
}
