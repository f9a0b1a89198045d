//! Configuration model: typed stage and resource defaults and the resolved
//! [`SystemConfig`] tree they export to.

pub mod assets;
pub mod resources;
pub mod system;

pub use assets::{
    AssetConfigurations, ChunkingConfig, ChunkingStrategy, FeedbackGenerationPromptConfig,
    RetrievalConfig, TeacherModelBaseConfig, TeacherModelUpdateConfig, stage,
};
pub use resources::{
    BucketConfig, EmbeddingModelConfig, EmbeddingPreprocessorConfig, LlmConfig,
    ResourceConfigurations, TrackingClientConfig, VectorStoreConfig, resource,
};
pub use system::{ConfigSection, SystemConfig, build_system_config};
