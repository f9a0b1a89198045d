//! Prompt construction.
//!
//! - [`templates`]: versioned template fragments per prompt section.
//! - [`render`]: single-pass `{name}` placeholder substitution.
//! - [`builder`]: few-shot blocks and composition of sub-prompts.
//! - [`trim`]: shared token budgets over lists of documents.
//! - [`styles`]: instruction styles and output formats.
//! - [`directors`]: the four prompt pipelines built on the above.

pub mod builder;
pub mod directors;
pub mod render;
pub mod styles;
pub mod templates;
pub mod trim;

pub use builder::PromptBuilder;
pub use directors::{
    FeedbackGenerationConfig, FeedbackGenerationDirector, FeedbackRequest, PersonaBaseDirector,
    PersonaUpdateDirector, PromptPlan, StudentConferencingConfig, StudentConferencingDirector,
};
pub use styles::{
    ConferencingStyle, FeedbackStyle, PersonaBaseStyle, PersonaOutputFormat, PersonaUpdateStyle,
};
pub use templates::{Section, TemplateRecord, TemplateRegistry, Version};
pub use trim::{CharRatioCounter, Cl100kCounter, ContentTrimmer, TokenCount};
