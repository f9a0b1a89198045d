//! Convenience re-exports for experiment code.
//!
//! ```
//! use feedback_lab::prelude::*;
//! ```
//!
//! Covers configuration, treatments, directors and the collaborator traits.
//! Template internals (registry, renderer, builder) and concrete
//! collaborator implementations stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Error, Record, Result, json_schema_for, record};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::{
    AssetConfigurations, ChunkingConfig, EmbeddingPreprocessorConfig,
    FeedbackGenerationPromptConfig, LlmConfig, ResourceConfigurations, RetrievalConfig,
    SystemConfig, TeacherModelBaseConfig, TeacherModelUpdateConfig, build_system_config,
    resource, stage,
};

// ── Treatments ──────────────────────────────────────────────────────
pub use crate::design::{
    ExperimentDesign, TargetKind, Treatment, TreatmentGroup, introduce_treatment,
};

// ── Prompts ─────────────────────────────────────────────────────────
pub use crate::prompt::{
    ContentTrimmer, FeedbackGenerationConfig, FeedbackGenerationDirector, FeedbackRequest,
    PersonaBaseDirector, PersonaUpdateDirector, StudentConferencingConfig,
    StudentConferencingDirector, Version,
};

// ── Collaborators ───────────────────────────────────────────────────
pub use crate::llm::TextGenerator;
pub use crate::retrieval::Retriever;
pub use crate::tracking::{Tracker, record_or_warn};
