//! Treatment composition and prompt assembly for essay-feedback experiments.
//!
//! `feedback-lab` is the core of an experimentation harness for an LLM-based
//! essay-feedback product. It does two things:
//!
//! 1. **Configuration composition.** Typed defaults for every pipeline stage
//!    and shared resource export to one [`SystemConfig`](config::SystemConfig)
//!    tree. Declarative [`Treatment`](design::Treatment)s override single
//!    fields of a copy of that tree, giving one fully resolved configuration
//!    per experiment variant.
//! 2. **Prompt assembly.** Four prompt directors (persona creation, persona
//!    update, feedback generation, student conferencing) turn typed stage
//!    configs and caller data into prompt strings built from versioned
//!    template fragments.
//!
//! Both are deterministic: the same inputs give the same configuration and
//! the same prompt, byte for byte. The one exception is persona-update
//! example sampling, which is random unless seeded.
//!
//! # Getting started
//!
//! ```no_run
//! use feedback_lab::prelude::*;
//!
//! # fn main() -> feedback_lab::Result<()> {
//! let base = SystemConfig::defaults()?;
//! let resolved = introduce_treatment(&base, &TreatmentGroup::ClassContextAugmentedPrompt.treatments())?;
//!
//! let persona_config: TeacherModelBaseConfig = resolved.asset(stage::TEACHER_MODEL_BASE)?;
//! let director = PersonaBaseDirector::new(persona_config)?;
//! let prompt = director.build_prompt(
//!     &[record(&[("document_name", "Syllabus"), ("document_content", "Attend class.")])],
//!     &[record(&[("question", "Goal?"), ("response", "Improve writing.")])],
//! )?;
//! println!("{prompt}");
//! # Ok(())
//! # }
//! ```
//!
//! # Where to find things
//!
//! - **Stage and resource defaults, the resolved tree:** [`config`].
//! - **Treatments, the named treatment catalog, multi-variant designs:**
//!   [`design`].
//! - **Templates, placeholder rendering, few-shot blocks, token trimming,
//!   directors:** [`prompt`].
//! - **Collaborators:** text generation in [`llm`], similarity search and
//!   query preprocessing in [`retrieval`], artifact recording in
//!   [`tracking`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Typed stage/resource configs, [`SystemConfig`](config::SystemConfig), schema validation |
//! | [`design`] | [`introduce_treatment`](design::introduce_treatment), [`TreatmentGroup`](design::TreatmentGroup), [`ExperimentDesign`](design::ExperimentDesign) |
//! | [`prompt`] | Template registry, [`PromptBuilder`](prompt::PromptBuilder), [`ContentTrimmer`](prompt::ContentTrimmer), directors |
//! | [`llm`] | [`TextGenerator`](llm::TextGenerator), mock and chat-completions generators |
//! | [`retrieval`] | [`Retriever`](retrieval::Retriever), ranking and selection, query text |
//! | [`tracking`] | [`Tracker`](tracking::Tracker), local artifact store |

pub mod config;
pub mod design;
pub mod error;
pub mod llm;
pub mod prelude;
pub mod prompt;
pub mod retrieval;
pub mod tracking;

use std::collections::BTreeMap;

use schemars::JsonSchema;

pub use error::{Error, Result};

// Re-export schemars for downstream crates deriving config types.
pub use schemars;

/// A string-to-string mapping: a document, a Q&A pair, a feedback example,
/// or a retrieval hit.
pub type Record = BTreeMap<String, String>;

/// Build a [`Record`] from key/value pairs.
///
/// ```
/// let doc = feedback_lab::record(&[("document_name", "Syllabus")]);
/// assert_eq!(doc["document_name"], "Syllabus");
/// ```
pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Used to validate resolved configuration trees
/// against the typed configs they must deserialize into.
///
/// # Example
///
/// ```
/// use feedback_lab::json_schema_for;
/// use feedback_lab::config::RetrievalConfig;
///
/// let schema = json_schema_for::<RetrievalConfig>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["properties"]["top_k"].is_object());
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_last_duplicate_key() {
        let r = record(&[("a", "1"), ("a", "2")]);
        assert_eq!(r.len(), 1);
        assert_eq!(r["a"], "2");
    }

    #[test]
    fn record_iterates_in_key_order() {
        let r = record(&[("b", "2"), ("a", "1")]);
        let keys: Vec<&str> = r.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
