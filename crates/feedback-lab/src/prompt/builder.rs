//! Few-shot block assembly and final-template composition.
//!
//! [`PromptBuilder`] renders registered [`TemplateRecord`]s for one
//! [`Version`]. It has two operations:
//!
//! - [`build_few_shot`](PromptBuilder::build_few_shot) renders one body per
//!   example and joins `[prefix, bodies...]` with the record's separator,
//!   skipping empty pieces;
//! - [`build_composed`](PromptBuilder::build_composed) substitutes
//!   pre-rendered sub-prompts and free variables into a final template.
//!
//! [`TemplateRecord`]: super::templates::TemplateRecord

use super::render::render;
use super::templates::{Section, TemplateRegistry, Version};
use crate::Record;
use crate::error::Result;

/// Renders templates of a single version from a registry.
///
/// # Example
///
/// ```
/// use feedback_lab::prompt::{PromptBuilder, Section, Version};
/// use feedback_lab::record;
///
/// let builder = PromptBuilder::new(Version::V1);
/// let block = builder
///     .build_few_shot(
///         &[record(&[("question", "Goal?"), ("response", "Improve writing.")])],
///         Section::Onboarding,
///     )
///     .unwrap();
///
/// assert!(block.starts_with("----- INTERVIEW WITH TEACHER -----"));
/// assert!(block.ends_with("TEACHER RESPONSE: Improve writing."));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    version: Version,
    registry: &'static TemplateRegistry,
}

impl PromptBuilder {
    /// Builder over the standard registry.
    pub fn new(version: Version) -> Self {
        Self::with_registry(version, TemplateRegistry::standard())
    }

    pub fn with_registry(version: Version, registry: &'static TemplateRegistry) -> Self {
        Self { version, registry }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn registry(&self) -> &'static TemplateRegistry {
        self.registry
    }

    /// Render `section` once per example and join the pieces.
    ///
    /// Empty `examples` yields the prefix alone, or `""` when the section has
    /// no prefix. A field referenced by the body but absent from an example
    /// is [`Error::MissingVariable`](crate::Error::MissingVariable).
    pub fn build_few_shot(&self, examples: &[Record], section: Section) -> Result<String> {
        let record = self.registry.lookup(self.version, section)?;

        let mut pieces: Vec<String> = Vec::with_capacity(examples.len() + 1);
        if let Some(prefix) = record.prefix {
            pieces.push(prefix.to_string());
        }
        for example in examples {
            pieces.push(render(section.as_str(), record.body, |name| {
                example.get(name).map(String::as_str)
            })?);
        }

        pieces.retain(|piece| !piece.is_empty());
        Ok(pieces.join(record.separator))
    }

    /// Substitute `sub_prompts` and then `free_variables` into the final
    /// template of `section` in a single pass.
    pub fn build_composed(
        &self,
        sub_prompts: &[(&str, String)],
        section: Section,
        free_variables: &[(&str, &str)],
    ) -> Result<String> {
        let record = self.registry.lookup(self.version, section)?;
        render(section.as_str(), record.body, |name| {
            sub_prompts
                .iter()
                .find(|(slot, _)| *slot == name)
                .map(|(_, value)| value.as_str())
                .or_else(|| {
                    free_variables
                        .iter()
                        .find(|(var, _)| *var == name)
                        .map(|(_, value)| *value)
                })
        })
    }
}
