//! Prompt directors: persona creation, persona update, feedback generation,
//! student conferencing.
//!
//! Every director follows the same lifecycle:
//!
//! 1. **Construction** parses the style fields of its config, checks flag
//!    combinations ([`Error::Configuration`]) and checks that its template
//!    version defines every section it will use ([`Error::TemplateNotFound`]).
//!    It then builds a [`PromptPlan`]: one entry per sub-prompt slot of the
//!    final template, each with an `enabled` flag fixed by the config and a
//!    render closure.
//! 2. **`build_prompt`** validates the caller's inputs first
//!    ([`Error::MalformedInput`]), renders the enabled plan entries, fills
//!    disabled slots with `""`, and composes the final template.
//!
//! Directors keep no per-call state, so one director can serve many builds.

mod conferencing;
mod feedback;
mod persona_base;
mod persona_update;

pub use conferencing::{StudentConferencingConfig, StudentConferencingDirector};
pub use feedback::{FeedbackGenerationConfig, FeedbackGenerationDirector, FeedbackRequest};
pub use persona_base::{PersonaBaseDirector, SUMMARIZE_TEMPLATE};
pub use persona_update::PersonaUpdateDirector;

use crate::Record;
use crate::error::{Error, Result};

type RenderFn<I> = Box<dyn Fn(&I) -> Result<String> + Send + Sync>;

/// One sub-prompt slot of a director's final template.
pub struct PlannedSection<I> {
    /// Placeholder name in the final template.
    pub slot: &'static str,
    /// Whether the slot is rendered or left empty.
    pub enabled: bool,
    render: RenderFn<I>,
}

impl<I> std::fmt::Debug for PlannedSection<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedSection")
            .field("slot", &self.slot)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Ordered sub-prompt slots, fixed at director construction.
pub struct PromptPlan<I> {
    sections: Vec<PlannedSection<I>>,
}

impl<I> std::fmt::Debug for PromptPlan<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.sections).finish()
    }
}

impl<I> Default for PromptPlan<I> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
        }
    }
}

impl<I> PromptPlan<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot.
    pub fn section(
        mut self,
        slot: &'static str,
        enabled: bool,
        render: impl Fn(&I) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.sections.push(PlannedSection {
            slot,
            enabled,
            render: Box::new(render),
        });
        self
    }

    pub fn sections(&self) -> &[PlannedSection<I>] {
        &self.sections
    }

    pub fn is_enabled(&self, slot: &str) -> bool {
        self.sections.iter().any(|s| s.slot == slot && s.enabled)
    }

    /// Render enabled slots in order; disabled slots become `""`.
    pub fn render(&self, inputs: &I) -> Result<Vec<(&'static str, String)>> {
        self.sections
            .iter()
            .map(|section| {
                let text = if section.enabled {
                    (section.render)(inputs)?
                } else {
                    String::new()
                };
                Ok((section.slot, text))
            })
            .collect()
    }
}

/// Check that every record carries every field in `fields`.
pub(crate) fn require_fields(records: &[Record], fields: &[&str], what: &str) -> Result<()> {
    for (i, record) in records.iter().enumerate() {
        for field in fields {
            if !record.contains_key(*field) {
                return Err(Error::malformed(format!(
                    "each {what} must have a '{field}' key (item {i} does not)"
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::malformed(format!("{what} is required")));
    }
    Ok(())
}

/// `slot=len` pairs for build logging.
pub(crate) fn slot_lengths(slots: &[(&'static str, String)]) -> String {
    slots
        .iter()
        .map(|(slot, text)| format!("{slot}={}", text.len()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn disabled_slots_render_empty_and_skip_closure() {
        let plan: PromptPlan<u32> = PromptPlan::new()
            .section("a", true, |n| Ok(format!("a{n}")))
            .section("b", false, |_| Err(Error::malformed("should not run")));
        let out = plan.render(&7).unwrap();
        assert_eq!(out, vec![("a", "a7".to_string()), ("b", String::new())]);
        assert!(plan.is_enabled("a"));
        assert!(!plan.is_enabled("b"));
    }

    #[test]
    fn render_errors_propagate() {
        let plan: PromptPlan<()> =
            PromptPlan::new().section("a", true, |_| Err(Error::malformed("bad")));
        assert!(matches!(plan.render(&()), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn require_fields_names_field_and_item() {
        let docs = vec![
            record(&[("question", "q"), ("response", "r")]),
            record(&[("question", "q")]),
        ];
        let err = require_fields(&docs, &["question", "response"], "onboarding document")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'response'"));
        assert!(msg.contains("item 1"));
    }
}
