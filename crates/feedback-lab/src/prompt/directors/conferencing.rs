//! Student conferencing: one conversational turn answering a student's
//! question about feedback they received.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PromptPlan, require_fields, require_non_empty, slot_lengths};
use crate::error::{Error, Result};
use crate::prompt::builder::PromptBuilder;
use crate::prompt::styles::ConferencingStyle;
use crate::prompt::templates::{Section, Version};
use crate::prompt::trim::ContentTrimmer;
use crate::{Record, record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StudentConferencingConfig {
    /// Template version. Only `1` defines the conferencing sections. Default: `1`.
    pub version: u32,
    /// Default: `"DESCRIBE"`.
    pub instruction_style: String,
    /// Default: `2000`.
    pub max_essay_context_tokens: usize,
}

impl Default for StudentConferencingConfig {
    fn default() -> Self {
        Self {
            version: 1,
            instruction_style: "DESCRIBE".into(),
            max_essay_context_tokens: 2000,
        }
    }
}

struct Inputs {
    persona: String,
    essay_context: Vec<Record>,
}

/// Builds the prompt for one reply to a student in a 1:1 conversation.
///
/// Each call is independent. Conversation history, if any, is the caller's
/// to carry.
pub struct StudentConferencingDirector {
    config: StudentConferencingConfig,
    style: ConferencingStyle,
    builder: PromptBuilder,
    plan: PromptPlan<Inputs>,
}

impl std::fmt::Debug for StudentConferencingDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentConferencingDirector")
            .field("config", &self.config)
            .finish()
    }
}

impl StudentConferencingDirector {
    pub fn new(config: StudentConferencingConfig) -> Result<Self> {
        Self::with_trimmer(config, ContentTrimmer::cl100k()?)
    }

    pub fn with_trimmer(config: StudentConferencingConfig, trimmer: ContentTrimmer) -> Result<Self> {
        let style: ConferencingStyle = config.instruction_style.parse()?;
        let version = Version::from_number(config.version)?;
        let builder = PromptBuilder::new(version);
        builder.registry().require(
            version,
            &[
                Section::PersonaConferencing,
                Section::EssayContextConferencing,
                Section::StudentConferencing,
            ],
        )?;

        let budget = config.max_essay_context_tokens;
        let plan = PromptPlan::new()
            .section("teacher_model_prompt", true, move |inputs: &Inputs| {
                builder.build_few_shot(
                    &[record(&[("teacher_model", inputs.persona.as_str())])],
                    Section::PersonaConferencing,
                )
            })
            .section("essay_context_prompt", true, move |inputs: &Inputs| {
                let docs = trimmer.trim(inputs.essay_context.clone(), budget, "document_content")?;
                builder.build_few_shot(&docs, Section::EssayContextConferencing)
            });

        Ok(Self {
            config,
            style,
            builder,
            plan,
        })
    }

    pub fn config(&self) -> &StudentConferencingConfig {
        &self.config
    }

    /// Build the conferencing prompt.
    ///
    /// `student_text`, `teacher_feedback` and `student_query` must be
    /// non-empty and at least one essay-context document (`document_name`,
    /// `document_content`) is required.
    pub fn build_prompt(
        &self,
        persona: &str,
        essay_context: &[Record],
        student_text: &str,
        teacher_feedback: &str,
        student_query: &str,
    ) -> Result<String> {
        require_non_empty(student_text, "student text")?;
        require_non_empty(student_query, "student query")?;
        require_non_empty(teacher_feedback, "teacher feedback")?;
        if essay_context.is_empty() {
            return Err(Error::malformed("at least one essay context document is required"));
        }
        require_fields(
            essay_context,
            &["document_name", "document_content"],
            "essay context document",
        )?;

        let inputs = Inputs {
            persona: persona.to_string(),
            essay_context: essay_context.to_vec(),
        };
        let slots = self.plan.render(&inputs)?;
        debug!("[conferencing] rendered slots: {}", slot_lengths(&slots));

        self.builder.build_composed(
            &slots,
            Section::StudentConferencing,
            &[
                ("task_instruction", self.style.instruction()),
                ("student_text", student_text),
                ("teacher_feedback", teacher_feedback),
                ("student_query", student_query),
            ],
        )
    }
}
