//! Feedback generation (`feedback_generation_prompt`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PromptPlan, require_fields, slot_lengths};
use crate::config::{FeedbackGenerationPromptConfig, RetrievalConfig, SystemConfig, stage};
use crate::error::{Error, Result};
use crate::prompt::builder::PromptBuilder;
use crate::prompt::styles::FeedbackStyle;
use crate::prompt::templates::{Section, Version};
use crate::prompt::trim::ContentTrimmer;
use crate::{Record, record};

/// Flags and budgets of the feedback-generation director.
///
/// Assembled from three stages: the prompt stage itself plus the `enabled`
/// flags of feedback retrieval and class-context retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeedbackGenerationConfig {
    pub version: u32,
    pub include_teacher_model: bool,
    pub include_few_shot_feedback: bool,
    pub include_class_context_retrieval: bool,
    pub include_essay_context: bool,
    pub instruction_style: String,
    pub max_essay_context_tokens: usize,
    pub max_class_context_tokens: usize,
    pub max_feedback_example_tokens: usize,
}

impl Default for FeedbackGenerationConfig {
    fn default() -> Self {
        Self::from_stages(
            &FeedbackGenerationPromptConfig::default(),
            &RetrievalConfig::default(),
            &RetrievalConfig::disabled(),
        )
    }
}

impl FeedbackGenerationConfig {
    pub fn from_stages(
        prompt: &FeedbackGenerationPromptConfig,
        feedback_retrieval: &RetrievalConfig,
        class_context_retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            version: prompt.version,
            include_teacher_model: prompt.include_teacher_model,
            include_few_shot_feedback: feedback_retrieval.enabled,
            include_class_context_retrieval: class_context_retrieval.enabled,
            include_essay_context: prompt.include_essay_context,
            instruction_style: prompt.instruction_style.clone(),
            max_essay_context_tokens: prompt.max_essay_context_tokens,
            max_class_context_tokens: prompt.max_class_context_tokens,
            max_feedback_example_tokens: prompt.max_feedback_example_tokens,
        }
    }

    /// Read the three contributing stages from a resolved configuration.
    pub fn from_system_config(config: &SystemConfig) -> Result<Self> {
        Ok(Self::from_stages(
            &config.asset(stage::FEEDBACK_GENERATION_PROMPT)?,
            &config.asset(stage::FEEDBACK_RETRIEVAL)?,
            &config.asset(stage::CLASS_CONTEXT_RETRIEVAL)?,
        ))
    }
}

/// A student's highlighted passage and the teacher's instruction for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub text_selection: String,
    pub instruction: String,
}

impl FeedbackRequest {
    pub fn new(text_selection: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            text_selection: text_selection.into(),
            instruction: instruction.into(),
        }
    }

    /// Read a request from a record with `text_selection` and `instruction`.
    pub fn from_record(record: &Record) -> Result<Self> {
        let field = |name: &str| {
            record.get(name).cloned().ok_or_else(|| {
                Error::malformed(format!("each feedback request must have a '{name}' key"))
            })
        };
        Ok(Self {
            text_selection: field("text_selection")?,
            instruction: field("instruction")?,
        })
    }
}

struct Inputs {
    persona: String,
    feedback_examples: Vec<Record>,
    class_context: Vec<Record>,
    essay_context: Vec<Record>,
}

/// Builds the prompt that asks a model to write feedback on a passage in the
/// teacher's voice.
///
/// Sections appear in a fixed order: persona, class context, feedback
/// examples, essay context. Each is trimmed to its own budget; a disabled
/// section leaves its slot empty.
pub struct FeedbackGenerationDirector {
    config: FeedbackGenerationConfig,
    style: FeedbackStyle,
    builder: PromptBuilder,
    plan: PromptPlan<Inputs>,
}

impl std::fmt::Debug for FeedbackGenerationDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackGenerationDirector")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .finish()
    }
}

impl FeedbackGenerationDirector {
    pub fn new(config: FeedbackGenerationConfig) -> Result<Self> {
        Self::with_trimmer(config, ContentTrimmer::cl100k()?)
    }

    pub fn with_trimmer(config: FeedbackGenerationConfig, trimmer: ContentTrimmer) -> Result<Self> {
        if !(config.include_teacher_model
            || config.include_few_shot_feedback
            || config.include_class_context_retrieval
            || config.include_essay_context)
        {
            return Err(Error::configuration(
                "at least one of 'include_class_context_retrieval', 'include_essay_context', \
                 'include_teacher_model', or 'include_few_shot_feedback' must be true",
            ));
        }
        let style: FeedbackStyle = config.instruction_style.parse()?;
        let version = Version::from_number(config.version)?;
        let builder = PromptBuilder::new(version);
        builder.registry().require(
            version,
            &[
                Section::Persona,
                Section::ClassContextFeedback,
                Section::Feedback,
                Section::EssayContext,
                Section::FeedbackGeneration,
            ],
        )?;

        let class_budget = config.max_class_context_tokens;
        let feedback_budget = config.max_feedback_example_tokens;
        let essay_budget = config.max_essay_context_tokens;
        let (t1, t2, t3) = (trimmer.clone(), trimmer.clone(), trimmer);

        let plan = PromptPlan::new()
            .section(
                "teacher_model_prompt",
                config.include_teacher_model,
                move |inputs: &Inputs| {
                    builder.build_few_shot(
                        &[record(&[("teacher_model", inputs.persona.as_str())])],
                        Section::Persona,
                    )
                },
            )
            .section(
                "class_context_prompt",
                config.include_class_context_retrieval,
                move |inputs: &Inputs| {
                    let docs = t1.trim(inputs.class_context.clone(), class_budget, "document_content")?;
                    builder.build_few_shot(&docs, Section::ClassContextFeedback)
                },
            )
            .section(
                "feedback_prompt",
                config.include_few_shot_feedback,
                move |inputs: &Inputs| {
                    let examples =
                        t2.trim(inputs.feedback_examples.clone(), feedback_budget, "highlighted_text")?;
                    builder.build_few_shot(&examples, Section::Feedback)
                },
            )
            .section(
                "essay_context_prompt",
                config.include_essay_context,
                move |inputs: &Inputs| {
                    let docs = t3.trim(inputs.essay_context.clone(), essay_budget, "document_content")?;
                    builder.build_few_shot(&docs, Section::EssayContext)
                },
            );

        Ok(Self {
            config,
            style,
            builder,
            plan,
        })
    }

    pub fn config(&self) -> &FeedbackGenerationConfig {
        &self.config
    }

    /// Whether the sub-prompt `slot` is rendered by this director.
    pub fn section_enabled(&self, slot: &str) -> bool {
        self.plan.is_enabled(slot)
    }

    /// Build the feedback-generation prompt.
    ///
    /// `feedback_examples` need `highlighted_text` and `feedback_text`;
    /// `class_context` and `essay_context` need `document_name` and
    /// `document_content`. All inputs are validated even when their section
    /// is disabled. A `None` persona renders like an empty one: the persona
    /// block is its prefix alone.
    pub fn build_prompt(
        &self,
        request: &FeedbackRequest,
        persona: Option<&str>,
        feedback_examples: &[Record],
        class_context: &[Record],
        essay_context: &[Record],
    ) -> Result<String> {
        require_fields(
            feedback_examples,
            &["feedback_text", "highlighted_text"],
            "feedback retrieval result",
        )?;
        require_fields(
            class_context,
            &["document_name", "document_content"],
            "class context retrieval result",
        )?;
        require_fields(
            essay_context,
            &["document_name", "document_content"],
            "essay context document",
        )?;

        let inputs = Inputs {
            persona: persona.unwrap_or_default().to_string(),
            feedback_examples: feedback_examples.to_vec(),
            class_context: class_context.to_vec(),
            essay_context: essay_context.to_vec(),
        };
        let slots = self.plan.render(&inputs)?;
        debug!("[feedback] rendered slots: {}", slot_lengths(&slots));

        self.builder.build_composed(
            &slots,
            Section::FeedbackGeneration,
            &[
                ("task_instruction", self.style.instruction()),
                ("student_text", request.text_selection.as_str()),
                ("teacher_instruction", request.instruction.as_str()),
            ],
        )
    }
}
