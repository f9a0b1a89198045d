//! Persona creation (`teacher_model_base`).

use std::sync::Arc;

use tracing::debug;

use super::{PromptPlan, require_fields, slot_lengths};
use crate::Record;
use crate::config::TeacherModelBaseConfig;
use crate::error::{Error, Result};
use crate::llm::{TextGenerator, generate};
use crate::prompt::builder::PromptBuilder;
use crate::prompt::render::render;
use crate::prompt::styles::{PersonaBaseStyle, PersonaOutputFormat};
use crate::prompt::templates::{Section, Version};
use crate::prompt::trim::ContentTrimmer;

/// Prompt used to condense one class document before persona creation.
pub const SUMMARIZE_TEMPLATE: &str = "Consider the following task: {task_instruction}:

Here is your task: Summarize the key information from the document below to help complete this task. Limit your response to 3 sentences:
{document_content}
";

struct Inputs {
    class_context: Vec<Record>,
    onboarding: Vec<Record>,
}

/// Builds the prompt that asks a model to write a teacher persona from class
/// documents and onboarding interview answers.
pub struct PersonaBaseDirector {
    config: TeacherModelBaseConfig,
    style: PersonaBaseStyle,
    output_format: PersonaOutputFormat,
    builder: PromptBuilder,
    plan: PromptPlan<Inputs>,
}

impl std::fmt::Debug for PersonaBaseDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaBaseDirector")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .finish()
    }
}

impl PersonaBaseDirector {
    /// Director without a text generator. Fails if the config asks for
    /// summarization.
    pub fn new(config: TeacherModelBaseConfig) -> Result<Self> {
        Self::from_parts(config, None, ContentTrimmer::cl100k()?)
    }

    /// Director that can summarize class documents with `generator`.
    pub fn with_generator(
        config: TeacherModelBaseConfig,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        Self::from_parts(config, Some(generator), ContentTrimmer::cl100k()?)
    }

    pub fn from_parts(
        config: TeacherModelBaseConfig,
        generator: Option<Arc<dyn TextGenerator>>,
        trimmer: ContentTrimmer,
    ) -> Result<Self> {
        if !config.include_class_context && !config.include_onboarding {
            return Err(Error::configuration(
                "at least one of 'include_class_context' and 'include_onboarding' must be true",
            ));
        }
        if config.summarize_class_context && !config.include_class_context {
            return Err(Error::configuration(
                "cannot summarize class context if 'include_class_context' is false",
            ));
        }
        let generator = match (config.summarize_class_context, generator) {
            (true, None) => {
                return Err(Error::configuration(
                    "'summarize_class_context' requires a text generator",
                ));
            }
            (_, generator) => generator,
        };
        let style: PersonaBaseStyle = config.instruction_style.parse()?;
        let output_format: PersonaOutputFormat = config.output_format.parse()?;

        let version = Version::from_number(config.version)?;
        let builder = PromptBuilder::new(version);
        builder.registry().require(
            version,
            &[Section::ClassContextPersona, Section::Onboarding, Section::Create],
        )?;

        let summarize = config.summarize_class_context;
        let max_tokens = config.max_class_context_tokens;
        let plan = PromptPlan::new()
            .section(
                "class_context_prompt",
                config.include_class_context,
                move |inputs: &Inputs| {
                    let mut docs = inputs.class_context.clone();
                    if summarize && let Some(generator) = &generator {
                        docs = summarize_documents(generator.as_ref(), style, docs)?;
                    }
                    let docs = trimmer.trim(docs, max_tokens, "document_content")?;
                    builder.build_few_shot(&docs, Section::ClassContextPersona)
                },
            )
            .section("onboarding_prompt", config.include_onboarding, move |inputs: &Inputs| {
                builder.build_few_shot(&inputs.onboarding, Section::Onboarding)
            });

        Ok(Self {
            config,
            style,
            output_format,
            builder,
            plan,
        })
    }

    pub fn config(&self) -> &TeacherModelBaseConfig {
        &self.config
    }

    /// Whether the sub-prompt `slot` is rendered by this director.
    pub fn section_enabled(&self, slot: &str) -> bool {
        self.plan.is_enabled(slot)
    }

    /// Build the persona-creation prompt.
    ///
    /// `class_context` records need `document_name` and `document_content`;
    /// `onboarding` records need `question` and `response`.
    pub fn build_prompt(&self, class_context: &[Record], onboarding: &[Record]) -> Result<String> {
        require_fields(
            class_context,
            &["document_name", "document_content"],
            "class context document",
        )?;
        require_fields(onboarding, &["question", "response"], "onboarding document")?;

        let inputs = Inputs {
            class_context: class_context.to_vec(),
            onboarding: onboarding.to_vec(),
        };
        let slots = self.plan.render(&inputs)?;
        debug!("[persona_base] rendered slots: {}", slot_lengths(&slots));

        self.builder.build_composed(
            &slots,
            Section::Create,
            &[
                ("task_instruction", self.style.instruction()),
                ("output_format", self.output_format.instruction()),
            ],
        )
    }
}

/// Rewrite each document's content as a short summary, one generator call
/// per document, in order.
fn summarize_documents(
    generator: &dyn TextGenerator,
    style: PersonaBaseStyle,
    docs: Vec<Record>,
) -> Result<Vec<Record>> {
    let total = docs.len();
    docs.into_iter()
        .enumerate()
        .map(|(i, mut doc)| {
            let content = doc.get("document_content").map(String::as_str).unwrap_or("");
            let prompt = render("summarize", SUMMARIZE_TEMPLATE, |name| match name {
                "task_instruction" => Some(style.instruction()),
                "document_content" => Some(content),
                _ => None,
            })?;
            let summary = generate(generator, &prompt)?;
            debug!("[persona_base] summarized class document {}/{total}", i + 1);
            doc.insert("document_content".into(), summary);
            Ok(doc)
        })
        .collect()
}
