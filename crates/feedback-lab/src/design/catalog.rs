//! Named treatment groups used by the feedback experiments.
//!
//! Each [`TreatmentGroup`] expands to the treatments that realize it. Groups
//! that only make sense with class context retrieved also switch that
//! retrieval on.

use std::fmt;
use std::str::FromStr;

use crate::config::{resource, stage};
use crate::error::{Error, Result};
use crate::prompt::{FeedbackStyle, PersonaBaseStyle, PersonaOutputFormat, PersonaUpdateStyle};

use super::treatment::Treatment;

macro_rules! treatment_groups {
    ($($variant:ident => $name:literal,)+) => {
        /// A named, reusable set of treatments.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TreatmentGroup {
            $($variant,)+
        }

        impl TreatmentGroup {
            pub const ALL: &'static [TreatmentGroup] = &[$(TreatmentGroup::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(TreatmentGroup::$variant => $name,)+
                }
            }
        }
    };
}

treatment_groups! {
    ClassContextAugmentedPrompt => "CLASS_CONTEXT_AUGMENTED_PROMPT",
    LlmSummaryPrompt => "LLM_SUMMARY_PROMPT",
    ImpersonatePromptStyle => "IMPERSONATE_PROMPT_STYLE",
    ParagraphsOutputFormat => "PARAGRAPHS_OUTPUT_FORMAT",
    MarkdownPromptStyle => "MARKDOWN_PROMPT_STYLE",
    OnboardingAblation => "ONBOARDING_ABLATION",
    DynamicTeacherModelAblation => "DYNAMIC_TEACHER_MODEL_ABLATION",
    OneShotTeacherModelUpdate => "ONE_SHOT_TEACHER_MODEL_UPDATE",
    LargeTeacherModelPromptWithClassContext => "LARGE_TEACHER_MODEL_PROMPT_WITH_CLASS_CONTEXT",
    LargeTeacherModelPromptWithoutClassContext => "LARGE_TEACHER_MODEL_PROMPT_WITHOUT_CLASS_CONTEXT",
    FewShotFeedbackAblation => "FEW_SHOT_FEEDBACK_ABLATION",
    TeacherModelAblation => "TEACHER_MODEL_ABLATION",
    EssayContextAblation => "ESSAY_CONTEXT_ABLATION",
    LargeFeedbackGenerationContext => "LARGE_FEEDBACK_GENERATION_CONTEXT",
    StrictFewShotFeedbackRetrieval => "STRICT_FEW_SHOT_FEEDBACK_RETRIEVAL",
    LooseFewShotFeedbackRetrieval => "LOOSE_FEW_SHOT_FEEDBACK_RETRIEVAL",
    OneShotFeedback => "ONE_SHOT_FEEDBACK",
    StrictClassContextRetrieval => "STRICT_CLASS_CONTEXT_RETRIEVAL",
    LooseClassContextRetrieval => "LOOSE_CLASS_CONTEXT_RETRIEVAL",
    OneShotClassContext => "ONE_SHOT_CLASS_CONTEXT",
    SemanticChunking => "SEMANTIC_CHUNKING",
    NltkChunking => "NLTK_CHUNKING",
    SmallChunks => "SMALL_CHUNKS",
    LargeChunks => "LARGE_CHUNKS",
    GeminiProLlm => "GEMINI_PRO_LLM",
    Gpt35TurboLlm => "GPT_35_TURBO_LLM",
    Gpt4TurboLlm => "GPT_4_TURBO_LLM",
    HighTemperatureLlm => "HIGH_TEMPERATURE_LLM",
    LowTemperatureLlm => "LOW_TEMPERATURE_LLM",
    LowTopPLlm => "LOW_TOP_P_LLM",
    CompleteEmbeddingPreprocess => "COMPLETE_EMBEDDING_PREPROCESS",
    EmbeddingWithEssayContext => "EMBEDDING_WITH_ESSAY_CONTEXT_ESSAY_TEXT",
    EmbeddingWithEssayContextAndInstruction => "EMBEDDING_WITH_ESSAY_CONTEXT_ESSAY_TEXT_INSTRUCTION",
}

fn enable_class_context_retrieval() -> Treatment {
    Treatment::asset(
        "Augment feedback generation prompt with class context",
        stage::CLASS_CONTEXT_RETRIEVAL,
        "enabled",
        true,
    )
}

fn include_class_context_in_persona() -> Treatment {
    Treatment::asset(
        "Augment teacher model prompt with class context",
        stage::TEACHER_MODEL_BASE,
        "include_class_context",
        true,
    )
}

/// Chunking overrides applied identically to feedback and class documents.
fn both_chunkings(label: &str, factor: &str, value: serde_json::Value) -> [Treatment; 2] {
    [
        Treatment::asset(
            format!("{label} on feedback"),
            stage::CHUNKED_FEEDBACK,
            factor,
            value.clone(),
        ),
        Treatment::asset(
            format!("{label} on class documents"),
            stage::CHUNKED_CLASS_DOCUMENTS,
            factor,
            value,
        ),
    ]
}

fn include_in_embedding(part: &str) -> Treatment {
    Treatment::resource(
        format!("Include {} in embedding preprocess", part.replace('_', " ")),
        resource::EMBEDDING_PREPROCESSOR,
        format!("include_{part}"),
        true,
    )
}

impl TreatmentGroup {
    /// The treatments this group applies, in application order.
    pub fn treatments(&self) -> Vec<Treatment> {
        use TreatmentGroup::*;
        match self {
            ClassContextAugmentedPrompt => vec![
                include_class_context_in_persona(),
                enable_class_context_retrieval(),
            ],
            LlmSummaryPrompt => vec![
                Treatment::asset(
                    "Summarize class context with LLM",
                    stage::TEACHER_MODEL_BASE,
                    "summarize_class_context",
                    true,
                ),
                include_class_context_in_persona(),
            ],
            ImpersonatePromptStyle => vec![
                Treatment::asset(
                    "Impersonation prompt for LLM to create teacher model",
                    stage::TEACHER_MODEL_BASE,
                    "instruction_style",
                    PersonaBaseStyle::Impersonate.as_str(),
                ),
                Treatment::asset(
                    "Impersonation prompt for LLM to update teacher model",
                    stage::TEACHER_MODEL_UPDATE_PROMPT,
                    "instruction_style",
                    PersonaUpdateStyle::Impersonate.as_str(),
                ),
                Treatment::asset(
                    "Impersonation prompt for LLM to generate feedback",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "instruction_style",
                    FeedbackStyle::Impersonate.as_str(),
                ),
            ],
            ParagraphsOutputFormat => vec![Treatment::asset(
                "Paragraphs output format for teacher model",
                stage::TEACHER_MODEL_BASE,
                "output_format",
                PersonaOutputFormat::Paragraph.as_str(),
            )],
            MarkdownPromptStyle => vec![
                Treatment::asset(
                    "Markdown prompt style for base teacher model",
                    stage::TEACHER_MODEL_BASE,
                    "version",
                    2,
                ),
                Treatment::asset(
                    "Markdown prompt style for updating teacher model",
                    stage::TEACHER_MODEL_UPDATE_PROMPT,
                    "version",
                    2,
                ),
                Treatment::asset(
                    "Markdown prompt style for feedback generation",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "version",
                    2,
                ),
            ],
            OnboardingAblation => vec![
                Treatment::asset(
                    "Onboarding ablation for teacher model",
                    stage::TEACHER_MODEL_BASE,
                    "include_onboarding",
                    false,
                ),
                include_class_context_in_persona(),
            ],
            DynamicTeacherModelAblation => vec![Treatment::asset(
                "Dynamic teacher model ablation",
                stage::TEACHER_MODEL_UPDATE_PROMPT,
                "enabled",
                false,
            )],
            OneShotTeacherModelUpdate => vec![Treatment::asset(
                "One shot teacher model update",
                stage::TEACHER_MODEL_UPDATE_PROMPT,
                "max_examples",
                1,
            )],
            LargeTeacherModelPromptWithClassContext => {
                let mut treatments = vec![
                    include_class_context_in_persona(),
                    Treatment::asset(
                        "Large class context for teacher model base prompt",
                        stage::TEACHER_MODEL_BASE,
                        "max_class_context_tokens",
                        4000,
                    ),
                ];
                treatments.extend(LargeTeacherModelPromptWithoutClassContext.treatments());
                treatments
            }
            LargeTeacherModelPromptWithoutClassContext => vec![
                Treatment::asset(
                    "Large number of feedback examples in teacher model update prompt",
                    stage::TEACHER_MODEL_UPDATE_PROMPT,
                    "max_examples",
                    5,
                ),
                Treatment::asset(
                    "Large feedback example context for teacher model update prompt",
                    stage::TEACHER_MODEL_UPDATE_PROMPT,
                    "max_feedback_example_tokens",
                    4000,
                ),
            ],
            FewShotFeedbackAblation => vec![Treatment::asset(
                "Few shot feedback ablation",
                stage::FEEDBACK_RETRIEVAL,
                "enabled",
                false,
            )],
            TeacherModelAblation => vec![Treatment::asset(
                "Teacher model ablation from feedback generation",
                stage::FEEDBACK_GENERATION_PROMPT,
                "include_teacher_model",
                false,
            )],
            EssayContextAblation => vec![Treatment::asset(
                "Essay context ablation from feedback generation",
                stage::FEEDBACK_GENERATION_PROMPT,
                "include_essay_context",
                false,
            )],
            LargeFeedbackGenerationContext => vec![
                Treatment::asset(
                    "Large essay context for feedback generation",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "max_essay_context_tokens",
                    5000,
                ),
                Treatment::asset(
                    "Higher class context retrieval",
                    stage::CLASS_CONTEXT_RETRIEVAL,
                    "top_k",
                    4,
                ),
                Treatment::asset(
                    "Large class context for feedback generation",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "max_class_context_tokens",
                    3000,
                ),
                enable_class_context_retrieval(),
                Treatment::asset(
                    "Higher few shot feedback retrieval",
                    stage::FEEDBACK_RETRIEVAL,
                    "top_k",
                    4,
                ),
                Treatment::asset(
                    "Large feedback example context for feedback generation",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "max_feedback_example_tokens",
                    3000,
                ),
            ],
            StrictFewShotFeedbackRetrieval => vec![Treatment::asset(
                "Higher similarity threshold for few shot feedback",
                stage::FEEDBACK_RETRIEVAL,
                "threshold",
                0.8,
            )],
            LooseFewShotFeedbackRetrieval => vec![Treatment::asset(
                "Lower similarity threshold for few shot feedback",
                stage::FEEDBACK_RETRIEVAL,
                "threshold",
                0.4,
            )],
            OneShotFeedback => vec![Treatment::asset(
                "One shot feedback",
                stage::FEEDBACK_RETRIEVAL,
                "top_k",
                1,
            )],
            StrictClassContextRetrieval => vec![
                Treatment::asset(
                    "Higher similarity threshold for class context retrieval",
                    stage::CLASS_CONTEXT_RETRIEVAL,
                    "threshold",
                    0.8,
                ),
                enable_class_context_retrieval(),
            ],
            LooseClassContextRetrieval => vec![
                Treatment::asset(
                    "Lower similarity threshold for class context retrieval",
                    stage::CLASS_CONTEXT_RETRIEVAL,
                    "threshold",
                    0.2,
                ),
                enable_class_context_retrieval(),
            ],
            OneShotClassContext => vec![
                Treatment::asset(
                    "One shot class context retrieval",
                    stage::CLASS_CONTEXT_RETRIEVAL,
                    "top_k",
                    1,
                ),
                enable_class_context_retrieval(),
            ],
            SemanticChunking => {
                let mut treatments =
                    both_chunkings("Semantic chunking", "strategy", "semantic_chunking".into())
                        .to_vec();
                treatments.push(enable_class_context_retrieval());
                treatments
            }
            NltkChunking => {
                let mut treatments =
                    both_chunkings("NLTK chunking", "strategy", "nltk_text_splitting".into())
                        .to_vec();
                treatments.push(enable_class_context_retrieval());
                treatments
            }
            SmallChunks => {
                let mut treatments = both_chunkings("Small chunks", "chunk_size", 200.into()).to_vec();
                treatments.extend(both_chunkings("Small chunks", "overlap", 25.into()));
                treatments.push(enable_class_context_retrieval());
                treatments
            }
            LargeChunks => {
                let mut treatments = both_chunkings("Large chunks", "chunk_size", 1000.into()).to_vec();
                treatments.extend(both_chunkings("Large chunks", "overlap", 150.into()));
                treatments.push(enable_class_context_retrieval());
                treatments.push(Treatment::asset(
                    "Large feedback example context for feedback generation",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "max_feedback_example_tokens",
                    3000,
                ));
                treatments.push(Treatment::asset(
                    "Large class context for feedback generation",
                    stage::FEEDBACK_GENERATION_PROMPT,
                    "max_class_context_tokens",
                    3000,
                ));
                treatments
            }
            GeminiProLlm => vec![Treatment::resource(
                "Gemini Pro LLM",
                resource::LLM,
                "model_name",
                "gemini-1.5-pro",
            )],
            Gpt35TurboLlm => vec![Treatment::resource(
                "GPT-3.5 Turbo LLM",
                resource::LLM,
                "model_name",
                "gpt-3.5-turbo",
            )],
            Gpt4TurboLlm => vec![Treatment::resource(
                "GPT-4 Turbo LLM",
                resource::LLM,
                "model_name",
                "gpt-4-turbo",
            )],
            HighTemperatureLlm => vec![Treatment::resource(
                "High temperature LLM",
                resource::LLM,
                "temperature",
                0.9,
            )],
            LowTemperatureLlm => vec![Treatment::resource(
                "Low temperature LLM",
                resource::LLM,
                "temperature",
                0.5,
            )],
            LowTopPLlm => vec![Treatment::resource(
                "Low top-p LLM",
                resource::LLM,
                "top_p",
                0.7,
            )],
            CompleteEmbeddingPreprocess => vec![
                include_in_embedding("essay_context"),
                include_in_embedding("teacher_feedback"),
                include_in_embedding("teacher_instruction"),
            ],
            EmbeddingWithEssayContext => vec![include_in_embedding("essay_context")],
            EmbeddingWithEssayContextAndInstruction => vec![
                include_in_embedding("essay_context"),
                include_in_embedding("teacher_instruction"),
            ],
        }
    }
}

impl fmt::Display for TreatmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreatmentGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TreatmentGroup::ALL
            .iter()
            .copied()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| Error::configuration(format!("unknown treatment group '{s}'")))
    }
}

/// Treatments of the group named `name`.
pub fn lookup(name: &str) -> Result<Vec<Treatment>> {
    Ok(name.parse::<TreatmentGroup>()?.treatments())
}

/// Every group with its treatments, in declaration order.
pub fn all() -> Vec<(TreatmentGroup, Vec<Treatment>)> {
    TreatmentGroup::ALL
        .iter()
        .map(|group| (*group, group.treatments()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ChunkingConfig, ChunkingStrategy, EmbeddingPreprocessorConfig, RetrievalConfig,
        SystemConfig, TeacherModelBaseConfig,
    };
    use crate::design::introduce_treatment;

    #[test]
    fn every_group_applies_to_defaults_and_validates() {
        let base = SystemConfig::defaults().unwrap();
        for (group, treatments) in all() {
            assert!(!treatments.is_empty(), "{group} is empty");
            let resolved = introduce_treatment(&base, &treatments)
                .unwrap_or_else(|e| panic!("{group}: {e}"));
            resolved
                .validate()
                .unwrap_or_else(|e| panic!("{group}: {e}"));
        }
    }

    #[test]
    fn names_round_trip() {
        for group in TreatmentGroup::ALL {
            assert_eq!(group.as_str().parse::<TreatmentGroup>().unwrap(), *group);
        }
        assert!(matches!(
            lookup("NO_SUCH_GROUP"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn llm_summary_enables_class_context_for_persona() {
        let base = SystemConfig::defaults().unwrap();
        let resolved = introduce_treatment(&base, &lookup("LLM_SUMMARY_PROMPT").unwrap()).unwrap();
        let persona: TeacherModelBaseConfig = resolved.asset(stage::TEACHER_MODEL_BASE).unwrap();
        assert!(persona.summarize_class_context);
        assert!(persona.include_class_context);
    }

    #[test]
    fn small_chunks_touch_both_chunking_stages() {
        let base = SystemConfig::defaults().unwrap();
        let resolved =
            introduce_treatment(&base, &TreatmentGroup::SmallChunks.treatments()).unwrap();
        for key in [stage::CHUNKED_FEEDBACK, stage::CHUNKED_CLASS_DOCUMENTS] {
            let chunking: ChunkingConfig = resolved.asset(key).unwrap();
            assert_eq!(chunking.chunk_size, 200);
            assert_eq!(chunking.overlap, 25);
            assert_eq!(chunking.strategy, ChunkingStrategy::RecursiveTextSplitting);
        }
        let retrieval: RetrievalConfig = resolved.asset(stage::CLASS_CONTEXT_RETRIEVAL).unwrap();
        assert!(retrieval.enabled);
    }

    #[test]
    fn complete_embedding_preprocess_sets_every_flag() {
        let base = SystemConfig::defaults().unwrap();
        let resolved = introduce_treatment(
            &base,
            &TreatmentGroup::CompleteEmbeddingPreprocess.treatments(),
        )
        .unwrap();
        let pre: EmbeddingPreprocessorConfig =
            resolved.resource(resource::EMBEDDING_PREPROCESSOR).unwrap();
        assert!(pre.include_essay_text);
        assert!(pre.include_essay_context);
        assert!(pre.include_teacher_feedback);
        assert!(pre.include_teacher_instruction);
    }
}
