//! Persona update (`teacher_model_update_prompt`).

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::{PromptPlan, require_fields, slot_lengths};
use crate::Record;
use crate::config::TeacherModelUpdateConfig;
use crate::error::{Error, Result};
use crate::llm::{TextGenerator, generate};
use crate::prompt::builder::PromptBuilder;
use crate::prompt::styles::PersonaUpdateStyle;
use crate::prompt::templates::{Section, Version};
use crate::prompt::trim::ContentTrimmer;

struct Inputs {
    examples: Vec<Record>,
}

/// Builds the prompt that revises an existing persona from feedback the
/// teacher has given.
///
/// When more than `max_examples` feedback examples are supplied, a uniform
/// random subset is used. The subset differs between calls unless a seed is
/// set with [`with_seed`](Self::with_seed).
pub struct PersonaUpdateDirector {
    config: TeacherModelUpdateConfig,
    style: PersonaUpdateStyle,
    builder: PromptBuilder,
    plan: PromptPlan<Inputs>,
    seed: Option<u64>,
}

impl std::fmt::Debug for PersonaUpdateDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaUpdateDirector")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .finish()
    }
}

impl PersonaUpdateDirector {
    pub fn new(config: TeacherModelUpdateConfig) -> Result<Self> {
        Self::with_trimmer(config, ContentTrimmer::cl100k()?)
    }

    pub fn with_trimmer(config: TeacherModelUpdateConfig, trimmer: ContentTrimmer) -> Result<Self> {
        if config.max_examples == 0 {
            return Err(Error::configuration("'max_examples' must be at least 1"));
        }
        let style: PersonaUpdateStyle = config.instruction_style.parse()?;
        let version = Version::from_number(config.version)?;
        let builder = PromptBuilder::new(version);
        builder
            .registry()
            .require(version, &[Section::Feedback, Section::Update])?;

        let max_tokens = config.max_feedback_example_tokens;
        let plan = PromptPlan::new().section("feedback_prompt", true, move |inputs: &Inputs| {
            let examples = trimmer.trim(inputs.examples.clone(), max_tokens, "highlighted_text")?;
            builder.build_few_shot(&examples, Section::Feedback)
        });

        Ok(Self {
            config,
            style,
            builder,
            plan,
            seed: None,
        })
    }

    /// Make example sampling reproducible: every build with the same inputs
    /// picks the same subset.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &TeacherModelUpdateConfig {
        &self.config
    }

    /// Whether the persona is revised at all. Default: `true`.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Revise `persona` with `generator`. When the stage is disabled the
    /// persona comes back unchanged and the generator is never called.
    pub fn update_persona(
        &self,
        generator: &dyn TextGenerator,
        persona: &str,
        examples: &[Record],
    ) -> Result<String> {
        if !self.config.enabled {
            debug!("[persona_update] disabled; keeping base persona");
            return Ok(persona.to_string());
        }
        let prompt = self.build_prompt(persona, examples)?;
        generate(generator, &prompt)
    }

    /// Build the persona-update prompt from the current `persona` and
    /// feedback examples (`highlighted_text`, `feedback_text`).
    pub fn build_prompt(&self, persona: &str, examples: &[Record]) -> Result<String> {
        if examples.is_empty() {
            return Err(Error::malformed("at least one feedback example is required"));
        }
        require_fields(examples, &["highlighted_text", "feedback_text"], "feedback example")?;

        let inputs = Inputs {
            examples: self.sample(examples),
        };
        let slots = self.plan.render(&inputs)?;
        debug!(
            "[persona_update] {} of {} examples; {}",
            inputs.examples.len(),
            examples.len(),
            slot_lengths(&slots)
        );

        self.builder.build_composed(
            &slots,
            Section::Update,
            &[
                ("task_instruction", self.style.instruction()),
                ("teacher_model_base", persona),
            ],
        )
    }

    fn sample(&self, examples: &[Record]) -> Vec<Record> {
        let mut examples = examples.to_vec();
        if examples.len() > self.config.max_examples {
            match self.seed {
                Some(seed) => examples.shuffle(&mut StdRng::seed_from_u64(seed)),
                None => examples.shuffle(&mut rand::thread_rng()),
            }
            examples.truncate(self.config.max_examples);
        }
        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockGenerator, MockResponse};
    use crate::prompt::trim::CharRatioCounter;
    use crate::record;
    use std::sync::Arc;

    fn director(config: TeacherModelUpdateConfig) -> PersonaUpdateDirector {
        PersonaUpdateDirector::with_trimmer(
            config,
            ContentTrimmer::new(Arc::new(CharRatioCounter::default())),
        )
        .unwrap()
    }

    fn examples(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let passage = format!("essay passage {i}");
                let feedback = format!("feedback {i}");
                record(&[
                    ("highlighted_text", passage.as_str()),
                    ("feedback_text", feedback.as_str()),
                ])
            })
            .collect()
    }

    fn count_examples(prompt: &str) -> usize {
        prompt.matches("======= FEEDBACK EXAMPLE =======").count()
    }

    #[test]
    fn disabled_stage_keeps_persona_without_generating() {
        let mock = MockGenerator::new(MockResponse::TeacherModel);
        let d = director(TeacherModelUpdateConfig {
            enabled: false,
            ..TeacherModelUpdateConfig::default()
        });
        assert!(!d.enabled());
        let persona = d.update_persona(&mock, "Kind but firm.", &examples(2)).unwrap();
        assert_eq!(persona, "Kind but firm.");
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn enabled_stage_generates_updated_persona() {
        let mock = MockGenerator::new(MockResponse::TeacherModel);
        let d = director(TeacherModelUpdateConfig::default());
        let persona = d.update_persona(&mock, "Kind but firm.", &examples(2)).unwrap();
        assert!(persona.starts_with("MOCKED TEACHER MODEL"));
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn requires_at_least_one_example() {
        let d = director(TeacherModelUpdateConfig::default());
        let err = d.build_prompt("persona", &[]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(ref m) if m.contains("at least one")));
    }

    #[test]
    fn example_without_feedback_text_is_malformed() {
        let d = director(TeacherModelUpdateConfig::default());
        let err = d
            .build_prompt("persona", &[record(&[("highlighted_text", "x")])])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(ref m) if m.contains("feedback_text")));
    }

    #[test]
    fn zero_max_examples_is_rejected() {
        let config = TeacherModelUpdateConfig {
            max_examples: 0,
            ..TeacherModelUpdateConfig::default()
        };
        let err = PersonaUpdateDirector::with_trimmer(
            config,
            ContentTrimmer::new(Arc::new(CharRatioCounter::default())),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn keeps_all_examples_within_limit_in_order() {
        let d = director(TeacherModelUpdateConfig::default());
        let prompt = d.build_prompt("persona", &examples(3)).unwrap();
        assert_eq!(count_examples(&prompt), 3);
        let first = prompt.find("essay passage 0").unwrap();
        let last = prompt.find("essay passage 2").unwrap();
        assert!(first < last);
    }

    #[test]
    fn samples_down_to_max_examples() {
        let d = director(TeacherModelUpdateConfig::default());
        let prompt = d.build_prompt("persona", &examples(10)).unwrap();
        assert_eq!(count_examples(&prompt), 3);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let d = director(TeacherModelUpdateConfig::default()).with_seed(42);
        let a = d.build_prompt("persona", &examples(10)).unwrap();
        let b = d.build_prompt("persona", &examples(10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn persona_and_instruction_are_substituted() {
        let d = director(TeacherModelUpdateConfig {
            instruction_style: "IMPERSONATE".into(),
            ..TeacherModelUpdateConfig::default()
        });
        let prompt = d
            .build_prompt("Warm but {strict} grader.", &examples(1))
            .unwrap();
        assert!(prompt.contains("Here is the current profile of the teacher.\n\nWarm but {strict} grader.\n\n----- FEEDBACK -----"));
        assert!(prompt.contains(PersonaUpdateStyle::Impersonate.instruction()));
    }

    #[test]
    fn highlighted_text_is_trimmed() {
        let d = director(TeacherModelUpdateConfig {
            max_feedback_example_tokens: 2,
            ..TeacherModelUpdateConfig::default()
        });
        let prompt = d.build_prompt("persona", &examples(1)).unwrap();
        // 2 tokens over one document: first two characters survive.
        assert!(prompt.contains("STUDENT ESSAY TEXT: es..."));
        assert!(prompt.contains("TEACHER FEEDBACK: feedback 0"));
    }
}
