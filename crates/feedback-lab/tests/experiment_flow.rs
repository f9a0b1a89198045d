//! Resolved configuration → director → prompt, across module boundaries.

use std::sync::Arc;

use feedback_lab::config::{LlmConfig, SystemConfig, TeacherModelBaseConfig, resource, stage};
use feedback_lab::design::{ExperimentDesign, Treatment, TreatmentGroup, introduce_treatment};
use feedback_lab::llm::{MockGenerator, MockResponse, TextGenerator, generator_for};
use feedback_lab::prompt::render::placeholders;
use feedback_lab::prompt::{
    CharRatioCounter, ContentTrimmer, FeedbackGenerationConfig, FeedbackGenerationDirector,
    FeedbackRequest, PersonaBaseDirector, PersonaBaseStyle, PersonaOutputFormat,
    PersonaUpdateDirector,
};
use feedback_lab::tracking::{LocalArtifactStore, RUN_CONFIGURATION};
use feedback_lab::{Error, Record, record};

fn class_context() -> Vec<Record> {
    vec![record(&[
        ("document_name", "Syllabus"),
        ("document_content", "Attend class."),
    ])]
}

fn onboarding() -> Vec<Record> {
    vec![record(&[("question", "Goal?"), ("response", "Improve writing.")])]
}

fn char_trimmer() -> ContentTrimmer {
    ContentTrimmer::new(Arc::new(CharRatioCounter::default()))
}

fn assert_in_order(text: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        let at = text
            .get(from..)
            .and_then(|rest| rest.find(needle))
            .unwrap_or_else(|| panic!("'{needle}' missing or out of order"));
        from += at + needle.len();
    }
}

#[test]
fn persona_prompt_from_treated_defaults() {
    let base = SystemConfig::defaults().unwrap();
    let resolved =
        introduce_treatment(&base, &TreatmentGroup::ClassContextAugmentedPrompt.treatments())
            .unwrap();
    let config: TeacherModelBaseConfig = resolved.asset(stage::TEACHER_MODEL_BASE).unwrap();
    assert!(config.include_class_context);
    assert!(config.include_onboarding);
    assert!(!config.summarize_class_context);
    assert_eq!(config.instruction_style, "DESCRIBE");
    assert_eq!(config.output_format, "BULLET_POINTS");

    let director =
        PersonaBaseDirector::from_parts(config, None, ContentTrimmer::cl100k().unwrap()).unwrap();
    let prompt = director.build_prompt(&class_context(), &onboarding()).unwrap();

    assert_in_order(
        &prompt,
        &[
            PersonaBaseStyle::Describe.instruction(),
            "----- TEACHER'S CLASS DOCUMENTS -----",
            "DOCUMENT NAME: Syllabus",
            "Attend class.",
            "----- INTERVIEW WITH TEACHER -----",
            "QUESTION: Goal?",
            "TEACHER RESPONSE: Improve writing.",
            PersonaOutputFormat::BulletPoints.instruction(),
        ],
    );
    assert!(placeholders(&prompt).is_empty(), "unresolved: {prompt}");
}

#[test]
fn markdown_treatment_switches_template_version() {
    let base = SystemConfig::defaults().unwrap();
    let resolved =
        introduce_treatment(&base, &TreatmentGroup::MarkdownPromptStyle.treatments()).unwrap();
    let config: TeacherModelBaseConfig = resolved.asset(stage::TEACHER_MODEL_BASE).unwrap();
    let director = PersonaBaseDirector::from_parts(config, None, char_trimmer()).unwrap();
    let prompt = director.build_prompt(&[], &onboarding()).unwrap();

    assert!(prompt.contains("# TASK\n"));
    assert!(prompt.contains("ANSWER: Improve writing."));
    assert!(!prompt.contains("TEACHER'S CLASS DOCUMENTS"));
}

#[test]
fn llm_summary_runs_mock_generator_once_per_document() {
    let base = SystemConfig::defaults().unwrap();
    let resolved =
        introduce_treatment(&base, &TreatmentGroup::LlmSummaryPrompt.treatments()).unwrap();
    let config: TeacherModelBaseConfig = resolved.asset(stage::TEACHER_MODEL_BASE).unwrap();

    let mock = Arc::new(MockGenerator::new(MockResponse::ClassDocumentSummary));
    let generator: Arc<dyn TextGenerator> = mock.clone();
    let director = PersonaBaseDirector::from_parts(config, Some(generator), char_trimmer()).unwrap();

    let mut docs = class_context();
    docs.push(record(&[
        ("document_name", "Rubric"),
        ("document_content", "Thesis first."),
    ]));
    let prompt = director.build_prompt(&docs, &onboarding()).unwrap();

    assert_eq!(mock.calls(), 2);
    assert!(prompt.contains("MOCKED CLASS DOCUMENT SUMMARY"));
    assert!(!prompt.contains("Attend class."));
}

#[test]
fn cost_estimation_mode_selects_mock_generator() {
    let base = SystemConfig::defaults().unwrap();
    let treatment = Treatment::resource("Cost estimation", resource::LLM, "cost_estimation_mode", true);
    let resolved = introduce_treatment(&base, [&treatment]).unwrap();
    let llm: LlmConfig = resolved.resource(resource::LLM).unwrap();

    let generator = generator_for(&llm, MockResponse::TeacherModel).unwrap();
    let persona = generator.generate("any prompt").unwrap();
    assert!(persona.starts_with("MOCKED TEACHER MODEL"));
}

#[test]
fn ablations_remove_feedback_sections() {
    let base = SystemConfig::defaults().unwrap();
    let mut treatments = TreatmentGroup::TeacherModelAblation.treatments();
    treatments.extend(TreatmentGroup::FewShotFeedbackAblation.treatments());
    let resolved = introduce_treatment(&base, &treatments).unwrap();

    let config = FeedbackGenerationConfig::from_system_config(&resolved).unwrap();
    assert!(!config.include_teacher_model);
    assert!(!config.include_few_shot_feedback);

    let director = FeedbackGenerationDirector::with_trimmer(config, char_trimmer()).unwrap();
    let essay = vec![record(&[
        ("document_name", "Prompt"),
        ("document_content", "Argue a position."),
    ])];
    let prompt = director
        .build_prompt(
            &FeedbackRequest::new("Homework is bad.", "Focus on the thesis."),
            None,
            &[],
            &[],
            &essay,
        )
        .unwrap();

    assert!(!prompt.contains("TEACHER PERSONA"));
    assert!(!prompt.contains("----- FEEDBACK -----"));
    assert_in_order(
        &prompt,
        &[
            "----- ESSAY CONTEXT -----",
            "Argue a position.",
            "STUDENT ESSAY TEXT: Homework is bad.",
            "TEACHER INSTRUCTION: Focus on the thesis.",
        ],
    );
}

#[test]
fn one_shot_update_samples_one_example() {
    let base = SystemConfig::defaults().unwrap();
    let resolved =
        introduce_treatment(&base, &TreatmentGroup::OneShotTeacherModelUpdate.treatments())
            .unwrap();
    let director = PersonaUpdateDirector::with_trimmer(
        resolved.asset(stage::TEACHER_MODEL_UPDATE_PROMPT).unwrap(),
        char_trimmer(),
    )
    .unwrap()
    .with_seed(7);

    let examples: Vec<Record> = (0..4)
        .map(|i| {
            let passage = format!("passage {i}");
            record(&[
                ("highlighted_text", passage.as_str()),
                ("feedback_text", "Good."),
            ])
        })
        .collect();
    let prompt = director.build_prompt("Kind but firm.", &examples).unwrap();
    assert_eq!(prompt.matches("======= FEEDBACK EXAMPLE =======").count(), 1);
    assert!(prompt.contains("Kind but firm."));
}

#[test]
fn dynamic_persona_ablation_skips_update() {
    let base = SystemConfig::defaults().unwrap();
    let resolved =
        introduce_treatment(&base, &TreatmentGroup::DynamicTeacherModelAblation.treatments())
            .unwrap();
    let director = PersonaUpdateDirector::with_trimmer(
        resolved.asset(stage::TEACHER_MODEL_UPDATE_PROMPT).unwrap(),
        char_trimmer(),
    )
    .unwrap();

    let mock = MockGenerator::new(MockResponse::TeacherModel);
    let examples = vec![record(&[
        ("highlighted_text", "passage"),
        ("feedback_text", "Good."),
    ])];
    let persona = director
        .update_persona(&mock, "Kind but firm.", &examples)
        .unwrap();
    assert_eq!(persona, "Kind but firm.");
    assert_eq!(mock.calls(), 0);
}

#[test]
fn treatment_properties_hold_on_defaults() {
    let base = SystemConfig::defaults().unwrap();
    let snapshot = base.clone();

    for group in TreatmentGroup::ALL {
        let treatments = group.treatments();
        let once = introduce_treatment(&base, &treatments).unwrap();
        let twice = introduce_treatment(&once, &treatments).unwrap();
        assert_eq!(once, twice, "{group} is not idempotent");
    }
    assert_eq!(base, snapshot);

    let strict = TreatmentGroup::StrictFewShotFeedbackRetrieval.treatments();
    let loose = TreatmentGroup::LooseFewShotFeedbackRetrieval.treatments();
    let both: Vec<&Treatment> = strict.iter().chain(loose.iter()).collect();
    let resolved = introduce_treatment(&base, both).unwrap();
    assert_eq!(
        resolved.ops["feedback_retrieval"]["config"]["threshold"],
        serde_json::json!(0.4)
    );

    let stale = Treatment::asset("stale", stage::FEEDBACK_RETRIEVAL, "similarity", "cosine");
    let err = introduce_treatment(&base, [&strict[0], &stale]).unwrap_err();
    assert!(matches!(err, Error::FactorNotFound { .. }));
    assert_eq!(base, snapshot);
}

#[test]
fn experiment_variants_record_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let design = ExperimentDesign::new(SystemConfig::defaults().unwrap())
        .with_group(TreatmentGroup::SemanticChunking)
        .with_group(TreatmentGroup::GeminiProLlm);

    for variant in design.resolve().unwrap() {
        let store = LocalArtifactStore::new(dir.path(), variant.name.as_str());
        assert!(variant.record(&store).unwrap());

        let reloaded = SystemConfig::from_json(store.load(RUN_CONFIGURATION).unwrap()).unwrap();
        assert_eq!(reloaded, variant.config);
        reloaded.validate().unwrap();
    }

    assert!(
        dir.path()
            .join("artifacts/GEMINI_PRO_LLM/run_configuration.json")
            .exists()
    );
}
