//! Versioned template fragments for every semantic prompt section.
//!
//! The [`TemplateRegistry`] is a closed, immutable two-level map from
//! [`Version`] to [`Section`] to [`TemplateRecord`]. `V1` defines all twelve
//! sections; `V2` (the markdown-headed layout) defines the nine sections used
//! for persona and feedback prompts and has no conferencing sections.
//!
//! Directors call [`TemplateRegistry::require`] at construction so a
//! version/section mismatch fails before any input is processed.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Separator placed between rendered pieces of a few-shot block.
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Template layout version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    /// Banner-style headings (`======= ... =======`).
    V1,
    /// Markdown headings (`# TASK`, `### ...`).
    V2,
}

impl Version {
    pub const ALL: [Version; 2] = [Version::V1, Version::V2];

    /// Map the integer `version` field of a stage config to a tag.
    pub fn from_number(n: u32) -> Result<Self> {
        match n {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            other => Err(Error::configuration(format!(
                "unsupported template version {other} (expected 1 or 2)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1 => "V1",
            Version::V2 => "V2",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named semantic prompt section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// Class documents shown when creating a persona.
    ClassContextPersona,
    /// Retrieved class documents shown when generating feedback.
    ClassContextFeedback,
    /// Teacher interview Q&A pairs.
    Onboarding,
    /// Feedback examples (highlighted text + teacher feedback).
    Feedback,
    EssayContext,
    /// The persona rendered into a feedback prompt.
    Persona,
    /// Final template for persona creation.
    Create,
    /// Final template for persona update.
    Update,
    /// Final template for feedback generation.
    FeedbackGeneration,
    /// Final template for student conferencing.
    StudentConferencing,
    EssayContextConferencing,
    PersonaConferencing,
}

impl Section {
    pub const ALL: [Section; 12] = [
        Section::ClassContextPersona,
        Section::ClassContextFeedback,
        Section::Onboarding,
        Section::Feedback,
        Section::EssayContext,
        Section::Persona,
        Section::Create,
        Section::Update,
        Section::FeedbackGeneration,
        Section::StudentConferencing,
        Section::EssayContextConferencing,
        Section::PersonaConferencing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::ClassContextPersona => "class_context_persona",
            Section::ClassContextFeedback => "class_context_feedback",
            Section::Onboarding => "onboarding",
            Section::Feedback => "feedback",
            Section::EssayContext => "essay_context",
            Section::Persona => "persona",
            Section::Create => "create",
            Section::Update => "update",
            Section::FeedbackGeneration => "feedback_generation",
            Section::StudentConferencing => "student_conferencing",
            Section::EssayContextConferencing => "essay_context_conferencing",
            Section::PersonaConferencing => "persona_conferencing",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| Error::configuration(format!("unknown prompt section '{s}'")))
    }
}

/// One registered template: a body with `{name}` placeholders, an optional
/// prefix shown once before the rendered bodies, and the separator between
/// pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRecord {
    pub body: &'static str,
    pub prefix: Option<&'static str>,
    pub separator: &'static str,
}

impl TemplateRecord {
    const fn new(body: &'static str, prefix: Option<&'static str>) -> Self {
        Self {
            body,
            prefix,
            separator: DEFAULT_SEPARATOR,
        }
    }
}

/// Immutable version → section → template map.
#[derive(Debug)]
pub struct TemplateRegistry {
    versions: BTreeMap<Version, BTreeMap<Section, TemplateRecord>>,
}

impl TemplateRegistry {
    /// The process-wide registry of built-in templates.
    pub fn standard() -> &'static TemplateRegistry {
        static STANDARD: OnceLock<TemplateRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| TemplateRegistry {
            versions: BTreeMap::from([
                (Version::V1, v1::records().into_iter().collect()),
                (Version::V2, v2::records().into_iter().collect()),
            ]),
        })
    }

    /// Look up the template for `section` under `version`.
    pub fn lookup(&self, version: Version, section: Section) -> Result<&TemplateRecord> {
        self.versions
            .get(&version)
            .and_then(|sections| sections.get(&section))
            .ok_or_else(|| Error::TemplateNotFound {
                version: version.to_string(),
                section: section.to_string(),
            })
    }

    /// Fail with the first section that `version` does not define.
    pub fn require(&self, version: Version, sections: &[Section]) -> Result<()> {
        for &section in sections {
            self.lookup(version, section)?;
        }
        Ok(())
    }

    /// Sections defined for `version`, in section order.
    pub fn sections(&self, version: Version) -> Vec<Section> {
        self.versions
            .get(&version)
            .map(|sections| sections.keys().copied().collect())
            .unwrap_or_default()
    }
}

mod v1 {
    use super::{Section, TemplateRecord};

    const CLASS_DOCUMENT: &str = "======= CLASS DOCUMENT =======
DOCUMENT NAME: {document_name}
DOCUMENT CONTENT:
{document_content}";

    const ONBOARDING: &str = "======= Q&A =======
QUESTION: {question}
TEACHER RESPONSE: {response}";

    const FEEDBACK: &str = "======= FEEDBACK EXAMPLE =======
STUDENT ESSAY TEXT: {highlighted_text}

TEACHER FEEDBACK: {feedback_text}";

    const ESSAY_CONTEXT: &str = "======= ESSAY CONTEXT =======
DOCUMENT NAME: {document_name}
DOCUMENT CONTENT: {document_content}";

    const PERSONA: &str = "{teacher_model}";

    const CREATE: &str = "
TASK: {task_instruction}

---------------------------

{class_context_prompt}

{onboarding_prompt}
---------------------------

{output_format}
";

    const UPDATE: &str = "
TASK: {task_instruction}

---------------------------

----- EXISTING TEACHER PERSONA -----
Here is the current profile of the teacher.

{teacher_model_base}

{feedback_prompt}
---------------------------

Your updated profile should maintain the format of the existing teacher persona.
";

    const FEEDBACK_GENERATION: &str = "
TASK: {task_instruction}

---------------------------

{teacher_model_prompt}

{class_context_prompt}

{feedback_prompt}

{essay_context_prompt}

---------------------------

STUDENT ESSAY TEXT: {student_text}
TEACHER INSTRUCTION: {teacher_instruction}
FEEDBACK: \n";

    const STUDENT_CONFERENCING: &str = "
TASK: {task_instruction}

---------------------------

{teacher_model_prompt}

{essay_context_prompt}

---------------------------

STUDENT ESSAY TEXT: {student_text}
TEACHER FEEDBACK: {teacher_feedback}
STUDENT QUERY: {student_query}
RESPONSE:
";

    const PERSONA_CONFERENCING: &str = "======= TEACHER PERSONA =======
{teacher_model}";

    const PREFIX_CLASS_CONTEXT_PERSONA: &str = "----- TEACHER'S CLASS DOCUMENTS -----
Here are documents from the teacher's class. Use them to extract information about the class and the teacher's goals and teaching style.";

    const PREFIX_CLASS_CONTEXT_FEEDBACK: &str = "----- TEACHER'S CLASS DOCUMENTS -----
Here is relevant context from the class documents. Use them to provide better feedback to students in alignment with the class needs.";

    const PREFIX_ONBOARDING: &str = "----- INTERVIEW WITH TEACHER -----
Here is an interview with the teacher.";

    const PREFIX_FEEDBACK: &str = "----- FEEDBACK -----
Here are examples of feedback the teacher has given to students.";

    const PREFIX_ESSAY_CONTEXT: &str = "----- ESSAY CONTEXT -----
Here is context on the essay assignment. Use this to provide feedback that is relevant to the essay assignment.";

    const PREFIX_PERSONA: &str = "----- TEACHER PERSONA -----
Here is a persona of the teacher. Use this to help with impersonating them when writing feedback.";

    const PREFIX_ESSAY_CONTEXT_CONFERENCING: &str = "----- ESSAY CONTEXT -----
Here is context on the essay assignment. Use this to interact with the student in 1:1 conversation that is relevant to the essay assignment.";

    const PREFIX_PERSONA_CONFERENCING: &str = "----- TEACHER PERSONA -----
Here is a persona of the teacher. Use this to help with impersonating them when 1:1 conversing with students.";

    pub(super) fn records() -> Vec<(Section, TemplateRecord)> {
        vec![
            (
                Section::ClassContextPersona,
                TemplateRecord::new(CLASS_DOCUMENT, Some(PREFIX_CLASS_CONTEXT_PERSONA)),
            ),
            (
                Section::ClassContextFeedback,
                TemplateRecord::new(CLASS_DOCUMENT, Some(PREFIX_CLASS_CONTEXT_FEEDBACK)),
            ),
            (
                Section::Onboarding,
                TemplateRecord::new(ONBOARDING, Some(PREFIX_ONBOARDING)),
            ),
            (
                Section::Feedback,
                TemplateRecord::new(FEEDBACK, Some(PREFIX_FEEDBACK)),
            ),
            (
                Section::EssayContext,
                TemplateRecord::new(ESSAY_CONTEXT, Some(PREFIX_ESSAY_CONTEXT)),
            ),
            (
                Section::Persona,
                TemplateRecord::new(PERSONA, Some(PREFIX_PERSONA)),
            ),
            (Section::Create, TemplateRecord::new(CREATE, None)),
            (Section::Update, TemplateRecord::new(UPDATE, None)),
            (
                Section::FeedbackGeneration,
                TemplateRecord::new(FEEDBACK_GENERATION, None),
            ),
            (
                Section::StudentConferencing,
                TemplateRecord::new(STUDENT_CONFERENCING, None),
            ),
            (
                Section::EssayContextConferencing,
                TemplateRecord::new(ESSAY_CONTEXT, Some(PREFIX_ESSAY_CONTEXT_CONFERENCING)),
            ),
            (
                Section::PersonaConferencing,
                TemplateRecord::new(PERSONA_CONFERENCING, Some(PREFIX_PERSONA_CONFERENCING)),
            ),
        ]
    }
}

mod v2 {
    use super::{Section, TemplateRecord};

    const CLASS_DOCUMENT: &str = "### {document_name}
{document_content}";

    const ONBOARDING: &str = "### Q&A
QUESTION: {question}
ANSWER: {response}";

    const FEEDBACK: &str = "### Feedback Example
STUDENT ESSAY TEXT: {highlighted_text}

TEACHER FEEDBACK: {feedback_text}";

    const ESSAY_CONTEXT: &str = "### Essay Context
DOCUMENT NAME: {document_name}
DOCUMENT CONTENT: {document_content}";

    const PERSONA: &str = "{teacher_model}";

    const CREATE: &str = "
# TASK
{task_instruction}

# INFORMATION ABOUT THE TEACHER

{class_context_prompt}

{onboarding_prompt}

# OUTPUT FORMAT
{output_format}
";

    const UPDATE: &str = "
# TASK
{task_instruction}

# INFORMATION ABOUT THE TEACHER
## EXISTING TEACHER PERSONA
Here is the current profile of the teacher.

{teacher_model_base}

{feedback_prompt}

# OUTPUT FORMAT
Your updated profile should maintain the format of the existing teacher persona.
";

    const FEEDBACK_GENERATION: &str = "
# TASK
{task_instruction}

# INFORMATION ABOUT THE TEACHER
{teacher_model_prompt}

{class_context_prompt}

{feedback_prompt}

{essay_context_prompt}

# STUDENT ESSAY TEXT
{student_text}

# TEACHER INSTRUCTION
{teacher_instruction}

# FEEDBACK
";

    const PREFIX_CLASS_CONTEXT_PERSONA: &str = "## Teacher's Class Documents
Here are documents from the teacher's class. Use them to extract information about the class and the teacher's goals and teaching style.";

    const PREFIX_CLASS_CONTEXT_FEEDBACK: &str = "## Teacher's Class Documents
Here is relevant context from the class documents. Use them to provide better feedback to students in alignment with the class needs.";

    const PREFIX_ONBOARDING: &str = "## Interview with Teacher
Here is an interview with the teacher.";

    const PREFIX_FEEDBACK: &str = "## Feedback Examples
Here are examples of feedback the teacher has given to students.";

    const PREFIX_ESSAY_CONTEXT: &str = "## Essay Context
Here is context on the essay assignment. Use this to provide feedback that is relevant to the essay assignment.";

    const PREFIX_PERSONA: &str = "## Teacher Persona
Here is a persona of the teacher. Use this to help with impersonating them when writing feedback.";

    pub(super) fn records() -> Vec<(Section, TemplateRecord)> {
        vec![
            (
                Section::ClassContextPersona,
                TemplateRecord::new(CLASS_DOCUMENT, Some(PREFIX_CLASS_CONTEXT_PERSONA)),
            ),
            (
                Section::ClassContextFeedback,
                TemplateRecord::new(CLASS_DOCUMENT, Some(PREFIX_CLASS_CONTEXT_FEEDBACK)),
            ),
            (
                Section::Onboarding,
                TemplateRecord::new(ONBOARDING, Some(PREFIX_ONBOARDING)),
            ),
            (
                Section::Feedback,
                TemplateRecord::new(FEEDBACK, Some(PREFIX_FEEDBACK)),
            ),
            (
                Section::EssayContext,
                TemplateRecord::new(ESSAY_CONTEXT, Some(PREFIX_ESSAY_CONTEXT)),
            ),
            (
                Section::Persona,
                TemplateRecord::new(PERSONA, Some(PREFIX_PERSONA)),
            ),
            (Section::Create, TemplateRecord::new(CREATE, None)),
            (Section::Update, TemplateRecord::new(UPDATE, None)),
            (
                Section::FeedbackGeneration,
                TemplateRecord::new(FEEDBACK_GENERATION, None),
            ),
        ]
    }
}
