//! Instruction styles and persona output formats.
//!
//! Each director reads its style from a string field of its stage config
//! (`"DESCRIBE"`, `"IMPERSONATE"`, `"BULLET_POINTS"`, ...). Parsing happens
//! at director construction; an unknown name is a configuration error that
//! lists the accepted names.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! closed_style {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $key:literal : $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            /// Fixed instruction text rendered into the prompt.
            pub fn instruction(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let names: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        Error::configuration(format!(
                            "invalid {} '{s}'; must be one of: {}",
                            $label,
                            names.join(", ")
                        ))
                    })
            }
        }
    };
}

closed_style! {
    /// Output layout requested from the persona-creation prompt.
    PersonaOutputFormat, "output format" {
        Paragraph => "PARAGRAPH":
            "Please format the output as a coherent paragraph.",
        BulletPoints => "BULLET_POINTS":
            "Please format the output as a list of bullet points.",
        Sections => "SECTIONS":
            "Please format the output as sections describing different aspects of the teacher. Each section should be written in paragraph form.",
    }
}

closed_style! {
    /// Task framing for persona creation.
    PersonaBaseStyle, "instruction style" {
        Describe => "DESCRIBE":
            "The goal is to generate a persona of this teacher to help with impersonating them when writing feedback or 1:1 conversing with students. Here is some info on the teacher for you to use.",
        Impersonate => "IMPERSONATE":
            "You are a school principal trying to draft a detailed report on one of your teachers. Use the information provided to create a comprehensive profile of the teacher.",
    }
}

closed_style! {
    /// Task framing for persona update.
    PersonaUpdateStyle, "instruction style" {
        Describe => "DESCRIBE":
            "The goal is to take the existing persona of this teacher and update it based on examples of feedback the teacher has given to students. We want the persona to allow us to accurately predict how the teacher will give feedback in the future and interact with students in 1:1 converstaion.",
        Impersonate => "IMPERSONATE":
            "You are a school principal and have been handed a profile of one of your teachers. The district has asked you to update the profile based on feedback the teacher has given to students. Use the information provided to create a comprehensive profile of the teacher that includes their feedback style. If you don't do this well, you will be fired.",
    }
}

closed_style! {
    /// Task framing for feedback generation.
    FeedbackStyle, "instruction style" {
        Describe => "DESCRIBE":
            "The goal is to generate feedback for a highlighted passage (STUDENT ESSAY TEXT) from a student's essay as if it were written by the teacher. Provide feedback that is aligned with the teacher's style and the class needs. Use all of the information at your disposable to customize to the teacher and class. Take the teacher instruction into account, in case they emphasize specifically what they want you to do.",
        Impersonate => "IMPERSONATE":
            "You have hacked into a teacher's account and are interacting with that teacher's students online. They can't see you, but they can see your feedback on their essays. You don't want to get caught, so you try your hardest to mimic the teacher's feedback style. Provide feedback on the STUDENT ESSAY TEXT.",
    }
}

closed_style! {
    /// Task framing for student conferencing.
    ConferencingStyle, "instruction style" {
        Describe => "DESCRIBE":
            "The goal is to interact with the student in a 1:1 conversation about their essay. Their teacher has provided TEACHER FEEDBACK on a select STUDENT TEXT. Your task is to answer the STUDENT QUERY in a way that is relevant to the ESSAY CONTEXT and reflect the TEACHER PERSONA. Use the information provided to guide the conversation that is aligned with the teacher's style and the class needs.",
        Impersonate => "IMPERSONATE":
            "You are a teacher's assistant and have been asked to talk to a student on their essay. Use the information provided to guide the conversation and provide feedback that is aligned with the teacher's style and the class needs. The student is expecting help from the teacher, so you need to impersonate the teacher's style.",
    }
}
