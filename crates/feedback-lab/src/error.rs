//! Error taxonomy shared by every module in the crate.
//!
//! Nothing in the crate retries or degrades on error: each variant is surfaced
//! to the immediate caller. The variants group into four families:
//!
//! - director construction ([`Error::Configuration`]) and director inputs
//!   ([`Error::MalformedInput`]);
//! - template/version mismatches ([`Error::TemplateNotFound`],
//!   [`Error::MissingVariable`]);
//! - stale treatment definitions ([`Error::UnknownTargetKind`],
//!   [`Error::StageNotFound`], [`Error::FactorNotFound`]);
//! - collaborator and I/O failures ([`Error::Generation`],
//!   [`Error::Tracking`], [`Error::Io`], [`Error::Serialization`],
//!   [`Error::SchemaViolation`]).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A director's flags or limits contradict each other.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied data to `build_prompt` lacks a required field or value.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The requested section is not registered for the version.
    #[error("template '{section}' is not defined for version {version}")]
    TemplateNotFound { version: String, section: String },

    /// A template placeholder had no value supplied.
    #[error("template '{template}' references '{{{name}}}' but no value was supplied")]
    MissingVariable { template: String, name: String },

    /// A treatment target kind other than `Asset` or `Resource`.
    #[error("unknown treatment target kind '{0}' (expected 'Asset' or 'Resource')")]
    UnknownTargetKind(String),

    /// A treatment or lookup named a stage that the configuration lacks.
    #[error("stage '{key}' not found in '{section}'")]
    StageNotFound { section: String, key: String },

    /// A treatment named a field that the stage's config lacks.
    #[error("field '{factor}' not found in '{section}.{key}.config'")]
    FactorNotFound {
        section: String,
        key: String,
        factor: String,
    },

    /// The text-generation collaborator failed.
    #[error("text generation failed: {0}")]
    Generation(String),

    /// The tracking collaborator failed.
    #[error("tracking failed: {0}")]
    Tracking(String),

    /// A resolved configuration does not match the schema of its typed config.
    #[error("configuration does not match its schema:\n{}", .0.join("\n"))]
    SchemaViolation(Vec<String>),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_message_shows_braced_name() {
        let err = Error::MissingVariable {
            template: "create".into(),
            name: "task_instruction".into(),
        };
        assert_eq!(
            err.to_string(),
            "template 'create' references '{task_instruction}' but no value was supplied"
        );
    }

    #[test]
    fn schema_violation_lists_every_problem() {
        let err = Error::SchemaViolation(vec!["  - /a: bad".into(), "  - /b: worse".into()]);
        let msg = err.to_string();
        assert!(msg.contains("/a: bad"));
        assert!(msg.contains("/b: worse"));
    }
}
