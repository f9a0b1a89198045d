//! Experiment design: treatments, the treatment catalog, and multi-variant
//! designs resolved against one base configuration.
//!
//! A treatment sets one field of one stage or resource. Applying a list of
//! treatments never touches the base configuration; it returns a resolved
//! copy.
//!
//! ```
//! use feedback_lab::config::{RetrievalConfig, SystemConfig, stage};
//! use feedback_lab::design::{Treatment, introduce_treatment};
//!
//! let base = SystemConfig::defaults()?;
//! let ablation = Treatment::asset(
//!     "Few shot feedback ablation",
//!     stage::FEEDBACK_RETRIEVAL,
//!     "enabled",
//!     false,
//! );
//! let resolved = introduce_treatment(&base, [&ablation])?;
//! let retrieval: RetrievalConfig = resolved.asset(stage::FEEDBACK_RETRIEVAL)?;
//! assert!(!retrieval.enabled);
//! # Ok::<(), feedback_lab::Error>(())
//! ```

pub mod catalog;
pub mod experiment;
pub mod treatment;

pub use catalog::TreatmentGroup;
pub use experiment::{ExperimentDesign, ResolvedVariant, Variant};
pub use treatment::{TargetKind, Treatment, introduce_treatment};
