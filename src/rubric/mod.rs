//! Rubric specs and their remote creation

pub mod outcomes;
pub mod payload;
pub mod resolve;
pub mod spec;
pub mod upload;
pub mod workflow;

pub use outcomes::{OutcomeMapError, OutcomeMapping};
pub use resolve::{resolve, OutcomeFallback, Resolution, ResolvedRubric};
pub use spec::{RubricSpec, RubricSpecError};
pub use workflow::{wait_for_import, PollSettings, RubricError, RubricWorkflow};
