//! CLI command implementations

pub mod modules;
pub mod prune;
pub mod rubrics;
pub mod sync;
pub mod validate;
pub mod watch;
