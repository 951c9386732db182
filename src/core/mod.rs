//! Core module - local state, reconciliation and the sync steps

pub mod config;
pub mod content;
pub mod credentials;
pub mod loader;
pub mod mirror;
pub mod modules;
pub mod pipeline;
pub mod prune;
pub mod reconcile;
pub mod report;

pub use config::{Config, ConfigError, ConfigSources, CourseLayout, RubricStrategy, SyncSettings};
pub use content::{ContentDescriptor, ContentDetails, ContentKind, ModulePlacement};
pub use credentials::Credentials;
pub use loader::{ChangeSet, LoadError, LocalItem, LocalState};
pub use mirror::RemoteMirror;
pub use modules::ModuleSynchronizer;
pub use pipeline::{Pipeline, PipelineError, SyncPlan};
pub use prune::PrunePolicy;
pub use reconcile::{Reconciliation, ReconciliationMismatch};
pub use report::{Outcome, RunReport};
