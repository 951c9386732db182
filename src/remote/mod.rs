//! Remote course boundary
//!
//! Everything the sync engine needs from the learning-management service goes
//! through [`RemoteCourse`]. The trait is flat: list, create and
//! delete calls with no behavior of their own. Two implementations ship with
//! the crate: [`canvas::CanvasClient`] for the real service and
//! [`memory::MemoryCourse`], an in-memory test double.

pub mod canvas;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use canvas::CanvasClient;
pub use memory::{MemoryCourse, Mutation};

/// Result alias for remote calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors returned by a remote call, categorized by response status
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not authorized (HTTP {status}): the token or role lacks permission")]
    Permission { status: u16 },

    #[error("not found (HTTP 404): {0}")]
    NotFound(String),

    #[error("payload rejected (HTTP 422): {0}")]
    Validation(String),

    #[error("unexpected HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Classify a non-success response
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => RemoteError::Permission { status },
            404 => RemoteError::NotFound(body),
            422 => RemoteError::Validation(body),
            _ => RemoteError::Status { status, body },
        }
    }
}

/// Kinds of remote content objects that can be listed and pruned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    Page,
    Assignment,
    File,
}

impl std::fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteKind::Page => write!(f, "page"),
            RemoteKind::Assignment => write!(f, "assignment"),
            RemoteKind::File => write!(f, "file"),
        }
    }
}

/// The key a module item uses to point at its target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    PageUrl(String),
    ContentId(u64),
    ExternalUrl(String),
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKey::PageUrl(url) => write!(f, "page_url={}", url),
            IdentityKey::ContentId(id) => write!(f, "content_id={}", id),
            IdentityKey::ExternalUrl(url) => write!(f, "external_url={}", url),
        }
    }
}

/// Snapshot of one remote page, assignment or file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub kind: RemoteKind,
    pub id: u64,
    /// Page title, assignment name, or file name
    pub name: String,
    pub identity: IdentityKey,
}

/// A module in the remote course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteModule {
    pub id: u64,
    pub name: String,
}

/// Module item types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleItemType {
    Page,
    Assignment,
    File,
    ExternalUrl,
    /// Sub-headers, quizzes, discussions and anything else we never manage
    Other(String),
}

impl ModuleItemType {
    /// Wire name used by the remote API
    pub fn as_str(&self) -> &str {
        match self {
            ModuleItemType::Page => "Page",
            ModuleItemType::Assignment => "Assignment",
            ModuleItemType::File => "File",
            ModuleItemType::ExternalUrl => "ExternalUrl",
            ModuleItemType::Other(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Page" => ModuleItemType::Page,
            "Assignment" => ModuleItemType::Assignment,
            "File" => ModuleItemType::File,
            "ExternalUrl" => ModuleItemType::ExternalUrl,
            other => ModuleItemType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ModuleItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An existing item inside a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleItem {
    pub id: u64,
    pub item_type: ModuleItemType,
    pub title: String,
    pub indent: u32,
    /// `None` for item types that do not point at managed content
    pub identity: Option<IdentityKey>,
}

impl ModuleItem {
    /// Whether this item points at the same target as `(item_type, identity)`.
    /// The display title is never part of the comparison.
    pub fn matches(&self, item_type: &ModuleItemType, identity: &IdentityKey) -> bool {
        &self.item_type == item_type && self.identity.as_ref() == Some(identity)
    }
}

/// Request to append an item to a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewModuleItem {
    pub item_type: ModuleItemType,
    pub title: String,
    pub indent: u32,
    pub identity: IdentityKey,
    pub new_tab: bool,
}

/// Rubric created (and, for the inline path, associated) in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRubric {
    pub rubric_id: u64,
    pub association_id: Option<u64>,
}

/// State of an asynchronous rubric upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Processing,
    Imported,
    Failed,
}

impl JobState {
    /// Map a remote workflow state onto the job state machine.
    /// Unknown states are treated as still processing.
    pub fn from_workflow_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" | "pending" | "queued" => JobState::Pending,
            "imported" | "completed" | "complete" | "succeeded" | "succeeded_with_errors" => {
                JobState::Imported
            }
            "failed" | "failed_with_errors" | "failed_with_messages" | "error" => JobState::Failed,
            _ => JobState::Processing,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Imported | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Processing => write!(f, "PROCESSING"),
            JobState::Imported => write!(f, "IMPORTED"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Snapshot of a rubric upload job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricUploadJob {
    pub id: u64,
    pub state: JobState,
    /// Set once the job is imported
    pub rubric_id: Option<u64>,
}

/// Request to bind an existing rubric to an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRubricAssociation {
    pub rubric_id: u64,
    pub assignment_id: u64,
    /// Shown as the association title (the assignment name)
    pub title: String,
    pub purpose: String,
    pub use_for_grading: bool,
}

/// A created rubric association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricAssociation {
    pub id: u64,
    pub rubric_id: u64,
    pub assignment_id: u64,
    pub purpose: String,
    pub use_for_grading: bool,
}

/// Operations consumed from the remote course.
///
/// Calls are blocking and made one at a time; implementations are free to
/// use interior mutability because the engine never shares a course across
/// threads.
pub trait RemoteCourse {
    /// Course id used in log lines
    fn course_id(&self) -> u64;

    /// List every page, assignment or file in the course
    fn list_objects(&self, kind: RemoteKind) -> RemoteResult<Vec<RemoteObject>>;

    /// Delete a page or assignment
    fn delete_object(&self, object: &RemoteObject) -> RemoteResult<()>;

    fn list_modules(&self) -> RemoteResult<Vec<RemoteModule>>;

    fn create_module(&self, name: &str) -> RemoteResult<RemoteModule>;

    /// Items of one module, in module order
    fn list_module_items(&self, module_id: u64) -> RemoteResult<Vec<ModuleItem>>;

    /// Append an item to the end of a module
    fn create_module_item(&self, module_id: u64, item: &NewModuleItem) -> RemoteResult<ModuleItem>;

    /// Create a rubric and its association in one request from flattened
    /// form parameters
    fn create_rubric(&self, params: &[(String, String)]) -> RemoteResult<CreatedRubric>;

    /// Submit a rubric CSV as an upload job
    fn submit_rubric_upload(&self, csv: &[u8]) -> RemoteResult<RubricUploadJob>;

    fn rubric_upload_status(&self, job_id: u64) -> RemoteResult<RubricUploadJob>;

    fn create_rubric_association(
        &self,
        association: &NewRubricAssociation,
    ) -> RemoteResult<RubricAssociation>;
}
