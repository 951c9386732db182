//! Rubric build, upload and association
//!
//! Every processed assignment folder produces one new rubric and one new
//! association. Existing rubrics are never edited.
//!
//! Upload jobs move through `PENDING -> PROCESSING -> IMPORTED | FAILED`. The
//! job is polled at a fixed interval until it is terminal or the timeout
//! passes; only an imported job is associated.

use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::config::{RubricStrategy, SyncSettings};
use crate::core::content::ContentKind;
use crate::core::loader::{ChangeSet, LocalItem};
use crate::core::mirror::RemoteMirror;
use crate::core::report::RunReport;
use crate::remote::{JobState, RemoteCourse, RemoteError, RemoteKind, RubricUploadJob};
use crate::rubric::outcomes::OutcomeMapping;
use crate::rubric::payload::{association_request, inline_params, AssociationTarget};
use crate::rubric::resolve::{resolve, ResolvedRubric};
use crate::rubric::spec::{RubricSpec, RubricSpecError};
use crate::rubric::upload::render_csv;

#[derive(Debug, Error)]
pub enum RubricError {
    #[error(transparent)]
    Spec(#[from] RubricSpecError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("no remote assignment named '{0}'")]
    AssignmentNotFound(String),

    #[error("could not render rubric CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("rubric upload job {job_id} failed")]
    JobFailed { job_id: u64 },

    #[error("rubric upload job {job_id} still {state} after {:.1}s", waited.as_secs_f64())]
    JobTimeout {
        job_id: u64,
        state: JobState,
        waited: Duration,
    },

    #[error("rubric {rubric_id} was created but not associated: {source}")]
    Association {
        rubric_id: u64,
        #[source]
        source: RemoteError,
    },
}

/// Upload job polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&SyncSettings> for PollSettings {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            interval: settings.poll_interval(),
            timeout: settings.poll_timeout(),
        }
    }
}

/// A rubric that now exists remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRubricSummary {
    pub rubric_id: u64,
    pub association_id: Option<u64>,
    pub assignment_id: u64,
    pub criteria: usize,
}

/// Wait for an upload job to reach a terminal state
pub fn wait_for_import(
    course: &dyn RemoteCourse,
    submitted: RubricUploadJob,
    poll: PollSettings,
) -> Result<u64, RubricError> {
    let started = Instant::now();
    let mut job = submitted;
    loop {
        tracing::debug!(job_id = job.id, state = %job.state, "rubric upload state");
        match job.state {
            JobState::Imported => {
                return job.rubric_id.ok_or_else(|| {
                    RubricError::Remote(RemoteError::Decode(format!(
                        "upload job {} imported without a rubric id",
                        job.id
                    )))
                })
            }
            JobState::Failed => return Err(RubricError::JobFailed { job_id: job.id }),
            JobState::Pending | JobState::Processing => {}
        }

        let waited = started.elapsed();
        if waited >= poll.timeout {
            return Err(RubricError::JobTimeout {
                job_id: job.id,
                state: job.state,
                waited,
            });
        }
        std::thread::sleep(poll.interval);
        job = course.rubric_upload_status(job.id)?;
    }
}

/// Creates rubrics for assignment folders
pub struct RubricWorkflow<'a> {
    course: &'a dyn RemoteCourse,
    mirror: &'a RemoteMirror,
    outcomes: &'a OutcomeMapping,
    strategy: RubricStrategy,
    poll: PollSettings,
}

impl<'a> RubricWorkflow<'a> {
    pub fn new(
        course: &'a dyn RemoteCourse,
        mirror: &'a RemoteMirror,
        outcomes: &'a OutcomeMapping,
        strategy: RubricStrategy,
        poll: PollSettings,
    ) -> Self {
        Self {
            course,
            mirror,
            outcomes,
            strategy,
            poll,
        }
    }

    /// Process every assignment with a rubric file, limited to changed
    /// folders when a change set is given. One folder failing never stops
    /// the rest.
    pub fn run<'i>(
        &self,
        items: impl IntoIterator<Item = &'i LocalItem>,
        changes: Option<&ChangeSet>,
        report: &mut RunReport,
    ) {
        for item in items {
            if item.kind() != ContentKind::Assignment {
                continue;
            }
            let Some(rubric_file) = item.rubric_file.as_deref() else {
                tracing::debug!(folder = %item.label(), "no rubric file");
                continue;
            };
            if let Some(changes) = changes {
                if !changes.touches(&item.folder) {
                    tracing::debug!(folder = %item.label(), "unchanged, skipping rubric");
                    continue;
                }
            }

            let label = item.label();
            match self.process(item, rubric_file, report) {
                Ok(created) => {
                    tracing::info!(
                        folder = %label,
                        rubric_id = created.rubric_id,
                        assignment_id = created.assignment_id,
                        "rubric created"
                    );
                    report.created(
                        label,
                        format!(
                            "rubric {} ({} criteria) associated with assignment {}",
                            created.rubric_id, created.criteria, created.assignment_id
                        ),
                    );
                }
                Err(e) => {
                    tracing::error!(folder = %label, error = %e, "rubric failed");
                    report.failed(label, e.to_string());
                }
            }
        }
    }

    /// Build and create the rubric of one folder. Outcome fallbacks are
    /// recorded as warnings on `report`.
    pub fn process(
        &self,
        item: &LocalItem,
        rubric_file: &Path,
        report: &mut RunReport,
    ) -> Result<CreatedRubricSummary, RubricError> {
        let spec = RubricSpec::load(rubric_file)?;
        let resolution = resolve(&spec, self.outcomes);
        for fallback in &resolution.fallbacks {
            tracing::warn!(
                folder = %item.label(),
                criterion = %fallback.criterion,
                reason = %fallback.reason,
                "outcome not aligned"
            );
            report.warned(item.label(), fallback.to_string());
        }

        let target = self.target(item, &resolution.rubric)?;
        let (rubric_id, association_id) = match self.strategy {
            RubricStrategy::Inline => self.create_inline(&resolution.rubric, &target)?,
            RubricStrategy::Upload => self.create_uploaded(&resolution.rubric, &target)?,
        };

        Ok(CreatedRubricSummary {
            rubric_id,
            association_id,
            assignment_id: target.assignment_id,
            criteria: resolution.rubric.criteria.len(),
        })
    }

    fn target(&self, item: &LocalItem, rubric: &ResolvedRubric) -> Result<AssociationTarget, RubricError> {
        let assignment_name = item.name().to_string();
        let assignment_id = match rubric.association.assignment_id {
            Some(id) => id,
            None => self
                .mirror
                .find(RemoteKind::Assignment, &assignment_name)
                .map(|a| a.id)
                .ok_or_else(|| RubricError::AssignmentNotFound(assignment_name.clone()))?,
        };
        Ok(AssociationTarget {
            assignment_id,
            assignment_name,
        })
    }

    fn create_inline(
        &self,
        rubric: &ResolvedRubric,
        target: &AssociationTarget,
    ) -> Result<(u64, Option<u64>), RubricError> {
        let created = self.course.create_rubric(&inline_params(rubric, target))?;
        Ok((created.rubric_id, created.association_id))
    }

    fn create_uploaded(
        &self,
        rubric: &ResolvedRubric,
        target: &AssociationTarget,
    ) -> Result<(u64, Option<u64>), RubricError> {
        let csv = render_csv(rubric)?;
        let job = self.course.submit_rubric_upload(&csv)?;
        tracing::info!(job_id = job.id, title = %rubric.title, "submitted rubric upload");

        let rubric_id = wait_for_import(self.course, job, self.poll)?;
        let association = self
            .course
            .create_rubric_association(&association_request(rubric, rubric_id, target))
            .map_err(|source| RubricError::Association { rubric_id, source })?;
        Ok((rubric_id, Some(association.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryCourse;

    fn fast() -> PollSettings {
        PollSettings {
            interval: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_poll_until_imported() {
        let course = MemoryCourse::new(1);
        course.script_uploads(vec![JobState::Pending, JobState::Processing, JobState::Imported]);
        let job = course.submit_rubric_upload(b"csv").unwrap();
        let rubric_id = wait_for_import(&course, job, fast()).unwrap();
        assert_eq!(course.rubric_count(), 1);
        assert!(rubric_id > 0);
    }

    #[test]
    fn test_failed_job() {
        let course = MemoryCourse::new(1);
        course.script_uploads(vec![JobState::Processing, JobState::Failed]);
        let job = course.submit_rubric_upload(b"csv").unwrap();
        assert!(matches!(
            wait_for_import(&course, job, fast()),
            Err(RubricError::JobFailed { .. })
        ));
    }

    #[test]
    fn test_timeout_is_distinct_from_failure() {
        let course = MemoryCourse::new(1);
        course.script_uploads(vec![JobState::Processing]);
        let job = course.submit_rubric_upload(b"csv").unwrap();
        let poll = PollSettings {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(30),
        };
        match wait_for_import(&course, job, poll) {
            Err(RubricError::JobTimeout { state, .. }) => assert_eq!(state, JobState::Processing),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeout_checks_submitted_state_once() {
        let course = MemoryCourse::new(1);
        let job = RubricUploadJob {
            id: 7,
            state: JobState::Imported,
            rubric_id: Some(9),
        };
        let poll = PollSettings {
            interval: Duration::ZERO,
            timeout: Duration::ZERO,
        };
        assert_eq!(wait_for_import(&course, job, poll).unwrap(), 9);
    }

    #[test]
    fn test_imported_without_rubric_id() {
        let course = MemoryCourse::new(1);
        let job = RubricUploadJob {
            id: 7,
            state: JobState::Imported,
            rubric_id: None,
        };
        assert!(matches!(
            wait_for_import(&course, job, fast()),
            Err(RubricError::Remote(RemoteError::Decode(_)))
        ));
    }
}
