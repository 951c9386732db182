//! Prune safety gate
//!
//! Deletion of remote objects that have no local declaration. Nothing is
//! deleted unless `apply` is set, and assignments additionally need
//! `include_assignments`.

use crate::core::report::{Outcome, RunReport};
use crate::remote::{RemoteCourse, RemoteKind, RemoteObject};

/// Which deletions are allowed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrunePolicy {
    /// Actually delete; otherwise only report
    pub apply: bool,
    /// Let assignment-kind extras be deleted at all
    pub include_assignments: bool,
}

impl PrunePolicy {
    pub fn dry_run() -> Self {
        Self::default()
    }

    fn eligible(&self, object: &RemoteObject) -> bool {
        match object.kind {
            RemoteKind::Page => true,
            RemoteKind::Assignment => self.include_assignments,
            RemoteKind::File => false,
        }
    }
}

/// Extras found by one fetch, previewed and deleted from the same list
#[derive(Debug, Clone)]
pub struct PrunePlan {
    report: RunReport,
    candidates: Vec<RemoteObject>,
}

impl PrunePlan {
    /// `report` carries whatever loading and reconciling already recorded
    pub fn new(report: RunReport, candidates: Vec<RemoteObject>) -> Self {
        Self { report, candidates }
    }

    pub fn candidates(&self) -> &[RemoteObject] {
        &self.candidates
    }

    /// Run the gate over this plan's candidates
    pub fn execute(&self, course: &dyn RemoteCourse, policy: PrunePolicy) -> RunReport {
        let mut report = self.report.clone();
        prune(course, &self.candidates, policy, &mut report);
        report
    }
}

fn subject(object: &RemoteObject) -> String {
    format!("{} '{}'", object.kind, object.name)
}

/// Apply the policy to every candidate. A failed delete is recorded and the
/// remaining candidates are still attempted.
pub fn prune(
    course: &dyn RemoteCourse,
    candidates: &[RemoteObject],
    policy: PrunePolicy,
    report: &mut RunReport,
) {
    for object in candidates {
        if !policy.eligible(object) {
            tracing::info!(
                kind = %object.kind,
                name = %object.name,
                "kept: pruning not enabled for this kind"
            );
            report.unchanged(subject(object), format!("kept, {} pruning not enabled", object.kind));
            continue;
        }

        if !policy.apply {
            tracing::info!(kind = %object.kind, name = %object.name, id = object.id, "would prune");
            report.record(Outcome::WouldPrune, subject(object), format!("id {}", object.id));
            continue;
        }

        match course.delete_object(object) {
            Ok(()) => {
                tracing::info!(kind = %object.kind, name = %object.name, id = object.id, "pruned");
                report.record(Outcome::Pruned, subject(object), format!("id {}", object.id));
            }
            Err(e) => {
                tracing::error!(
                    kind = %object.kind,
                    name = %object.name,
                    id = object.id,
                    error = %e,
                    "delete failed"
                );
                report.failed(subject(object), format!("delete failed: {}", e));
            }
        }
    }
}
