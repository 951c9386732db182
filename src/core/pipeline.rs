//! Step ordering for one run
//!
//! `sync`: load local state, load the outcome map, fetch the mirror,
//! reconcile, place modules, create rubrics. `prune`: load, fetch, reconcile,
//! then hand the extras to the safety gate. Steps run strictly in sequence and
//! each folder is finished before the next one starts.

use thiserror::Error;

use crate::core::config::{CourseLayout, RubricStrategy, SyncSettings};
use crate::core::loader::{declared_names, ChangeSet, LocalState};
use crate::core::mirror::RemoteMirror;
use crate::core::modules::ModuleSynchronizer;
use crate::core::prune::{PrunePlan, PrunePolicy};
use crate::core::reconcile::{Reconciliation, ReconciliationMismatch};
use crate::core::report::RunReport;
use crate::remote::{RemoteCourse, RemoteError, RemoteKind};
use crate::rubric::{OutcomeMapError, OutcomeMapping, PollSettings, RubricWorkflow};

/// Errors that stop a whole run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to list course content: {0}")]
    Mirror(#[source] RemoteError),

    #[error(transparent)]
    Outcomes(#[from] OutcomeMapError),
}

/// Which steps a sync run performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Warn about names present on one side only
    pub reconcile: bool,
    pub modules: bool,
    pub rubrics: bool,
    pub strategy: RubricStrategy,
    pub poll: PollSettings,
}

impl SyncPlan {
    /// Everything the settings enable
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            reconcile: true,
            modules: settings.manage_modules,
            rubrics: settings.sync_rubrics,
            strategy: settings.rubric_strategy,
            poll: PollSettings::from(settings),
        }
    }

    /// Module placement only
    pub fn modules_only(settings: &SyncSettings) -> Self {
        Self {
            reconcile: false,
            modules: true,
            rubrics: false,
            ..Self::from_settings(settings)
        }
    }

    /// Rubrics only
    pub fn rubrics_only(settings: &SyncSettings) -> Self {
        Self {
            reconcile: false,
            modules: false,
            rubrics: true,
            ..Self::from_settings(settings)
        }
    }
}

/// Runs steps against one course
pub struct Pipeline<'a> {
    layout: &'a CourseLayout,
    course: &'a dyn RemoteCourse,
}

impl<'a> Pipeline<'a> {
    pub fn new(layout: &'a CourseLayout, course: &'a dyn RemoteCourse) -> Self {
        Self { layout, course }
    }

    fn load_local(&self, report: &mut RunReport) -> LocalState {
        let local = LocalState::load(self.layout);
        tracing::info!(
            items = local.items().len(),
            skipped = local.skipped().len(),
            "loaded local content"
        );
        for skipped in local.skipped() {
            report.warned(skipped.subject.clone(), skipped.reason.clone());
        }
        local
    }

    fn fetch_mirror(&self) -> Result<RemoteMirror, PipelineError> {
        let mirror = RemoteMirror::fetch(self.course).map_err(PipelineError::Mirror)?;
        tracing::info!(
            course = self.course.course_id(),
            pages = mirror.len(RemoteKind::Page),
            assignments = mirror.len(RemoteKind::Assignment),
            files = mirror.len(RemoteKind::File),
            "fetched course content"
        );
        Ok(mirror)
    }

    fn reconcile(&self, local: &LocalState, mirror: &RemoteMirror, report: &mut RunReport) -> Reconciliation {
        let reconciliation = Reconciliation::compute(local, mirror);
        for mismatch in reconciliation.mismatches() {
            match &mismatch {
                ReconciliationMismatch::LocalOnly { kind, name } => {
                    tracing::warn!(%kind, %name, "declared locally but missing in the course");
                    report.warned(
                        format!("{} '{}'", kind, name),
                        "missing in the course; publish it first",
                    );
                }
                ReconciliationMismatch::RemoteOnly { .. } => tracing::debug!("{}", mismatch),
            }
        }
        let extra = reconciliation.extra_count();
        if extra > 0 {
            tracing::info!(extra, "remote items without a local declaration; see `zaphod prune`");
        }
        reconciliation
    }

    /// One sync run. `changes` limits the rubric step to changed folders.
    pub fn sync(&self, plan: &SyncPlan, changes: Option<&ChangeSet>) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::new();
        let local = self.load_local(&mut report);

        let outcomes = if plan.rubrics {
            let path = self.layout.outcome_map_path();
            let outcomes = OutcomeMapping::load(&path)?;
            if !outcomes.is_loaded() {
                report.warned(
                    "outcome map",
                    format!("{} not found; outcome criteria will be created as local", path.display()),
                );
            }
            outcomes
        } else {
            OutcomeMapping::default()
        };

        let mirror = self.fetch_mirror()?;

        if plan.reconcile {
            self.reconcile(&local, &mirror, &mut report);
        }

        if plan.modules {
            ModuleSynchronizer::new(self.course, &mirror).sync(local.items(), &mut report);
        } else {
            tracing::info!("module placement disabled");
        }

        if plan.rubrics {
            if let Some(changes) = changes {
                tracing::info!(paths = changes.paths().len(), "rubric step limited to changed folders");
            }
            RubricWorkflow::new(self.course, &mirror, &outcomes, plan.strategy, plan.poll).run(
                local.items(),
                changes,
                &mut report,
            );
        } else {
            tracing::info!("rubric sync disabled");
        }

        Ok(report)
    }

    /// Reconcile, then delete (or report) extras according to `policy`
    /// Load, fetch and reconcile once; the plan can then be previewed and
    /// applied without another fetch
    pub fn plan_prune(&self) -> Result<PrunePlan, PipelineError> {
        let mut report = RunReport::new();
        let local = self.load_local(&mut report);
        let mirror = self.fetch_mirror()?;
        let reconciliation = self.reconcile(&local, &mirror, &mut report);

        // A descriptor outside a loadable content folder still protects its name
        let declared = declared_names(&self.layout.pages_dir());
        let mut candidates = reconciliation.prune_candidates(&mirror);
        candidates.retain(|object| {
            let keep = declared.contains(&(object.kind, object.name.clone()));
            if keep {
                tracing::debug!(kind = %object.kind, name = %object.name, "declared locally, not pruning");
            }
            !keep
        });
        tracing::info!(candidates = candidates.len(), "prune candidates");
        Ok(PrunePlan::new(report, candidates))
    }

    pub fn execute_prune(&self, plan: &PrunePlan, policy: PrunePolicy) -> RunReport {
        tracing::info!(
            candidates = plan.candidates().len(),
            apply = policy.apply,
            include_assignments = policy.include_assignments,
            "pruning"
        );
        plan.execute(self.course, policy)
    }

    pub fn prune(&self, policy: PrunePolicy) -> Result<RunReport, PipelineError> {
        let plan = self.plan_prune()?;
        Ok(self.execute_prune(&plan, policy))
    }
}
