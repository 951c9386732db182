//! Reconciliation of local declarations against the remote mirror
//!
//! Names are compared exactly and case-sensitively. Nothing here mutates the
//! remote course: missing names are reported, extra names become prune
//! candidates for [`crate::core::prune`].

use std::collections::BTreeSet;
use thiserror::Error;

use crate::core::content::ContentKind;
use crate::core::loader::LocalState;
use crate::core::mirror::RemoteMirror;
use crate::remote::{RemoteKind, RemoteObject};

/// Kinds that take part in reconciliation
pub const RECONCILED_KINDS: [ContentKind; 2] = [ContentKind::Page, ContentKind::Assignment];

/// A name present on one side only
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationMismatch {
    #[error("{kind} '{name}' exists locally but not in the course")]
    LocalOnly { kind: RemoteKind, name: String },

    #[error("{kind} '{name}' exists in the course but has no local declaration")]
    RemoteOnly { kind: RemoteKind, name: String },
}

/// Name-set comparison for one kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDiff {
    pub kind: RemoteKind,
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
}

impl KindDiff {
    pub fn compute<'a>(
        kind: RemoteKind,
        local: impl IntoIterator<Item = &'a str>,
        remote: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let local: BTreeSet<String> = local.into_iter().map(str::to_string).collect();
        let remote: BTreeSet<String> = remote.into_iter().map(str::to_string).collect();
        Self {
            kind,
            matched: local.intersection(&remote).cloned().collect(),
            missing: local.difference(&remote).cloned().collect(),
            extra: remote.difference(&local).cloned().collect(),
        }
    }
}

/// Result of reconciling pages and assignments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub diffs: Vec<KindDiff>,
}

impl Reconciliation {
    pub fn compute(local: &LocalState, mirror: &RemoteMirror) -> Self {
        let diffs = RECONCILED_KINDS
            .into_iter()
            .filter_map(|kind| {
                let remote_kind = kind.remote_kind()?;
                Some(KindDiff::compute(
                    remote_kind,
                    local.names(kind),
                    mirror.names(remote_kind),
                ))
            })
            .collect();
        Self { diffs }
    }

    pub fn diff(&self, kind: RemoteKind) -> Option<&KindDiff> {
        self.diffs.iter().find(|d| d.kind == kind)
    }

    /// Every name present on one side only
    pub fn mismatches(&self) -> Vec<ReconciliationMismatch> {
        let mut out = Vec::new();
        for diff in &self.diffs {
            out.extend(diff.missing.iter().map(|name| ReconciliationMismatch::LocalOnly {
                kind: diff.kind,
                name: name.clone(),
            }));
            out.extend(diff.extra.iter().map(|name| ReconciliationMismatch::RemoteOnly {
                kind: diff.kind,
                name: name.clone(),
            }));
        }
        out
    }

    /// Every remote object carrying an extra name, pages first
    pub fn prune_candidates(&self, mirror: &RemoteMirror) -> Vec<RemoteObject> {
        self.diffs
            .iter()
            .flat_map(|diff| {
                diff.extra
                    .iter()
                    .flat_map(move |name| mirror.all_named(diff.kind, name).iter().cloned())
            })
            .collect()
    }

    pub fn extra_count(&self) -> usize {
        self.diffs.iter().map(|d| d.extra.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{LocalItem, LocalState};
    use crate::core::content::{ContentDescriptor, ContentDetails};
    use std::path::PathBuf;

    fn local(items: &[(ContentDetails, &str)]) -> LocalState {
        LocalState::collect(items.iter().map(|(details, name)| {
            Ok(LocalItem {
                folder: PathBuf::from(format!("pages/{}", name)),
                descriptor: ContentDescriptor {
                    name: name.to_string(),
                    body: None,
                    placements: Vec::new(),
                    details: details.clone(),
                },
                rubric_file: None,
            })
        }))
    }

    fn page(id: u64, name: &str) -> RemoteObject {
        RemoteObject {
            kind: RemoteKind::Page,
            id,
            name: name.to_string(),
            identity: crate::remote::IdentityKey::PageUrl(name.to_lowercase()),
        }
    }

    #[test]
    fn test_matched_missing_extra() {
        let state = local(&[
            (ContentDetails::Page, "Intro"),
            (ContentDetails::Page, "Week 1"),
            (ContentDetails::Assignment, "Essay"),
        ]);
        let mirror = RemoteMirror::from_objects(vec![page(1, "Intro"), page(2, "Old Page"), page(3, "Old Page")]);

        let rec = Reconciliation::compute(&state, &mirror);
        let pages = rec.diff(RemoteKind::Page).unwrap();
        assert_eq!(pages.matched.iter().collect::<Vec<_>>(), vec!["Intro"]);
        assert_eq!(pages.missing.iter().collect::<Vec<_>>(), vec!["Week 1"]);
        assert_eq!(pages.extra.iter().collect::<Vec<_>>(), vec!["Old Page"]);

        let assignments = rec.diff(RemoteKind::Assignment).unwrap();
        assert_eq!(assignments.missing.len(), 1);
        assert!(assignments.extra.is_empty());

        // Both remote objects named "Old Page" are candidates
        assert_eq!(rec.prune_candidates(&mirror).len(), 2);
        assert_eq!(rec.extra_count(), 1);
        assert_eq!(rec.mismatches().len(), 3);
    }

    #[test]
    fn test_comparison_is_exact() {
        let state = local(&[(ContentDetails::Page, "intro")]);
        let mirror = RemoteMirror::from_objects(vec![page(1, "Intro")]);
        let rec = Reconciliation::compute(&state, &mirror);
        let pages = rec.diff(RemoteKind::Page).unwrap();
        assert!(pages.matched.is_empty());
        assert!(pages.missing.contains("intro"));
        assert!(pages.extra.contains("Intro"));
    }

    #[test]
    fn test_files_and_links_are_not_reconciled() {
        let state = local(&[(
            ContentDetails::Link {
                external_url: "https://example.com".to_string(),
                new_tab: true,
            },
            "Docs",
        )]);
        let mirror = RemoteMirror::from_objects(vec![RemoteObject {
            kind: RemoteKind::File,
            id: 9,
            name: "orphan.pdf".to_string(),
            identity: crate::remote::IdentityKey::ContentId(9),
        }]);
        let rec = Reconciliation::compute(&state, &mirror);
        assert!(rec.mismatches().is_empty());
        assert!(rec.prune_candidates(&mirror).is_empty());
    }
}
