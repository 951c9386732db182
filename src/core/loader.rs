//! Local state loader
//!
//! Walks `pages/` for content folders (`*.page`, `*.assignment`, `*.file`,
//! `*.link`) and reads each folder's `meta.json`. Loading is per folder: a bad
//! folder yields an error for that folder only.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::config::CourseLayout;
use crate::core::content::{ContentDescriptor, ContentKind, DescriptorError, RawMeta};
use crate::remote::RemoteKind;
use crate::yaml::{parse_json, YamlError};

/// Descriptor file inside every content folder
pub const META_FILE: &str = "meta.json";

/// Rubric spec file names, in lookup order
pub const RUBRIC_FILES: [&str; 3] = ["rubric.yaml", "rubric.yml", "rubric.json"];

/// Body file names, in lookup order
pub const BODY_FILES: [&str; 2] = ["source.md", "index.md"];

/// Errors loading one content folder
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{}: no meta.json", folder.display())]
    MissingMeta { folder: PathBuf },

    #[error("{}: {source}", folder.display())]
    Parse {
        folder: PathBuf,
        #[source]
        source: YamlError,
    },

    #[error("{}: {source}", folder.display())]
    Invalid {
        folder: PathBuf,
        #[source]
        source: DescriptorError,
    },

    #[error("failed to read {}: {source}", folder.display())]
    Io {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk content tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl LoadError {
    /// Folder the error belongs to, if any
    pub fn folder(&self) -> Option<&Path> {
        match self {
            LoadError::MissingMeta { folder }
            | LoadError::Parse { folder, .. }
            | LoadError::Invalid { folder, .. }
            | LoadError::Io { folder, .. } => Some(folder),
            LoadError::Walk(e) => e.path(),
        }
    }
}

/// A loaded descriptor and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LocalItem {
    pub folder: PathBuf,
    pub descriptor: ContentDescriptor,
    /// Rubric spec next to the descriptor, if any
    pub rubric_file: Option<PathBuf>,
}

impl LocalItem {
    pub fn kind(&self) -> ContentKind {
        self.descriptor.kind()
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Folder name, used as the subject of log lines and report entries
    pub fn label(&self) -> String {
        folder_label(&self.folder)
    }
}

pub(crate) fn folder_label(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.display().to_string())
}

/// Content folders under `pages/`, sorted, hidden directories skipped
pub fn content_folders(pages_dir: &Path) -> impl Iterator<Item = Result<PathBuf, LoadError>> {
    WalkDir::new(pages_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| match entry {
            Ok(e) if e.depth() > 0 && e.file_type().is_dir() => {
                let is_content = ContentKind::from_folder_name(&e.file_name().to_string_lossy()).is_some();
                is_content.then(|| Ok(e.into_path()))
            }
            Ok(_) => None,
            Err(e) => Some(Err(LoadError::Walk(e))),
        })
}

/// Lazily load every content folder of a course
pub fn load_items(layout: &CourseLayout) -> impl Iterator<Item = Result<LocalItem, LoadError>> {
    content_folders(&layout.pages_dir()).map(|folder| folder.and_then(|f| load_item(&f)))
}

/// Load one content folder
pub fn load_item(folder: &Path) -> Result<LocalItem, LoadError> {
    let meta_path = folder.join(META_FILE);
    if !meta_path.is_file() {
        return Err(LoadError::MissingMeta {
            folder: folder.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(&meta_path).map_err(|source| LoadError::Io {
        folder: folder.to_path_buf(),
        source,
    })?;
    let raw: RawMeta =
        parse_json(&content, &meta_path.display().to_string()).map_err(|source| LoadError::Parse {
            folder: folder.to_path_buf(),
            source,
        })?;

    let mut descriptor = ContentDescriptor::try_from(raw).map_err(|source| LoadError::Invalid {
        folder: folder.to_path_buf(),
        source,
    })?;
    descriptor.body = first_existing(folder, &BODY_FILES);

    Ok(LocalItem {
        folder: folder.to_path_buf(),
        descriptor,
        rubric_file: first_existing(folder, &RUBRIC_FILES),
    })
}

/// Every (kind, name) declared by any `meta.json` under `pages/`, whatever
/// folder it sits in and whether or not that folder loads as content.
/// Unreadable or nameless descriptors declare nothing.
pub fn declared_names(pages_dir: &Path) -> BTreeSet<(RemoteKind, String)> {
    WalkDir::new(pages_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == META_FILE)
        .filter_map(|e| {
            let content = std::fs::read_to_string(e.path()).ok()?;
            let meta: serde_json::Value = serde_json::from_str(&content).ok()?;
            let kind = match meta.get("type")?.as_str()?.to_lowercase().as_str() {
                "page" => RemoteKind::Page,
                "assignment" => RemoteKind::Assignment,
                _ => return None,
            };
            let name = meta.get("name")?.as_str().filter(|n| !n.is_empty())?;
            Some((kind, name.to_string()))
        })
        .collect()
}

fn first_existing(folder: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| folder.join(name))
        .find(|path| path.is_file())
}

/// A folder that did not make it into the local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub subject: String,
    pub reason: String,
}

/// All loaded items of one run
#[derive(Debug, Default)]
pub struct LocalState {
    items: Vec<LocalItem>,
    skipped: Vec<Skipped>,
}

impl LocalState {
    /// Drain the loader, keeping the first descriptor for each (kind, name)
    pub fn collect(loaded: impl IntoIterator<Item = Result<LocalItem, LoadError>>) -> Self {
        let mut state = Self::default();
        let mut seen: BTreeMap<(ContentKind, String), String> = BTreeMap::new();

        for result in loaded {
            match result {
                Ok(item) => {
                    let key = (item.kind(), item.name().to_string());
                    if let Some(first) = seen.get(&key) {
                        tracing::warn!(
                            folder = %item.label(),
                            name = %item.name(),
                            first = %first,
                            "duplicate name, skipping"
                        );
                        state.skipped.push(Skipped {
                            subject: item.label(),
                            reason: format!(
                                "duplicate {} name '{}' (already declared by {})",
                                key.0, key.1, first
                            ),
                        });
                        continue;
                    }
                    seen.insert(key, item.label());
                    state.items.push(item);
                }
                Err(e) => {
                    let subject = e.folder().map(folder_label).unwrap_or_else(|| "pages".to_string());
                    tracing::warn!(folder = %subject, error = %e, "skipping content folder");
                    state.skipped.push(Skipped {
                        subject,
                        reason: e.to_string(),
                    });
                }
            }
        }
        state
    }

    /// Load the whole tree of a course
    pub fn load(layout: &CourseLayout) -> Self {
        Self::collect(load_items(layout))
    }

    pub fn items(&self) -> &[LocalItem] {
        &self.items
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn of_kind(&self, kind: ContentKind) -> impl Iterator<Item = &LocalItem> {
        self.items.iter().filter(move |item| item.kind() == kind)
    }

    pub fn names(&self, kind: ContentKind) -> BTreeSet<&str> {
        self.of_kind(kind).map(LocalItem::name).collect()
    }
}

/// Paths reported changed by the watcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().map(|p| normalize(&p)).collect();
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether any changed path lies inside `folder`
    pub fn touches(&self, folder: &Path) -> bool {
        let folder = normalize(folder);
        self.paths.iter().any(|p| p.starts_with(&folder))
    }
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    // Deleted files cannot be canonicalized; resolve through the parent
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
