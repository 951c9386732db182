//! Outcome code to remote outcome id mapping
//!
//! `_course_metadata/outcome_map.json`:
//!
//! ```json
//! { "OC-1": 4211, "OC-2": "4212" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::rubric::spec::IdValue;
use crate::yaml::{parse_json, YamlError};

#[derive(Debug, Error)]
pub enum OutcomeMapError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] YamlError),

    #[error("{}: outcome '{code}' has non-integer id '{value}'", path.display())]
    InvalidId {
        path: PathBuf,
        code: String,
        value: String,
    },
}

/// Read-only code → id lookup for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeMapping {
    ids: BTreeMap<String, u64>,
    /// File the mapping was read from; `None` when there was no file
    source: Option<PathBuf>,
}

impl OutcomeMapping {
    /// Load the mapping; a missing file gives an empty mapping
    pub fn load(path: &Path) -> Result<Self, OutcomeMapError> {
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "no outcome map; outcome criteria will be created as local");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| OutcomeMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, IdValue> = parse_json(&content, &path.display().to_string())?;

        let mut ids = BTreeMap::new();
        for (code, value) in raw {
            let id = value.as_u64().ok_or_else(|| OutcomeMapError::InvalidId {
                path: path.to_path_buf(),
                code: code.clone(),
                value: value.to_string(),
            })?;
            ids.insert(code, id);
        }
        tracing::debug!(path = %path.display(), count = ids.len(), "loaded outcome map");

        Ok(Self {
            ids,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self {
            ids: pairs.into_iter().map(|(c, id)| (c.to_string(), id)).collect(),
            source: None,
        }
    }

    pub fn get(&self, code: &str) -> Option<u64> {
        self.ids.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the mapping came from a file at all
    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }
}
