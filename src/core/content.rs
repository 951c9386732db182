//! Content descriptors
//!
//! Each content folder carries a `meta.json` written by the front-matter step.
//! It is read into a loose [`RawMeta`] and converted once into a
//! [`ContentDescriptor`], so everything downstream works with checked fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::remote::{ModuleItemType, RemoteKind};

/// Kinds of locally declared content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Page,
    Assignment,
    File,
    Link,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Page,
        ContentKind::Assignment,
        ContentKind::File,
        ContentKind::Link,
    ];

    /// Folder suffix marking a content folder of this kind
    pub fn folder_suffix(self) -> &'static str {
        match self {
            ContentKind::Page => ".page",
            ContentKind::Assignment => ".assignment",
            ContentKind::File => ".file",
            ContentKind::Link => ".link",
        }
    }

    /// Kind implied by a folder name, if it is a content folder
    pub fn from_folder_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| name.len() > kind.folder_suffix().len() && name.ends_with(kind.folder_suffix()))
    }

    /// Remote object kind, for kinds that exist as remote objects
    pub fn remote_kind(self) -> Option<RemoteKind> {
        match self {
            ContentKind::Page => Some(RemoteKind::Page),
            ContentKind::Assignment => Some(RemoteKind::Assignment),
            ContentKind::File => Some(RemoteKind::File),
            ContentKind::Link => None,
        }
    }

    pub fn module_item_type(self) -> ModuleItemType {
        match self {
            ContentKind::Page => ModuleItemType::Page,
            ContentKind::Assignment => ModuleItemType::Assignment,
            ContentKind::File => ModuleItemType::File,
            ContentKind::Link => ModuleItemType::ExternalUrl,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Page => write!(f, "page"),
            ContentKind::Assignment => write!(f, "assignment"),
            ContentKind::File => write!(f, "file"),
            ContentKind::Link => write!(f, "link"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" => Ok(ContentKind::Page),
            "assignment" => Ok(ContentKind::Assignment),
            "file" => Ok(ContentKind::File),
            "link" => Ok(ContentKind::Link),
            _ => Err(DescriptorError::UnsupportedType(s.to_string())),
        }
    }
}

/// Problems with a single `meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unsupported content type '{0}'")]
    UnsupportedType(String),

    #[error("indent must be a non-negative integer, got {0}")]
    InvalidIndent(i64),
}

/// `meta.json` as written by the front-matter step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMeta {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub modules: Option<Vec<String>>,
    pub indent: Option<i64>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub external_url: Option<String>,
    pub new_tab: Option<bool>,
}

/// Where an item goes in a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePlacement {
    pub module_name: String,
    pub indent: u32,
}

/// Fields that only some kinds carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDetails {
    Page,
    Assignment,
    File { filename: String, title: String },
    Link { external_url: String, new_tab: bool },
}

/// A checked content declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub name: String,
    /// `source.md` or `index.md`, filled in by the loader when present
    pub body: Option<PathBuf>,
    pub placements: Vec<ModulePlacement>,
    pub details: ContentDetails,
}

impl ContentDescriptor {
    pub fn kind(&self) -> ContentKind {
        match self.details {
            ContentDetails::Page => ContentKind::Page,
            ContentDetails::Assignment => ContentKind::Assignment,
            ContentDetails::File { .. } => ContentKind::File,
            ContentDetails::Link { .. } => ContentKind::Link,
        }
    }

    /// Title shown for this item inside a module
    pub fn display_title(&self) -> &str {
        match &self.details {
            ContentDetails::File { title, .. } => title,
            _ => &self.name,
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, DescriptorError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(DescriptorError::MissingField(field))
}

impl TryFrom<RawMeta> for ContentDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawMeta) -> Result<Self, Self::Error> {
        let kind: ContentKind = required(raw.kind, "type")?.parse()?;
        let name = required(raw.name, "name")?;

        let indent = match raw.indent.unwrap_or(0) {
            n if n < 0 || n > u32::MAX as i64 => return Err(DescriptorError::InvalidIndent(n)),
            n => n as u32,
        };
        let placements = raw
            .modules
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .map(|module_name| ModulePlacement { module_name, indent })
            .collect();

        let details = match kind {
            ContentKind::Page => ContentDetails::Page,
            ContentKind::Assignment => ContentDetails::Assignment,
            ContentKind::File => {
                let filename = required(raw.filename, "filename")?;
                let title = raw
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| filename.clone());
                ContentDetails::File { filename, title }
            }
            ContentKind::Link => ContentDetails::Link {
                external_url: required(raw.external_url, "external_url")?,
                new_tab: raw.new_tab.unwrap_or(false),
            },
        };

        Ok(Self {
            name,
            body: None,
            placements,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawMeta {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_type_is_case_insensitive() {
        let d = ContentDescriptor::try_from(raw(r#"{"type": "PAGE", "name": "Intro"}"#)).unwrap();
        assert_eq!(d.kind(), ContentKind::Page);
        assert!(d.placements.is_empty());
    }

    #[test]
    fn test_placements_share_indent() {
        let d = ContentDescriptor::try_from(raw(
            r#"{"type": "Assignment", "name": "Essay", "modules": ["Week 1", " ", "Week 2"], "indent": 2}"#,
        ))
        .unwrap();
        assert_eq!(
            d.placements,
            vec![
                ModulePlacement {
                    module_name: "Week 1".to_string(),
                    indent: 2
                },
                ModulePlacement {
                    module_name: "Week 2".to_string(),
                    indent: 2
                },
            ]
        );
    }

    #[test]
    fn test_file_title_defaults_to_filename() {
        let d = ContentDescriptor::try_from(raw(
            r#"{"type": "file", "name": "Slides", "filename": "slides.pdf"}"#,
        ))
        .unwrap();
        assert_eq!(d.display_title(), "slides.pdf");
    }

    #[test]
    fn test_missing_kind_specific_fields() {
        assert_eq!(
            ContentDescriptor::try_from(raw(r#"{"type": "file", "name": "Slides"}"#)),
            Err(DescriptorError::MissingField("filename"))
        );
        assert_eq!(
            ContentDescriptor::try_from(raw(r#"{"type": "link", "name": "Docs"}"#)),
            Err(DescriptorError::MissingField("external_url"))
        );
    }

    #[test]
    fn test_missing_and_unsupported_type() {
        assert_eq!(
            ContentDescriptor::try_from(raw(r#"{"name": "Intro"}"#)),
            Err(DescriptorError::MissingField("type"))
        );
        assert!(matches!(
            ContentDescriptor::try_from(raw(r#"{"type": "quiz", "name": "Q1"}"#)),
            Err(DescriptorError::UnsupportedType(_))
        ));
        assert_eq!(
            ContentDescriptor::try_from(raw(r#"{"type": "page", "name": "  "}"#)),
            Err(DescriptorError::MissingField("name"))
        );
    }

    #[test]
    fn test_negative_indent_rejected() {
        assert_eq!(
            ContentDescriptor::try_from(raw(r#"{"type": "page", "name": "A", "indent": -1}"#)),
            Err(DescriptorError::InvalidIndent(-1))
        );
    }

    #[test]
    fn test_folder_suffixes() {
        assert_eq!(ContentKind::from_folder_name("intro.page"), Some(ContentKind::Page));
        assert_eq!(
            ContentKind::from_folder_name("essay.assignment"),
            Some(ContentKind::Assignment)
        );
        assert_eq!(ContentKind::from_folder_name(".page"), None);
        assert_eq!(ContentKind::from_folder_name("notes"), None);
    }
}
