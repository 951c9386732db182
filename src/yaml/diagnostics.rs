//! Parse errors with source spans for miette

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors from reading a structured (YAML or JSON) file
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(Box<YamlSyntaxError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A syntax or shape error located in the source text
#[derive(Debug, Error, Diagnostic)]
#[error("invalid {format} in {filename}: {message}")]
#[diagnostic(code(zaphod::parse))]
pub struct YamlSyntaxError {
    pub format: &'static str,
    pub filename: String,
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    pub fn from_serde_error(e: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let span = e
            .location()
            .map(|loc| SourceSpan::from((loc.index().min(content.len()), 0)));
        Self {
            format: "YAML",
            filename: filename.to_string(),
            message: e.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }

    pub fn from_json_error(e: &serde_json::Error, content: &str, filename: &str) -> Self {
        let span = offset_of(content, e.line(), e.column())
            .map(|offset| SourceSpan::from((offset, 0)));
        Self {
            format: "JSON",
            filename: filename.to_string(),
            message: e.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }
}

/// Byte offset of a 1-based line/column pair
fn offset_of(content: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let line_start: usize = content
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    Some((line_start + column.saturating_sub(1)).min(content.len()))
}
