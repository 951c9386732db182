//! YAML/JSON parsing with error handling

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::yaml::diagnostics::{YamlError, YamlSyntaxError};

/// Parse YAML content into a typed value with nice error messages
pub fn parse_yaml<T: DeserializeOwned + 'static>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content).map_err(|e| {
        YamlError::Syntax(Box::new(YamlSyntaxError::from_serde_error(&e, content, filename)))
    })
}

/// Parse JSON content into a typed value with nice error messages
pub fn parse_json<T: DeserializeOwned>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_json::from_str(content).map_err(|e| {
        YamlError::Syntax(Box::new(YamlSyntaxError::from_json_error(&e, content, filename)))
    })
}

/// Parse YAML from a file path
pub fn parse_yaml_file<T: DeserializeOwned + 'static>(path: &Path) -> Result<T, YamlError> {
    let content = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    parse_yaml(&content, &filename)
}

/// Parse a file as JSON when its extension is `.json`, YAML otherwise
pub fn parse_structured_file<T: DeserializeOwned + 'static>(path: &Path) -> Result<T, YamlError> {
    let content = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        parse_json(&content, &filename)
    } else {
        parse_yaml(&content, &filename)
    }
}
