//! Canvas credential file
//!
//! The file holds two assignments, one per line:
//!
//! ```text
//! API_KEY = "..."
//! API_URL = "https://canvas.example.edu"
//! ```
//!
//! It is parsed as plain `KEY = value` lines and never evaluated.

use std::path::{Path, PathBuf};

use crate::core::config::ConfigError;

/// API endpoint and token for one Canvas instance
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read and parse a credential file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingCredentials(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse credential file content; `path` is only used in errors
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut api_url = None;
        let mut api_key = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                "API_URL" => api_url = Some(value.trim_end_matches('/').to_string()),
                "API_KEY" => api_key = Some(value.to_string()),
                _ => {}
            }
        }

        let missing = |key: &'static str| ConfigError::MissingCredentialKey {
            path: path.display().to_string(),
            key,
        };

        Ok(Self {
            api_url: api_url.filter(|v| !v.is_empty()).ok_or_else(|| missing("API_URL"))?,
            api_key: api_key.filter(|v| !v.is_empty()).ok_or_else(|| missing("API_KEY"))?,
        })
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// `~/.canvas/credentials.txt`, if a home directory can be determined
pub fn default_credentials_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".canvas").join("credentials.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_values() {
        let creds = Credentials::parse(
            "# Canvas\nAPI_KEY = \"abc123\"\nAPI_URL = 'https://canvas.example.edu/'\n",
            Path::new("creds.txt"),
        )
        .unwrap();
        assert_eq!(creds.api_key, "abc123");
        assert_eq!(creds.api_url, "https://canvas.example.edu");
    }

    #[test]
    fn test_parse_bare_values() {
        let creds = Credentials::parse(
            "API_URL=https://canvas.example.edu\nAPI_KEY=token",
            Path::new("creds.txt"),
        )
        .unwrap();
        assert_eq!(creds.api_key, "token");
    }

    #[test]
    fn test_missing_key_is_reported() {
        let err = Credentials::parse("API_URL = \"https://x\"", Path::new("creds.txt")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredentialKey { key: "API_KEY", .. }
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = Credentials {
            api_url: "https://x".to_string(),
            api_key: "secret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Credentials::load(Path::new("/nonexistent/credentials.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials(_)));
    }
}
