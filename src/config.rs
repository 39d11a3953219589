//! Search configuration supplied by the host application

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::DEFAULT_MAX_RESULTS;

/// File name of the settings document in the home directory
pub const CONFIG_FILE_NAME: &str = ".fastsearch.json";

/// Static configuration read once when an engine is built
///
/// Missing fields take their default values, so a partial document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Default result cap
    pub max_results:       usize,
    /// Glob patterns of paths to skip, matched against any path suffix
    pub exclude_patterns:  Vec<String>,
    /// Folders searched in addition to the well-known home folders
    pub extra_folders:     Vec<PathBuf>,
    /// File name suffixes treated as text without sniffing
    pub text_extensions:   Vec<String>,
    /// Number of leading path components shown in status lines
    pub status_path_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results:       DEFAULT_MAX_RESULTS,
            exclude_patterns:  ["node_modules", ".git", "__pycache__", "*.tmp"]
                .map(String::from)
                .to_vec(),
            extra_folders:     Vec::new(),
            text_extensions:   [
                ".txt",
                ".log",
                ".md",
                ".py",
                ".java",
                ".js",
                ".ts",
                ".jsx",
                ".tsx",
                ".html",
                ".css",
                ".xml",
                ".json",
                ".yaml",
                ".yml",
                ".ini",
                ".conf",
                ".c",
                ".cpp",
                ".h",
                ".hpp",
                ".cs",
                ".go",
                ".rs",
                ".rb",
                ".php",
                ".sh",
                ".bat",
                ".sql",
                ".properties",
                ".gradle",
                ".maven",
            ]
            .map(String::from)
            .to_vec(),
            status_path_depth: 4,
        }
    }
}

impl SearchConfig {
    /// Location of the settings document, `~/.fastsearch.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a JSON document
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Config { path: path.to_path_buf(), reason: e.to_string() })?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Config { path: path.to_path_buf(), reason: e.to_string() })
    }

    /// Load configuration, falling back to the defaults when the file is absent
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match fs::metadata(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            },
            _ => Self::load(path),
        }
    }
}
