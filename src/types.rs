//! Common types and constants for `FastSearch`

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Upper bound for the per-search result cap
pub const MAX_RESULTS_LIMIT: usize = 1_000_000;

/// Default per-search result cap
pub const DEFAULT_MAX_RESULTS: usize = 1_000;

/// Number of leading bytes inspected when sniffing for binary content
pub const SNIFF_SIZE: usize = 1024;

/// Lines read between cancellation checks during a content scan
pub const CANCEL_CHECK_LINES: usize = 1024;

const _: () = {
    assert!(DEFAULT_MAX_RESULTS > 0);
    assert!(DEFAULT_MAX_RESULTS <= MAX_RESULTS_LIMIT);
    assert!(SNIFF_SIZE > 0);
    assert!(CANCEL_CHECK_LINES.is_power_of_two());
};

/// What a query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchMode {
    /// Base name of each file
    Filename,
    /// Textual contents of each file
    Content,
}

impl SearchMode {
    /// Display label used in status lines
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Filename => "Filename",
            Self::Content => "Content",
        }
    }
}

/// A file that passed every filter of a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path:     PathBuf,
    /// Base name of the file
    pub name:     String,
    /// Size in bytes
    pub size:     u64,
    /// Last modification time
    pub modified: DateTime<Local>,
    /// Coarse type label derived from the extension
    pub kind:     String,
}

impl FileRecord {
    /// Build a record from a path and its already-fetched metadata
    ///
    /// Returns `None` when the platform cannot report a modification time.
    #[must_use]
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Option<Self> {
        let modified = metadata.modified().ok()?;
        Some(Self {
            path:     path.to_path_buf(),
            name:     path
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            size:     metadata.len(),
            modified: DateTime::<Local>::from(modified),
            kind:     file_kind(path),
        })
    }

    /// Size rendered for humans, e.g. `1.5 KB`
    #[must_use]
    pub fn size_formatted(&self) -> String {
        format_size(self.size)
    }

    /// Modification time rendered as `YYYY-MM-DD HH:MM`
    #[must_use]
    pub fn modified_formatted(&self) -> String {
        self.modified.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Derive the coarse type label of a path from its extension
///
/// Unknown extensions are labelled with the upper-cased extension itself and
/// paths without one are labelled `File`.
#[must_use]
pub fn file_kind(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    // A leading dot alone (".bashrc") is not an extension
    let ext = match name.rfind('.') {
        Some(i) if i > 0 => name[i + 1..].to_ascii_uppercase(),
        _ => return "File".to_owned(),
    };

    let label = match ext.as_str() {
        "PDF" => "PDF",
        "DOCX" | "DOC" => "Word",
        "XLSX" | "XLS" => "Excel",
        "PPTX" => "PowerPoint",
        "TXT" => "Text",
        "JPG" | "JPEG" | "PNG" | "GIF" => "Image",
        "MP4" | "AVI" => "Video",
        "MP3" | "WAV" => "Audio",
        "ZIP" | "RAR" => "Archive",
        "PY" => "Python",
        "JAVA" => "Java",
        "JS" => "JavaScript",
        "HTML" => "HTML",
        "CSS" => "CSS",
        "" => "File",
        _ => return ext,
    };
    label.to_owned()
}

/// Render a byte count with a binary unit
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size < KB {
        format!("{size} B")
    } else if size < MB {
        format!("{:.1} KB", size as f64 / KB as f64)
    } else if size < GB {
        format!("{:.1} MB", size as f64 / MB as f64)
    } else {
        format!("{:.2} GB", size as f64 / GB as f64)
    }
}

/// How a search run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchOutcome {
    /// Every reachable directory was visited
    Completed,
    /// The result cap was reached before the walk finished
    Limited,
    /// The search was cancelled by the caller
    Cancelled,
}

/// Summary of a finished search run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    /// Terminal state of the run
    pub outcome:     SearchOutcome,
    /// Number of records delivered
    pub matches:     usize,
    /// Number of directories entered
    pub directories: usize,
    /// Number of files examined
    pub files:       usize,
    /// Wall-clock duration
    pub elapsed:     Duration,
}

impl SearchSummary {
    /// Closing status line, e.g. `3 results found in Documents (0s)`
    ///
    /// `folder` names the explicit search folder; `None` means the default set.
    #[must_use]
    pub fn status_line(&self, folder: Option<&Path>) -> String {
        if self.outcome == SearchOutcome::Cancelled {
            return "Search cancelled".to_owned();
        }
        let folder = folder
            .and_then(Path::file_name)
            .map_or_else(|| "common folders".into(), |n| n.to_string_lossy());
        format!("{} results found in {folder} ({}s)", self.matches, self.elapsed.as_secs())
    }
}

/// Keep the first `depth` components of a status path and mark the cut with `...`
#[must_use]
pub fn truncate_path(path: &str, depth: usize) -> String {
    let parts: Vec<&str> = path.split(['/', '\\']).collect();
    if parts.len() <= depth {
        return path.to_owned();
    }
    let mut out = parts[..depth].join(std::path::MAIN_SEPARATOR_STR);
    out.push(std::path::MAIN_SEPARATOR);
    out.push_str("...");
    out
}
