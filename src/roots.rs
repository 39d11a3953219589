//! Search root resolution

use std::path::{Path, PathBuf};

/// Well-known home subfolders searched by default
pub const COMMON_FOLDERS: [&str; 6] =
    ["Desktop", "Documents", "Downloads", "Pictures", "Videos", "Music"];

/// Computes the directories a search starts from
#[derive(Debug, Clone)]
pub struct RootResolver {
    /// The user's home directory
    home:          PathBuf,
    /// Configured folders searched alongside the common ones
    extra_folders: Vec<PathBuf>,
}

impl RootResolver {
    /// Create a resolver for an explicit home directory
    #[must_use]
    pub fn new(home: PathBuf, extra_folders: Vec<PathBuf>) -> Self {
        Self { home, extra_folders }
    }

    /// Create a resolver for the current user's home directory
    #[must_use]
    pub fn for_current_user(extra_folders: Vec<PathBuf>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home, extra_folders)
    }

    /// Resolve the ordered, deduplicated set of roots
    ///
    /// An existing explicit folder replaces the default set entirely. A
    /// missing one is logged and the default set is used instead.
    #[must_use]
    pub fn resolve(&self, explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(folder) = explicit.filter(|p| !p.as_os_str().is_empty()) {
            if folder.is_dir() {
                return vec![absolute(folder)];
            }
            tracing::warn!(
                path = %folder.display(),
                "Search folder does not exist, using defaults"
            );
        }

        let mut roots: Vec<PathBuf> = Vec::new();
        let candidates = COMMON_FOLDERS
            .iter()
            .map(|name| self.home.join(name))
            .chain(self.extra_folders.iter().cloned());

        for dir in candidates {
            if !dir.is_dir() {
                continue;
            }
            let dir = absolute(&dir);
            if !roots.contains(&dir) {
                roots.push(dir);
            }
        }

        if roots.is_empty() {
            roots.push(absolute(&self.home));
        }
        roots
    }
}

/// Make a path absolute without touching symlinks, keeping it as-is on failure
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
