//! Path exclusion rules

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled exclusion patterns
///
/// Each pattern is anchored as `**/<pattern>`, so it matches any path whose
/// trailing components fit it: `node_modules` hits every directory of that
/// name, `*.tmp` hits every file with that suffix.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    /// Compiled patterns
    set:      GlobSet,
    /// Number of patterns that compiled
    patterns: usize,
}

impl ExcludeMatcher {
    /// Compile a list of glob patterns
    ///
    /// Patterns that fail to compile are logged and dropped.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut compiled = 0;

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match GlobBuilder::new(&format!("**/{pattern}")).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    compiled += 1;
                },
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "Invalid exclude pattern, skipping");
                },
            }
        }

        match builder.build() {
            Ok(set) => Self { set, patterns: compiled },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build exclude rules, nothing will be excluded");
                Self::empty()
            },
        }
    }

    /// A matcher that excludes nothing
    #[must_use]
    pub fn empty() -> Self {
        Self { set: GlobSet::empty(), patterns: 0 }
    }

    /// Number of patterns in effect
    #[must_use]
    pub const fn len(&self) -> usize {
        self.patterns
    }

    /// Returns true if no pattern is in effect
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns == 0
    }

    /// Returns true if any pattern matches the path
    #[must_use]
    pub fn should_exclude(&self, path: &Path) -> bool {
        self.patterns > 0 && self.set.is_match(path)
    }
}
