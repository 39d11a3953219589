//! Parallel directory crawler

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::{Scope, ThreadPoolBuilder};

use crate::error::Result;
use crate::exclude::ExcludeMatcher;
use crate::query::CompiledQuery;
use crate::search::ResultSink;
use crate::text::{self, FileClass, TextClassifier};
use crate::types::{FileRecord, SearchMode};

/// Number of workers used when the platform cannot report its parallelism
const FALLBACK_WORKERS: usize = 4;

/// Worker count matching the available hardware parallelism
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(FALLBACK_WORKERS, NonZeroUsize::get)
}

/// Directory crawler for a single search run
///
/// Every directory is one unit of work on a private thread pool. A unit lists
/// its children, matches the files in place and spawns a new unit per
/// subdirectory. All units share the match counter and the cancel flag, and
/// stop as soon as either says so.
pub struct Crawler<'a> {
    /// Compiled pattern and per-file filters
    query:       &'a CompiledQuery,
    /// Paths never visited
    excludes:    &'a ExcludeMatcher,
    /// Gate for content matching
    classifier:  &'a TextClassifier,
    /// Receiver of results and status lines
    sink:        &'a dyn ResultSink,
    /// Raised when the caller cancels
    cancel:      &'a AtomicBool,
    /// Number of records delivered
    matches:     AtomicUsize,
    /// Number of directories entered
    directories: AtomicUsize,
    /// Number of files examined
    files:       AtomicUsize,
    /// Set once the cap turned away a match or left work unvisited
    limited:     AtomicBool,
}

impl std::fmt::Debug for Crawler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("query", &self.query)
            .field("matches", &self.matches)
            .field("directories", &self.directories)
            .field("files", &self.files)
            .field("limited", &self.limited)
            .finish_non_exhaustive()
    }
}

impl<'a> Crawler<'a> {
    /// Create a crawler for one search run
    #[must_use]
    pub fn new(
        query: &'a CompiledQuery,
        excludes: &'a ExcludeMatcher,
        classifier: &'a TextClassifier,
        sink: &'a dyn ResultSink,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            query,
            excludes,
            classifier,
            sink,
            cancel,
            matches: AtomicUsize::new(0),
            directories: AtomicUsize::new(0),
            files: AtomicUsize::new(0),
            limited: AtomicBool::new(false),
        }
    }

    /// Get the current progress of the crawl
    ///
    /// Returns a tuple of:
    /// - Number of records delivered
    /// - Number of directories entered
    /// - Number of files examined
    #[must_use = "Progress information should be used for monitoring"]
    pub fn progress(&self) -> (usize, usize, usize) {
        (
            self.matches.load(Ordering::Acquire),
            self.directories.load(Ordering::Relaxed),
            self.files.load(Ordering::Relaxed),
        )
    }

    /// Returns true if the cap cut the walk short
    ///
    /// A walk that finds exactly `max_results` matches and runs to the end is
    /// not limited.
    #[must_use]
    pub fn was_limited(&self) -> bool {
        self.limited.load(Ordering::Relaxed)
    }

    /// Walk every root on a pool of `workers` threads
    ///
    /// Blocks until every spawned unit has finished, whether the walk was
    /// exhausted, capped or cancelled. The pool is dropped on return.
    ///
    /// # Errors
    /// Returns error if the thread pool cannot be built
    pub fn run(&self, roots: &[PathBuf], workers: usize) -> Result<()> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|idx| format!("fastsearch-worker-{idx}"))
            .build()?;

        pool.scope(|scope| {
            for root in roots {
                scope.spawn(move |scope| self.visit(scope, root.clone()));
            }
        });
        Ok(())
    }

    /// Returns true once the run is cancelled or the cap is reached
    fn should_stop(&self) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            return true;
        }
        if self.matches.load(Ordering::Acquire) >= self.query.max_results {
            self.limited.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Process one directory and spawn units for its subdirectories
    fn visit<'s>(&'s self, scope: &Scope<'s>, dir: PathBuf) {
        if self.should_stop() {
            return;
        }
        self.directories.fetch_add(1, Ordering::Relaxed);
        self.sink.status(&format!("Searching in: {}", dir.display()));

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                if !self.cancel.load(Ordering::Relaxed) {
                    tracing::warn!(path = %dir.display(), error = %e, "Error reading directory");
                }
                return;
            },
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            if self.should_stop() {
                return;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                    continue;
                },
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping entry");
                    continue;
                },
            };

            // Symlinks to directories are skipped to avoid cycles
            if file_type.is_dir() {
                if self.excludes.should_exclude(&path) {
                    tracing::trace!(path = %path.display(), "Excluded directory");
                } else {
                    subdirs.push(path);
                }
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                self.process_file(&path);
            }
        }

        for subdir in subdirs {
            scope.spawn(move |scope| self.visit(scope, subdir));
        }
    }

    /// Run every per-file check and deliver the file if it passes
    fn process_file(&self, path: &Path) {
        self.files.fetch_add(1, Ordering::Relaxed);

        if self.excludes.should_exclude(path) || !self.query.extension_matches(path) {
            return;
        }

        let matched = match self.query.mode {
            SearchMode::Filename => path
                .file_name()
                .is_some_and(|name| self.query.pattern.is_match(&name.to_string_lossy())),
            SearchMode::Content => self.content_matches(path),
        };
        if matched {
            self.accept(path);
        }
    }

    /// Classify the file and scan its lines for the pattern
    fn content_matches(&self, path: &Path) -> bool {
        if self.classifier.classify(path) == FileClass::Binary {
            return false;
        }
        match text::file_contains(path, &self.query.pattern, self.cancel) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Failed to read file");
                false
            },
        }
    }

    /// Build the record, apply the size/date filter and deliver it
    fn accept(&self, path: &Path) {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Failed to read metadata");
                return;
            },
        };
        let Some(record) = FileRecord::from_metadata(path, &metadata) else {
            tracing::debug!(path = %path.display(), "No modification time available");
            return;
        };

        if !self.query.filter.matches(&record)
            || self.cancel.load(Ordering::Relaxed)
            || !self.reserve_slot()
        {
            return;
        }
        self.sink.result(record);
    }

    /// Claim one result slot, failing once the cap is reached
    fn reserve_slot(&self) -> bool {
        let reserved = self
            .matches
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.query.max_results).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            self.limited.store(true, Ordering::Relaxed);
        }
        reserved
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use parking_lot::Mutex;
    use tempfile::TempDir;

    use super::*;
    use crate::filter::SizeDateFilter;
    use crate::search::FnSink;

    fn name_query(query: &str, max_results: usize) -> CompiledQuery {
        CompiledQuery::new(query, SearchMode::Filename, false, false)
            .unwrap()
            .with_max_results(max_results)
    }

    fn crawl(
        query: &CompiledQuery,
        excludes: &ExcludeMatcher,
        roots: &[PathBuf],
        cancel: &AtomicBool,
    ) -> (Vec<String>, (usize, usize, usize)) {
        let (names, progress, _) = crawl_limited(query, excludes, roots, cancel);
        (names, progress)
    }

    fn crawl_limited(
        query: &CompiledQuery,
        excludes: &ExcludeMatcher,
        roots: &[PathBuf],
        cancel: &AtomicBool,
    ) -> (Vec<String>, (usize, usize, usize), bool) {
        let classifier = TextClassifier::new(&[".txt"]);
        let names = Mutex::new(Vec::new());
        let sink = FnSink::new(|record: FileRecord| names.lock().push(record.name));
        let crawler = Crawler::new(query, excludes, &classifier, &sink, cancel);
        crawler.run(roots, 4).unwrap();
        let progress = crawler.progress();
        let limited = crawler.was_limited();
        let mut names = names.into_inner();
        names.sort();
        (names, progress, limited)
    }

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = AtomicBool::new(false);
        let (names, (matches, dirs, files)) =
            crawl(&name_query("", 10), &ExcludeMatcher::empty(), &[temp_dir.path().to_path_buf()], &cancel);

        assert!(names.is_empty());
        assert_eq!((matches, dirs, files), (0, 1, 0));
    }

    #[test]
    fn test_mixed_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("file1.txt"));
        let subdir = temp_dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        touch(&subdir.join("file2.txt"));
        touch(&subdir.join("other.bin"));

        let cancel = AtomicBool::new(false);
        let (names, (matches, dirs, files)) = crawl(
            &name_query("file", 10),
            &ExcludeMatcher::empty(),
            &[temp_dir.path().to_path_buf()],
            &cancel,
        );

        assert_eq!(names, ["file1.txt", "file2.txt"]);
        assert_eq!((matches, dirs, files), (2, 2, 3));
    }

    #[test]
    fn test_directory_depth() {
        const TEST_DEPTH: usize = 8;

        let temp_dir = TempDir::new().unwrap();
        let mut dir = temp_dir.path().to_path_buf();
        for i in 0..TEST_DEPTH {
            dir = dir.join(format!("dir_{i}"));
            fs::create_dir(&dir).unwrap();
            touch(&dir.join(format!("deep_{i}.txt")));
        }

        let cancel = AtomicBool::new(false);
        let (names, (_, dirs, _)) = crawl(
            &name_query("deep_", 100),
            &ExcludeMatcher::empty(),
            &[temp_dir.path().to_path_buf()],
            &cancel,
        );

        assert_eq!(names.len(), TEST_DEPTH);
        assert_eq!(dirs, TEST_DEPTH + 1);
    }

    #[test]
    fn test_excluded_directory_not_entered() {
        let temp_dir = TempDir::new().unwrap();
        let skipped = temp_dir.path().join("node_modules");
        fs::create_dir(&skipped).unwrap();
        touch(&skipped.join("match.txt"));
        touch(&temp_dir.path().join("match.txt"));

        let cancel = AtomicBool::new(false);
        let (names, (_, dirs, _)) = crawl(
            &name_query("match", 10),
            &ExcludeMatcher::new(&["node_modules"]),
            &[temp_dir.path().to_path_buf()],
            &cancel,
        );

        assert_eq!(names, ["match.txt"]);
        assert_eq!(dirs, 1);
    }

    #[test]
    fn test_result_cap_is_exact() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..10 {
            let subdir = temp_dir.path().join(format!("dir_{i}"));
            fs::create_dir(&subdir).unwrap();
            for j in 0..10 {
                touch(&subdir.join(format!("file_{j}.txt")));
            }
        }

        let cancel = AtomicBool::new(false);
        let (names, (matches, _, _), limited) = crawl_limited(
            &name_query("file_", 7),
            &ExcludeMatcher::empty(),
            &[temp_dir.path().to_path_buf()],
            &cancel,
        );

        assert_eq!(names.len(), 7);
        assert_eq!(matches, 7);
        assert!(limited);
    }

    #[test]
    fn test_cap_reached_without_cut_is_not_limited() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("only.txt"));

        let cancel = AtomicBool::new(false);
        let (names, (matches, _, _), limited) = crawl_limited(
            &name_query("only", 1),
            &ExcludeMatcher::empty(),
            &[temp_dir.path().to_path_buf()],
            &cancel,
        );

        assert_eq!(names, ["only.txt"]);
        assert_eq!(matches, 1);
        assert!(!limited);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        let open = temp_dir.path().join("open");
        fs::create_dir(&locked).unwrap();
        fs::create_dir(&open).unwrap();
        touch(&locked.join("hidden.txt"));
        touch(&open.join("visible.txt"));
        touch(&temp_dir.path().join("top.txt"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores permission bits
        let denied = fs::read_dir(&locked).is_err();

        let classifier = TextClassifier::new(&[".txt"]);
        let names = Mutex::new(Vec::new());
        let sink = FnSink::new(|record: FileRecord| names.lock().push(record.name));
        let cancel = AtomicBool::new(false);
        let query = name_query(".txt", 100);
        let excludes = ExcludeMatcher::empty();
        let crawler = Crawler::new(&query, &excludes, &classifier, &sink, &cancel);
        let result = crawler.run(&[temp_dir.path().to_path_buf()], 4);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.is_ok());
        let mut names = std::mem::take(&mut *names.lock());
        names.sort();
        if denied {
            assert_eq!(names, ["top.txt", "visible.txt"]);
        } else {
            assert_eq!(names, ["hidden.txt", "top.txt", "visible.txt"]);
        }
        assert_eq!(crawler.progress().1, 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("file.txt"));

        let cancel = AtomicBool::new(true);
        let (names, (_, dirs, files)) =
            crawl(&name_query("", 10), &ExcludeMatcher::empty(), &[temp_dir.path().to_path_buf()], &cancel);

        assert!(names.is_empty());
        assert_eq!((dirs, files), (0, 0));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = AtomicBool::new(false);
        let (names, _) = crawl(
            &name_query("", 10),
            &ExcludeMatcher::empty(),
            &[temp_dir.path().join("missing")],
            &cancel,
        );
        assert!(names.is_empty());
    }

    #[test]
    fn test_filter_applied_before_delivery() {
        let temp_dir = TempDir::new().unwrap();
        let mut big = File::create(temp_dir.path().join("big.txt")).unwrap();
        big.write_all(&[b'x'; 4096]).unwrap();
        touch(&temp_dir.path().join("tiny.txt"));

        let mut query = name_query(".txt", 10);
        query.filter = SizeDateFilter::new().min_size(1024);
        let cancel = AtomicBool::new(false);
        let (names, (matches, _, _)) =
            crawl(&query, &ExcludeMatcher::empty(), &[temp_dir.path().to_path_buf()], &cancel);

        assert_eq!(names, ["big.txt"]);
        assert_eq!(matches, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_followed() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        touch(&subdir.join("target.txt"));
        std::os::unix::fs::symlink(temp_dir.path(), subdir.join("loop")).unwrap();
        std::os::unix::fs::symlink(subdir.join("target.txt"), temp_dir.path().join("link.txt"))
            .unwrap();

        let cancel = AtomicBool::new(false);
        let (names, (_, dirs, _)) = crawl(
            &name_query(".txt", 100),
            &ExcludeMatcher::empty(),
            &[temp_dir.path().to_path_buf()],
            &cancel,
        );

        assert_eq!(names, ["link.txt", "target.txt"]);
        assert_eq!(dirs, 2);
    }
}
