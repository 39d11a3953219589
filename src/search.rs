//! Search engine implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use crate::config::SearchConfig;
use crate::crawler::{Crawler, default_workers};
use crate::error::Result;
use crate::exclude::ExcludeMatcher;
use crate::filter::SizeDateFilter;
use crate::query::CompiledQuery;
use crate::roots::RootResolver;
use crate::text::TextClassifier;
use crate::types::{FileRecord, SearchMode, SearchOutcome, SearchSummary};

/// Receiver of search output
///
/// Called concurrently from worker threads. `result` is invoked exactly once
/// per accepted file; no ordering holds between files.
pub trait ResultSink: Sync {
    /// Deliver one accepted file
    fn result(&self, record: FileRecord);

    /// Deliver a progress line such as `Searching in: /home/me/Documents`
    fn status(&self, _message: &str) {}
}

/// Sink backed by a pair of closures
pub struct FnSink<R, S> {
    on_result: R,
    on_status: S,
}

impl<R: Fn(FileRecord) + Sync> FnSink<R, fn(&str)> {
    /// Create a sink that ignores status lines
    pub fn new(on_result: R) -> Self {
        Self { on_result, on_status: |_| {} }
    }
}

impl<R, S> FnSink<R, S> {
    /// Replace the status handler
    pub fn with_status<T: Fn(&str) + Sync>(self, on_status: T) -> FnSink<R, T> {
        FnSink { on_result: self.on_result, on_status }
    }
}

impl<R, S> std::fmt::Debug for FnSink<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

impl<R, S> ResultSink for FnSink<R, S>
where
    R: Fn(FileRecord) + Sync,
    S: Fn(&str) + Sync,
{
    fn result(&self, record: FileRecord) {
        (self.on_result)(record);
    }

    fn status(&self, message: &str) {
        (self.on_status)(message);
    }
}

/// Search output as a channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// An accepted file
    Result(FileRecord),
    /// A progress line
    Status(String),
}

impl ResultSink for Sender<SearchEvent> {
    fn result(&self, record: FileRecord) {
        // A gone receiver means nobody is listening any more
        let _ = self.send(SearchEvent::Result(record));
    }

    fn status(&self, message: &str) {
        let _ = self.send(SearchEvent::Status(message.to_owned()));
    }
}

/// Shared cancellation flag for one search run
///
/// Cancelling is monotonic and idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// The underlying flag
    #[must_use]
    pub fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// Parameters of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Raw query text
    pub query:          String,
    /// What the query is matched against
    pub mode:           SearchMode,
    /// Required file extension
    pub extension:      Option<String>,
    /// Folder to search instead of the default set
    pub root:           Option<PathBuf>,
    /// Size and date bounds
    pub filter:         SizeDateFilter,
    /// Result cap; the engine default when unset
    pub max_results:    Option<usize>,
    /// Match case exactly
    pub case_sensitive: bool,
    /// Treat a content query as a regular expression
    pub regex:          bool,
}

impl SearchRequest {
    fn new(query: &str, mode: SearchMode) -> Self {
        Self {
            query: query.to_owned(),
            mode,
            extension: None,
            root: None,
            filter: SizeDateFilter::default(),
            max_results: None,
            case_sensitive: false,
            regex: false,
        }
    }

    /// Search file names; `*` and `?` act as wildcards
    #[must_use]
    pub fn by_name(query: &str) -> Self {
        Self::new(query, SearchMode::Filename)
    }

    /// Search file contents
    #[must_use]
    pub fn by_content(query: &str) -> Self {
        Self::new(query, SearchMode::Content)
    }

    /// Only accept files with this extension
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Search this folder only
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Apply size and date bounds
    #[must_use]
    pub fn filter(mut self, filter: SizeDateFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Stop after this many results
    #[must_use]
    pub const fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Match case exactly
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Treat a content query as a regular expression
    #[must_use]
    pub const fn regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }
}

/// File search engine
///
/// Built once from a configuration and reusable for sequential searches.
/// Overlapping searches on one engine are not supported.
#[derive(Debug)]
pub struct SearchEngine {
    /// Compiled exclusion rules
    excludes:    ExcludeMatcher,
    /// Text/binary gate for content searches
    classifier:  TextClassifier,
    /// Default root computation
    roots:       RootResolver,
    /// Cap used when a request sets none
    max_results: usize,
    /// Worker threads per search
    workers:     usize,
    /// Token of the current or most recent search
    active:      Mutex<CancelToken>,
}

impl SearchEngine {
    /// Create an engine for the current user
    #[must_use]
    pub fn new(config: &SearchConfig) -> Self {
        Self::with_roots(config, RootResolver::for_current_user(config.extra_folders.clone()))
    }

    /// Create an engine with an explicit root resolver
    #[must_use]
    pub fn with_roots(config: &SearchConfig, roots: RootResolver) -> Self {
        Self {
            excludes: ExcludeMatcher::new(&config.exclude_patterns),
            classifier: TextClassifier::new(&config.text_extensions),
            roots,
            max_results: config.max_results,
            workers: default_workers(),
            active: Mutex::new(CancelToken::new()),
        }
    }

    /// Use a fixed number of worker threads
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Cancel the running search, if any
    pub fn cancel(&self) {
        self.active.lock().cancel();
    }

    /// Token of the current or most recent search
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.active.lock().clone()
    }

    /// Run a search, blocking until it ends
    ///
    /// # Errors
    /// Returns error if the query does not compile, the cap is out of range or
    /// the worker pool cannot start. Nothing is delivered in those cases.
    pub fn search(&self, request: &SearchRequest, sink: &dyn ResultSink) -> Result<SearchSummary> {
        self.search_with_token(request, sink, CancelToken::new())
    }

    /// Run a search that can also be cancelled through `token`
    ///
    /// # Errors
    /// See [`SearchEngine::search`]
    pub fn search_with_token(
        &self,
        request: &SearchRequest,
        sink: &dyn ResultSink,
        token: CancelToken,
    ) -> Result<SearchSummary> {
        let started = Instant::now();
        *self.active.lock() = token.clone();
        let query = self.compile(request)?;

        let roots = self.roots.resolve(request.root.as_deref());
        tracing::info!(
            query = %request.query,
            mode = request.mode.label(),
            roots = roots.len(),
            max_results = query.max_results,
            "Starting search"
        );

        let crawler = Crawler::new(&query, &self.excludes, &self.classifier, sink, token.flag());
        crawler.run(&roots, self.workers)?;

        let (matches, directories, files) = crawler.progress();
        let outcome = if token.is_cancelled() {
            SearchOutcome::Cancelled
        } else if crawler.was_limited() {
            SearchOutcome::Limited
        } else {
            SearchOutcome::Completed
        };
        let summary = SearchSummary { outcome, matches, directories, files, elapsed: started.elapsed() };
        tracing::info!(
            outcome = ?summary.outcome,
            matches,
            directories,
            files,
            elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Search finished"
        );
        Ok(summary)
    }

    /// Search file names
    ///
    /// # Errors
    /// See [`SearchEngine::search`]
    #[allow(clippy::too_many_arguments)]
    pub fn search_by_name(
        &self,
        query: &str,
        extension: Option<&str>,
        root: Option<&Path>,
        filter: &SizeDateFilter,
        max_results: usize,
        case_sensitive: bool,
        sink: &dyn ResultSink,
    ) -> Result<SearchSummary> {
        let request = Self::request(SearchRequest::by_name(query), extension, root, filter)
            .max_results(max_results)
            .case_sensitive(case_sensitive);
        self.search(&request, sink)
    }

    /// Search file contents
    ///
    /// # Errors
    /// See [`SearchEngine::search`]
    #[allow(clippy::too_many_arguments)]
    pub fn search_by_content(
        &self,
        query: &str,
        extension: Option<&str>,
        root: Option<&Path>,
        filter: &SizeDateFilter,
        max_results: usize,
        case_sensitive: bool,
        is_regex: bool,
        sink: &dyn ResultSink,
    ) -> Result<SearchSummary> {
        let request = Self::request(SearchRequest::by_content(query), extension, root, filter)
            .max_results(max_results)
            .case_sensitive(case_sensitive)
            .regex(is_regex);
        self.search(&request, sink)
    }

    fn request(
        mut request: SearchRequest,
        extension: Option<&str>,
        root: Option<&Path>,
        filter: &SizeDateFilter,
    ) -> SearchRequest {
        request.extension = extension.map(str::to_owned);
        request.root = root.map(Path::to_path_buf);
        request.filter = filter.clone();
        request
    }

    /// Turn a request into a checked, compiled query
    fn compile(&self, request: &SearchRequest) -> Result<CompiledQuery> {
        let query =
            CompiledQuery::new(&request.query, request.mode, request.case_sensitive, request.regex)?
                .with_extension(request.extension.as_deref())
                .with_filter(request.filter.clone())
                .with_max_results(request.max_results.unwrap_or(self.max_results));
        query.validate()?;
        Ok(query)
    }
}
