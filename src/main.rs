#![deny(missing_debug_implementations, missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
//! `FastSearch` - Concurrent, cancellable file search by name or content.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use clap_cargo::style::CLAP_STYLING;
use crossbeam::channel::{self, RecvTimeoutError};
use fastsearch::config::SearchConfig;
use fastsearch::error::Result;
use fastsearch::filter::{SizeDateFilter, parse_size, parse_timestamp};
use fastsearch::search::{CancelToken, SearchEngine, SearchEvent, SearchRequest};
use fastsearch::types::{FileRecord, SearchSummary, truncate_path};
use tracing_subscriber::EnvFilter;

/// CLI arguments for `FastSearch`
#[derive(Parser, Debug)]
#[command(author, version, about, styles = CLAP_STYLING)]
struct Cli {
    /// Settings file to use instead of ~/.fastsearch.json
    #[arg(long, global = true)]
    config:  Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Find files whose name matches a query; `*` and `?` are wildcards
    Name {
        /// Search query
        query:   String,
        #[command(flatten)]
        options: SearchOptions,
    },
    /// Find text files whose content matches a query
    Content {
        /// Search query
        query:   String,
        /// Treat the query as a regular expression
        #[arg(long)]
        regex:   bool,
        #[command(flatten)]
        options: SearchOptions,
    },
}

/// Options shared by both search commands
#[derive(Args, Debug)]
struct SearchOptions {
    /// Only files with this extension
    #[arg(long)]
    ext:            Option<String>,
    /// Search this folder instead of the common home folders
    #[arg(long)]
    dir:            Option<PathBuf>,
    /// Smallest file size, e.g. 10K or 2M
    #[arg(long)]
    min_size:       Option<String>,
    /// Largest file size, e.g. 10K or 2M
    #[arg(long)]
    max_size:       Option<String>,
    /// Only files modified at or after this time (YYYY-MM-DD [HH:MM])
    #[arg(long)]
    after:          Option<String>,
    /// Only files modified at or before this time (YYYY-MM-DD [HH:MM])
    #[arg(long)]
    before:         Option<String>,
    /// Stop after this many results
    #[arg(long)]
    max_results:    Option<usize>,
    /// Match case exactly
    #[arg(long)]
    case_sensitive: bool,
    /// Cancel the search after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout:        Option<u64>,
    /// Print the folder being searched to stderr
    #[arg(long)]
    progress:       bool,
}

impl SearchOptions {
    /// Parse the size and date bounds
    fn filter(&self) -> Result<SizeDateFilter> {
        let mut filter = SizeDateFilter::new();
        if let Some(raw) = &self.min_size {
            filter = filter.min_size(parse_size(raw)?);
        }
        if let Some(raw) = &self.max_size {
            filter = filter.max_size(parse_size(raw)?);
        }
        if let Some(raw) = &self.after {
            filter = filter.modified_after(parse_timestamp(raw)?);
        }
        if let Some(raw) = &self.before {
            filter = filter.modified_before(parse_timestamp(raw)?);
        }
        Ok(filter)
    }

    /// Apply the options to a request
    fn request(&self, mut request: SearchRequest) -> Result<SearchRequest> {
        request = request.filter(self.filter()?).case_sensitive(self.case_sensitive);
        if let Some(ext) = &self.ext {
            request = request.extension(ext.clone());
        }
        if let Some(dir) = &self.dir {
            request = request.root(dir.clone());
        }
        if let Some(max_results) = self.max_results {
            request = request.max_results(max_results);
        }
        Ok(request)
    }
}

/// Load settings, falling back to defaults when the default file is unusable
fn load_config(explicit: Option<&Path>) -> Result<SearchConfig> {
    if let Some(path) = explicit {
        return SearchConfig::load(path);
    }
    let Some(path) = SearchConfig::default_path() else {
        return Ok(SearchConfig::default());
    };
    Ok(SearchConfig::load_or_default(&path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
        SearchConfig::default()
    }))
}

/// Print one result line
fn print_record(record: &FileRecord) {
    println!(
        "{:<12} {:>10}  {}  {}",
        record.kind,
        record.size_formatted(),
        record.modified_formatted(),
        record.path.display()
    );
}

/// Run a search on a background thread, printing events as they arrive
fn search_files(
    config: &SearchConfig,
    request: &SearchRequest,
    timeout: Option<Duration>,
    progress: bool,
) -> Result<SearchSummary> {
    let engine = SearchEngine::new(config);
    let token = CancelToken::new();
    let (tx, rx) = channel::unbounded();
    let mut deadline = timeout.map(|t| Instant::now() + t);

    thread::scope(|s| {
        let worker_token = token.clone();
        let handle = s.spawn(move || engine.search_with_token(request, &tx, worker_token));

        loop {
            let event = match deadline {
                Some(at) => match rx.recv_deadline(at) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::info!("Timeout reached, cancelling search");
                        token.cancel();
                        deadline = None;
                        continue;
                    },
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            match event {
                SearchEvent::Result(record) => print_record(&record),
                SearchEvent::Status(message) if progress => {
                    let dir = message.strip_prefix("Searching in: ").unwrap_or(&message);
                    eprintln!("Searching in: {}", truncate_path(dir, config.status_path_depth));
                },
                SearchEvent::Status(_) => {},
            }
        }

        handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    let (request, options) = match &cli.command {
        Command::Name { query, options } => (SearchRequest::by_name(query), options),
        Command::Content { query, regex, options } => {
            (SearchRequest::by_content(query).regex(*regex), options)
        },
    };
    let request = options.request(request)?;
    let timeout = options.timeout.map(Duration::from_secs);

    let summary = search_files(&config, &request, timeout, options.progress)?;
    println!("\n{}", summary.status_line(request.root.as_deref()));
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&Cli::parse()) {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
