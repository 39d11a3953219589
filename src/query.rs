//! Query compilation

use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::{Result, validate_max_results};
use crate::filter::SizeDateFilter;
use crate::types::{DEFAULT_MAX_RESULTS, SearchMode};

/// Everything a crawler needs to decide whether a file is a result
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Pattern matched against names or lines
    pub pattern:     Regex,
    /// What the pattern is matched against
    pub mode:        SearchMode,
    /// Required lower-cased name suffix, including the dot
    pub extension:   Option<String>,
    /// Size and date bounds
    pub filter:      SizeDateFilter,
    /// Result cap
    pub max_results: usize,
}

impl CompiledQuery {
    /// Compile a query with no extension requirement, no bounds and the default cap
    ///
    /// # Errors
    /// Returns error if the query does not compile
    pub fn new(query: &str, mode: SearchMode, case_sensitive: bool, is_regex: bool) -> Result<Self> {
        Ok(Self {
            pattern: compile(query, mode, case_sensitive, is_regex)?,
            mode,
            extension: None,
            filter: SizeDateFilter::default(),
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    /// Require an extension, given with or without its leading dot
    #[must_use]
    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = extension
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"));
        self
    }

    /// Apply size and date bounds
    #[must_use]
    pub fn with_filter(mut self, filter: SizeDateFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the result cap
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Check the cap is in range
    ///
    /// # Errors
    /// Returns error if the cap is zero or above the limit
    pub fn validate(&self) -> Result<()> {
        validate_max_results(self.max_results)
    }

    /// Returns true if the file name carries the required extension
    #[must_use]
    pub fn extension_matches(&self, path: &Path) -> bool {
        let Some(suffix) = &self.extension else {
            return true;
        };
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().to_lowercase().ends_with(suffix.as_str()))
    }
}

/// Returns true if a filename query uses `*` or `?` wildcards
#[must_use]
pub fn is_glob(query: &str) -> bool {
    query.contains(['*', '?'])
}

/// Translate a filename query into regex source
///
/// Wildcard queries map `*` to `.*` and `?` to `.`, escaping literal dots.
/// Other queries match as a literal substring of the name.
#[must_use]
pub fn filename_pattern(query: &str) -> String {
    if is_glob(query) {
        query.replace('.', "\\.").replace('*', ".*").replace('?', ".")
    } else {
        format!(".*{}.*", regex::escape(query))
    }
}

/// Translate a content query into regex source
#[must_use]
pub fn content_pattern(query: &str, is_regex: bool) -> String {
    if is_regex { query.to_owned() } else { regex::escape(query) }
}

/// Compile a query into the single pattern used during the walk
///
/// `is_regex` only applies to content queries.
///
/// # Errors
/// Returns error if the resulting pattern is not a valid regular expression
pub fn compile(query: &str, mode: SearchMode, case_sensitive: bool, is_regex: bool) -> Result<Regex> {
    let source = match mode {
        SearchMode::Filename => filename_pattern(query),
        SearchMode::Content => content_pattern(query, is_regex),
    };
    let regex = RegexBuilder::new(&source).case_insensitive(!case_sensitive).build()?;
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn name_query(query: &str, case_sensitive: bool) -> Regex {
        compile(query, SearchMode::Filename, case_sensitive, false).unwrap()
    }

    #[test]
    fn test_filename_substring() {
        let re = name_query("testFile1", false);
        assert!(re.is_match("testFile1.txt"));
        assert!(re.is_match("TESTFILE1.log"));
        assert!(!re.is_match("testFile2.log"));
    }

    #[test]
    fn test_filename_case_sensitive() {
        assert!(!name_query("testfile", true).is_match("testFile1.txt"));
        assert!(!name_query("testfile", true).is_match("TESTFILE_UPPER.txt"));
        assert!(name_query("TESTFILE_UPPER", true).is_match("TESTFILE_UPPER.txt"));
    }

    #[test]
    fn test_filename_literal_is_escaped() {
        let re = name_query("a.b", false);
        assert!(re.is_match("xa.by"));
        assert!(!re.is_match("axb"));
        assert!(name_query("c++ (copy)", false).is_match("notes c++ (copy).txt"));
    }

    #[test]
    fn test_filename_glob() {
        assert_eq!(filename_pattern("*.txt"), ".*\\.txt");
        assert_eq!(filename_pattern("file?.log"), "file.\\.log");

        let re = name_query("*.txt", false);
        assert!(re.is_match("notes.txt"));
        assert!(!re.is_match("notes_txt"));
        assert!(name_query("file?.log", false).is_match("file7.log"));
    }

    #[test]
    fn test_empty_filename_query_matches_everything() {
        assert!(name_query("", false).is_match("anything.bin"));
    }

    #[test]
    fn test_content_literal() {
        let re = compile("[Hh]ello", SearchMode::Content, false, false).unwrap();
        assert!(re.is_match("say [hh]ello"));
        assert!(!re.is_match("Hello"));
    }

    #[test]
    fn test_content_regex() {
        let re = compile("\\bsub.*", SearchMode::Content, false, true).unwrap();
        assert!(re.is_match("This is a file in a subdirectory."));
        assert!(!re.is_match("insubstantial"));
    }

    #[test]
    fn test_extension_filter() {
        let query = CompiledQuery::new("test", SearchMode::Filename, false, false).unwrap();
        assert!(query.extension_matches(Path::new("a.bin")));

        let query = query.with_extension(Some("LOG"));
        assert!(query.extension_matches(Path::new("/tmp/testFile2.log")));
        assert!(query.extension_matches(Path::new("/tmp/TRACE.Log")));
        assert!(!query.extension_matches(Path::new("/tmp/testFile1.txt")));
        assert!(!query.extension_matches(Path::new("/tmp/log")));

        let dotted = query.clone().with_extension(Some(".log"));
        assert_eq!(dotted.extension.as_deref(), Some(".log"));
        assert!(query.with_extension(Some("  ")).extension.is_none());
    }

    #[test]
    fn test_validate_cap() {
        let query = CompiledQuery::new("x", SearchMode::Content, true, false).unwrap();
        assert!(query.validate().is_ok());
        assert!(query.with_max_results(0).validate().is_err());
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            compile("(unclosed", SearchMode::Content, false, true),
            Err(Error::InvalidQuery(_))
        ));
        // Wildcard names pass other metacharacters through unescaped
        assert!(compile("[*", SearchMode::Filename, false, false).is_err());
        assert!(compile("[", SearchMode::Filename, false, false).is_ok());
        assert!(compile("(unclosed", SearchMode::Content, false, false).is_ok());
    }
}
