//! Text file detection and content scanning

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;

use crate::types::{CANCEL_CHECK_LINES, SNIFF_SIZE};

/// Whether a file is eligible for content search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Readable text
    Text,
    /// Binary data, or a file that could not be inspected
    Binary,
}

/// Classifies files as text or binary
///
/// Files with a listed extension are text without any I/O. Everything else is
/// sniffed: a NUL byte in the first `SNIFF_SIZE` bytes means binary.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    /// Lower-cased name suffixes treated as text
    extensions: Vec<String>,
}

impl TextClassifier {
    /// Create a classifier from a list of name suffixes such as `.txt`
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim().to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Returns true if the file name ends with a listed suffix
    #[must_use]
    pub fn is_listed(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    /// Classify a file, sniffing its head when the extension is not listed
    ///
    /// Read failures classify as binary.
    #[must_use]
    pub fn classify(&self, path: &Path) -> FileClass {
        if self.is_listed(path) {
            return FileClass::Text;
        }
        match File::open(path).and_then(sniff) {
            Ok(class) => class,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Failed to sniff file content");
                FileClass::Binary
            },
        }
    }
}

/// Classify a stream by looking for NUL in its first `SNIFF_SIZE` bytes
///
/// Wide encodings such as UTF-16 contain NUL bytes and classify as binary.
///
/// # Errors
/// Returns error if reading fails
pub fn sniff<R: Read>(mut reader: R) -> io::Result<FileClass> {
    let mut buf = [0u8; SNIFF_SIZE];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }

    if memchr::memchr(0, &buf[..filled]).is_some() {
        Ok(FileClass::Binary)
    } else {
        Ok(FileClass::Text)
    }
}

/// Returns true if any line of the file matches the pattern
///
/// Lines are decoded as UTF-8 with invalid sequences replaced, and scanning
/// stops at the first hit. A raised `cancel` flag ends the scan with `false`.
///
/// # Errors
/// Returns error if the file cannot be opened or read
pub fn file_contains(path: &Path, pattern: &Regex, cancel: &AtomicBool) -> io::Result<bool> {
    let file = File::open(path)?;
    lines_contain(BufReader::new(file), pattern, cancel)
}

/// Line-by-line pattern search over a buffered reader
///
/// # Errors
/// Returns error if reading fails
pub fn lines_contain<R: BufRead>(
    mut reader: R,
    pattern: &Regex,
    cancel: &AtomicBool,
) -> io::Result<bool> {
    let mut line = Vec::new();
    let mut count = 0_usize;

    loop {
        if count & (CANCEL_CHECK_LINES - 1) == 0 && cancel.load(Ordering::Relaxed) {
            return Ok(false);
        }
        count = count.wrapping_add(1);

        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(false);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }

        if pattern.is_match(&String::from_utf8_lossy(&line)) {
            return Ok(true);
        }
    }
}
