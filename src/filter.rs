//! Size and modification-time filtering of results

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::FileRecord;

/// Optional bounds on file size and modification time
///
/// Unset bounds do not constrain. Sizes are inclusive on both ends;
/// `modified_after` rejects only strictly earlier times and `modified_before`
/// rejects only strictly later times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDateFilter {
    /// Smallest accepted size in bytes
    pub min_size:        Option<u64>,
    /// Largest accepted size in bytes
    pub max_size:        Option<u64>,
    /// Earliest accepted modification time
    pub modified_after:  Option<DateTime<Local>>,
    /// Latest accepted modification time
    pub modified_before: Option<DateTime<Local>>,
}

impl SizeDateFilter {
    /// A filter that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum size
    #[must_use]
    pub const fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    /// Set the maximum size
    #[must_use]
    pub const fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Set the earliest modification time
    #[must_use]
    pub fn modified_after(mut self, time: DateTime<Local>) -> Self {
        self.modified_after = Some(time);
        self
    }

    /// Set the latest modification time
    #[must_use]
    pub fn modified_before(mut self, time: DateTime<Local>) -> Self {
        self.modified_before = Some(time);
        self
    }

    /// Returns true if no bound is set
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min_size.is_none()
            && self.max_size.is_none()
            && self.modified_after.is_none()
            && self.modified_before.is_none()
    }

    /// Returns true if the record satisfies every set bound
    #[must_use]
    pub fn matches(&self, record: &FileRecord) -> bool {
        if self.min_size.is_some_and(|min| record.size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| record.size > max) {
            return false;
        }
        if self.modified_after.is_some_and(|after| record.modified < after) {
            return false;
        }
        !self.modified_before.is_some_and(|before| record.modified > before)
    }
}

/// Parse a size such as `2048`, `10K`, `1.5M` or `2G` into bytes
///
/// Suffixes are binary multiples and case-insensitive; a trailing `B` is allowed.
///
/// # Errors
/// Returns error if the value is not a non-negative number with a known suffix
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn parse_size(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();
    let digits = upper.strip_suffix('B').unwrap_or(&upper);
    let (number, multiplier) = match digits.chars().last() {
        Some('K') => (&digits[..digits.len() - 1], 1024_u64),
        Some('M') => (&digits[..digits.len() - 1], 1024 * 1024),
        Some('G') => (&digits[..digits.len() - 1], 1024 * 1024 * 1024),
        _ => (digits, 1),
    };
    let number = number.trim();

    if let Ok(bytes) = number.parse::<u64>() {
        return bytes
            .checked_mul(multiplier)
            .ok_or_else(|| Error::request(format!("Size is too large: {trimmed}")));
    }
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok((value * multiplier as f64) as u64),
        _ => Err(Error::request(format!("Invalid size: {trimmed}"))),
    }
}

/// Parse a local timestamp written as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM`
///
/// A bare date means midnight at the start of that day.
///
/// # Errors
/// Returns error if the value does not match either form or does not exist in
/// the local time zone
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Local>> {
    let trimmed = raw.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::request(format!("Invalid date: {trimmed} (use YYYY-MM-DD)")))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::request(format!("Date does not exist locally: {trimmed}")))
}
