// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control strings in device installation logs.
//!
//! Device agents send their installation log as plain text lines. A few
//! substrings carry meaning for the server:
//!
//! - `Downloaded <N>%` reports download progress; the last occurrence in a
//!   line wins
//! - a line starting with [`RESET_MARKER`] starts a new installation and
//!   discards the previous log
//! - a line equal to [`SKIP_MARKER`] is not recorded
//!
//! These strings are part of the device agent protocol and must not change.
//!
//! # Examples
//!
//! ```
//! use fleet_updater::log_protocol::{LogLine, parse_progress};
//!
//! assert_eq!(parse_progress("Downloaded 42% Downloaded 57%"), Some(57));
//!
//! let line = LogLine::parse("Installing Update Chunk Artifacts.");
//! assert!(line.resets_log);
//! assert!(line.recorded);
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Prefix of a line that starts a fresh installation log.
pub const RESET_MARKER: &str = "Installing Update Chunk Artifacts.";

/// A line that is acknowledged but never recorded.
pub const SKIP_MARKER: &str = "Skipped Update.";

static PROGRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Downloaded ([0-9]+)%").expect("progress pattern is valid"));

/// Returns the percentage of the last `Downloaded <N>%` occurrence.
///
/// Values above 100 are clamped to 100.
#[must_use]
pub fn parse_progress(line: &str) -> Option<u8> {
    let captures = PROGRESS_PATTERN.captures_iter(line).last()?;
    let value = captures[1].parse::<u64>().unwrap_or(u64::MAX);
    Some(u8::try_from(value.min(100)).unwrap_or(100))
}

/// How a single log line affects the stored log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLine {
    /// Progress reported by the line, if any.
    pub progress: Option<u8>,
    /// The stored log must be cleared before this line is appended.
    pub resets_log: bool,
    /// The line is appended to the stored log and broadcast.
    pub recorded: bool,
}

impl LogLine {
    /// Classifies a raw log line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        Self {
            progress: parse_progress(line),
            resets_log: line.starts_with(RESET_MARKER),
            recorded: line != SKIP_MARKER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_progress() {
        assert_eq!(parse_progress("Downloaded 10%"), Some(10));
    }

    #[test]
    fn last_match_wins() {
        assert_eq!(parse_progress("Downloaded 42% Downloaded 57%"), Some(57));
        assert_eq!(
            parse_progress("Downloaded 90% ... Downloaded 3%, retrying"),
            Some(3)
        );
    }

    #[test]
    fn malformed_occurrences_are_ignored() {
        assert_eq!(parse_progress("Downloaded %"), None);
        assert_eq!(parse_progress("Downloaded 12 %"), None);
        assert_eq!(parse_progress("Downloaded 12% Downloaded x%"), Some(12));
        assert_eq!(parse_progress("downloaded 12%"), None);
    }

    #[test]
    fn no_progress_in_plain_line() {
        assert_eq!(parse_progress("Verifying signature"), None);
        assert_eq!(parse_progress(""), None);
    }

    #[test]
    fn oversized_values_clamp() {
        assert_eq!(parse_progress("Downloaded 250%"), Some(100));
        assert_eq!(
            parse_progress("Downloaded 99999999999999999999999%"),
            Some(100)
        );
    }

    #[test]
    fn reset_marker_is_a_prefix_match() {
        let line = LogLine::parse("Installing Update Chunk Artifacts. (3 chunks)");
        assert!(line.resets_log);
        assert!(line.recorded);
        assert!(!LogLine::parse("  Installing Update Chunk Artifacts.").resets_log);
    }

    #[test]
    fn skip_marker_is_exact() {
        assert!(!LogLine::parse("Skipped Update.").recorded);
        assert!(LogLine::parse("Skipped Update. Reason: pinned").recorded);
    }
}
