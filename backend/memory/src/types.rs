use std::sync::LazyLock;

use regex::Regex;
use roundtable_core::Phase;
use serde::Serialize;

/// Timestamp format used in artifact record headers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A body line that would read as a record header once its leading spaces are gone.
static HEADER_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ *\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\]$").expect("valid header regex")
});

/// One record in an agent's phase log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseArtifact {
    pub agent_id: String,
    pub phase: Phase,
    /// Local time, formatted with [`TIMESTAMP_FORMAT`]
    pub timestamp: String,
    pub text: String,
}

impl PhaseArtifact {
    /// The on-disk form: a bracketed timestamp line, the text, and a blank line.
    ///
    /// Text lines shaped like a header are indented by one space so that only
    /// the leading line of a record can start a new one.
    pub fn to_record(&self) -> String {
        format!("[{}]\n{}\n\n", self.timestamp, escape_body(&self.text))
    }
}

pub(crate) fn escape_body(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if HEADER_LIKE_RE.is_match(line) {
                format!(" {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inverse of [`escape_body`].
pub(crate) fn unescape_body(text: &str) -> String {
    text.split('\n')
        .map(|line| match line.strip_prefix(' ') {
            Some(rest) if HEADER_LIKE_RE.is_match(line) => rest,
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
