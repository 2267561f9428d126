//! Fault taxonomy for miner polls.
//!
//! Every failed poll collapses into one of five categories, which drive
//! per-miner error counters. Transport faults keep their kind from the I/O
//! layer; anything else is classified by inspecting the message text, the
//! same way an operator would reading the log.

use std::time::Duration;

use strum::{AsRefStr, Display, EnumIter};

/// Error raised by a single poll of one miner.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("timeout connecting to {host}:{port} after {timeout:?}")]
    Timeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    #[error("connection refused to {host}:{port}")]
    ConnectionRefused { host: String, port: u16 },

    #[error("network error connecting to {host}:{port}: {source}")]
    Network {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("empty response from {host}:{port}")]
    EmptyResponse { host: String, port: u16 },

    #[error("parse error from {host}:{port}: {message}")]
    Parse {
        host: String,
        port: u16,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

/// The five counter buckets a failed poll lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    ConnectionRefused,
    Network,
    Parse,
    Other,
}

impl PollError {
    /// Classify this error into a counter bucket.
    ///
    /// Explicit variants win; `Other` falls back to substring matching on
    /// the message so wrapped errors from lower layers still land in a
    /// useful bucket.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PollError::Timeout { .. } => ErrorCategory::Timeout,
            PollError::ConnectionRefused { .. } => ErrorCategory::ConnectionRefused,
            PollError::Network { .. } => ErrorCategory::Network,
            PollError::EmptyResponse { .. } | PollError::Parse { .. } => ErrorCategory::Parse,
            PollError::Other(message) => categorize_message(message),
        }
    }
}

/// Substring-based fallback classification, case-insensitive.
fn categorize_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if lower.contains("timeout") {
        ErrorCategory::Timeout
    } else if lower.contains("connection refused") {
        ErrorCategory::ConnectionRefused
    } else if lower.contains("network") || lower.contains("unreachable") {
        ErrorCategory::Network
    } else if lower.contains("parse") || lower.contains("empty response") {
        ErrorCategory::Parse
    } else {
        ErrorCategory::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn explicit_variants_win_over_message_text() {
        let err = PollError::Timeout {
            host: "10.0.0.1".into(),
            port: 4028,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.category(), ErrorCategory::Timeout);

        let err = PollError::ConnectionRefused {
            host: "10.0.0.1".into(),
            port: 4028,
        };
        assert_eq!(err.category(), ErrorCategory::ConnectionRefused);
    }

    #[test]
    fn empty_response_is_a_parse_fault() {
        let err = PollError::EmptyResponse {
            host: "10.0.0.1".into(),
            port: 4028,
        };
        assert_eq!(err.category(), ErrorCategory::Parse);
    }

    #[test_case("Timeout waiting for reply" => ErrorCategory::Timeout)]
    #[test_case("Connection refused by peer" => ErrorCategory::ConnectionRefused)]
    #[test_case("network is down" => ErrorCategory::Network)]
    #[test_case("host unreachable" => ErrorCategory::Network)]
    #[test_case("failed to parse STATS" => ErrorCategory::Parse)]
    #[test_case("Empty response from miner" => ErrorCategory::Parse)]
    #[test_case("something else entirely" => ErrorCategory::Other)]
    fn other_errors_classify_by_substring(message: &str) -> ErrorCategory {
        PollError::Other(message.to_string()).category()
    }

    #[test]
    fn category_names_are_counter_suffixes() {
        assert_eq!(ErrorCategory::Timeout.as_ref(), "timeout");
        assert_eq!(ErrorCategory::ConnectionRefused.as_ref(), "connection_refused");
        assert_eq!(ErrorCategory::Other.as_ref(), "other");
    }
}
