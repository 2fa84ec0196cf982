//! Per-request error taxonomy.
//!
//! Configuration failures live in [`crate::config::ConfigError`]; everything
//! here happens while serving a request and is caught at the handler boundary.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Spreadsheet or messaging API unreachable, or credentials rejected.
    UpstreamUnavailable(String),
    /// Webhook payload could not be decoded into an update.
    MalformedUpdate(String),
    /// Best-effort cleanup failed. Logged, never surfaced.
    DeleteFailed(String),
    /// Outbound reply was rejected by the messaging platform.
    SendFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UpstreamUnavailable(e) => write!(f, "upstream unavailable: {e}"),
            Error::MalformedUpdate(e) => write!(f, "malformed update: {e}"),
            Error::DeleteFailed(e) => write!(f, "delete failed: {e}"),
            Error::SendFailed(e) => write!(f, "send failed: {e}"),
        }
    }
}

impl std::error::Error for Error {}
