//! Shared result types (spec §3): `RecipientStatus`, `DiagnosticTag`,
//! `SessionOutcome`, and the outward-facing `Verdict`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::smtp::TranscriptLine;

/// Internal recipient status, derived by the classifier (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientStatus {
    Valid,
    UserNotFound,
    TemporaryFailure,
    UnknownFailure,
    Blacklisted,
}

/// Short diagnostic label, orthogonal to the user-facing category (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticTag {
    Accepted,
    Forwarded,
    CannotVerify,
    ServiceUnavailable,
    MailboxBusy,
    LocalError,
    Temporary,
    InsufficientStorage,
    UserNotFound,
    BlockedByBlacklist,
    BlockedBySpamhaus,
    Blocked,
    UserNotLocal,
    StorageExceeded,
    MailboxNameInvalid,
    Rejected,
    RelayDenied,
    AccessDenied,
    Timeout,
    DnsResolutionFailed,
    TlsHandshakeFailed,
    AllPortsFailed,
    Unclassified,
}

impl fmt::Display for DiagnosticTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of one `race()` call against a domain's preferred MX host (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub status: RecipientStatus,
    pub reply_code: i32,
    pub reply_text: String,
    pub diagnostic_tag: DiagnosticTag,
    pub mx_host: String,
    pub port: u16,
    pub tls: bool,
    pub transcript: Vec<TranscriptLine>,
    pub timestamp_ms: u64,
    pub error: Option<String>,
}

/// The outward, user-visible taxonomy (spec §4.7 step 10).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Valid,
    Invalid,
    CatchAll,
    Disposable,
    Blacklisted,
    Whitelisted,
    UserNotFound,
    Greylisted,
    RelayDenied,
    AccessDenied,
    Forwarded,
    CannotVerify,
    MailboxBusy,
    LocalError,
    InsufficientStorage,
    SyntaxError,
    Unknown,
}

impl Category {
    /// Matches `allByCategory`'s case-insensitive comparison against the
    /// outward string taxonomy (spec §4.8).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::CatchAll => "Catch-All",
            Self::Disposable => "Disposable",
            Self::Blacklisted => "Blacklisted",
            Self::Whitelisted => "Whitelisted",
            Self::UserNotFound => "UserNotFound",
            Self::Greylisted => "Greylisted",
            Self::RelayDenied => "RelayDenied",
            Self::AccessDenied => "AccessDenied",
            Self::Forwarded => "Forwarded",
            Self::CannotVerify => "CannotVerify",
            Self::MailboxBusy => "MailboxBusy",
            Self::LocalError => "LocalError",
            Self::InsufficientStorage => "InsufficientStorage",
            Self::SyntaxError => "SyntaxError",
            Self::Unknown => "Unknown",
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(query)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full probe result (spec §3, §4.7). Always produced — `categorize`
/// never returns an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub address: String,
    pub category: Category,
    pub catch_all: bool,
    pub smtp_code: i32,
    pub status: Option<RecipientStatus>,
    pub diagnostic_tag: Option<DiagnosticTag>,
    pub mail_host: Option<String>,
    pub transcript: Vec<TranscriptLine>,
    pub port_opened: bool,
    pub connection_successful: bool,
    pub errors: Vec<String>,
    pub timestamp_ms: u64,
}

impl Verdict {
    /// A freshly initialized verdict before any orchestration step has run
    /// (spec §4.7 step 1).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            category: Category::Unknown,
            catch_all: false,
            smtp_code: 0,
            status: None,
            diagnostic_tag: None,
            mail_host: None,
            transcript: Vec::new(),
            port_opened: false,
            connection_successful: false,
            errors: Vec::new(),
            timestamp_ms: now_ms(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matches_is_case_insensitive() {
        assert!(Category::CatchAll.matches("catch-all"));
        assert!(Category::CatchAll.matches("CATCH-ALL"));
        assert!(!Category::CatchAll.matches("valid"));
    }

    #[test]
    fn verdict_new_starts_unresolved() {
        let verdict = Verdict::new("alice@example.com");
        assert_eq!(verdict.category, Category::Unknown);
        assert!(verdict.status.is_none());
        assert!(verdict.transcript.is_empty());
    }
}
