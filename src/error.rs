//! Error taxonomy (spec §7).
//!
//! The session runner and racer never propagate these to the orchestrator
//! as `Result::Err` — they fold them into a `SessionOutcome` carrying
//! `UnknownFailure` plus a rendered message. `ProbeError` is exposed for the
//! lower-level building blocks (`resolve_mx`, `run_session`) that callers may
//! use directly and that do want a typed error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid address: {reasons:?}")]
    Syntax { reasons: Vec<String> },

    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },

    #[error("DNS lookup failed: {source}")]
    Resolve {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },

    #[error("no mail servers for domain")]
    NoMailServers,

    #[error("connection to {host} failed: {source}")]
    Network {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server rejected with permanent failure {code}: {text}")]
    ServerPermanent { code: u16, text: String },

    #[error("server reported transient failure {code}: {text}")]
    ServerTransient { code: u16, text: String },

    #[error("server policy refusal: {0}")]
    Policy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProbeError {
    pub fn syntax(reasons: Vec<String>) -> Self {
        Self::Syntax { reasons }
    }

    pub fn network(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::Network {
            host: host.into(),
            source,
        }
    }
}
