#![forbid(unsafe_code)]
//! mailprobe — recipient-probing engine: MX resolution, concurrent SMTP
//! RCPT dialog, catch-all detection and deliverability classification,
//! backed by a TTL result cache.

pub mod address;
pub mod cache;
pub mod catchall;
pub mod classify;
pub mod config;
pub mod domain_lists;
pub mod error;
pub mod orchestrator;
pub mod racer;
pub mod resolver;
pub mod smtp;
pub mod util;
pub mod verdict;

pub use address::{ParsedAddress, parse};
pub use cache::ResultCache;
pub use config::ProbeConfig;
pub use domain_lists::DomainLists;
pub use error::ProbeError;
pub use orchestrator::ProbeOrchestrator;
pub use racer::{DEFAULT_PORTS, race, run_session};
pub use resolver::{MxCandidate, MxLookup, build_resolver, resolve_mx};
pub use smtp::{SessionOptions, SmtpSession};
pub use verdict::{Category, DiagnosticTag, RecipientStatus, SessionOutcome, Verdict};
