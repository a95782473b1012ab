//! Probe orchestrator (spec §4.7): the single `categorize` entry point,
//! sequencing syntax, domain lists, MX resolution, catch-all detection and
//! the SMTP race into one `Verdict`. Never returns `Err`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use native_tls::TlsConnector;
use tracing::{info, warn};
use trust_dns_resolver::Resolver;

use crate::address;
use crate::catchall::is_catch_all;
use crate::domain_lists::DomainLists;
use crate::racer::{self, DEFAULT_PORTS};
use crate::resolver::{MxLookup, resolve_mx};
use crate::smtp::SessionOptions;
use crate::verdict::{Category, DiagnosticTag, RecipientStatus, Verdict};

const RETRY_BACKOFFS: &[Duration] = &[Duration::from_secs(1), Duration::from_secs(2)];

/// Owns the read-only collaborators a probe needs: the system resolver, the
/// domain lists, session options and the TLS connector. Constructed once and
/// shared (typically behind an `Arc`) across every `categorize` call.
pub struct ProbeOrchestrator {
    resolver: Resolver,
    domain_lists: Arc<DomainLists>,
    options: SessionOptions,
    connector: TlsConnector,
    ports: Vec<u16>,
}

impl ProbeOrchestrator {
    pub fn new(
        resolver: Resolver,
        domain_lists: Arc<DomainLists>,
        options: SessionOptions,
    ) -> Result<Self, native_tls::Error> {
        let connector = TlsConnector::new()?;
        Ok(Self {
            resolver,
            domain_lists,
            options,
            connector,
            ports: DEFAULT_PORTS.to_vec(),
        })
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Runs the full ten-step probe sequence for `address` (spec §4.7).
    pub fn categorize(&self, raw_address: &str) -> Verdict {
        let verdict = Verdict::new(raw_address);

        let parsed = match address::parse(raw_address) {
            Some(parsed) => parsed,
            None => return verdict.with_category(Category::Invalid),
        };
        let domain = &parsed.domain;

        if self.domain_lists.is_whitelisted(domain) {
            return verdict.with_category(Category::Whitelisted);
        }
        if self.domain_lists.is_disposable(domain) {
            return verdict.with_category(Category::Disposable);
        }
        if self.domain_lists.is_blacklisted(domain) {
            return verdict.with_category(Category::Blacklisted);
        }

        let candidates = match resolve_mx(&self.resolver, domain) {
            Ok(MxLookup::Candidates(candidates)) => candidates,
            Ok(MxLookup::Empty) => return verdict.with_category(Category::Invalid),
            Err(err) => {
                warn!(%domain, error = %err, "MX resolution failed");
                return verdict
                    .with_category(Category::Unknown)
                    .with_error(err.to_string());
            }
        };
        let host = &candidates[0].host;

        let cancelled = AtomicBool::new(false);
        let catch_all = match is_catch_all(
            host,
            25,
            domain,
            &parsed.original,
            &self.options,
            &self.connector,
            &cancelled,
        ) {
            Ok(result) => result,
            Err(err) => {
                warn!(%host, error = %err, "catch-all probe failed");
                return verdict
                    .with_category(Category::Unknown)
                    .with_error(err.to_string());
            }
        };
        if catch_all {
            let mut verdict = verdict.with_category(Category::CatchAll);
            verdict.catch_all = true;
            verdict.mail_host = Some(host.clone());
            return verdict;
        }

        let outcome = self.race_with_retry(host, domain, &parsed.original);

        let mut verdict = verdict;
        verdict.mail_host = Some(outcome.mx_host.clone());
        verdict.transcript = outcome.transcript.clone();
        verdict.smtp_code = outcome.reply_code;
        verdict.status = Some(outcome.status);
        verdict.diagnostic_tag = Some(outcome.diagnostic_tag);
        verdict.port_opened = outcome.reply_code >= 0;
        verdict.connection_successful = outcome.status != RecipientStatus::UnknownFailure;
        if let Some(error) = &outcome.error {
            verdict.errors.push(error.clone());
        }

        if mentions_blacklist(&outcome.error, &outcome.reply_text) {
            return verdict.with_category(Category::Blacklisted);
        }

        let category = category_for(outcome.status, outcome.diagnostic_tag);
        info!(address = %parsed.original, ?category, "probe complete");
        verdict.with_category(category)
    }

    /// Races the candidate ports, retrying once on `TemporaryFailure` with a
    /// 1s-then-2s backoff (resolves the spec's retry MAY clause).
    fn race_with_retry(
        &self,
        host: &str,
        domain: &str,
        address: &str,
    ) -> crate::verdict::SessionOutcome {
        let mut outcome = racer::race(host, domain, address, &self.options, &self.connector, &self.ports);
        for backoff in RETRY_BACKOFFS {
            if outcome.status != RecipientStatus::TemporaryFailure {
                break;
            }
            thread::sleep(*backoff);
            outcome = racer::race(host, domain, address, &self.options, &self.connector, &self.ports);
        }
        outcome
    }
}

fn mentions_blacklist(error: &Option<String>, reply_text: &str) -> bool {
    let haystacks = [error.as_deref().unwrap_or(""), reply_text];
    haystacks.iter().any(|text| {
        let lower = text.to_ascii_lowercase();
        lower.contains("550 5.7.1") || lower.contains("blocked") || lower.contains("spamhaus")
    })
}

fn category_for(status: RecipientStatus, tag: DiagnosticTag) -> Category {
    use DiagnosticTag::*;

    match tag {
        Accepted => Category::Valid,
        Forwarded => Category::Forwarded,
        CannotVerify => Category::CannotVerify,
        MailboxBusy => Category::MailboxBusy,
        LocalError => Category::LocalError,
        InsufficientStorage => Category::InsufficientStorage,
        UserNotFound => Category::UserNotFound,
        BlockedByBlacklist | BlockedBySpamhaus | Blocked => Category::Blacklisted,
        RelayDenied => Category::RelayDenied,
        AccessDenied => Category::AccessDenied,
        _ => default_category(status),
    }
}

fn default_category(status: RecipientStatus) -> Category {
    match status {
        RecipientStatus::Valid => Category::Valid,
        RecipientStatus::UserNotFound => Category::UserNotFound,
        RecipientStatus::Blacklisted => Category::Blacklisted,
        RecipientStatus::TemporaryFailure => Category::Unknown,
        RecipientStatus::UnknownFailure => Category::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_category_maps_temporary_to_unknown() {
        assert_eq!(default_category(RecipientStatus::TemporaryFailure), Category::Unknown);
    }

    #[test]
    fn default_category_maps_unknown_failure_to_invalid() {
        assert_eq!(default_category(RecipientStatus::UnknownFailure), Category::Invalid);
    }

    #[test]
    fn category_for_blocked_tag_is_blacklisted() {
        assert_eq!(
            category_for(RecipientStatus::Blacklisted, DiagnosticTag::BlockedBySpamhaus),
            Category::Blacklisted
        );
    }

    #[test]
    fn mentions_blacklist_matches_enhanced_code_text() {
        assert!(mentions_blacklist(&None, "550 5.7.1 message rejected due to policy"));
    }
}
