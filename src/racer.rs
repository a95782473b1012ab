//! Multi-port racer (spec §4.4): races one SMTP session per candidate port
//! and returns as soon as any of them accepts the recipient.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use native_tls::TlsConnector;

use crate::classify::classify;
use crate::error::ProbeError;
use crate::smtp::{SessionOptions, SmtpSession};
use crate::verdict::{DiagnosticTag, RecipientStatus, SessionOutcome, now_ms};

/// Default candidate ports, in the order the spec prescribes (spec §6).
pub const DEFAULT_PORTS: &[u16] = &[25, 587, 465];

/// Runs one full RCPT dialog against `host:port` for `address`. Never
/// returns `Err`: every failure mode folds into an `UnknownFailure`
/// outcome carrying the error text, per the session runner's propagation
/// policy.
pub fn run_session(
    host: &str,
    port: u16,
    domain: &str,
    address: &str,
    options: &SessionOptions,
    connector: &TlsConnector,
    cancelled: &AtomicBool,
) -> SessionOutcome {
    let timestamp_ms = now_ms();
    let attempt = (|| -> Result<SessionOutcome, crate::error::ProbeError> {
        let mut session = SmtpSession::connect(host, port, options, connector, cancelled)?;
        session.read_banner()?;
        let ehlo = session.send_command(&format!("EHLO {}", options.helo_name))?;
        if ehlo.is_positive_completion()
            && !cancelled.load(Ordering::Relaxed)
            && ehlo.has_capability("STARTTLS")
            && !session.tls
        {
            session.starttls(connector, options)?;
            session.send_command(&format!("EHLO {}", options.helo_name))?;
        }

        session.send_command(&format!("MAIL FROM:<{}>", options.mail_from_for(domain)))?;
        let reply = session.send_command(&format!("RCPT TO:<{address}>"))?;
        session.quit();

        let (status, diagnostic_tag) = classify(&reply);
        Ok(SessionOutcome {
            status,
            reply_code: reply.code,
            reply_text: reply.text,
            diagnostic_tag,
            mx_host: host.to_string(),
            port,
            tls: session.tls,
            transcript: session.transcript,
            timestamp_ms,
            error: None,
        })
    })();

    attempt.unwrap_or_else(|err| {
        let (status, diagnostic_tag) = classify_error(&err);
        SessionOutcome {
            status,
            reply_code: -1,
            reply_text: String::new(),
            diagnostic_tag,
            mx_host: host.to_string(),
            port,
            tls: false,
            transcript: Vec::new(),
            timestamp_ms,
            error: Some(err.to_string()),
        }
    })
}

/// Maps a session-level failure onto the differentiated outcome spec §4.3's
/// failure-modes table requires, instead of collapsing everything into
/// `UnknownFailure`/`Unclassified`.
fn classify_error(err: &ProbeError) -> (RecipientStatus, DiagnosticTag) {
    match err {
        ProbeError::Tls { .. } => (RecipientStatus::TemporaryFailure, DiagnosticTag::TlsHandshakeFailed),
        ProbeError::Network { source, .. } if source.kind() == ErrorKind::TimedOut => {
            (RecipientStatus::TemporaryFailure, DiagnosticTag::Timeout)
        }
        ProbeError::Network { source, .. } if source.kind() == ErrorKind::NotFound => {
            (RecipientStatus::UnknownFailure, DiagnosticTag::DnsResolutionFailed)
        }
        ProbeError::Resolve { .. } | ProbeError::ResolverInit { .. } => {
            (RecipientStatus::UnknownFailure, DiagnosticTag::DnsResolutionFailed)
        }
        _ => (RecipientStatus::UnknownFailure, DiagnosticTag::Unclassified),
    }
}

/// Races `run_session` across `ports` concurrently (spec §4.4, §5). Returns
/// the first `Valid` outcome, or a deterministic fallback when none of the
/// ports accepted the recipient.
pub fn race(
    host: &str,
    domain: &str,
    address: &str,
    options: &SessionOptions,
    connector: &TlsConnector,
    ports: &[u16],
) -> SessionOutcome {
    let cancelled = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<SessionOutcome>();

    let outcomes = std::thread::scope(|scope| {
        for &port in ports {
            let tx = tx.clone();
            let cancelled = &cancelled;
            scope.spawn(move || {
                let outcome = run_session(host, port, domain, address, options, connector, cancelled);
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut collected = Vec::with_capacity(ports.len());
        let deadline = options.timeout + Duration::from_secs(2);
        while collected.len() < ports.len() {
            match rx.recv_timeout(deadline) {
                Ok(outcome) => {
                    let is_valid = outcome.status == RecipientStatus::Valid;
                    collected.push(outcome);
                    if is_valid {
                        cancelled.store(true, Ordering::Relaxed);
                    }
                }
                Err(_) => break,
            }
        }
        collected
    });

    pick_winner(outcomes, host)
}

/// Selects the race's result: first `Valid` wins; otherwise the first
/// completed outcome with a non-negative reply code (a server that said
/// something); otherwise the first `TemporaryFailure` (e.g. every port
/// timed out, spec §8 "all ports time out → `Unknown`"); otherwise
/// `UnknownFailure`/`AllPortsFailed` (spec §4.4).
fn pick_winner(outcomes: Vec<SessionOutcome>, host: &str) -> SessionOutcome {
    if let Some(valid) = outcomes.iter().find(|o| o.status == RecipientStatus::Valid) {
        return valid.clone();
    }
    if let Some(reachable) = outcomes.iter().find(|o| o.reply_code >= 0) {
        return reachable.clone();
    }
    if let Some(transient) = outcomes
        .iter()
        .find(|o| o.status == RecipientStatus::TemporaryFailure)
    {
        return transient.clone();
    }

    SessionOutcome {
        status: RecipientStatus::UnknownFailure,
        reply_code: -1,
        reply_text: String::new(),
        diagnostic_tag: DiagnosticTag::AllPortsFailed,
        mx_host: host.to_string(),
        port: 0,
        tls: false,
        transcript: Vec::new(),
        timestamp_ms: now_ms(),
        error: Some("all candidate ports failed".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: RecipientStatus, reply_code: i32) -> SessionOutcome {
        SessionOutcome {
            status,
            reply_code,
            reply_text: String::new(),
            diagnostic_tag: DiagnosticTag::Unclassified,
            mx_host: "mx.example.com".to_string(),
            port: 25,
            tls: false,
            transcript: Vec::new(),
            timestamp_ms: 0,
            error: None,
        }
    }

    #[test]
    fn prefers_valid_over_reachable() {
        let outcomes = vec![
            outcome(RecipientStatus::TemporaryFailure, 450),
            outcome(RecipientStatus::Valid, 250),
        ];
        let winner = pick_winner(outcomes, "mx.example.com");
        assert_eq!(winner.status, RecipientStatus::Valid);
    }

    #[test]
    fn falls_back_to_first_reachable() {
        let outcomes = vec![
            outcome(RecipientStatus::UnknownFailure, -1),
            outcome(RecipientStatus::TemporaryFailure, 450),
        ];
        let winner = pick_winner(outcomes, "mx.example.com");
        assert_eq!(winner.reply_code, 450);
    }

    #[test]
    fn reports_all_ports_failed_when_nothing_reachable() {
        let winner = pick_winner(Vec::new(), "mx.example.com");
        assert_eq!(winner.diagnostic_tag, DiagnosticTag::AllPortsFailed);
    }

    #[test]
    fn falls_back_to_temporary_failure_when_every_port_times_out() {
        let outcomes = vec![
            outcome(RecipientStatus::TemporaryFailure, -1),
            outcome(RecipientStatus::TemporaryFailure, -1),
        ];
        let winner = pick_winner(outcomes, "mx.example.com");
        assert_eq!(winner.status, RecipientStatus::TemporaryFailure);
    }

    #[test]
    fn classify_error_maps_timeout_to_temporary_failure() {
        let err = ProbeError::network(
            "mx.example.com",
            std::io::Error::new(ErrorKind::TimedOut, "read timed out"),
        );
        assert_eq!(
            classify_error(&err),
            (RecipientStatus::TemporaryFailure, DiagnosticTag::Timeout)
        );
    }

    #[test]
    fn classify_error_maps_dns_failure_to_unknown_failure() {
        let err = ProbeError::network(
            "mx.example.com",
            std::io::Error::new(ErrorKind::NotFound, "no address resolved"),
        );
        assert_eq!(
            classify_error(&err),
            (RecipientStatus::UnknownFailure, DiagnosticTag::DnsResolutionFailed)
        );
    }
}
