//! Catch-all probe (spec §4.6): does this domain accept every local-part?

use std::sync::atomic::AtomicBool;

use native_tls::TlsConnector;

use crate::classify::classify;
use crate::error::ProbeError;
use crate::smtp::{SessionOptions, SmtpSession};
use crate::util::random_local_part;
use crate::verdict::RecipientStatus;

/// Opens one session against `host:port` and probes both a synthetic,
/// guaranteed-nonexistent local-part and the real target address. The
/// domain is catch-all only if both are accepted (resolves the spec's MAY
/// clause to always double-confirm, since the session is already open).
pub fn is_catch_all(
    host: &str,
    port: u16,
    domain: &str,
    target_address: &str,
    options: &SessionOptions,
    connector: &TlsConnector,
    cancelled: &AtomicBool,
) -> Result<bool, ProbeError> {
    let mut session = SmtpSession::connect(host, port, options, connector, cancelled)?;
    session.read_banner()?;
    let ehlo = session.send_command(&format!("EHLO {}", options.helo_name))?;
    if ehlo.is_positive_completion() && ehlo.has_capability("STARTTLS") && !session.tls {
        session.starttls(connector, options)?;
        session.send_command(&format!("EHLO {}", options.helo_name))?;
    }
    session.send_command(&format!("MAIL FROM:<{}>", options.mail_from_for(domain)))?;

    let probe_local = random_local_part(16);
    let probe_reply =
        session.send_command(&format!("RCPT TO:<{probe_local}@{domain}>"))?;
    let (probe_status, _) = classify(&probe_reply);
    if probe_status != RecipientStatus::Valid {
        session.quit();
        return Ok(false);
    }

    let target_reply = session.send_command(&format!("RCPT TO:<{target_address}>"))?;
    let (target_status, _) = classify(&target_reply);
    session.quit();

    Ok(target_status == RecipientStatus::Valid)
}
