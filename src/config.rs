//! Ambient configuration (spec §6): every tunable knob the probe engine
//! recognizes, loadable from the process environment or constructed
//! programmatically with sensible defaults.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TTL;
use crate::racer::DEFAULT_PORTS;
use crate::smtp::SessionOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// `smtp.timeout.ms` — per-socket read/connect timeout.
    pub smtp_timeout_ms: u64,
    /// `helo.name` — identity announced in EHLO.
    pub helo_name: String,
    /// `mail.from` — MAIL FROM identity; empty falls back to
    /// `postmaster@<domain>` at probe time.
    pub mail_from: String,
    /// Candidate port list, raced in order (default `[25, 587, 465]`).
    pub ports: Vec<u16>,
    /// Cache TTL in seconds (default 30 days).
    pub cache_ttl_secs: u64,
    /// `email.validation.interval.ms` — refresh driver cadence; stored here
    /// only as the default the refresh collaborator reads.
    pub validation_interval_ms: u64,
    pub whitelist_domains: Vec<String>,
    pub disposable_domains: Vec<String>,
    pub blacklist_domains: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            smtp_timeout_ms: 15_000,
            helo_name: "mailprobe.localdomain".to_string(),
            mail_from: String::new(),
            ports: DEFAULT_PORTS.to_vec(),
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            validation_interval_ms: 60_000,
            whitelist_domains: Vec::new(),
            disposable_domains: Vec::new(),
            blacklist_domains: Vec::new(),
        }
    }
}

impl ProbeConfig {
    /// Loads overrides from `MAILPROBE_*` environment variables, falling
    /// back to [`ProbeConfig::default`] for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(ms) = read_u64("MAILPROBE_SMTP_TIMEOUT_MS")? {
            config.smtp_timeout_ms = ms;
        }
        if let Ok(helo) = env::var("MAILPROBE_HELO_NAME") {
            config.helo_name = helo;
        }
        if let Ok(from) = env::var("MAILPROBE_MAIL_FROM") {
            config.mail_from = from;
        }
        if let Some(ports) = read_csv("MAILPROBE_PORTS") {
            config.ports = ports
                .iter()
                .map(|p| p.parse::<u16>())
                .collect::<Result<Vec<_>, _>>()
                .context("MAILPROBE_PORTS must be a comma-separated list of u16 ports")?;
        }
        if let Some(secs) = read_u64("MAILPROBE_CACHE_TTL_SECS")? {
            config.cache_ttl_secs = secs;
        }
        if let Some(domains) = read_csv("MAILPROBE_WHITELIST_DOMAINS") {
            config.whitelist_domains = domains;
        }
        if let Some(domains) = read_csv("MAILPROBE_DISPOSABLE_DOMAINS") {
            config.disposable_domains = domains;
        }
        if let Some(domains) = read_csv("MAILPROBE_BLACKLIST_DOMAINS") {
            config.blacklist_domains = domains;
        }

        Ok(config)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            helo_name: self.helo_name.clone(),
            mail_from: self.mail_from.clone(),
            timeout: Duration::from_millis(self.smtp_timeout_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn read_u64(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("{key} is not valid unicode")),
    }
}

fn read_csv(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_match_spec() {
        assert_eq!(ProbeConfig::default().ports, vec![25, 587, 465]);
    }

    #[test]
    fn session_options_reflect_timeout_override() {
        let mut config = ProbeConfig::default();
        config.smtp_timeout_ms = 5_000;
        assert_eq!(config.session_options().timeout, Duration::from_millis(5_000));
    }
}
