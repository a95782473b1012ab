use std::time::Duration;

/// Knobs for [`super::session::SmtpSession`] (spec §6 `smtp.timeout.ms`, `helo.name`, `mail.from`).
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub helo_name: String,
    pub mail_from: String,
    pub timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            helo_name: "mailprobe.localdomain".to_string(),
            mail_from: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl SessionOptions {
    /// The `MAIL FROM` identity, falling back to `postmaster@<domain>`.
    pub fn mail_from_for(&self, domain: &str) -> String {
        if self.mail_from.is_empty() {
            format!("postmaster@{domain}")
        } else {
            self.mail_from.clone()
        }
    }
}
