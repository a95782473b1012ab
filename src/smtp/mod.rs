//! Single-session SMTP dialog (spec §4.3): greeting, EHLO, opportunistic
//! STARTTLS or implicit TLS, MAIL FROM, RCPT TO.

mod options;
mod session;
mod types;

pub use options::SessionOptions;
pub use session::{IMPLICIT_TLS_PORTS, SmtpSession};
pub use types::{Direction, SmtpReply, TranscriptLine};
