use serde::{Deserialize, Serialize};

/// Wire direction of a recorded transcript line (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `<<` — sent by us.
    Out,
    /// `>>` — received from the server.
    In,
}

/// One line of the forensic wire transcript, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub direction: Direction,
    pub payload: String,
}

impl TranscriptLine {
    pub fn out(payload: impl Into<String>) -> Self {
        Self {
            direction: Direction::Out,
            payload: payload.into(),
        }
    }

    pub fn inbound(payload: impl Into<String>) -> Self {
        Self {
            direction: Direction::In,
            payload: payload.into(),
        }
    }
}

/// A parsed (possibly multi-line) SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpReply {
    /// The last line's three-digit code, or `-1` if the reply couldn't be
    /// parsed at all (connection error before any bytes arrived).
    pub code: i32,
    /// Enhanced status code (`x.y.z`, RFC 3463), if the reply text carries one.
    pub enhanced: Option<String>,
    /// Full raw multi-line reply text, newline-joined.
    pub text: String,
}

impl SmtpReply {
    pub fn disconnected() -> Self {
        Self {
            code: -1,
            enhanced: None,
            text: String::new(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn has_capability(&self, token: &str) -> bool {
        self.text
            .lines()
            .any(|line| line.split_whitespace().next().is_some_and(|first| first.eq_ignore_ascii_case(token)))
    }
}
