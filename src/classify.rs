//! Response classifier (spec §4.5): maps a parsed SMTP reply onto the
//! internal `(RecipientStatus, DiagnosticTag)` pair.

use crate::smtp::SmtpReply;
use crate::verdict::{DiagnosticTag, RecipientStatus};

pub fn classify(reply: &SmtpReply) -> (RecipientStatus, DiagnosticTag) {
    let text = reply.text.to_ascii_lowercase();

    if let Some(enhanced) = reply.enhanced.as_deref() {
        match enhanced {
            "5.1.1" | "5.1.0" => return (RecipientStatus::UserNotFound, tag_for(reply, &text)),
            "4.2.1" | "4.3.0" | "4.4.7" => {
                return (RecipientStatus::TemporaryFailure, tag_for(reply, &text));
            }
            "5.7.1" => return (RecipientStatus::Blacklisted, DiagnosticTag::BlockedByBlacklist),
            _ => {}
        }
    }

    match reply.code {
        250..=259 => (RecipientStatus::Valid, tag_for(reply, &text)),
        252 => (RecipientStatus::TemporaryFailure, DiagnosticTag::CannotVerify),
        400..=499 => (RecipientStatus::TemporaryFailure, tag_for(reply, &text)),
        550 => (RecipientStatus::UserNotFound, tag_for(reply, &text)),
        _ if is_user_not_found_text(&text) => {
            (RecipientStatus::UserNotFound, DiagnosticTag::UserNotFound)
        }
        _ if is_blacklist_text(&text) => {
            (RecipientStatus::Blacklisted, tag_for(reply, &text))
        }
        500..=599 => (RecipientStatus::UnknownFailure, tag_for(reply, &text)),
        _ => (RecipientStatus::UnknownFailure, DiagnosticTag::Unclassified),
    }
}

fn is_user_not_found_text(text: &str) -> bool {
    text.contains("user unknown")
        || text.contains("no such user")
        || text.contains("recipient address rejected")
}

fn is_blacklist_text(text: &str) -> bool {
    text.contains("blacklist") || text.contains("spamhaus") || text.contains("blocked")
}

fn tag_for(reply: &SmtpReply, text: &str) -> DiagnosticTag {
    if text.contains("relay access denied") {
        return DiagnosticTag::RelayDenied;
    }
    if text.contains("not permitted") {
        return DiagnosticTag::AccessDenied;
    }

    match reply.code {
        250 => DiagnosticTag::Accepted,
        251 => DiagnosticTag::Forwarded,
        252 => DiagnosticTag::CannotVerify,
        421 => DiagnosticTag::ServiceUnavailable,
        450 => DiagnosticTag::MailboxBusy,
        451 => {
            if text.contains("temporar") {
                DiagnosticTag::Temporary
            } else {
                DiagnosticTag::LocalError
            }
        }
        452 => DiagnosticTag::InsufficientStorage,
        550 => {
            if text.contains("spamhaus") {
                DiagnosticTag::BlockedBySpamhaus
            } else if text.contains("blacklist") {
                DiagnosticTag::BlockedByBlacklist
            } else if text.contains("blocked") {
                DiagnosticTag::Blocked
            } else {
                DiagnosticTag::UserNotFound
            }
        }
        551 => DiagnosticTag::UserNotLocal,
        552 => DiagnosticTag::StorageExceeded,
        553 => DiagnosticTag::MailboxNameInvalid,
        554 => DiagnosticTag::Rejected,
        200..=299 => DiagnosticTag::Accepted,
        _ if is_blacklist_text(text) => DiagnosticTag::BlockedByBlacklist,
        _ => DiagnosticTag::Unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reply(code: i32, enhanced: Option<&str>, text: &str) -> SmtpReply {
        SmtpReply {
            code,
            enhanced: enhanced.map(str::to_string),
            text: text.to_string(),
        }
    }

    #[test]
    fn accepts_250_as_valid() {
        let (status, tag) = classify(&reply(250, None, "2.1.5 OK"));
        assert_eq!(status, RecipientStatus::Valid);
        assert_eq!(tag, DiagnosticTag::Accepted);
    }

    #[test]
    fn enhanced_code_takes_precedence_over_number() {
        let (status, _) = classify(&reply(550, Some("5.1.1"), "mailbox unavailable"));
        assert_eq!(status, RecipientStatus::UserNotFound);
    }

    #[test]
    fn enhanced_5_7_1_is_blacklisted() {
        let (status, tag) = classify(&reply(550, Some("5.7.1"), "message rejected"));
        assert_eq!(status, RecipientStatus::Blacklisted);
        assert_eq!(tag, DiagnosticTag::BlockedByBlacklist);
    }

    #[test]
    fn text_fallback_detects_user_not_found() {
        let (status, _) = classify(&reply(553, None, "No such user here"));
        assert_eq!(status, RecipientStatus::UserNotFound);
    }

    #[test]
    fn text_fallback_detects_spamhaus_block() {
        let (status, tag) = classify(&reply(550, None, "blocked by spamhaus, see zen.spamhaus.org"));
        assert_eq!(status, RecipientStatus::Blacklisted);
        assert_eq!(tag, DiagnosticTag::BlockedBySpamhaus);
    }

    #[test]
    fn four_xx_is_temporary_failure() {
        let (status, _) = classify(&reply(450, None, "mailbox busy"));
        assert_eq!(status, RecipientStatus::TemporaryFailure);
    }

    #[test]
    fn unmatched_5xx_is_unknown_failure() {
        let (status, tag) = classify(&reply(521, None, "unrecognized error"));
        assert_eq!(status, RecipientStatus::UnknownFailure);
        assert_eq!(tag, DiagnosticTag::Unclassified);
    }

    #[test]
    fn relay_access_denied_text_sets_tag() {
        let (_, tag) = classify(&reply(554, None, "Relay access denied"));
        assert_eq!(tag, DiagnosticTag::RelayDenied);
    }

    proptest! {
        /// `classify` is a pure function: same inputs, same outputs (spec §8).
        #[test]
        fn classify_is_deterministic(
            code in 200i32..600,
            text in "[a-zA-Z ]{0,40}",
        ) {
            let first = classify(&reply(code, None, &text));
            let second = classify(&reply(code, None, &text));
            prop_assert_eq!(first, second);
        }
    }
}
