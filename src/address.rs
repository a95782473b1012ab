//! Address parsing for the probe orchestrator (spec §4.7 steps 2-3): one
//! yes/no syntax gate plus a normalized, IDNA-folded domain.

use std::sync::LazyLock;

use regex::Regex;

/// `^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$`, case-insensitive, per spec §4.7.
static SYNTAX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("static regex is valid")
});

/// A syntactically accepted address, split and folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub original: String,
    pub local: String,
    /// Lowercased, IDNA-converted-to-ASCII domain.
    pub domain: String,
}

/// Checks the address against the canonical pattern and extracts the domain.
///
/// Returns `None` if the address doesn't match the pattern, the domain is
/// missing/empty, or the domain fails IDNA conversion — all three collapse
/// to the orchestrator's `Invalid` category.
pub fn parse(raw: &str) -> Option<ParsedAddress> {
    let trimmed = raw.trim();
    if !SYNTAX_RE.is_match(trimmed) {
        return None;
    }

    let at = trimmed.rfind('@')?;
    let local = &trimmed[..at];
    let raw_domain = &trimmed[at + 1..];
    if raw_domain.is_empty() {
        return None;
    }

    let ascii_domain = idna::domain_to_ascii(raw_domain).ok()?;
    if ascii_domain.is_empty() {
        return None;
    }

    Some(ParsedAddress {
        original: trimmed.to_string(),
        local: local.to_string(),
        domain: ascii_domain.to_lowercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank() {
        assert!(parse(" ").is_none());
    }

    #[test]
    fn rejects_missing_at() {
        assert!(parse("not-an-email").is_none());
    }

    #[test]
    fn accepts_plain_address() {
        let p = parse("Alice.Smith+tag@Example.COM").unwrap();
        assert_eq!(p.local, "Alice.Smith+tag");
        assert_eq!(p.domain, "example.com");
    }

    #[test]
    fn folds_idn_domain() {
        let p = parse("user@xn--nxasmq6b.example").unwrap();
        assert_eq!(p.domain, "xn--nxasmq6b.example");
    }

    #[test]
    fn is_idempotent_under_repeated_folding() {
        let once = parse("user@EXAMPLE.com").unwrap();
        let twice = parse(&format!("user@{}", once.domain)).unwrap();
        assert_eq!(once.domain, twice.domain);
    }
}
