//! Domain-list classifier (spec §4.1): whitelist/disposable/blacklist
//! membership tests, checked in that order by the orchestrator.

use std::collections::HashSet;

/// Three immutable, lowercased domain sets, loaded once at startup and
/// shared read-only across every concurrent probe.
#[derive(Debug, Clone, Default)]
pub struct DomainLists {
    whitelist: HashSet<String>,
    disposable: HashSet<String>,
    blacklist: HashSet<String>,
}

impl DomainLists {
    pub fn new<I, J, K>(whitelist: I, disposable: J, blacklist: K) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
        K: IntoIterator<Item = String>,
    {
        Self {
            whitelist: normalize_set(whitelist),
            disposable: normalize_set(disposable),
            blacklist: normalize_set(blacklist),
        }
    }

    pub fn is_whitelisted(&self, domain: &str) -> bool {
        self.whitelist.contains(&domain.to_ascii_lowercase())
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        self.disposable.contains(&domain.to_ascii_lowercase())
    }

    pub fn is_blacklisted(&self, domain: &str) -> bool {
        self.blacklist.contains(&domain.to_ascii_lowercase())
    }
}

fn normalize_set<I: IntoIterator<Item = String>>(domains: I) -> HashSet<String> {
    domains
        .into_iter()
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lists() -> DomainLists {
        DomainLists::new(
            vec!["trusted.example".to_string()],
            vec!["mailinator.com".to_string()],
            vec!["spamtrap.example".to_string()],
        )
    }

    #[test]
    fn membership_is_case_insensitive() {
        let lists = lists();
        assert!(lists.is_whitelisted("Trusted.Example"));
        assert!(lists.is_disposable("MAILINATOR.COM"));
        assert!(lists.is_blacklisted("spamtrap.example"));
    }

    #[test]
    fn unknown_domain_matches_nothing() {
        let lists = lists();
        assert!(!lists.is_whitelisted("other.example"));
        assert!(!lists.is_disposable("other.example"));
        assert!(!lists.is_blacklisted("other.example"));
    }
}
