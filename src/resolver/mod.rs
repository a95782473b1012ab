//! MX resolution with A-record fallback (spec §4.2).

mod types;

pub use types::MxCandidate;

use trust_dns_resolver::Resolver;
use trust_dns_resolver::error::ResolveErrorKind;

use crate::error::ProbeError;

/// Outcome of [`resolve_mx`]: either a preference-sorted candidate list, or
/// an explicit "nothing usable" signal distinct from a hard resolver error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxLookup {
    Candidates(Vec<MxCandidate>),
    Empty,
}

/// Looks up MX records for `domain`, falling back to the domain's own A
/// record (preference 0) when no MX record exists, per spec §4.2.
pub fn resolve_mx(resolver: &Resolver, domain: &str) -> Result<MxLookup, ProbeError> {
    let mut candidates = lookup_mx(resolver, domain)?;

    if candidates.is_empty() {
        if has_a_record(resolver, domain) {
            candidates.push(MxCandidate::new(domain.to_string(), 0));
        } else {
            return Ok(MxLookup::Empty);
        }
    }

    candidates.sort_by_key(|c| c.preference);
    Ok(MxLookup::Candidates(candidates))
}

fn lookup_mx(resolver: &Resolver, domain: &str) -> Result<Vec<MxCandidate>, ProbeError> {
    match resolver.mx_lookup(domain) {
        Ok(lookup) => Ok(lookup
            .iter()
            .map(|record| {
                let host = record
                    .exchange()
                    .to_utf8()
                    .trim_end_matches('.')
                    .to_ascii_lowercase();
                MxCandidate::new(host, record.preference())
            })
            .collect()),
        Err(err) => match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
            _ => Err(ProbeError::Resolve { source: err }),
        },
    }
}

fn has_a_record(resolver: &Resolver, domain: &str) -> bool {
    resolver
        .lookup_ip(domain)
        .map(|lookup| lookup.iter().next().is_some())
        .unwrap_or(false)
}

/// Builds a resolver from the host's system DNS configuration.
pub fn build_resolver() -> Result<Resolver, ProbeError> {
    Resolver::from_system_conf().map_err(|source| ProbeError::ResolverInit { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidate_list_sorts_trivially() {
        let mut candidates = vec![
            MxCandidate::new("mx2.example.com", 20),
            MxCandidate::new("mx1.example.com", 10),
        ];
        candidates.sort_by_key(|c| c.preference);
        assert_eq!(candidates[0].host, "mx1.example.com");
    }
}
