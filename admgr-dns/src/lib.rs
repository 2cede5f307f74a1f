//! DNS-01 delegation verifier.
//!
//! Confirms that `_acme-challenge.<base(d)>` CNAMEs to the acme-dns
//! account's `full_domain`, so acme-dns can answer the ACME server's
//! DNS-01 lookup without this tool ever touching the zone that hosts the
//! certificate's own domains.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use admgr_core::Error;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const PROPAGATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of comparing a resolved CNAME against the expected delegation
/// target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Match,
    Mismatch(String),
    Missing,
}

/// Polymorphic over the resolver so tests can inject a fixed name→CNAME
/// table instead of issuing real DNS queries.
#[async_trait]
pub trait DnsVerifier: Send + Sync {
    async fn verify(&self, challenge_name: &str, expected_target: &str) -> Result<VerifyOutcome, Error>;
}

/// Strips at most one trailing dot before comparing resolved and expected
/// targets.
fn strip_trailing_dot(s: &str) -> &str {
    s.strip_suffix('.').unwrap_or(s)
}

/// Resolver-backed implementation using `hickory-resolver`.
pub struct HickoryDnsVerifier {
    resolver: TokioAsyncResolver,
}

impl HickoryDnsVerifier {
    /// Builds a verifier using the platform's default recursive resolver.
    pub fn system() -> Result<Self, Error> {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Ok(Self { resolver })
    }

    /// Builds a verifier that queries `addr` directly, bypassing the
    /// system resolver entirely. Appends the default DNS port (53) if
    /// `addr` carries none.
    pub fn with_resolver_override(addr: &str) -> Result<Self, Error> {
        let socket_addr = parse_resolver_addr(addr)?;
        let group = NameServerConfigGroup::from_ips_clear(&[socket_addr.ip()], socket_addr.port(), true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());
        Ok(Self { resolver })
    }
}

impl HickoryDnsVerifier {
    /// Polls `name` for a TXT record equal to `expected_value`, sleeping
    /// `PROPAGATION_POLL_INTERVAL` between attempts, until `timeout`
    /// elapses. Used to wait out real-world DNS propagation of a
    /// DNS-01 proof before asking the ACME server to validate it.
    pub async fn wait_for_txt_propagation(
        &self,
        name: &str,
        expected_value: &str,
        timeout: Duration,
    ) -> Result<(), Error> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let found = match self.resolver.txt_lookup(name).await {
                Ok(lookup) => lookup
                    .iter()
                    .any(|txt| txt.txt_data().iter().any(|chunk| chunk.as_ref() == expected_value.as_bytes())),
                Err(_) => false,
            };
            if found {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::dns(
                    "dns_wait_for_txt_propagation",
                    "TXT record did not propagate before the challenge timeout",
                )
                .with_resource(name.to_string()));
            }
            tokio::time::sleep(PROPAGATION_POLL_INTERVAL).await;
        }
    }
}

fn parse_resolver_addr(addr: &str) -> Result<SocketAddr, Error> {
    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return Ok(sock);
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 53));
    }
    Err(Error::config("dns_resolver_override", format!("invalid resolver address: {addr}")))
}

#[async_trait]
impl DnsVerifier for HickoryDnsVerifier {
    async fn verify(&self, challenge_name: &str, expected_target: &str) -> Result<VerifyOutcome, Error> {
        let lookup = tokio::time::timeout(LOOKUP_TIMEOUT, self.resolver.cname_lookup(challenge_name)).await;

        let lookup = match lookup {
            Err(_) => {
                return Err(Error::dns("dns_verify", "CNAME lookup timed out after 5s")
                    .with_resource(challenge_name.to_string()))
            }
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                if is_no_such_host(&e) {
                    return Ok(VerifyOutcome::Missing);
                }
                return Err(Error::dns("dns_verify", format!("CNAME lookup failed: {e}"))
                    .with_resource(challenge_name.to_string()));
            }
        };

        let Some(found) = lookup.iter().next() else {
            return Ok(VerifyOutcome::Missing);
        };
        let found = found.to_string();
        let found_stripped = strip_trailing_dot(&found);
        let expected_stripped = strip_trailing_dot(expected_target);

        if found_stripped.eq_ignore_ascii_case(expected_stripped) {
            Ok(VerifyOutcome::Match)
        } else {
            Ok(VerifyOutcome::Mismatch(found_stripped.to_string()))
        }
    }
}

fn is_no_such_host(err: &hickory_resolver::error::ResolveError) -> bool {
    use hickory_resolver::error::ResolveErrorKind;
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

/// Fixed name→CNAME table for tests, replacing a live resolver entirely.
pub struct MockDnsVerifier {
    records: HashMap<String, String>,
}

impl MockDnsVerifier {
    pub fn new() -> Self {
        Self { records: HashMap::new() }
    }

    pub fn with(mut self, challenge_name: impl Into<String>, cname: impl Into<String>) -> Self {
        self.records.insert(challenge_name.into(), cname.into());
        self
    }
}

impl Default for MockDnsVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsVerifier for MockDnsVerifier {
    async fn verify(&self, challenge_name: &str, expected_target: &str) -> Result<VerifyOutcome, Error> {
        let Some(found) = self.records.get(challenge_name) else {
            return Ok(VerifyOutcome::Missing);
        };
        let found_stripped = strip_trailing_dot(found);
        let expected_stripped = strip_trailing_dot(expected_target);
        if found_stripped.eq_ignore_ascii_case(expected_stripped) {
            Ok(VerifyOutcome::Match)
        } else {
            Ok(VerifyOutcome::Mismatch(found_stripped.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_reports_match() {
        let v = MockDnsVerifier::new().with(
            "_acme-challenge.example.com",
            "abc123.acme-dns.example.com.",
        );
        let outcome = v
            .verify("_acme-challenge.example.com", "abc123.acme-dns.example.com")
            .await
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Match);
    }

    #[tokio::test]
    async fn mock_reports_mismatch_with_found_value() {
        let v = MockDnsVerifier::new().with("_acme-challenge.example.com", "wrong.acme-dns.example.com");
        let outcome = v
            .verify("_acme-challenge.example.com", "abc123.acme-dns.example.com")
            .await
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Mismatch("wrong.acme-dns.example.com".to_string()));
    }

    #[tokio::test]
    async fn mock_reports_missing_when_absent() {
        let v = MockDnsVerifier::new();
        let outcome = v
            .verify("_acme-challenge.example.com", "abc123.acme-dns.example.com")
            .await
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Missing);
    }

    #[test]
    fn resolver_override_appends_default_port() {
        let addr = parse_resolver_addr("203.0.113.10").unwrap();
        assert_eq!(addr.port(), 53);
    }

    #[test]
    fn resolver_override_respects_explicit_port() {
        let addr = parse_resolver_addr("203.0.113.10:5353").unwrap();
        assert_eq!(addr.port(), 5353);
    }
}
