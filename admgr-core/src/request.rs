//! `CertificateRequest` — the immutable per-cert input.

use crate::domain::{validate_domain, validate_name};
use crate::error::Error;
use crate::keytype::KeyType;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub name: String,
    pub domains: Vec<String>,
    pub key_type: KeyType,
}

impl CertificateRequest {
    pub fn new(
        name: impl Into<String>,
        domains: Vec<String>,
        key_type: Option<KeyType>,
    ) -> Result<Self, Error> {
        let name = name.into();
        validate_name(&name)?;
        if domains.is_empty() {
            return Err(Error::validation(
                "certificate_request",
                format!("certificate '{name}' has zero domains"),
            )
            .with_resource(&name));
        }
        let mut seen = HashSet::new();
        for d in &domains {
            validate_domain(d)?;
            if !seen.insert(d.as_str()) {
                return Err(Error::validation(
                    "certificate_request",
                    format!("certificate '{name}' lists domain '{d}' more than once"),
                )
                .with_resource(&name));
            }
        }
        Ok(Self {
            name,
            domains,
            key_type: key_type.unwrap_or_default(),
        })
    }

    /// The first domain is the certificate's primary (Common Name) identity.
    pub fn primary_domain(&self) -> &str {
        &self.domains[0]
    }
}

/// Validates a request set for one invocation: no two requests may share
/// a `name`, and no domain may appear in more than one request (§3 data
/// model — a domain belongs to exactly one certificate per invocation).
pub fn validate_unique_names(requests: &[CertificateRequest]) -> Result<(), Error> {
    let mut seen_names = HashSet::new();
    for r in requests {
        if !seen_names.insert(r.name.as_str()) {
            return Err(Error::validation(
                "validate_request_set",
                format!("duplicate certificate name '{}' in this invocation", r.name),
            )
            .with_resource(&r.name));
        }
    }

    let mut seen_domains: std::collections::HashMap<&str, &str> = std::collections::HashMap::new();
    for r in requests {
        for d in &r.domains {
            if let Some(prior_name) = seen_domains.insert(d.as_str(), r.name.as_str()) {
                return Err(Error::validation(
                    "validate_request_set",
                    format!(
                        "domain '{d}' is requested by both '{prior_name}' and '{}' in this invocation",
                        r.name
                    ),
                )
                .with_resource(d.clone()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_domains() {
        assert!(CertificateRequest::new("web", vec![], None).is_err());
    }

    #[test]
    fn rejects_duplicate_domains_within_one_request() {
        let err = CertificateRequest::new(
            "web",
            vec!["example.com".into(), "example.com".into()],
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn primary_domain_is_first() {
        let req = CertificateRequest::new(
            "web",
            vec!["example.com".into(), "www.example.com".into()],
            None,
        )
        .unwrap();
        assert_eq!(req.primary_domain(), "example.com");
    }

    #[test]
    fn detects_duplicate_names_across_requests() {
        let a = CertificateRequest::new("web", vec!["a.com".into()], None).unwrap();
        let b = CertificateRequest::new("web", vec!["b.com".into()], None).unwrap();
        assert!(validate_unique_names(&[a, b]).is_err());
    }

    #[test]
    fn detects_same_domain_claimed_by_two_requests() {
        let a = CertificateRequest::new("web", vec!["example.com".into()], None).unwrap();
        let b = CertificateRequest::new("other", vec!["example.com".into()], None).unwrap();
        assert!(validate_unique_names(&[a, b]).is_err());
    }

    #[test]
    fn distinct_domains_across_requests_are_accepted() {
        let a = CertificateRequest::new("web", vec!["example.com".into()], None).unwrap();
        let b = CertificateRequest::new("other", vec!["other.example.com".into()], None).unwrap();
        assert!(validate_unique_names(&[a, b]).is_ok());
    }
}
