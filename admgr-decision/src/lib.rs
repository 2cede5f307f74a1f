//! Renewal decision engine: a pure function from a stored certificate's
//! bytes (if any) and the currently-requested domains to an action.
//!
//! Generalizes `pingclair-tls/src/acme.rs`'s `Certificate::needs_renewal`
//! (a single `expires_at - now < 30 days` boolean) into a five-step
//! decision order, parsing the certificate itself with `x509-parser`
//! rather than trusting a cached `expires_at` field, since this engine
//! must also treat an unparseable or domain-mismatched on-disk
//! certificate as a renewal trigger.

use std::collections::BTreeSet;
use std::time::Duration;

use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::pem::parse_x509_pem;

/// Outcome of a renewal decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Init,
    Renew(String),
    Skip,
}

/// Decides what to do about one certificate request, given the raw bytes
/// of its currently-stored leaf certificate (if any), the requested
/// domain list (first entry is the primary/CN identity), the current
/// time, and the renewal grace period.
///
/// `now` and `grace` are passed in explicitly (rather than read from the
/// system clock) so the function stays pure and trivially testable.
pub fn decide(
    stored_cert_pem: Option<&[u8]>,
    requested_domains: &[String],
    now: chrono::DateTime<chrono::Utc>,
    grace: Duration,
) -> Action {
    let Some(pem_bytes) = stored_cert_pem else {
        return Action::Init;
    };

    let (cert_der, not_after_ts, sans, common_name) = match parse_cert(pem_bytes) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored certificate is unparseable, forcing renewal");
            return Action::Renew("unparseable".to_string());
        }
    };
    let _ = cert_der;

    let not_after = chrono::DateTime::<chrono::Utc>::from_timestamp(not_after_ts, 0)
        .unwrap_or(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
    let time_left = not_after - now;
    let grace_chrono = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::zero());

    if time_left <= grace_chrono {
        return Action::Renew(format!(
            "expires in {} (threshold {})",
            humantime::format_duration(duration_from_chrono(time_left)),
            humantime::format_duration(grace),
        ));
    }

    // SAN comparison folds in the CommonName whenever the SAN list doesn't
    // already cover it — whether that's because SANs are entirely absent
    // or because they're present but missing the CN value (legacy cert
    // compatibility either way).
    let mut effective_names: BTreeSet<&str> = sans.iter().map(|s| s.as_str()).collect();
    if let Some(cn) = common_name.as_deref() {
        if !effective_names.contains(cn) {
            tracing::warn!(common_name = cn, "falling back to CommonName as a virtual SAN");
            effective_names.insert(cn);
        }
    }

    let missing: Vec<&String> = requested_domains
        .iter()
        .filter(|d| !effective_names.contains(d.as_str()))
        .collect();

    if !missing.is_empty() {
        let list = missing
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Action::Renew(format!("certificate missing domains: {list}"));
    }

    Action::Skip
}

fn duration_from_chrono(d: chrono::Duration) -> Duration {
    d.to_std().unwrap_or(Duration::ZERO)
}

/// Parses a PEM certificate, returning its DER bytes (retained only to
/// keep the underlying `X509Certificate` borrow's dependencies alive to
/// the caller, unused otherwise), `not_after` as a Unix timestamp, the
/// `dNSName` SAN entries, and the subject CommonName if present.
fn parse_cert(pem_bytes: &[u8]) -> Result<(Vec<u8>, i64, Vec<String>, Option<String>), String> {
    let (_, pem) = parse_x509_pem(pem_bytes).map_err(|e| e.to_string())?;
    let cert = pem.parse_x509().map_err(|e| e.to_string())?;

    let not_after = cert.validity().not_after.timestamp();

    let mut sans = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for name in &san.general_names {
                if let GeneralName::DNSName(dns) = name {
                    sans.push(dns.to_string());
                }
            }
        }
    }

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|s| s.to_string());

    Ok((pem.contents, not_after, sans, common_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_certificate_is_init() {
        let action = decide(None, &["example.com".to_string()], chrono::Utc::now(), Duration::from_secs(86400 * 30));
        assert_eq!(action, Action::Init);
    }

    #[test]
    fn unparseable_certificate_is_renew() {
        let action = decide(
            Some(b"not a real certificate"),
            &["example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert_eq!(action, Action::Renew("unparseable".to_string()));
    }

    /// Builds a self-signed leaf certificate PEM with the given SAN list
    /// and an expiry `days_from_now` days out, for exercising the decision
    /// order against real X.509 structure rather than fixture bytes.
    fn self_signed_cert(common_name: &str, sans: &[&str], days_from_now: i32) -> Vec<u8> {
        use openssl::asn1::Asn1Time;
        use openssl::ec::{EcGroup, EcKey};
        use openssl::nid::Nid;
        use openssl::pkey::PKey;
        use openssl::x509::extension::SubjectAlternativeName;
        use openssl::x509::{X509Name, X509};

        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let ec_key = EcKey::generate(&group).unwrap();
        let pkey = PKey::from_ec_key(ec_key).unwrap();

        let mut name_builder = X509Name::builder().unwrap();
        name_builder.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
        let name = name_builder.build();

        let mut builder = X509::builder().unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(days_from_now.max(0) as u32).unwrap())
            .unwrap();

        if !sans.is_empty() {
            let mut san_ext = SubjectAlternativeName::new();
            for s in sans {
                san_ext.dns(s);
            }
            let ctx = builder.x509v3_context(None, None);
            let ext = san_ext.build(&ctx).unwrap();
            builder.append_extension(ext).unwrap();
        }

        builder.sign(&pkey, openssl::hash::MessageDigest::sha256()).unwrap();
        let cert = builder.build();
        cert.to_pem().unwrap()
    }

    #[test]
    fn fresh_certificate_with_matching_sans_is_skip() {
        let pem = self_signed_cert("example.com", &["example.com", "www.example.com"], 60);
        let action = decide(
            Some(&pem),
            &["example.com".to_string(), "www.example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn certificate_within_grace_period_is_renewed() {
        let pem = self_signed_cert("example.com", &["example.com"], 10);
        let action = decide(
            Some(&pem),
            &["example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert!(matches!(action, Action::Renew(ref reason) if reason.starts_with("expires in")));
    }

    #[test]
    fn certificate_missing_a_requested_domain_is_renewed() {
        let pem = self_signed_cert("example.com", &["example.com"], 60);
        let action = decide(
            Some(&pem),
            &["example.com".to_string(), "new.example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert!(matches!(action, Action::Renew(reason) if reason.contains("new.example.com")));
    }

    #[test]
    fn extra_sans_beyond_request_do_not_trigger_renewal() {
        let pem = self_signed_cert(
            "example.com",
            &["example.com", "extra.example.com"],
            60,
        );
        let action = decide(
            Some(&pem),
            &["example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn common_name_is_used_as_fallback_when_sans_absent() {
        let pem = self_signed_cert("legacy.example.com", &[], 60);
        let action = decide(
            Some(&pem),
            &["legacy.example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn common_name_is_merged_in_when_sans_are_present_but_omit_it() {
        let pem = self_signed_cert("legacy.example.com", &["www.example.com"], 60);
        let action = decide(
            Some(&pem),
            &["legacy.example.com".to_string(), "www.example.com".to_string()],
            chrono::Utc::now(),
            Duration::from_secs(86400 * 30),
        );
        assert_eq!(action, Action::Skip);
    }
}
