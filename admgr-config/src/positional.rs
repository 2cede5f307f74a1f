//! Manual-mode positional argument grammar. A small hand-rolled parser:
//! three string splits, no parser-combinator crate warranted (the corpus
//! reaches for `logos` only for a full DSL like Pingclair's own config
//! language).
//!
//! Grammar:
//! - `bare-domain` — both the certificate name and its single domain.
//! - `name@d1,d2,...` — explicit name and domain list.
//! - `name@d1,d2,.../key_type=T` — with a key-type override.
//! - A `/` inside the name portion (before `@`) is a hard parse error.
//!
//! Domain syntax validation (RFC-1035 label rules, wildcard form) is left
//! to `admgr_core::domain::validate_domain`, invoked by
//! `CertificateRequest::new`.

use admgr_core::{CertificateRequest, Error, KeyType};

const KEY_TYPE_MARKER: &str = "/key_type=";

/// Parses one manual-mode positional argument into a `CertificateRequest`.
pub fn parse_positional_arg(arg: &str) -> Result<CertificateRequest, Error> {
    let Some(at_pos) = arg.find('@') else {
        return CertificateRequest::new(arg, vec![arg.to_string()], None);
    };

    let name_part = &arg[..at_pos];
    if name_part.contains('/') || name_part.contains('\\') {
        return Err(Error::validation(
            "parse_positional_arg",
            format!("certificate name '{name_part}' must not contain '/' or '\\'"),
        )
        .with_resource(arg.to_string()));
    }

    let rest = &arg[at_pos + 1..];
    let (domains_part, key_type) = match rest.split_once(KEY_TYPE_MARKER) {
        Some((domains, type_str)) => {
            let kt: KeyType = type_str.parse().map_err(|e: String| {
                Error::validation("parse_positional_arg", e).with_resource(arg.to_string())
            })?;
            (domains, Some(kt))
        }
        None => (rest, None),
    };

    if domains_part.is_empty() {
        return Err(Error::validation(
            "parse_positional_arg",
            format!("'{arg}' lists no domains after '@'"),
        )
        .with_resource(arg.to_string()));
    }

    let domains: Vec<String> = domains_part.split(',').map(|s| s.to_string()).collect();
    CertificateRequest::new(name_part, domains, key_type)
}

/// Parses every manual-mode positional argument, failing on the first
/// malformed one.
pub fn parse_positional_args(args: &[String]) -> Result<Vec<CertificateRequest>, Error> {
    args.iter().map(|a| parse_positional_arg(a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_is_both_name_and_domain() {
        let req = parse_positional_arg("example.com").unwrap();
        assert_eq!(req.name, "example.com");
        assert_eq!(req.domains, vec!["example.com".to_string()]);
    }

    #[test]
    fn name_with_domain_list() {
        let req = parse_positional_arg("web@example.com,www.example.com").unwrap();
        assert_eq!(req.name, "web");
        assert_eq!(
            req.domains,
            vec!["example.com".to_string(), "www.example.com".to_string()]
        );
        assert_eq!(req.key_type, KeyType::Ec256);
    }

    #[test]
    fn name_with_domain_list_and_key_type() {
        let req = parse_positional_arg("web@example.com,www.example.com/key_type=rsa2048").unwrap();
        assert_eq!(req.key_type, KeyType::Rsa2048);
        assert_eq!(req.domains.len(), 2);
    }

    #[test]
    fn slash_in_name_before_at_is_rejected() {
        assert!(parse_positional_arg("a/b@example.com").is_err());
    }

    #[test]
    fn unknown_key_type_is_rejected() {
        assert!(parse_positional_arg("web@example.com/key_type=bogus").is_err());
    }

    #[test]
    fn empty_domain_list_is_rejected() {
        assert!(parse_positional_arg("web@").is_err());
    }

    #[test]
    fn parses_multiple_args_in_order() {
        let reqs = parse_positional_args(&[
            "example.com".to_string(),
            "web@a.example.com".to_string(),
        ])
        .unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].name, "example.com");
        assert_eq!(reqs[1].name, "web");
    }
}
