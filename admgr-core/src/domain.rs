//! Domain-name helpers and validation.

use crate::error::Error;

/// Returns the base domain for `d`: `d` itself unless it starts with
/// `*.`, in which case the leading wildcard label is stripped.
///
/// The account store is keyed by `base(d)`; a wildcard and its apex always
/// share one account.
pub fn base(d: &str) -> &str {
    d.strip_prefix("*.").unwrap_or(d)
}

/// The DNS-01 challenge name is always `_acme-challenge.<base(d)>`, never
/// `_acme-challenge.*.<d>`.
pub fn challenge_name(d: &str) -> String {
    format!("_acme-challenge.{}", base(d))
}

/// Validates a single domain label or wildcard domain: RFC-1035-style
/// labels (1-63 chars, alphanumeric + hyphen, no leading or trailing
/// hyphen), total length <= 253, wildcards only in the single form
/// `*.base`.
pub fn validate_domain(d: &str) -> Result<(), Error> {
    if d.is_empty() {
        return Err(Error::validation("validate_domain", "domain is empty"));
    }
    if d.len() > 253 {
        return Err(Error::validation(
            "validate_domain",
            format!("domain '{d}' exceeds 253 characters"),
        )
        .with_resource(d));
    }

    let rest = if let Some(stripped) = d.strip_prefix("*.") {
        if stripped.starts_with("*.") || stripped.contains("*") {
            return Err(Error::validation(
                "validate_domain",
                format!("wildcard domain '{d}' must have the form *.base"),
            )
            .with_resource(d));
        }
        stripped
    } else if d.contains('*') {
        return Err(Error::validation(
            "validate_domain",
            format!("wildcard domain '{d}' must have the form *.base"),
        )
        .with_resource(d));
    } else {
        d
    };

    if rest.is_empty() {
        return Err(
            Error::validation("validate_domain", format!("domain '{d}' has an empty base"))
                .with_resource(d),
        );
    }

    for label in rest.split('.') {
        validate_label(d, label)?;
    }

    Ok(())
}

fn validate_label(whole: &str, label: &str) -> Result<(), Error> {
    if label.is_empty() || label.len() > 63 {
        return Err(Error::validation(
            "validate_domain",
            format!("domain '{whole}' has an invalid label length ('{label}')"),
        )
        .with_resource(whole));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(Error::validation(
            "validate_domain",
            format!("domain '{whole}' has a label with a leading/trailing hyphen ('{label}')"),
        )
        .with_resource(whole));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::validation(
            "validate_domain",
            format!("domain '{whole}' has a label with invalid characters ('{label}')"),
        )
        .with_resource(whole));
    }
    Ok(())
}

/// Validates a filename-safe certificate request name: no path separators.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::validation("validate_name", "certificate name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::validation(
            "validate_name",
            format!("certificate name '{name}' must not contain '/' or '\\'"),
        )
        .with_resource(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_strips_single_wildcard_label() {
        assert_eq!(base("*.example.com"), "example.com");
        assert_eq!(base("example.com"), "example.com");
    }

    #[test]
    fn challenge_name_never_keeps_wildcard() {
        assert_eq!(
            challenge_name("*.example.com"),
            "_acme-challenge.example.com"
        );
        assert_eq!(challenge_name("example.com"), "_acme-challenge.example.com");
    }

    #[test]
    fn rejects_double_wildcard() {
        assert!(validate_domain("*.*.foo").is_err());
    }

    #[test]
    fn rejects_64_char_label() {
        let label = "a".repeat(64);
        let d = format!("{label}.example.com");
        assert!(validate_domain(&d).is_err());
    }

    #[test]
    fn accepts_plain_and_wildcard() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("*.example.com").is_ok());
    }

    #[test]
    fn rejects_name_with_slash() {
        assert!(validate_name("a/b").is_err());
    }
}
