use crate::{Metadata, MetadataError, Result, MAX_EMAIL_LEN};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid regex")
});

/// Check that an email address is well formed
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Check mandatory fields and maintainer emails.
///
/// All problems are collected so the client can fix the payload in one go.
pub fn validate(metadata: &Metadata) -> Result<()> {
    let mut problems = Vec::new();

    let required = [
        ("Version", &metadata.version),
        ("Company", &metadata.company),
        ("Description", &metadata.description),
        ("License", &metadata.license),
        ("Source", &metadata.source),
        ("Title", &metadata.title),
        ("Website", &metadata.website),
    ];
    for (field, value) in required {
        if value.is_empty() {
            problems.push(format!("{} cannot be empty", field));
        }
    }

    if metadata.maintainers.is_empty() {
        problems.push("Maintainers cannot be empty".to_string());
    }

    for maintainer in &metadata.maintainers {
        if maintainer.name.is_empty() {
            problems.push("Maintainer name cannot be empty".to_string());
        }
        if maintainer.email.is_empty() {
            problems.push("Maintainer email cannot be empty".to_string());
        }
        if !is_valid_email(&maintainer.email) {
            problems.push("Maintainer email address not correct".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(MetadataError::Invalid(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Maintainer;
    use proptest::prelude::*;

    fn complete() -> Metadata {
        Metadata {
            title: "Valid App 2".to_string(),
            version: "1.0.1".to_string(),
            company: "Upbound Inc.".to_string(),
            website: "https://upbound.io".to_string(),
            source: "https://github.com/upbound/repo".to_string(),
            license: "Apache-2.0".to_string(),
            maintainers: vec![Maintainer::new("AppTwo Maintainer", "apptwo@hotmail.com")],
            description: "Latest release".to_string(),
        }
    }

    #[test]
    fn test_complete_record_is_valid() {
        assert!(validate(&complete()).is_ok());
    }

    #[test]
    fn test_reports_every_missing_field() {
        let err = validate(&Metadata::default()).unwrap_err();
        let problems = err.problems();
        assert!(problems.contains(&"Version cannot be empty".to_string()));
        assert!(problems.contains(&"Title cannot be empty".to_string()));
        assert!(problems.contains(&"Maintainers cannot be empty".to_string()));
        assert_eq!(problems.len(), 8);
    }

    #[test]
    fn test_only_empty_fields_are_missing() {
        let mut metadata = complete();
        metadata.description = " ".to_string();
        assert!(validate(&metadata).is_ok());

        metadata.description.clear();
        let err = validate(&metadata).unwrap_err();
        assert_eq!(err.problems(), ["Description cannot be empty".to_string()]);
    }

    #[test]
    fn test_bad_maintainer_email() {
        let mut metadata = complete();
        metadata.maintainers = vec![Maintainer::new("Bad Email", "apptwohotmail.com")];

        let err = validate(&metadata).unwrap_err();
        assert_eq!(err.problems(), ["Maintainer email address not correct".to_string()]);
        assert_eq!(err.to_string(), "Maintainer email address not correct");
    }

    #[test]
    fn test_empty_maintainer_fields() {
        let mut metadata = complete();
        metadata.maintainers = vec![Maintainer::default()];

        let err = validate(&metadata).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Maintainer name cannot be empty-Maintainer email cannot be empty-Maintainer email address not correct"
        );
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("bill@hotmail.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("trailing@dash-.com"));
        assert!(!is_valid_email(""));

        let long_local = "a".repeat(MAX_EMAIL_LEN);
        assert!(!is_valid_email(&format!("{}@example.com", long_local)));
    }

    proptest! {
        #[test]
        fn prop_simple_addresses_are_valid(
            local in "[a-z0-9]{1,20}",
            domain in "[a-z]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{}@{}.{}", local, domain, tld);
            prop_assert!(is_valid_email(&email));
        }

        #[test]
        fn prop_addresses_without_at_are_invalid(text in "[a-z0-9.]{0,40}") {
            prop_assert!(!is_valid_email(&text));
        }
    }
}
