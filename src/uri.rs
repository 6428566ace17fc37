use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const AGENT_SCHEME: &str = "agent://";

/// Same ceiling as a DNS domain name.
pub const MAX_AGENT_URI_LENGTH: usize = 253;

static AGENT_URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^agent://[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    )
    .expect("agent URI pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAgentUri {
    pub agent_name: String,
    pub service: Option<String>,
    pub organization: String,
}

pub fn validate_agent_uri(uri: &str) -> bool {
    uri.len() <= MAX_AGENT_URI_LENGTH && AGENT_URI_PATTERN.is_match(uri)
}

/// Splits a URI into agent name, optional service and organization.
///
/// Returns `None` when the URI does not carry the `agent://` scheme or has
/// fewer than two labels. Callers on the resolution path must run
/// [`validate_agent_uri`] first; parsing alone does not check label syntax.
pub fn parse_agent_uri(uri: &str) -> Option<ParsedAgentUri> {
    let host = uri.strip_prefix(AGENT_SCHEME)?;
    let labels: Vec<&str> = host.split('.').collect();

    match labels.as_slice() {
        [] | [_] => None,
        [name, organization] => Some(ParsedAgentUri {
            agent_name: name.to_string(),
            service: None,
            organization: organization.to_string(),
        }),
        [name, service, rest @ ..] => Some(ParsedAgentUri {
            agent_name: name.to_string(),
            service: Some(service.to_string()),
            organization: rest.join("."),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uris() {
        assert!(validate_agent_uri("agent://hello.dev.pbolduc"));
        assert!(validate_agent_uri("agent://support.example.com"));
        assert!(validate_agent_uri("agent://a-b.c1"));
        assert!(validate_agent_uri("agent://x.y.z.w.v"));
    }

    #[test]
    fn test_scheme_is_case_sensitive() {
        assert!(!validate_agent_uri("AGENT://hello.example.com"));
        assert!(!validate_agent_uri("https://hello.example.com"));
        assert!(!validate_agent_uri("invalid-uri"));
    }

    #[test]
    fn test_requires_two_labels() {
        assert!(!validate_agent_uri("agent://hello"));
        assert!(!validate_agent_uri("agent://"));
    }

    #[test]
    fn test_rejects_bad_labels() {
        assert!(!validate_agent_uri("agent://hello..example"));
        assert!(!validate_agent_uri("agent://-hello.example"));
        assert!(!validate_agent_uri("agent://hello-.example"));
        assert!(!validate_agent_uri("agent://hello.example-"));
        assert!(!validate_agent_uri("agent://hel_lo.example"));
        assert!(!validate_agent_uri("agent://hello.example/path"));
    }

    #[test]
    fn test_length_limit() {
        let label = "a".repeat(60);
        let host = vec![label; 4].join(".");
        let uri = format!("{}{}", AGENT_SCHEME, host);
        assert!(uri.len() <= MAX_AGENT_URI_LENGTH);
        assert!(validate_agent_uri(&uri));

        let too_long = format!("{}.{}", uri, "b".repeat(10));
        assert!(too_long.len() > MAX_AGENT_URI_LENGTH);
        assert!(!validate_agent_uri(&too_long));
    }

    #[test]
    fn test_parse_with_service() {
        let parsed = parse_agent_uri("agent://hello.dev.pbolduc").unwrap();
        assert_eq!(parsed.agent_name, "hello");
        assert_eq!(parsed.service.as_deref(), Some("dev"));
        assert_eq!(parsed.organization, "pbolduc");
    }

    #[test]
    fn test_parse_joins_remaining_labels_into_organization() {
        let parsed = parse_agent_uri("agent://billing.payments.acme.co.uk").unwrap();
        assert_eq!(parsed.agent_name, "billing");
        assert_eq!(parsed.service.as_deref(), Some("payments"));
        assert_eq!(parsed.organization, "acme.co.uk");
    }

    #[test]
    fn test_parse_without_service() {
        let parsed = parse_agent_uri("agent://support.example").unwrap();
        assert_eq!(parsed.agent_name, "support");
        assert!(parsed.service.is_none());
        assert_eq!(parsed.organization, "example");
    }

    #[test]
    fn test_parse_no_match() {
        assert!(parse_agent_uri("invalid-uri").is_none());
        assert!(parse_agent_uri("agent://single").is_none());
    }
}
