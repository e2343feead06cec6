//! Credential domains: named sets of requirement predicates that scope where
//! a credential may be used.
//!
//! A consumer describes its target as a `RequirementSet` (usually derived
//! from a URI). A domain matches when none of its specifications rejects the
//! set. Specifications only judge requirements of their own kind, and a
//! specification of a kind this build does not know never matches.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single fact about the lookup target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DomainRequirement {
    Scheme(String),
    Hostname(String),
    HostnamePort { host: String, port: u16 },
    Path(String),
}

/// The requirements a consumer places on the credentials it looks up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSet(Vec<DomainRequirement>);

impl RequirementSet {
    pub fn new(requirements: Vec<DomainRequirement>) -> Self {
        Self(requirements)
    }

    /// No requirements: only domains whose specifications are all neutral
    /// (including the global domain) match.
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, requirement: DomainRequirement) -> Self {
        self.0.push(requirement);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainRequirement> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive scheme, hostname, hostname:port and path requirements from a
    /// URI such as `https://git.example.com:8443/org/repo.git`.
    ///
    /// Anything that does not parse as `scheme://authority[/path]` yields an
    /// empty set.
    pub fn from_uri(uri: &str) -> Self {
        let Some((scheme, rest)) = uri.split_once("://") else {
            return Self::empty();
        };
        if scheme.is_empty() {
            return Self::empty();
        }

        let end_of_authority = rest.find(&['/', '?', '#'][..]).unwrap_or(rest.len());
        let authority = &rest[..end_of_authority];
        let remainder = &rest[end_of_authority..];
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

        let (host, port) = split_host_port(host_port);
        let scheme = scheme.to_lowercase();
        let mut set = Self::empty().with(DomainRequirement::Scheme(scheme.clone()));

        if !host.is_empty() {
            let host = host.to_lowercase();
            let port = port.or_else(|| default_port(&scheme));
            set = set.with(DomainRequirement::Hostname(host.clone()));
            if let Some(port) = port {
                set = set.with(DomainRequirement::HostnamePort { host, port });
            }
        }

        let path_end = remainder.find(&['?', '#'][..]).unwrap_or(remainder.len());
        let path = &remainder[..path_end];
        if !path.is_empty() {
            set = set.with(DomainRequirement::Path(path.to_string()));
        }
        set
    }
}

fn split_host_port(host_port: &str) -> (&str, Option<u16>) {
    // Bracketed IPv6 literal: [::1]:8080
    if let Some(stripped) = host_port.strip_prefix('[') {
        if let Some((host, tail)) = stripped.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (host_port, None),
        },
        None => (host_port, None),
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        "ssh" => Some(22),
        "ldap" => Some(389),
        "ldaps" => Some(636),
        _ => None,
    }
}

/// Outcome of testing one specification against a requirement set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecificationResult {
    /// At least one requirement of this kind was checked and all passed.
    Positive,
    /// A requirement of this kind was rejected.
    Negative,
    /// The set carries no requirement this specification understands.
    Neutral,
}

/// A predicate restricting a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainSpecification {
    /// Allowed URI schemes, case-insensitive.
    Scheme { schemes: Vec<String> },
    /// Comma-separated hostname globs.
    Hostname {
        #[serde(default)]
        includes: String,
        #[serde(default)]
        excludes: String,
    },
    /// Comma-separated `host:port` globs.
    HostnamePort {
        #[serde(default)]
        includes: String,
        #[serde(default)]
        excludes: String,
    },
    /// Comma-separated path globs.
    Path {
        #[serde(default)]
        includes: String,
        #[serde(default)]
        excludes: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// A specification written by a build that knows more kinds than this
    /// one. The raw document is kept so a save writes it back unchanged.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

impl DomainSpecification {
    pub fn test(&self, requirements: &RequirementSet) -> SpecificationResult {
        match self {
            Self::Scheme { schemes } => evaluate(requirements, |req| match req {
                DomainRequirement::Scheme(scheme) => {
                    Some(schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)))
                }
                _ => None,
            }),
            Self::Hostname { includes, excludes } => evaluate(requirements, |req| match req {
                DomainRequirement::Hostname(host) => {
                    Some(glob_list_accepts(includes, excludes, host, false))
                }
                _ => None,
            }),
            Self::HostnamePort { includes, excludes } => evaluate(requirements, |req| match req {
                DomainRequirement::HostnamePort { host, port } => Some(glob_list_accepts(
                    includes,
                    excludes,
                    &format!("{host}:{port}"),
                    false,
                )),
                _ => None,
            }),
            Self::Path {
                includes,
                excludes,
                case_sensitive,
            } => evaluate(requirements, |req| match req {
                DomainRequirement::Path(path) => {
                    Some(glob_list_accepts(includes, excludes, path, *case_sensitive))
                }
                _ => None,
            }),
            Self::Unknown(_) => SpecificationResult::Negative,
        }
    }
}

fn evaluate<F>(requirements: &RequirementSet, mut check: F) -> SpecificationResult
where
    F: FnMut(&DomainRequirement) -> Option<bool>,
{
    let mut result = SpecificationResult::Neutral;
    for requirement in requirements.iter() {
        match check(requirement) {
            Some(true) => result = SpecificationResult::Positive,
            Some(false) => return SpecificationResult::Negative,
            None => {}
        }
    }
    result
}

fn glob_list_accepts(includes: &str, excludes: &str, value: &str, case_sensitive: bool) -> bool {
    let included = {
        let mut patterns = split_globs(includes).peekable();
        patterns.peek().is_none()
            || patterns.any(|p| glob_matches(p, value, case_sensitive))
    };
    included && !split_globs(excludes).any(|p| glob_matches(p, value, case_sensitive))
}

fn split_globs(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|p| !p.is_empty())
}

/// `*` matches any run of characters, `?` a single character.
fn glob_matches(pattern: &str, value: &str, case_sensitive: bool) -> bool {
    let mut expr = String::with_capacity(pattern.len() + 8);
    if !case_sensitive {
        expr.push_str("(?i)");
    }
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).is_ok_and(|re| re.is_match(value))
}

/// A named scope of credentials inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// `None` for the global domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub specifications: Vec<DomainSpecification>,
}

impl Domain {
    /// The unrestricted domain every store starts with.
    pub const fn global() -> Self {
        Self {
            name: None,
            description: None,
            specifications: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>, specifications: Vec<DomainSpecification>) -> Self {
        Self {
            name: Some(name.into()),
            description: None,
            specifications,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Unnamed and unrestricted.
    pub fn is_global(&self) -> bool {
        self.name.is_none() && self.specifications.is_empty()
    }

    /// Display name; the global domain renders as `(global)`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(global)")
    }

    /// Whether credentials in this domain may be used for the target.
    ///
    /// Specifications are evaluated whenever present, so an unnamed domain
    /// that carries any is still restricted by them.
    pub fn matches(&self, requirements: &RequirementSet) -> bool {
        self.specifications
            .iter()
            .all(|spec| spec.test(requirements) != SpecificationResult::Negative)
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::global()
    }
}
