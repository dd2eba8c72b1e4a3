use url::Url;

/// A host pattern from the `allowed-domains` list
///
/// `example.com` matches that host only. `*.example.com` matches the bare
/// domain and any subdomain at any depth, but never `myexample.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPattern {
    Exact(String),
    Wildcard(String),
}

impl DomainPattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        match pattern.strip_prefix("*.") {
            Some(base) => Self::Wildcard(base.to_string()),
            None => Self::Exact(pattern),
        }
    }

    /// `host` must already be lowercase (as produced by the URL parser)
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(domain) => host == domain,
            Self::Wildcard(base) => {
                host == base
                    || host
                        .strip_suffix(base.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}

/// Decides which URLs belong to the crawled site
///
/// A URL is same-site when its host equals the seed's host or matches one of
/// the explicitly allowed patterns. Ports and schemes are not compared.
#[derive(Debug, Clone)]
pub struct SiteScope {
    seed_host: String,
    allowed: Vec<DomainPattern>,
}

impl SiteScope {
    /// Returns `None` when the seed has no host
    pub fn new(seed: &Url, allowed_domains: &[String]) -> Option<Self> {
        let seed_host = seed.host_str()?.to_ascii_lowercase();
        Some(Self {
            seed_host,
            allowed: allowed_domains
                .iter()
                .map(|p| DomainPattern::parse(p))
                .collect(),
        })
    }

    pub fn seed_host(&self) -> &str {
        &self.seed_host
    }

    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        host == self.seed_host || self.allowed.iter().any(|p| p.matches(&host))
    }
}
