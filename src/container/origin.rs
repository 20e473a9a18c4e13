//! Navigation filtering by origin.
//!
//! Patterns: `*` allows everything, `https://example.com` allows one origin,
//! `https://*.example.com` allows the domain and its subdomains and
//! `https://*` allows a whole scheme. `about:` and `data:` URLs are always
//! allowed so inline content keeps working.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginPattern {
    Any,
    Scheme(String),
    Exact(String),
    Subdomains { scheme: String, domain: String },
}

impl OriginPattern {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Some(Self::Any);
        }
        let (scheme, rest) = raw.split_once("://")?;
        let scheme = scheme.to_ascii_lowercase();
        let host = rest.trim_end_matches('/');
        if host == "*" {
            return Some(Self::Scheme(scheme));
        }
        if let Some(domain) = host.strip_prefix("*.") {
            return Some(Self::Subdomains {
                scheme,
                domain: domain.to_ascii_lowercase(),
            });
        }
        let url = Url::parse(raw).ok()?;
        Some(Self::Exact(url.origin().ascii_serialization()))
    }

    fn matches(&self, url: &Url) -> bool {
        match self {
            Self::Any => true,
            Self::Scheme(scheme) => url.scheme() == scheme,
            Self::Exact(origin) => url.origin().ascii_serialization() == *origin,
            Self::Subdomains { scheme, domain } => {
                url.scheme() == scheme
                    && url.host_str().is_some_and(|host| {
                        host == domain || host.ends_with(&format!(".{domain}"))
                    })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginWhitelist {
    patterns: Vec<OriginPattern>,
}

impl OriginWhitelist {
    /// Unparseable entries are skipped.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .filter_map(|p| OriginPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    pub fn allow_all() -> Self {
        Self {
            patterns: vec![OriginPattern::Any],
        }
    }

    pub fn allows(&self, url: &str) -> bool {
        if url.starts_with("about:") || url.starts_with("data:") {
            return true;
        }
        if self.patterns.contains(&OriginPattern::Any) {
            return true;
        }
        match Url::parse(url) {
            Ok(parsed) => self.patterns.iter().any(|p| p.matches(&parsed)),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_allows_everything() {
        let list = OriginWhitelist::new(&["*"]);
        assert!(list.allows("https://anything.test/path"));
        assert!(list.allows("not a url"));
        assert_eq!(list, OriginWhitelist::allow_all());
    }

    #[test]
    fn exact_origin_ignores_path_but_not_port() {
        let list = OriginWhitelist::new(&["https://docs.example.com"]);
        assert!(list.allows("https://docs.example.com/a/b?c=d"));
        assert!(list.allows("https://docs.example.com:443/"));
        assert!(!list.allows("https://docs.example.com:8443/"));
        assert!(!list.allows("http://docs.example.com/"));
        assert!(!list.allows("https://evil.example.com/"));
    }

    #[test]
    fn wildcard_covers_domain_and_subdomains() {
        let list = OriginWhitelist::new(&["https://*.example.com"]);
        assert!(list.allows("https://example.com/"));
        assert!(list.allows("https://a.b.example.com/"));
        assert!(!list.allows("https://notexample.com/"));
        assert!(!list.allows("http://a.example.com/"));
    }

    #[test]
    fn scheme_wildcard_and_inline_urls() {
        let list = OriginWhitelist::new(&["https://*", "garbage"]);
        assert!(list.allows("https://whatever.test/"));
        assert!(!list.allows("http://whatever.test/"));
        assert!(list.allows("about:blank"));
        assert!(list.allows("data:text/html,<p>hi</p>"));
    }

    #[test]
    fn empty_list_blocks_remote_navigation() {
        let list = OriginWhitelist::new::<&str>(&[]);
        assert!(!list.allows("https://example.com/"));
        assert!(list.allows("about:blank"));
    }
}
