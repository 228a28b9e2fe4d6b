//! Route lookup.
//!
//! # Responsibilities
//! - Store the compiled `host+path → URL` table
//! - Look up the target for a request key
//! - Return explicit no-match rather than a default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact, case-sensitive string match; no wildcards or normalization
//! - Replaced wholesale on config reload

use std::collections::HashMap;

use url::Url;

/// Error raised when a configured target is not a valid URL.
#[derive(Debug, thiserror::Error)]
#[error("route {key:?}: invalid target URL: {source}")]
pub struct RouteError {
    pub key: String,
    #[source]
    pub source: url::ParseError,
}

/// Exact-match table from `host+path` to an absolute upstream URL.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Url>,
}

impl RouteTable {
    /// Compile the configured routes.
    pub fn from_config(routes: &HashMap<String, String>) -> Result<Self, RouteError> {
        let routes = routes
            .iter()
            .map(|(key, target)| {
                Url::parse(target)
                    .map(|url| (key.clone(), url))
                    .map_err(|source| RouteError {
                        key: key.clone(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { routes })
    }

    /// Look up the target for a key built by [`route_key`].
    pub fn lookup(&self, key: &str) -> Option<&Url> {
        self.routes.get(key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builds the lookup key for a request: its host followed by its path.
pub fn route_key(host: &str, path: &str) -> String {
    let mut key = String::with_capacity(host.len() + path.len());
    key.push_str(host);
    key.push_str(path);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::from_config(&HashMap::from([
            (
                "dummy.tld/pubring.mix".to_string(),
                "https://www.harmsk.com/yamn/pubring.mix".to_string(),
            ),
            (
                "dummy.tld/mlist2.txt".to_string(),
                "https://www.harmsk.com/yamn/mlist2.txt".to_string(),
            ),
        ]))
        .unwrap()
    }

    #[test]
    fn exact_key_hits() {
        let table = table();
        let url = table.lookup(&route_key("dummy.tld", "/pubring.mix")).unwrap();
        assert_eq!(url.as_str(), "https://www.harmsk.com/yamn/pubring.mix");
    }

    #[test]
    fn lookup_is_exact() {
        let table = table();
        assert!(table.lookup("DUMMY.TLD/pubring.mix").is_none());
        assert!(table.lookup("dummy.tld/pubring.mix/").is_none());
        assert!(table.lookup("dummy.tld:80/pubring.mix").is_none());
        assert!(table.lookup("dummy.tld/").is_none());
    }

    #[test]
    fn invalid_target_is_rejected() {
        let err = RouteTable::from_config(&HashMap::from([(
            "a.tld/x".to_string(),
            "not a url".to_string(),
        )]))
        .unwrap_err();
        assert_eq!(err.key, "a.tld/x");
    }
}
