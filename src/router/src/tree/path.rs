//! Navigation path parsing
//!
//! Normalizes a requested URL path into segments plus query parameters.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A normalized navigation path
///
/// A path is a slash-separated string with optional query and fragment:
/// - `dashboards/analytics`
/// - `/apps/usuarios/` (leading and trailing slashes are ignored)
/// - `sign-in?redirectURL=/apps` (query is kept apart from the segments)
///
/// # Examples
///
/// ```
/// use portal_router::RoutePath;
///
/// let path = RoutePath::parse("/apps/usuarios?tab=active");
/// assert_eq!(path.segments(), ["apps", "usuarios"]);
/// assert_eq!(path.as_str(), "apps/usuarios");
/// assert_eq!(path.query().get("tab").map(String::as_str), Some("active"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutePath {
    /// Normalized path without slashes at either end
    normalized: String,
    /// Parsed segments
    segments: Vec<String>,
    /// Query parameters
    query: BTreeMap<String, String>,
}

impl RoutePath {
    /// Parses a raw path
    ///
    /// Empty segments (`a//b`) are dropped and a `#fragment` is discarded.
    pub fn parse(raw: &str) -> Self {
        let without_fragment = raw.split('#').next().unwrap_or_default();
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Self::parse_query(query)),
            None => (without_fragment, BTreeMap::new()),
        };

        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            normalized: segments.join("/"),
            segments,
            query,
        }
    }

    fn parse_query(query: &str) -> BTreeMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (Self::decode(key), Self::decode(value)),
                None => (Self::decode(pair), String::new()),
            })
            .collect()
    }

    /// Percent-decodes a query component, keeping it raw if it is not valid UTF-8
    fn decode(component: &str) -> String {
        urlencoding::decode(component)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| component.to_string())
    }

    /// Returns the segments of this path
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the normalized path (no query, no surrounding slashes)
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Returns the query parameters, percent-decoded
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Returns whether the path addresses the root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the depth of this path (number of segments)
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl FromStr for RoutePath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_creation() {
        let path = RoutePath::parse("dashboards/analytics");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.as_str(), "dashboards/analytics");
        assert!(!path.is_root());
    }

    #[test]
    fn test_slashes_normalized() {
        let path = RoutePath::parse("//apps///usuarios/");
        assert_eq!(path.segments(), ["apps", "usuarios"]);
        assert_eq!(path.to_string(), "/apps/usuarios");
    }

    #[test]
    fn test_root_paths() {
        assert!(RoutePath::parse("").is_root());
        assert!(RoutePath::parse("/").is_root());
        assert!(RoutePath::parse("?x=1").is_root());
    }

    #[test]
    fn test_query_and_fragment() {
        let path = RoutePath::parse("sign-in?redirectURL=/apps&flag#top");
        assert_eq!(path.segments(), ["sign-in"]);
        assert_eq!(path.query().get("redirectURL"), Some(&"/apps".to_string()));
        assert_eq!(path.query().get("flag"), Some(&String::new()));
    }

    #[test]
    fn test_query_values_percent_decoded() {
        let path = RoutePath::parse("sign-in?redirectURL=%2Fapps%2Fusuarios&q=a%20b&bad=%FF");
        assert_eq!(
            path.query().get("redirectURL").map(String::as_str),
            Some("/apps/usuarios")
        );
        assert_eq!(path.query().get("q").map(String::as_str), Some("a b"));
        assert_eq!(path.query().get("bad").map(String::as_str), Some("%FF"));
    }
}
