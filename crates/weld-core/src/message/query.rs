//! Query parameter map.

use std::collections::HashMap;

/// Query parameters: a mapping from key to the ordered list of values
/// it appeared with. A key may repeat in a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    params: HashMap<String, Vec<String>>,
}

impl QueryMap {
    /// Creates an empty query map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string (without the leading `?`).
    ///
    /// Keys and values are percent-decoded; `+` decodes to a space.
    pub fn parse(raw: &str) -> Self {
        let mut map = Self::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            map.push(key.into_owned(), value.into_owned());
        }
        map
    }

    /// Appends a value for `key`, preserving arrival order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value for `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Returns all values for `key` in arrival order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterates over keys and their value lists.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_pairs() {
        let query = QueryMap::parse("name=weld&lang=rust");
        assert_eq!(query.first("name"), Some("weld"));
        assert_eq!(query.first("lang"), Some("rust"));
        assert!(!query.contains("missing"));
    }

    #[test]
    fn repeated_keys_keep_order() {
        let query = QueryMap::parse("tag=a&tag=b&tag=c");
        assert_eq!(query.get_all("tag"), ["a", "b", "c"]);
    }

    #[test]
    fn values_are_percent_decoded() {
        let query = QueryMap::parse("q=hello%20world&plus=a+b");
        assert_eq!(query.first("q"), Some("hello world"));
        assert_eq!(query.first("plus"), Some("a b"));
    }

    #[test]
    fn empty_query_is_empty() {
        assert!(QueryMap::parse("").is_empty());
    }
}
