//! Query parsing and cache key canonicalization.
//!
//! Two requests that differ only in query-parameter order, or in the presence
//! of the auth credential, produce the same key. Bypassed requests get their
//! own key space so they never share an in-flight fetch with cached lookups.

use std::fmt;

use url::form_urlencoded;

use crate::routing::matcher::RouteKind;

/// Decoded query parameters in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .filter(|(name, _)| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { pairs }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove every occurrence of `name`, returning the removed values.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.pairs.retain(|(n, v)| {
            if n == name {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Build the canonical query string.
    ///
    /// Parameters named in `excluded` are dropped; the rest are sorted by
    /// `(name, value)` byte order and re-encoded as `name=value` joined by `&`.
    pub fn canonical(&self, excluded: &[&str]) -> String {
        let mut kept: Vec<&(String, String)> = self
            .pairs
            .iter()
            .filter(|(name, _)| !excluded.contains(&name.as_str()))
            .collect();
        kept.sort_by(|a, b| {
            a.0.as_bytes()
                .cmp(b.0.as_bytes())
                .then_with(|| a.1.as_bytes().cmp(b.1.as_bytes()))
        });

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in kept {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }
}

/// Deterministic cache and coalescing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// `{kind}|{backend}{path}?{query}|{cache|bypass}`
    pub fn build(kind: RouteKind, backend: &str, path: &str, query: &str, bypass: bool) -> Self {
        let mode = if bypass { "bypass" } else { "cache" };
        Self(format!("{}|{}{}?{}|{}", kind.tag(), backend, path, query, mode))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
