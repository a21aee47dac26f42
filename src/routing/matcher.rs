//! Route matching logic.
//!
//! # Responsibilities
//! - Classify a request path into one of the fixed route kinds
//! - Extract the numeric resource id from the path
//!
//! # Design Decisions
//! - Anchored, segment-by-segment matching; a prefix is never a match
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

use std::fmt;

/// The fixed set of proxied route kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    CatalogBundles,
    AvatarInfo,
    AvatarOutfits,
}

impl RouteKind {
    /// Stable tag used in cache keys, logs and metric labels.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CatalogBundles => "catalogBundles",
            Self::AvatarInfo => "avatarInfo",
            Self::AvatarOutfits => "avatarOutfits",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Id,
}

/// A compiled path pattern such as `/avatar/v1/users/{id}/outfits`.
///
/// Exactly one `{id}` placeholder is allowed; it captures a positive integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern. A pattern without `{id}` never matches.
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let segments = source
            .trim_start_matches('/')
            .split('/')
            .map(|s| match s {
                "{id}" => Segment::Id,
                other => Segment::Literal(other.to_string()),
            })
            .collect();
        Self { source, segments }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match the full path, returning the captured id.
    pub fn capture(&self, path: &str) -> Option<u64> {
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut id = None;

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Id => id = Some(parse_positive_id(part)?),
            }
        }

        // Trailing segments (including a trailing slash) are not allowed.
        if parts.next().is_some() {
            return None;
        }
        id
    }
}

/// Parse a path segment as a positive integer id.
///
/// Only ASCII digits are accepted (no sign, no whitespace) and the value must be > 0.
pub fn parse_positive_id(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match segment.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_captures_id() {
        let pattern = PathPattern::new("/catalog/v1/assets/{id}/bundles");
        assert_eq!(pattern.capture("/catalog/v1/assets/123/bundles"), Some(123));
        assert_eq!(pattern.as_str(), "/catalog/v1/assets/{id}/bundles");
    }

    #[test]
    fn test_pattern_is_anchored() {
        let pattern = PathPattern::new("/catalog/v1/assets/{id}/bundles");
        assert_eq!(pattern.capture("/catalog/v1/assets/123/bundles/extra"), None);
        assert_eq!(pattern.capture("/catalog/v1/assets/123/bundles/"), None);
        assert_eq!(pattern.capture("/catalog/v1/assets/123"), None);
        assert_eq!(pattern.capture("/prefix/catalog/v1/assets/123/bundles"), None);
        assert_eq!(pattern.capture("catalog/v1/assets/123/bundles"), None);
        assert_eq!(pattern.capture("/catalog/v1/assets/123/bundlesx"), None);
    }

    #[test]
    fn test_pattern_is_case_sensitive() {
        let pattern = PathPattern::new("/avatar/v1/users/{id}/avatar");
        assert_eq!(pattern.capture("/Avatar/v1/users/1/avatar"), None);
    }

    #[test]
    fn test_positive_id_parsing() {
        assert_eq!(parse_positive_id("42"), Some(42));
        assert_eq!(parse_positive_id("007"), Some(7));
        assert_eq!(parse_positive_id("0"), None);
        assert_eq!(parse_positive_id("abc"), None);
        assert_eq!(parse_positive_id("12a"), None);
        assert_eq!(parse_positive_id("-5"), None);
        assert_eq!(parse_positive_id("+5"), None);
        assert_eq!(parse_positive_id(""), None);
        assert_eq!(parse_positive_id("99999999999999999999999"), None);
    }

    #[test]
    fn test_route_kind_tags() {
        assert_eq!(RouteKind::CatalogBundles.to_string(), "catalogBundles");
        assert_eq!(RouteKind::AvatarInfo.tag(), "avatarInfo");
        assert_eq!(RouteKind::AvatarOutfits.tag(), "avatarOutfits");
    }
}
