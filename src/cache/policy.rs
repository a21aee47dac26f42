//! Per-route cache policy selection.
//!
//! The proxy never stores responses itself. It selects a policy per request
//! and hands it to the transport and the response composer, which render it
//! for the edge cache in front of (or behind) us.

use std::fmt;
use std::time::Duration;

use crate::config::{CacheConfig, RoutePolicyConfig};
use crate::routing::RouteKind;

/// Cache policy attached to an upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Cache with explicit freshness windows.
    Override {
        ttl: Duration,
        stale_while_revalidate: Option<Duration>,
        stale_if_error: Option<Duration>,
    },
    /// Forward every request; never write the response into the shared cache.
    Pass,
}

/// Value of the `x-cache-policy` diagnostic header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDisposition {
    Override,
    Bypass,
}

impl CacheDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "OVERRIDE",
            Self::Bypass => "BYPASS",
        }
    }
}

impl fmt::Display for CacheDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CachePolicy {
    pub fn disposition(&self) -> CacheDisposition {
        match self {
            Self::Override { .. } => CacheDisposition::Override,
            Self::Pass => CacheDisposition::Bypass,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Render as a `Cache-Control` header value.
    pub fn cache_control(&self) -> String {
        match self {
            Self::Pass => "no-store".to_string(),
            Self::Override {
                ttl,
                stale_while_revalidate,
                stale_if_error,
            } => {
                let mut value = format!("public, max-age={}", ttl.as_secs());
                if let Some(swr) = stale_while_revalidate {
                    value.push_str(&format!(", stale-while-revalidate={}", swr.as_secs()));
                }
                if let Some(sie) = stale_if_error {
                    value.push_str(&format!(", stale-if-error={}", sie.as_secs()));
                }
                value
            }
        }
    }
}

impl From<RoutePolicyConfig> for CachePolicy {
    fn from(config: RoutePolicyConfig) -> Self {
        Self::Override {
            ttl: Duration::from_secs(config.ttl_secs),
            stale_while_revalidate: config.stale_while_revalidate_secs.map(Duration::from_secs),
            stale_if_error: config.stale_if_error_secs.map(Duration::from_secs),
        }
    }
}

/// Maps (route kind, bypass) to a cache policy.
#[derive(Debug, Clone)]
pub struct PolicySelector {
    catalog_bundles: CachePolicy,
    avatar_info: CachePolicy,
    avatar_outfits: CachePolicy,
}

impl PolicySelector {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            catalog_bundles: config.catalog_bundles.into(),
            avatar_info: config.avatar_info.into(),
            avatar_outfits: config.avatar_outfits.into(),
        }
    }

    pub fn select(&self, kind: RouteKind, bypass: bool) -> CachePolicy {
        if bypass {
            return CachePolicy::Pass;
        }
        match kind {
            RouteKind::CatalogBundles => self.catalog_bundles,
            RouteKind::AvatarInfo => self.avatar_info,
            RouteKind::AvatarOutfits => self.avatar_outfits,
        }
    }
}

impl Default for PolicySelector {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
