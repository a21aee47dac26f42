//! Route lookup and upstream target resolution.
//!
//! # Responsibilities
//! - Store the compiled route descriptors
//! - Classify a request as health, a proxied route, or unmatched
//! - Resolve a matched route to its upstream URL and canonical key
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) pattern scan (three routes)
//! - Explicit Unmatched rather than silent default

use axum::http::Method;
use url::Url;

use crate::config::{BackendConfig, ProxyConfig};
use crate::routing::canonical::{CanonicalKey, QueryParams};
use crate::routing::matcher::{PathPattern, RouteKind};

/// A backend as seen by the router: its id and parsed base URL.
#[derive(Debug, Clone)]
pub struct Backend {
    pub name: String,
    pub base_url: Url,
}

impl Backend {
    pub fn from_config(config: &BackendConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            name: config.name.clone(),
            base_url: Url::parse(&config.base_url)?,
        })
    }
}

/// How a route derives the upstream query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Caller query is ignored; this canonical query is always sent.
    Forced(String),
    /// Caller query is forwarded minus control params; `bypass_param` opts out of caching.
    Forward { bypass_param: String },
}

/// Statically configured route.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub kind: RouteKind,
    pub method: Method,
    pub pattern: PathPattern,
    pub backend: Backend,
    /// Upstream path template, `{id}` is substituted.
    pub rewrite: String,
    pub query_mode: QueryMode,
}

/// Everything needed to issue (and coalesce) the upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub url: Url,
    pub key: CanonicalKey,
    pub bypass: bool,
}

impl RouteDescriptor {
    /// Resolve the upstream URL and canonical key for a matched id.
    ///
    /// `params` must already have the auth credential removed.
    pub fn target(&self, id: u64, params: &QueryParams) -> UpstreamTarget {
        let path = self.rewrite.replace("{id}", &id.to_string());

        let (query, bypass) = match &self.query_mode {
            QueryMode::Forced(query) => (query.clone(), false),
            QueryMode::Forward { bypass_param } => {
                let bypass = params.get(bypass_param).is_some_and(is_truthy);
                (params.canonical(&[bypass_param.as_str()]), bypass)
            }
        };

        let mut url = self.backend.base_url.clone();
        url.set_path(&path);
        url.set_query(if query.is_empty() { None } else { Some(&query) });

        let key = CanonicalKey::build(self.kind, &self.backend.name, &path, &query, bypass);
        UpstreamTarget { url, key, bypass }
    }

    /// Human-readable route, e.g. `GET /catalog/v1/assets/{assetId}/bundles`.
    pub fn describe(&self) -> String {
        let label = match self.kind {
            RouteKind::CatalogBundles => "{assetId}",
            RouteKind::AvatarInfo | RouteKind::AvatarOutfits => "{userId}",
        };
        format!("{} {}", self.method, self.pattern.as_str().replace("{id}", label))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true")
}

/// Result of classifying a request.
#[derive(Debug, Clone, Copy)]
pub enum RouteMatch<'a> {
    Health,
    Route { route: &'a RouteDescriptor, id: u64 },
    Unmatched,
}

/// Compiled, immutable route table.
#[derive(Debug, Clone)]
pub struct Router {
    health_path: String,
    routes: Vec<RouteDescriptor>,
}

impl Router {
    /// Build the fixed route set from configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, url::ParseError> {
        let catalog = Backend::from_config(&config.backends.catalog)?;
        let avatar = Backend::from_config(&config.backends.avatar)?;
        let forward = QueryMode::Forward {
            bypass_param: config.routes.bypass_param.clone(),
        };
        let forced = QueryParams::parse(Some(&config.routes.catalog_forced_query)).canonical(&[]);

        let routes = vec![
            RouteDescriptor {
                kind: RouteKind::CatalogBundles,
                method: Method::GET,
                pattern: PathPattern::new("/catalog/v1/assets/{id}/bundles"),
                backend: catalog,
                rewrite: "/v1/assets/{id}/bundles".to_string(),
                query_mode: QueryMode::Forced(forced),
            },
            RouteDescriptor {
                kind: RouteKind::AvatarInfo,
                method: Method::GET,
                pattern: PathPattern::new("/avatar/v1/users/{id}/avatar"),
                backend: avatar.clone(),
                rewrite: "/v1/users/{id}/avatar".to_string(),
                query_mode: forward.clone(),
            },
            RouteDescriptor {
                kind: RouteKind::AvatarOutfits,
                method: Method::GET,
                pattern: PathPattern::new("/avatar/v1/users/{id}/outfits"),
                backend: avatar,
                rewrite: "/v1/users/{id}/outfits".to_string(),
                query_mode: forward,
            },
        ];

        Ok(Self {
            health_path: config.routes.health_path.clone(),
            routes,
        })
    }

    /// Classify a request by method and path.
    pub fn classify(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        if path == self.health_path {
            return RouteMatch::Health;
        }
        for route in &self.routes {
            if let Some(id) = route.pattern.capture(path) {
                if route.method == *method {
                    return RouteMatch::Route { route, id };
                }
                // Known shape, wrong method.
                return RouteMatch::Unmatched;
            }
        }
        RouteMatch::Unmatched
    }

    /// Route descriptions for the unmatched-route response body.
    pub fn supported_routes(&self) -> Vec<String> {
        self.routes.iter().map(RouteDescriptor::describe).collect()
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }
}
