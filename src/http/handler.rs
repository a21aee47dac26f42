//! Request pipeline.
//!
//! ```text
//! OPTIONS → preflight ack
//! auth gate → 403
//! health path → {ok, time}
//! route match → 400 when unmatched
//! target (url + canonical key) → cache policy → coalesced fetch → compose
//! ```

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, Uri},
    response::Response,
};

use crate::cache::{Coalesced, Role};
use crate::error::ProxyError;
use crate::http::request::RequestIdExt;
use crate::http::response::{header_names, ResponseComposer};
use crate::http::server::{AppState, ServingState};
use crate::observability::metrics;
use crate::routing::{QueryParams, RouteMatch};
use crate::upstream::UpstreamRequest;

/// Entry point for every request.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let serving = state.serving();
    let request_id = request.request_id().to_string();
    let (parts, _body) = request.into_parts();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Handling request"
    );

    let (label, response) = dispatch(&state, &serving, &parts.method, &parts.uri, &parts.headers, &request_id).await;

    let cache = response
        .headers()
        .get(header_names::X_CACHE_POLICY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("NONE");
    metrics::record_request(label, response.status().as_u16(), cache, start);
    response
}

async fn dispatch(
    state: &AppState,
    serving: &ServingState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    request_id: &str,
) -> (&'static str, Response) {
    let composer = &serving.composer;

    if *method == Method::OPTIONS {
        return ("preflight", composer.preflight());
    }

    let mut params = QueryParams::parse(uri.query());
    if let Err(err) = serving.auth.check(headers, &mut params) {
        tracing::warn!(request_id = %request_id, path = %uri.path(), "Credential rejected");
        return ("auth", fail(composer, &err));
    }

    let (route, id) = match serving.router.classify(method, uri.path()) {
        RouteMatch::Health => return ("health", composer.health()),
        RouteMatch::Unmatched => {
            tracing::info!(request_id = %request_id, method = %method, path = %uri.path(), "No route matched");
            let err = ProxyError::RouteUnmatched {
                method: method.to_string(),
                path: uri.path().to_string(),
            };
            return ("unmatched", fail(composer, &err));
        }
        RouteMatch::Route { route, id } => (route, id),
    };

    let target = route.target(id, &params);
    let policy = serving.policies.select(route.kind, target.bypass);
    let upstream = UpstreamRequest {
        url: target.url,
        policy,
        backend: route.backend.name.clone(),
    };

    tracing::debug!(
        request_id = %request_id,
        route = %route.kind,
        key = %target.key,
        cache = %policy.disposition(),
        "Dispatching upstream"
    );

    let fetcher = serving.fetcher.clone();
    let coalesced = state
        .coalescer
        .acquire(target.key.as_str(), move || async move { fetcher.fetch(upstream).await })
        .await;
    metrics::record_inflight(state.coalescer.len());

    let response = match coalesced {
        Ok(Coalesced { value: Ok(outcome), role }) => {
            if role == Role::Follower {
                metrics::record_coalesced(route.kind.tag());
            }
            tracing::info!(
                request_id = %request_id,
                route = %route.kind,
                status = outcome.status,
                attempts = outcome.attempts,
                outcome = outcome.classify().as_str(),
                cache = %outcome.policy.disposition(),
                coalesced = (role == Role::Follower),
                "Upstream response"
            );
            composer.passthrough(&outcome)
        }
        Ok(Coalesced { value: Err(e), .. }) => {
            tracing::error!(request_id = %request_id, route = %route.kind, error = %e, "Upstream unreachable");
            fail(composer, &ProxyError::from(e))
        }
        Err(aborted) => {
            tracing::error!(request_id = %request_id, route = %route.kind, error = %aborted, "Upstream fetch aborted");
            fail(composer, &ProxyError::from(aborted))
        }
    };

    (route.kind.tag(), response)
}

fn fail(composer: &ResponseComposer, err: &ProxyError) -> Response {
    metrics::record_proxy_error(err.kind());
    composer.error(err)
}
