//! Endpoint handlers.
//!
//! # Data Flow
//! ```text
//! enforce_constraints (engine)
//!     → extractors (RequestContext, RequestMeta, Path, Body)
//!     → handler validates parameters, plans output
//!     → Response (paced bodies sleep through RequestContext only)
//! ```

pub mod delay;
pub mod drip;
pub mod echo;
pub mod range;
pub mod redirect;
pub mod stream;

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
    routing::{any, get},
    Router,
};
use futures_util::stream as futures_stream;

use crate::engine::{EngineError, EngineResult, RequestContext, StreamPlan};

/// Set on responses whose requested delay or pacing was shortened.
pub const X_DURATION_CLAMPED: HeaderName = HeaderName::from_static("x-duration-clamped");

/// Every endpoint, relative to the mount prefix.
pub fn routes() -> Router {
    Router::new()
        .route("/get", get(echo::get))
        .route("/headers", get(echo::headers))
        .route("/anything", any(echo::anything))
        .route("/anything/{*rest}", any(echo::anything))
        .route("/status/{code}", any(echo::status))
        .route("/env", get(echo::env))
        .route("/hostname", get(echo::hostname))
        .route("/delay/{delay}", any(delay::delay))
        .route("/drip", get(drip::drip))
        .route("/stream/{n}", get(stream::stream))
        .route("/range/{n}", get(range::range))
        .route("/redirect/{n}", get(redirect::redirect))
        .route("/relative-redirect/{n}", get(redirect::relative_redirect))
        .route("/absolute-redirect/{n}", get(redirect::absolute_redirect))
        .route("/redirect-to", any(redirect::redirect_to))
}

/// Parse a non-negative integer parameter.
pub(crate) fn parse_count(name: &str, raw: &str) -> EngineResult<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        EngineError::InvalidParameter(format!("invalid {name} {raw:?}: expected a non-negative integer"))
    })
}

/// Parse a duration given as float seconds (`1.5`) or humantime (`250ms`).
pub(crate) fn parse_duration(name: &str, raw: &str) -> EngineResult<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).map_err(|_| {
            EngineError::InvalidParameter(format!(
                "invalid {name} {raw:?}: expected a finite, non-negative number of seconds"
            ))
        });
    }
    humantime::parse_duration(raw)
        .map_err(|err| EngineError::InvalidParameter(format!("invalid {name} {raw:?}: {err}")))
}

/// Parse a status code in `100..=599`.
pub(crate) fn parse_status(raw: &str) -> EngineResult<StatusCode> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|code| (100..=599).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| EngineError::InvalidParameter(format!("invalid status code {raw:?}")))
}

pub(crate) fn mark_clamped(response: &mut Response, effective: Duration) {
    if let Ok(value) = HeaderValue::from_str(&format!("{:.3}", effective.as_secs_f64())) {
        response.headers_mut().insert(X_DURATION_CLAMPED, value);
    }
}

/// Body emitting the chunks of `plan`, each at its due time.
///
/// `fill(offset, len)` produces the bytes of a chunk. A cancelled request yields one
/// error, which aborts the response, and nothing after it.
pub(crate) fn paced_body<F>(ctx: RequestContext, plan: StreamPlan, fill: F) -> Body
where
    F: Fn(u64, u64) -> Bytes + Send + Sync + 'static,
{
    let state = (ctx, plan, fill);
    let chunks = futures_stream::unfold((state, Some(0u64)), |(state, next)| async move {
        let index = next?;
        let (ctx, plan, fill) = &state;
        if index >= plan.items() {
            return None;
        }
        if let Err(err) = ctx.sleep_until(plan.due_at(index)).await {
            tracing::warn!(
                sent = index,
                planned = plan.items(),
                "Paced response stopped before completion"
            );
            return Some((Err(err), (state, None)));
        }
        let chunk = fill(plan.chunk_offset(index), plan.chunk_len(index));
        Some((Ok(chunk), (state, Some(index + 1))))
    });
    Body::from_stream(chunks)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{body::Body, http::Response, middleware, Router};

    use crate::config::ServerConfig;
    use crate::engine::{enforce_constraints, Settings};

    pub fn app_with(configure: impl FnOnce(&mut ServerConfig)) -> Router {
        let mut config = ServerConfig::default();
        config.limits.max_duration = Duration::from_secs(5);
        configure(&mut config);
        let settings = Arc::new(Settings::from_config(&config));
        super::routes().layer(middleware::from_fn_with_state(settings, enforce_constraints))
    }

    pub fn app() -> Router {
        app_with(|_| {})
    }

    pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }
}
