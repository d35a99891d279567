//! Display endpoints: `/get`, `/headers`, `/anything`, `/status/{code}`, `/env`,
//! `/hostname`.

use axum::{
    body::Body,
    extract::Path,
    response::{IntoResponse, Response},
    Json,
};

use crate::engine::{bounded_output, EngineResult, RequestContext};
use crate::handlers::parse_status;
use crate::http::request::{read_body, RequestMeta};
use crate::http::response::{BodyEcho, Echo, EnvEcho, HeadersEcho, HostnameEcho};

pub async fn get(meta: RequestMeta) -> Json<Echo> {
    Json(meta.into())
}

pub async fn headers(meta: RequestMeta) -> Json<HeadersEcho> {
    Json(HeadersEcho {
        headers: meta.headers,
    })
}

pub async fn anything(
    ctx: RequestContext,
    meta: RequestMeta,
    body: Body,
) -> EngineResult<Response> {
    let body = read_body(&ctx, body).await?;
    Ok(bounded_output(Json(BodyEcho::new(meta, &body)?)))
}

pub async fn status(Path(code): Path<String>) -> EngineResult<Response> {
    Ok(parse_status(&code)?.into_response())
}

/// `HTTPBIN_ENV_*` variables captured at startup.
pub async fn env(ctx: RequestContext) -> Response {
    Json(EnvEcho {
        env: &ctx.settings().env,
    })
    .into_response()
}

/// Placeholder name unless the real hostname was resolved at startup.
pub async fn hostname(ctx: RequestContext) -> Response {
    Json(HostnameEcho {
        hostname: &ctx.settings().hostname,
    })
    .into_response()
}
