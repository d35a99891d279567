//! Redirect chains and `/redirect-to`.
//!
//! Every chain ends at `<prefix>/get`.

use axum::{
    extract::Path,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::engine::{EngineError, EngineResult, RequestContext};
use crate::handlers::parse_count;
use crate::http::request::RequestMeta;

fn found(location: &str) -> EngineResult<Response> {
    redirect_with(StatusCode::FOUND, location)
}

fn redirect_with(status: StatusCode, location: &str) -> EngineResult<Response> {
    let value = HeaderValue::from_str(location).map_err(|_| {
        EngineError::InvalidParameter(format!("invalid redirect location {location:?}"))
    })?;
    Ok((status, [(header::LOCATION, value)]).into_response())
}

/// Location of the next hop of a chain named `route`.
fn next_hop(ctx: &RequestContext, route: &str, n: u64) -> String {
    if n <= 1 {
        ctx.settings().path("/get")
    } else {
        ctx.settings().path(&format!("/{route}/{}", n - 1))
    }
}

fn absolute(meta: &RequestMeta, path: &str) -> String {
    format!("{}://{}{}", meta.scheme, meta.host, path)
}

/// `/redirect/{n}`; `?absolute=true` switches to absolute locations.
pub async fn redirect(
    ctx: RequestContext,
    Path(raw): Path<String>,
    meta: RequestMeta,
) -> EngineResult<Response> {
    let n = parse_count("n", &raw)?;
    if meta.arg("absolute").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return found(&absolute(&meta, &next_hop(&ctx, "absolute-redirect", n)));
    }
    found(&next_hop(&ctx, "redirect", n))
}

pub async fn relative_redirect(
    ctx: RequestContext,
    Path(raw): Path<String>,
) -> EngineResult<Response> {
    let n = parse_count("n", &raw)?;
    found(&next_hop(&ctx, "relative-redirect", n))
}

pub async fn absolute_redirect(
    ctx: RequestContext,
    Path(raw): Path<String>,
    meta: RequestMeta,
) -> EngineResult<Response> {
    let n = parse_count("n", &raw)?;
    found(&absolute(&meta, &next_hop(&ctx, "absolute-redirect", n)))
}

/// Query parameters: `url` (required) and `status_code` (300..=399, default 302).
pub async fn redirect_to(ctx: RequestContext, meta: RequestMeta) -> EngineResult<Response> {
    let target = meta
        .arg("url")
        .filter(|url| !url.is_empty())
        .ok_or_else(|| EngineError::InvalidParameter("missing required parameter url".into()))?;

    let status = match meta.arg("status_code") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|code| (300..=399).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| {
                EngineError::InvalidParameter(format!("invalid redirect status_code {raw:?}"))
            })?,
        None => StatusCode::FOUND,
    };

    let target = ctx.settings().redirect_allow_list.check(target)?;
    redirect_with(status, target)
}
