//! `/delay/{delay}`: answer with an echo after a client-chosen pause.

use axum::{body::Body, extract::Path, response::Response, Json};

use crate::engine::{bounded_output, EngineResult, RequestContext};
use crate::handlers::{mark_clamped, parse_duration};
use crate::http::request::{read_body, RequestMeta};
use crate::http::response::BodyEcho;

/// The pause is cut to what is left of the duration budget, never extended past it.
pub async fn delay(
    ctx: RequestContext,
    Path(raw): Path<String>,
    meta: RequestMeta,
    body: Body,
) -> EngineResult<Response> {
    let requested = parse_duration("delay", &raw)?;
    let body = read_body(&ctx, body).await?;

    let (granted, clamped) = ctx.clamp(requested);
    ctx.sleep(granted).await?;

    let mut response = bounded_output(Json(BodyEcho::new(meta, &body)?));
    if clamped {
        mark_clamped(&mut response, granted);
    }
    Ok(response)
}
