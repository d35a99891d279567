//! `/drip`: a fixed number of `*` bytes trickled over a duration.

use std::time::Duration;

use axum::{
    body::Bytes,
    http::header,
    response::{IntoResponse, Response},
};

use crate::engine::{EngineError, EngineResult, RequestContext, StreamPlan};
use crate::handlers::{mark_clamped, paced_body, parse_count, parse_duration, parse_status};
use crate::http::request::RequestMeta;

const DEFAULT_NUMBYTES: u64 = 10;
const DEFAULT_DURATION: Duration = Duration::from_secs(2);

/// Query parameters: `numbytes`, `duration`, `delay`, `code`, `chunks`.
///
/// `delay` passes before the headers go out; the first chunk follows the headers
/// immediately and the rest are spaced by `duration / chunks`.
pub async fn drip(ctx: RequestContext, meta: RequestMeta) -> EngineResult<Response> {
    let numbytes = match meta.arg("numbytes") {
        Some(raw) => parse_count("numbytes", raw)?,
        None => DEFAULT_NUMBYTES,
    };
    if numbytes == 0 {
        return Err(EngineError::InvalidParameter(
            "numbytes must be at least 1".into(),
        ));
    }
    let duration = match meta.arg("duration") {
        Some(raw) => parse_duration("duration", raw)?,
        None => DEFAULT_DURATION,
    };
    let delay = match meta.arg("delay") {
        Some(raw) => parse_duration("delay", raw)?,
        None => Duration::ZERO,
    };
    let status = match meta.arg("code") {
        Some(raw) => parse_status(raw)?,
        None => axum::http::StatusCode::OK,
    };
    let chunks = match meta.arg("chunks") {
        Some(raw) => parse_count("chunks", raw)?,
        None => numbytes,
    };

    let plan = StreamPlan::build(&ctx, chunks, Some(numbytes), delay, duration)?;
    ctx.sleep_until(plan.start_at()).await?;

    tracing::debug!(
        numbytes,
        chunks,
        interval_ms = plan.interval().as_millis() as u64,
        "Dripping response"
    );

    let clamped = plan.is_clamped().then(|| plan.projected_duration());
    let body = paced_body(ctx, plan, |_, len| {
        Bytes::from(vec![b'*'; usize::try_from(len).unwrap_or_default()])
    });

    let mut response = (
        status,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
            (header::CONTENT_LENGTH, numbytes.to_string()),
        ],
        body,
    )
        .into_response();
    if let Some(effective) = clamped {
        mark_clamped(&mut response, effective);
    }
    Ok(response)
}
