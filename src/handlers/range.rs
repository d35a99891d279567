//! `/range/{n}`: `n` deterministic bytes with single-range support.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::engine::{EngineError, EngineResult, RequestContext, StreamPlan};
use crate::handlers::{mark_clamped, paced_body, parse_count, parse_duration};
use crate::http::range::{parse_range, ByteRange};
use crate::http::request::RequestMeta;

const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024;

/// Byte at `offset` of every range resource.
pub fn pattern_byte(offset: u64) -> u8 {
    b'a' + (offset % 26) as u8
}

fn pattern(start: u64, len: u64) -> Bytes {
    (start..start + len).map(pattern_byte).collect::<Vec<_>>().into()
}

/// Optional query parameters: `chunk_size` (bytes per frame) and `duration`
/// (pacing across the frames, clamped to the budget).
pub async fn range(
    ctx: RequestContext,
    Path(raw): Path<String>,
    meta: RequestMeta,
    headers: HeaderMap,
) -> EngineResult<Response> {
    let len = parse_count("n", &raw)?;
    let limit = ctx.settings().max_body_size;
    if len == 0 || len > limit {
        return Err(EngineError::InvalidParameter(format!(
            "n must be between 1 and {limit}"
        )));
    }
    let chunk_size = match meta.arg("chunk_size") {
        Some(raw) => parse_count("chunk_size", raw)?,
        None => DEFAULT_CHUNK_SIZE,
    };
    if chunk_size == 0 {
        return Err(EngineError::InvalidParameter(
            "chunk_size must be at least 1".into(),
        ));
    }
    let duration = match meta.arg("duration") {
        Some(raw) => parse_duration("duration", raw)?,
        None => Duration::ZERO,
    };

    let requested = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (status, first, last) = match parse_range(requested, len) {
        ByteRange::Full => (StatusCode::OK, 0, len - 1),
        ByteRange::Partial(span) => (StatusCode::PARTIAL_CONTENT, *span.start(), *span.end()),
        ByteRange::NotSatisfiable => return Err(EngineError::RangeNotSatisfiable { len }),
    };
    let body_len = last - first + 1;

    let frames = body_len.div_ceil(chunk_size);
    let plan = StreamPlan::build(&ctx, frames, Some(body_len), Duration::ZERO, duration)?;
    let clamped = plan.is_clamped().then(|| plan.projected_duration());
    let body = paced_body(ctx, plan, move |offset, len| pattern(first + offset, len));

    let mut response = (
        status,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
            (header::CONTENT_LENGTH, body_len.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_owned()),
            (header::ETAG, format!("range{len}")),
        ],
        body,
    )
        .into_response();
    if status == StatusCode::PARTIAL_CONTENT {
        if let Ok(value) = format!("bytes {first}-{last}/{len}").parse() {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
    }
    if let Some(effective) = clamped {
        mark_clamped(&mut response, effective);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{app, app_with, body_bytes};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get(uri: &str, range: Option<&str>) -> axum::http::Response<Body> {
        let mut request = Request::get(uri);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }
        app().oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn full_body_without_range_header() {
        let response = get("/range/10", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(response.headers()[header::ETAG], "range10");
        assert_eq!(body_bytes(response).await, b"abcdefghij");
    }

    #[tokio::test]
    async fn single_range_is_partial_content() {
        let response = get("/range/10", Some("bytes=2-5")).await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(body_bytes(response).await, b"cdef");
    }

    #[tokio::test]
    async fn pattern_wraps_after_z() {
        let response = get("/range/30", Some("bytes=-5")).await;
        assert_eq!(body_bytes(response).await, b"zabcd");
    }

    #[tokio::test]
    async fn small_chunks_cover_the_same_bytes() {
        let response = get("/range/100?chunk_size=7", Some("bytes=10-")).await;
        let bytes = body_bytes(response).await;
        assert_eq!(bytes.len(), 90);
        assert_eq!(bytes[0], b'k');
        assert_eq!(bytes[89], super::pattern_byte(99));
    }

    #[tokio::test]
    async fn out_of_bounds_range_is_not_satisfiable() {
        let response = get("/range/10", Some("bytes=100-200")).await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[tokio::test]
    async fn multi_range_falls_back_to_full_body() {
        let response = get("/range/10", Some("bytes=0-1,3-4")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.len(), 10);
    }

    #[tokio::test]
    async fn size_outside_the_ceiling_is_rejected() {
        let app = app_with(|config| config.limits.max_body_size = 64);
        for uri in ["/range/0", "/range/65", "/range/ten"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }
}
