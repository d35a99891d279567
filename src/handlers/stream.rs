//! `/stream/{n}`: `n` newline-delimited JSON lines, one per body frame.

use axum::{
    body::{Body, Bytes},
    extract::Path,
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::{stream, Stream};

use crate::engine::{bounded_output, EngineError, EngineResult, RequestContext};
use crate::handlers::parse_count;
use crate::http::request::RequestMeta;
use crate::http::response::StreamLine;

pub async fn stream(
    ctx: RequestContext,
    Path(raw): Path<String>,
    meta: RequestMeta,
) -> EngineResult<Response> {
    let n = parse_count("n", &raw)?;
    if n == 0 {
        return Err(EngineError::InvalidParameter("n must be at least 1".into()));
    }
    ctx.check()?;

    let body = Body::from_stream(json_lines(ctx, meta, n));
    Ok(bounded_output(
        ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
    ))
}

/// Lines in strictly increasing `id` order. Cancellation is checked before each
/// line; once it fires the stream yields one error and ends.
fn json_lines(
    ctx: RequestContext,
    meta: RequestMeta,
    n: u64,
) -> impl Stream<Item = Result<Bytes, EngineError>> + Send + 'static {
    stream::unfold(Some(0u64), move |next| {
        let step = next.and_then(|id| {
            if id >= n {
                return None;
            }
            if let Err(err) = ctx.check() {
                tracing::warn!(sent = id, total = n, "Stream stopped before completion");
                return Some((Err(err), None));
            }
            let line = StreamLine {
                id,
                args: &meta.args,
                headers: &meta.headers,
                origin: &meta.origin,
                url: &meta.url,
            };
            let item = serde_json::to_vec(&line)
                .map(|mut bytes| {
                    bytes.push(b'\n');
                    Bytes::from(bytes)
                })
                .map_err(|err| {
                    EngineError::Internal(format!("failed to encode stream line: {err}"))
                });
            Some((item, Some(id + 1)))
        });
        std::future::ready(step)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::testing::{app, app_with, body_bytes};
    use crate::config::ServerConfig;
    use crate::engine::Settings;
    use axum::http::{Request, StatusCode};
    use futures_util::StreamExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn lines_arrive_in_order() {
        let response = app()
            .oneshot(Request::get("/stream/5?x=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = body_bytes(response).await;
        let text = String::from_utf8(bytes).unwrap();
        let ids: Vec<u64> = text
            .lines()
            .map(|line| {
                let json: serde_json::Value = serde_json::from_str(line).unwrap();
                assert_eq!(json["args"]["x"][0], "1");
                json["id"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn zero_and_garbage_counts_are_rejected() {
        for uri in ["/stream/0", "/stream/lots"] {
            let response = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn output_past_the_body_ceiling_is_cut() {
        let app = app_with(|config| config.limits.max_body_size = 512);
        let response = app
            .oneshot(Request::get("/stream/1000").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
    }

    #[tokio::test]
    async fn disconnect_stops_emission() {
        let settings = Arc::new(Settings::from_config(&ServerConfig::default()));
        let (ctx, guard) = RequestContext::new(settings, None);
        let meta = RequestMeta::for_test("GET", Default::default());
        let mut lines = Box::pin(json_lines(ctx, meta, 1000));

        for _ in 0..3 {
            assert!(lines.next().await.unwrap().is_ok());
        }
        drop(guard);

        assert!(matches!(
            lines.next().await,
            Some(Err(EngineError::DeadlineExceeded))
        ));
        assert!(lines.next().await.is_none());
    }
}
