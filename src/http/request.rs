//! Request-side extraction.
//!
//! # Responsibilities
//! - Hand handlers their [`RequestContext`]
//! - Snapshot request metadata for echo responses ([`RequestMeta`])
//! - Read request bodies under the body ceiling and the deadline
//!
//! # Design Decisions
//! - Header filtering happens here, once, so every display endpoint agrees
//! - Maps are ordered (`BTreeMap`) so echoed JSON is stable

use std::collections::BTreeMap;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, OriginalUri},
    http::{header, request::Parts, HeaderMap},
};

use crate::engine::{find_body_too_large, EngineError, EngineResult, RequestContext};

/// Multi-valued, ordered string map used for args, headers and form fields.
pub type MultiMap = BTreeMap<String, Vec<String>>;

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| EngineError::Internal("request context not installed".into()))
    }
}

/// What a display endpoint reports about the incoming request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: String,
    pub args: MultiMap,
    pub headers: MultiMap,
    pub origin: String,
    pub url: String,
    /// `http` or `https`, as the client sees it.
    pub scheme: String,
    pub host: String,
    content_type: Option<String>,
}

impl RequestMeta {
    /// First value of query argument `name`.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn for_test(method: &str, headers: HeaderMap) -> Self {
        Self {
            method: method.to_owned(),
            args: MultiMap::new(),
            headers: MultiMap::new(),
            origin: "127.0.0.1".to_owned(),
            url: "http://localhost/anything".to_owned(),
            scheme: "http".to_owned(),
            host: "localhost".to_owned(),
            content_type: header_str(&headers, header::CONTENT_TYPE.as_str()).map(str::to_owned),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        let settings = ctx.settings();

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |OriginalUri(uri)| uri.clone());

        let args = uri.query().map(parse_query).unwrap_or_default();

        let mut headers = MultiMap::new();
        for (name, value) in settings.header_filter.visible(&parts.headers) {
            headers
                .entry(canonical_header_name(name.as_str()))
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let origin = forwarded_for(&parts.headers)
            .or_else(|| ctx.peer().map(|peer| peer.ip().to_string()))
            .unwrap_or_default();

        let scheme = header_str(&parts.headers, "x-forwarded-proto")
            .map(str::to_owned)
            .unwrap_or_else(|| if settings.tls { "https" } else { "http" }.to_owned());
        let host = header_str(&parts.headers, header::HOST.as_str())
            .map(str::to_owned)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_owned());
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

        Ok(Self {
            method: parts.method.to_string(),
            args,
            headers,
            origin,
            url: format!("{scheme}://{host}{path_and_query}"),
            scheme,
            host,
            content_type: header_str(&parts.headers, header::CONTENT_TYPE.as_str())
                .map(str::to_owned),
        })
    }
}

/// Decode a query string or urlencoded form into an ordered multi-map.
pub fn parse_query(query: &str) -> MultiMap {
    let mut map = MultiMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        map.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    map
}

/// `x-foo-bar` becomes `X-Foo-Bar`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            let mut word = String::with_capacity(part.len());
            if let Some(first) = chars.next() {
                word.push(first.to_ascii_uppercase());
                word.push_str(&chars.as_str().to_ascii_lowercase());
            }
            word
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|first| first.trim().to_owned())
        .filter(|first| !first.is_empty())
}

/// Read the whole request body.
///
/// Fails with `BodyTooLarge` when the ceiling trips and with `DeadlineExceeded`
/// when the request is cancelled while waiting for bytes.
pub async fn read_body(ctx: &RequestContext, body: Body) -> EngineResult<Bytes> {
    tokio::select! {
        biased;
        result = axum::body::to_bytes(body, usize::MAX) => result.map_err(|err| {
            match find_body_too_large(&err) {
                Some(tripped) => EngineError::BodyTooLarge { limit: tripped.limit },
                None => EngineError::InvalidParameter(format!("failed to read request body: {err}")),
            }
        }),
        () = ctx.cancelled() => Err(EngineError::DeadlineExceeded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_canonicalized() {
        assert_eq!(canonical_header_name("x-foo-bar"), "X-Foo-Bar");
        assert_eq!(canonical_header_name("HOST"), "Host");
        assert_eq!(canonical_header_name("dnt"), "Dnt");
    }

    #[test]
    fn repeated_query_keys_keep_every_value() {
        let args = parse_query("b=2&a=1&b=3&empty=");
        assert_eq!(args["a"], vec!["1"]);
        assert_eq!(args["b"], vec!["2", "3"]);
        assert_eq!(args["empty"], vec![""]);
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["a", "b", "empty"]);
    }

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(forwarded_for(&headers).as_deref(), Some("203.0.113.9"));
    }
}
