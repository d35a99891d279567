//! Response bodies for the display endpoints.
//!
//! Field names and their order follow the httpbin JSON contract.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::engine::{EngineError, EngineResult};
use crate::http::request::{parse_query, MultiMap, RequestMeta};

/// `/get` style echo.
#[derive(Debug, Serialize)]
pub struct Echo {
    pub args: MultiMap,
    pub headers: MultiMap,
    pub method: String,
    pub origin: String,
    pub url: String,
}

impl From<RequestMeta> for Echo {
    fn from(meta: RequestMeta) -> Self {
        Self {
            args: meta.args,
            headers: meta.headers,
            method: meta.method,
            origin: meta.origin,
            url: meta.url,
        }
    }
}

/// Echo of a request that may carry a body.
#[derive(Debug, Serialize)]
pub struct BodyEcho {
    #[serde(flatten)]
    pub echo: Echo,
    pub data: String,
    pub files: MultiMap,
    pub form: MultiMap,
    pub json: Value,
}

impl BodyEcho {
    /// Decode `body` according to the request's content type.
    pub fn new(meta: RequestMeta, body: &[u8]) -> EngineResult<Self> {
        let content_type = meta
            .content_type()
            .map(|ct| ct.to_ascii_lowercase())
            .unwrap_or_default();

        let form = if content_type.starts_with("application/x-www-form-urlencoded") {
            parse_query(&String::from_utf8_lossy(body))
        } else {
            MultiMap::new()
        };

        let json = if content_type.contains("json") && !body.is_empty() {
            serde_json::from_slice(body).map_err(|err| {
                EngineError::InvalidParameter(format!("failed to parse JSON body: {err}"))
            })?
        } else {
            Value::Null
        };

        Ok(Self {
            echo: meta.into(),
            data: String::from_utf8_lossy(body).into_owned(),
            files: MultiMap::new(),
            form,
            json,
        })
    }
}

/// `/headers` body.
#[derive(Debug, Serialize)]
pub struct HeadersEcho {
    pub headers: MultiMap,
}

/// `/env` body.
#[derive(Debug, Serialize)]
pub struct EnvEcho<'a> {
    pub env: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct HostnameEcho<'a> {
    pub hostname: &'a str,
}

/// One line of `/stream/{n}`.
#[derive(Debug, Serialize)]
pub struct StreamLine<'a> {
    pub id: u64,
    pub args: &'a MultiMap,
    pub headers: &'a MultiMap,
    pub origin: &'a str,
    pub url: &'a str,
}
