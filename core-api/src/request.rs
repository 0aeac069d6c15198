//! Request descriptors and responses.
//!
//! A [`RequestDescriptor`] is the serializable description of one upstream
//! call. It is what the gateway executes and what the offline queue persists,
//! so it carries only data that survives a restart: no tokens, no timeouts.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bridge_traits::{HttpMethod, HttpRequest};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Result;

/// One upstream call relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    /// Path plus query string, e.g. `/products?limit=30&skip=0`.
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Retries spent in the current attempt chain. The gateway resets it
    /// when a chain starts.
    #[serde(default)]
    pub retry_count: u32,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            retry_count: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON body.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Absolute URL; absolute paths are passed through untouched.
    pub fn resolve_url(&self, base_url: &str) -> String {
        if self.path.starts_with("http://") || self.path.starts_with("https://") {
            return self.path.clone();
        }
        let base = base_url.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }

    pub fn identity(&self, base_url: &str) -> RequestIdentity {
        RequestIdentity::new(self.method, &self.resolve_url(base_url))
    }

    /// Build the transport request for one attempt.
    pub fn to_http_request(
        &self,
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<HttpRequest> {
        let mut request =
            HttpRequest::new(self.method, self.resolve_url(base_url)).timeout(timeout);

        for (key, value) in &self.headers {
            request = request.header(key.clone(), value.clone());
        }
        if let Some(token) = token {
            request = request.bearer_token(token);
        }
        if let Some(body) = &self.body {
            request = request
                .header("Content-Type", "application/json")
                .body(Bytes::from(serde_json::to_vec(body)?));
        }

        Ok(request)
    }
}

/// Cache identity of a request: `(METHOD) url`.
///
/// Query strings are part of the URL, so `/products?skip=0` and
/// `/products?skip=30` are cached separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestIdentity(String);

impl RequestIdentity {
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self(format!("({}) {}", method, url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache { stored_at: DateTime<Utc> },
}

/// Response handed back to callers of the gateway.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self.source, ResponseSource::Cache { .. })
    }
}
