//! Blocking HTTP GET.
//!
//! Only what the engine needs: a status code and a text body. Retries and
//! caching belong to implementations, not to callers.

use std::collections::HashMap;
#[cfg(feature = "http")]
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};

/// Response to a GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> ServiceResult<HttpResponse>;
}

/// GET `url` and parse the body as JSON. Non-2xx becomes [`ServiceError::Http`].
pub fn get_json(http: &dyn HttpClient, url: &str) -> ServiceResult<Value> {
    let response = http.get(url)?;
    if !response.is_success() {
        return Err(ServiceError::Http {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(serde_json::from_str(&response.body)?)
}

/// Refuses every request. The default when no network access is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineHttpClient;

impl HttpClient for OfflineHttpClient {
    fn get(&self, url: &str) -> ServiceResult<HttpResponse> {
        Err(ServiceError::Transport(format!(
            "network access disabled: {url}"
        )))
    }
}

/// Serves canned responses from memory; unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct StaticHttpClient {
    responses: RwLock<HashMap<String, HttpResponse>>,
}

impl StaticHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses.write().insert(url.into(), response);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.insert(url, response);
        self
    }
}

impl HttpClient for StaticHttpClient {
    fn get(&self, url: &str) -> ServiceResult<HttpResponse> {
        Ok(self
            .responses
            .read()
            .get(url)
            .cloned()
            .unwrap_or(HttpResponse {
                status: 404,
                body: String::new(),
            }))
    }
}

/// `reqwest` blocking client.
#[cfg(feature = "http")]
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vc-auditor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str) -> ServiceResult<HttpResponse> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ServiceError::Transport(format!("GET {url}: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ServiceError::Transport(format!("GET {url}: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}
