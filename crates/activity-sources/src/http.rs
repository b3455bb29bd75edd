use std::time::Duration;

use activity_core::config::{PAGE_THROTTLE, REQUEST_TIMEOUT};
use activity_core::retry::{with_retry, RetryPolicy};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Result, SourceError};

const USER_AGENT: &str = concat!("activity-report/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in [`SourceError::Status`].
const MAX_ERROR_BODY: usize = 300;

// ─── Response ─────────────────────────────────────────────────────────────

/// A decoded 2xx response plus its headers (for `Link` pagination).
#[derive(Debug)]
pub struct Response<T> {
    pub body: T,
    pub headers: HeaderMap,
}

impl<T> Response<T> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ─── ApiClient ────────────────────────────────────────────────────────────

/// One authenticated upstream API.
///
/// Every request goes through [`with_retry`] with this client's policy, so
/// transport errors, timeouts, non-2xx statuses, undecodable bodies and
/// API-level errors reported by a `check` function are all retried alike.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    retry: RetryPolicy,
    throttle: Duration,
}

impl ApiClient {
    /// `authorization` is the full header value (`Bearer …` or a raw key).
    pub fn new(base_url: &str, authorization: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(authorization)
            .map_err(|_| SourceError::Api("token contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            retry: RetryPolicy::default(),
            throttle: PAGE_THROTTLE,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn throttle(&self) -> Duration {
        self.throttle
    }

    /// Absolute URL for `path`. Absolute URLs (e.g. from a `Link` header)
    /// pass through untouched; an empty path is the base URL itself.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Retried GET returning the decoded body and headers.
    pub async fn get<T>(&self, context: &str, path: &str, query: &[(&str, String)]) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        self.request(context, |c| c.get(&url).query(query), Ok).await
    }

    /// Retried POST of a JSON body.
    pub async fn post<T, B>(&self, context: &str, path: &str, body: &B) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        self.request(context, |c| c.post(&url).json(body), Ok).await
    }

    /// Retried request with an API-specific `check` run on every 2xx
    /// response. A `check` error counts as a failed attempt.
    pub async fn request<T, U, B, C>(&self, context: &str, build: B, check: C) -> Result<U>
    where
        T: DeserializeOwned,
        B: Fn(&reqwest::Client) -> RequestBuilder,
        C: Fn(Response<T>) -> Result<U>,
    {
        let build = &build;
        let check = &check;
        let client = &self.client;
        let headers = &self.headers;
        let result = with_retry(&self.retry, context, move || async move {
            let request = build(client).headers(headers.clone());
            check(send::<T>(request).await?)
        })
        .await;
        result.map_err(SourceError::from)
    }
}

/// One attempt: send, require 2xx, decode JSON.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<Response<T>> {
    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: text.chars().take(MAX_ERROR_BODY).collect(),
        });
    }
    let body = serde_json::from_str(&text)?;
    Ok(Response { body, headers })
}
