use super::ApiError;
use crate::config::ApiConfig;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Which statuses count as success for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any 2xx.
    Success,
    /// Exactly 200; the update and delete endpoints answer nothing else.
    Ok,
}

impl Expect {
    fn accepts(self, status: StatusCode) -> bool {
        match self {
            Expect::Success => status.is_success(),
            Expect::Ok => status == StatusCode::OK,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct HttpClient {
    inner: reqwest::Client,
    base: Url,
    timeout_secs: u64,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.resolved_base_url();
        let base = Url::parse(&base_url).map_err(|e| ApiError::Url {
            reason: format!("{}: {}", base_url, e),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Url {
                reason: format!("{} cannot be used as a base URL", base_url),
            });
        }

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Client {
                reason: e.to_string(),
            })?;

        Ok(Self {
            inner,
            base,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Base URL with `segments` appended as percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let body = self
            .execute(self.inner.request(Method::GET, url), Expect::Success, fallback)
            .await?;
        decode(&body)
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        url: Url,
        payload: &B,
        expect: Expect,
        fallback: &str,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.inner.request(method, url).json(payload), expect, fallback)
            .await?;
        decode(&body)
    }

    pub async fn delete(&self, url: Url, fallback: &str) -> Result<(), ApiError> {
        self.execute(self.inner.request(Method::DELETE, url), Expect::Ok, fallback)
            .await
            .map(|_| ())
    }

    /// Send one request. No retries: a failed call is reported to the caller
    /// as-is.
    async fn execute(
        &self,
        req: RequestBuilder,
        expect: Expect,
        fallback: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let resp = req.send().await.map_err(|e| {
            warn!("Request failed: {}", e);
            if e.is_timeout() {
                ApiError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                ApiError::Network {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        debug!("{} {}", status, resp.url());
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network {
                reason: e.to_string(),
            })?
            .to_vec();

        if expect.accepts(status) {
            return Ok(body);
        }

        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        warn!("Server answered {}: {}", status, message);
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        reason: e.to_string(),
    })
}
