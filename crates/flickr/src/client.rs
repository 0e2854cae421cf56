use std::env;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::response::StatusBody;
use crate::ApiError;

pub const FLICKR_API_URL: &str = "https://api.flickr.com/services/rest/";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlickrCredentials {
    pub api_key: String,
    pub proxy: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FlickrCredentials {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            proxy: None,
            timeout_secs: None,
        }
    }

    /// Reads `FLICKR_API_KEY`, and optionally `FLICKR_PROXY` and
    /// `FLICKR_TIMEOUT_SECS`.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("FLICKR_API_KEY").ok()?;
        let proxy = env::var("FLICKR_PROXY").ok();
        let timeout_secs = env::var("FLICKR_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok());
        Some(Self {
            api_key,
            proxy,
            timeout_secs,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Performs plain GET requests. One call is one round trip, no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(credentials: &FlickrCredentials) -> Result<Self, ApiError> {
        let timeout = Duration::from_secs(credentials.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        /* build a new http client with optional proxy */
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(proxy_url) = &credentials.proxy {
            log::info!("Requesting Flickr using proxy '{proxy_url}'.");
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

pub struct FlickrClient {
    pub credentials: FlickrCredentials,
    transport: Arc<dyn Transport>,
}

impl FlickrClient {
    pub fn new(credentials: &FlickrCredentials) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(credentials)?;
        Ok(Self::with_transport(credentials, Arc::new(transport)))
    }

    pub fn with_transport(credentials: &FlickrCredentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials: credentials.clone(),
            transport,
        }
    }

    /// Call a REST method and decode its JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let base = [
            ("method", method.to_owned()),
            ("api_key", self.credentials.api_key.clone()),
            ("format", "json".to_owned()),
            ("nojsoncallback", "1".to_owned()),
        ];
        let url = Url::parse_with_params(FLICKR_API_URL, base.iter().chain(params.iter()))
            .map_err(|why| ApiError::InvalidUrl(why.to_string()))?;

        log::debug!("Requesting '{}'.", redacted(&url));
        let response = self.transport.get(&url).await?;
        let body = success_body(response, &url)?;

        /* flickr reports most failures with a 200 and "stat": "fail" */
        if let Ok(status) = serde_json::from_slice::<StatusBody>(&body) {
            if status.stat.as_deref() == Some("fail") {
                return Err(ApiError::Flickr {
                    code: status.code,
                    message: status.message().unwrap_or("unknown failure").to_owned(),
                });
            }
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Download the raw bytes behind an image URL.
    pub async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, ApiError> {
        let url = Url::parse(image_url).map_err(|_| ApiError::InvalidUrl(image_url.to_owned()))?;

        log::debug!("Fetching image '{url}'.");
        let response = self.transport.get(&url).await?;
        success_body(response, &url)
    }
}

fn success_body(response: HttpResponse, url: &Url) -> Result<Vec<u8>, ApiError> {
    if response.status.is_success() {
        return Ok(response.body);
    }
    Err(ApiError::InvalidResponse {
        status_code: response.status,
        url: redacted(url),
        message: server_message(&response.body),
    })
}

/// The status message of an error body, if the body is JSON carrying one.
fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<StatusBody>(body)
        .ok()?
        .message()
        .map(str::to_owned)
}

// never let the api key end up in logs or error messages
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "api_key" {
                "***".to_owned()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    if !pairs.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}
