use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("request to {url} failed: {reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read-only network access. Every fetch the gallery performs goes through
/// this trait so the loader and caches can run against stubs.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache");
        let url = url.to_string();

        async move {
            let response = request.send().await.map_err(|error| TransportError {
                url: url.clone(),
                reason: error.to_string(),
            })?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(|error| TransportError {
                url: url.clone(),
                reason: format!("failed to read body: {error}"),
            })?;

            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        }
    }
}

/// Joins a relative resource path onto the base url.
pub fn join_url(base_url: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
