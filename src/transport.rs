//! HTTP transport.
//!
//! Sends one [`Request`] and normalizes the answer into a [`Response`].
//! Status codes are not interpreted here; that is the session's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{NuageError, Result};
use crate::request::Request;
use crate::response::Response;

const USER_AGENT: &str = concat!("nuagerest/", env!("CARGO_PKG_VERSION"));

/// Long enough for the server to hold an events poll open.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Sends requests over the wire.
///
/// A transport-level failure (connection refused, TLS failure, broken
/// response) is returned as is and never retried.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: &Request) -> Result<Response>;
}

/// `reqwest` based transport.
///
/// Certificate validation is disabled: API endpoints are commonly served
/// with self-signed certificates.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(timeout)
            .build()
            .map_err(NuageError::Http)?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: &Request) -> Result<Response> {
        let url = request.full_url()?;

        tracing::info!("Req : {} {}", request.method, url);
        tracing::debug!("Req : Headers: {:?}", redacted(request));
        tracing::debug!("Req : Data: {}", String::from_utf8_lossy(&request.body));

        let mut builder = self.http.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let native = builder.send().await.map_err(NuageError::Http)?;

        let mut response = Response::new(native.status().as_u16());
        for name in native.headers().keys() {
            let joined = native
                .headers()
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            response.set_header(name.as_str(), joined);
        }
        response.body = native.bytes().await.map_err(NuageError::Http)?.to_vec();

        tracing::debug!("Resp: {}", response.code);
        tracing::debug!("Resp: Data: {}", String::from_utf8_lossy(&response.body));

        Ok(response)
    }
}

/// Request headers with the credentials masked, for logging.
fn redacted(request: &Request) -> Vec<(&str, &str)> {
    request
        .headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization") {
                (name.as_str(), "<redacted>")
            } else {
                (name.as_str(), value.as_str())
            }
        })
        .collect()
}
