//! HTTP client used by the worker pool
//!
//! Workers only see the [`HttpExecutor`] trait, so the request path can be
//! driven by any client. [`HttpClient`] is the reqwest-backed implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

use crate::config::Method;
use crate::error::{RequestError, RunError};

/// A single outgoing request
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a Url,
    pub headers: &'a HashMap<String, String>,
    pub body: Option<&'a [u8]>,
}

/// Status line received; the body has not been read yet
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn ResponseBody>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ResponseBody: Send {
    /// Drain the body and return its length in bytes
    async fn read_all(self: Box<Self>) -> Result<u64, RequestError>;
}

#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Send the request and return once the response head has arrived.
    ///
    /// Connection, DNS and timeout failures are reported as
    /// [`RequestError::Transport`].
    async fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, RequestError>;
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("mrsi/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed executor; one instance is shared by every worker
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, RunError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| RunError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

/// reqwest's top-level messages omit the cause (e.g. "connection refused").
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl HttpExecutor for HttpClient {
    async fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, RequestError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());

        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::Transport(describe(&e)))?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            body: Box::new(ReqwestBody(response)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn read_all(self: Box<Self>) -> Result<u64, RequestError> {
        // The client timeout spans the body too; a stall here is a timeout.
        let bytes = self.0.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RequestError::Transport(describe(&e))
            } else {
                RequestError::BodyRead(describe(&e))
            }
        })?;
        Ok(bytes.len() as u64)
    }
}
