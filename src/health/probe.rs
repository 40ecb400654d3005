//! Health probe transport.
//!
//! # Responsibilities
//! - Issue one bounded-time HTTP request per check
//! - Report the status code or a typed probe error
//!
//! # Design Decisions
//! - Non-blocking hyper client so sibling checks interleave on the runtime
//! - No retries; one attempt per firing
//! - The `Probe` trait is the seam for alternative transports and tests

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper::{header, Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::health::result::{ProbeError, ProbeOutcome};

const USER_AGENT: &str = "health-share-check";

/// HTTP methods a health check may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
}

impl HttpMethod {
    pub const SUPPORTED: [&'static str; 2] = ["GET", "HEAD"];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
        }
    }

    fn to_http(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Case-insensitive; anything other than GET or HEAD is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub uri: String,
    pub method: HttpMethod,
    pub timeout: Duration,
}

/// Something that can check an endpoint once.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> ProbeOutcome;
}

/// HTTP probe over a pooled hyper client.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, request: &ProbeRequest) -> ProbeOutcome {
        let uri: Uri = request
            .uri
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| ProbeError::InvalidUri(e.to_string()))?;

        let http_request = Request::builder()
            .method(request.method.to_http())
            .uri(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
            .map_err(|e| ProbeError::LocalResource(e.to_string()))?;

        match time::timeout(request.timeout, self.client.request(http_request)).await {
            Ok(Ok(response)) => Ok(response.status().as_u16()),
            Ok(Err(e)) => Err(ProbeError::Connect(error_chain(&e))),
            Err(_) => Err(ProbeError::Timeout(request.timeout)),
        }
    }
}

/// Render an error with its sources, e.g. `client error (Connect): Connection refused`.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("head".parse::<HttpMethod>(), Ok(HttpMethod::Head));
        assert_eq!("Get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("POST".parse::<HttpMethod>(), Err("POST".to_string()));
        assert!("".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_default_method_is_get() {
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[tokio::test]
    async fn test_invalid_uri() {
        let probe = HttpProbe::new();
        let request = ProbeRequest {
            uri: "http://bad host:80/health".into(),
            method: HttpMethod::Get,
            timeout: Duration::from_secs(1),
        };
        let outcome = probe.probe(&request).await;
        assert!(matches!(outcome, Err(ProbeError::InvalidUri(_))));
    }
}
