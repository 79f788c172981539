//! The transport boundary and the default `reqwest` transport.
//!
//! The pipeline hands every final [`Request`] to a [`Transport`] exactly once.
//! What the transport does on the wire, and which errors it raises, is opaque
//! to the pipeline: errors go straight to the error handler chain.

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Executes a request and produces a response.
///
/// # Examples
///
/// ```
/// use callsheet::{BoxError, Request, Response, Transport};
/// use serde_json::json;
///
/// struct Canned;
///
/// #[async_trait::async_trait]
/// impl Transport for Canned {
///     async fn execute(&self, request: &Request) -> Result<Response, BoxError> {
///         Ok(Response::new(json!({ "url": request.url })))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes `request`.
    async fn execute(&self, request: &Request) -> Result<Response, BoxError>;
}

/// A transport backed by a synchronous function.
///
/// Useful for tests and for adapting blocking clients.
///
/// ```
/// use callsheet::{transport, Response};
///
/// let canned = transport::from_fn(|_request| Ok(Response::empty()));
/// # let _ = canned;
/// ```
pub struct FnTransport<F> {
    f: F,
}

/// Wraps `f` into a [`Transport`].
pub fn from_fn<F>(f: F) -> FnTransport<F>
where
    F: Fn(&Request) -> Result<Response, BoxError> + Send + Sync,
{
    FnTransport { f }
}

#[async_trait]
impl<F> Transport for FnTransport<F>
where
    F: Fn(&Request) -> Result<Response, BoxError> + Send + Sync,
{
    async fn execute(&self, request: &Request) -> Result<Response, BoxError> {
        (self.f)(request)
    }
}

/// Errors raised by [`ReqwestTransport`].
///
/// Error handlers receive these boxed; downcast to inspect them:
///
/// ```
/// use callsheet::{BoxError, TransportError};
///
/// fn is_not_found(error: &BoxError) -> bool {
///     error
///         .downcast_ref::<TransportError>()
///         .and_then(TransportError::status)
///         .is_some_and(|status| status.as_u16() == 404)
/// }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The server returned a non-2xx status code.
    #[error("HTTP error {status}: {raw_response}")]
    HttpStatus {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// The response body could not be parsed.
    #[error("Failed to decode response (status {status}): {serde_error}")]
    Decode {
        /// The raw response body
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// A header or transport setting is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    /// Returns the HTTP status code if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::HttpStatus { status, .. } => Some(*status),
            TransportError::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if the server answered.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            TransportError::HttpStatus { raw_response, .. } => Some(raw_response),
            TransportError::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(error)
        }
    }
}

/// Result shape hint that makes [`ReqwestTransport`] return the body as text.
pub const TEXT_SHAPE: &str = "text";

/// The default transport, built on `reqwest`.
///
/// * query parameters are appended to the request URL in map order
/// * every header value is sent, repeated names included
/// * the body is sent as JSON
/// * non-2xx responses fail with [`TransportError::HttpStatus`]
/// * an empty body yields a `Null` result; a body is parsed as JSON unless
///   the request's shape hint is [`TEXT_SHAPE`]
///
/// # Examples
///
/// ```no_run
/// use callsheet::ReqwestTransport;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), callsheet::TransportError> {
/// let transport = ReqwestTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    /// Creates a new `ReqwestTransportBuilder`.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Builds the final URL, query parameters included.
    fn build_url(request: &Request) -> Result<Url, TransportError> {
        let mut url = Url::parse(&request.url)?;
        if !request.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in request.query_params.pairs() {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let url = Self::build_url(request)?;

        tracing::debug!(
            method = %request.http_method,
            url = %url,
            call = %request.call,
            "Executing HTTP request"
        );

        let mut builder = self
            .http_client
            .request(http::Method::from(request.http_method), url);

        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }

        for (name, value) in request.headers.pairs() {
            let name = HeaderName::try_from(name).map_err(|e| {
                TransportError::Configuration(format!("Invalid header name: {}", e))
            })?;
            let value = HeaderValue::try_from(value).map_err(|e| {
                TransportError::Configuration(format!("Invalid header value: {}", e))
            })?;
            builder = builder.header(name, value);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        self.parse_response(response, request.response_shape.as_deref())
            .await
    }

    async fn parse_response(
        &self,
        response: reqwest::Response,
        shape: Option<&str>,
    ) -> Result<Response, TransportError> {
        let status = response.status();
        let headers = response.headers().clone();

        tracing::info!(status = status.as_u16(), "Received HTTP response");

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();

            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
            } else if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            }

            return Err(TransportError::HttpStatus {
                status,
                raw_response,
                headers,
            });
        }

        let raw_body = response.text().await?;

        let parsed_result = if raw_body.is_empty() {
            Value::Null
        } else if shape == Some(TEXT_SHAPE) {
            Value::String(raw_body)
        } else {
            match serde_json::from_str::<Value>(&raw_body) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        raw_response = %raw_body,
                        "Failed to decode response"
                    );
                    return Err(TransportError::Decode {
                        raw_response: raw_body,
                        serde_error: e.to_string(),
                        status,
                    });
                }
            }
        };

        Ok(Response::new(parsed_result)
            .with_status(status)
            .with_headers(headers))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &Request) -> Result<Response, BoxError> {
        self.send(request).await.map_err(Into::into)
    }
}

/// Builder for configuring and creating a [`ReqwestTransport`].
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl ReqwestTransportBuilder {
    /// Creates a new `ReqwestTransportBuilder` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header that will be sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, TransportError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| TransportError::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| TransportError::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.append(name, value);
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `ReqwestTransport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            TransportError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(ReqwestTransport {
            http_client,
            default_headers: self.default_headers,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::HttpMethod;

    #[test]
    fn test_build_url_appends_query_params() {
        let mut request = Request::new("list", "https://www.example.com/entity");
        request.query_params.add("page", "1");
        request.query_params.add("tag", "a b");
        request.query_params.add("tag", "c");

        let url = ReqwestTransport::build_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.example.com/entity?page=1&tag=a+b&tag=c"
        );
    }

    #[test]
    fn test_build_url_rejects_relative() {
        let request = Request::new("list", "/entity");
        assert!(matches!(
            ReqwestTransport::build_url(&request),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_invalid_default_header() {
        let result = ReqwestTransport::builder().default_header("bad header", "x");
        assert!(matches!(result, Err(TransportError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_fn_transport() {
        let transport = from_fn(|request| {
            assert_eq!(request.http_method, HttpMethod::Get);
            Ok(Response::new(Value::String(request.url.clone())))
        });

        let response = transport
            .execute(&Request::new("get", "https://www.example.com"))
            .await
            .unwrap();
        assert_eq!(response.parsed_result, "https://www.example.com");
    }

    #[test]
    fn test_transport_error_accessors() {
        let error = TransportError::HttpStatus {
            status: StatusCode::NOT_FOUND,
            raw_response: "Not found".to_string(),
            headers: HeaderMap::new(),
        };
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(error.raw_response(), Some("Not found"));
        assert_eq!(TransportError::Timeout.status(), None);
    }
}
