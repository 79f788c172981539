//! The response produced by a transport or by error recovery.
//!
//! A [`Response`] carries the parsed result of a call plus whatever
//! transport-level metadata the transport chose to attach. Response
//! interceptors receive it by value and may replace any part of it.

use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// The outcome of executing one request.
///
/// # Examples
///
/// ```
/// use callsheet::Response;
/// use http::{HeaderMap, HeaderValue, StatusCode};
/// use serde_json::json;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", HeaderValue::from_static("application/json"));
///
/// let response = Response::new(json!({ "name": "Testy" }))
///     .with_status(StatusCode::OK)
///     .with_headers(headers);
///
/// assert_eq!(response.parsed_result["name"], "Testy");
/// assert_eq!(response.header("content-type"), Some("application/json"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// The parsed result; `Null` when the response carried none.
    pub parsed_result: Value,

    /// The HTTP status code, when the transport reports one.
    pub status: Option<StatusCode>,

    /// The response headers.
    pub headers: HeaderMap,
}

impl Response {
    /// Creates a response holding `parsed_result` and no transport metadata.
    pub fn new(parsed_result: Value) -> Self {
        Self {
            parsed_result,
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a response without a result.
    ///
    /// Error handlers use this as a placeholder that later handlers can fill in.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns `true` if the response carries no result.
    pub fn is_empty(&self) -> bool {
        self.parsed_result.is_null()
    }

    /// Returns a header value by name, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Consumes the response and returns the parsed result.
    pub fn into_result(self) -> Value {
        self.parsed_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_response() {
        let response = Response::empty();
        assert!(response.is_empty());
        assert_eq!(response.status, None);
        assert_eq!(response.into_result(), Value::Null);
    }

    #[test]
    fn test_filled_response() {
        let response = Response::new(json!("fallback value")).with_status(StatusCode::NOT_FOUND);
        assert!(!response.is_empty());
        assert_eq!(response.status, Some(StatusCode::NOT_FOUND));
        assert_eq!(response.header("missing"), None);
        assert_eq!(response.into_result(), json!("fallback value"));
    }
}
