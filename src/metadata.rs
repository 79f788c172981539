//! The compiled descriptor model of a call-set.
//!
//! These types are produced once by a [`Compiler`](crate::Compiler) and are
//! read-only afterwards. A [`Client`](crate::Client) keeps its
//! [`ClientDescriptor`] behind an `Arc` and shares it between every clone and
//! every in-flight invocation.

use crate::multimap::MultiValueMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The HTTP method of a declared call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`, the default for calls that do not name a method.
    #[default]
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// `TRACE`
    Trace,
}

impl HttpMethod {
    /// Returns the method as an upper-case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Options => http::Method::OPTIONS,
            HttpMethod::Trace => http::Method::TRACE,
        }
    }
}

/// How one positional argument of a call contributes to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterDescriptor {
    /// The argument is ignored when building the request.
    None,
    /// The argument is a full URL or a path fragment joined to the host.
    Url,
    /// The argument replaces the `{name}` placeholder in the URL.
    PathParam(String),
    /// The argument is a single query parameter value.
    QueryParam(String),
    /// The argument is a map of query parameter names to values.
    QueryParamMap,
    /// The argument is a single header value.
    HttpHeader(String),
    /// The argument is a map of header names to values.
    HttpHeaderMap,
    /// The argument is the request body.
    RequestBody,
}

impl ParameterDescriptor {
    /// Returns the name carried by named kinds.
    pub fn name(&self) -> Option<&str> {
        match self {
            ParameterDescriptor::PathParam(name)
            | ParameterDescriptor::QueryParam(name)
            | ParameterDescriptor::HttpHeader(name) => Some(name),
            _ => None,
        }
    }
}

/// Compiled metadata of one HTTP call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodDescriptor {
    /// The HTTP method.
    pub http_method: HttpMethod,

    /// A full URL or a path fragment; empty when the call uses the host alone.
    pub url_template: String,

    /// Static headers, in declaration order.
    pub headers: MultiValueMap,

    /// Static query parameters, in declaration order.
    pub query_params: MultiValueMap,

    /// One descriptor per positional argument.
    pub parameters: Vec<ParameterDescriptor>,

    /// Opaque hint for the transport about the expected result.
    pub response_shape: Option<String>,
}

/// Compiled metadata of a whole call-set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDescriptor {
    /// The client name.
    pub name: String,

    /// Base URL that path fragments are joined to.
    pub host: String,

    /// Compiled calls keyed by call name.
    pub methods: HashMap<String, MethodDescriptor>,
}

impl ClientDescriptor {
    /// Returns the compiled metadata of `call`, if it was declared as an HTTP call.
    pub fn method(&self, call: &str) -> Option<&MethodDescriptor> {
        self.methods.get(call)
    }

    /// Iterates over the names of all compiled calls.
    pub fn call_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_defaults_to_get() {
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
        assert_eq!(MethodDescriptor::default().http_method, HttpMethod::Get);
    }

    #[test]
    fn test_http_method_conversion() {
        assert_eq!(http::Method::from(HttpMethod::Patch), http::Method::PATCH);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        let parsed: HttpMethod = serde_json::from_str("\"POST\"").unwrap();
        assert_eq!(parsed, HttpMethod::Post);
    }

    #[test]
    fn test_parameter_names() {
        assert_eq!(
            ParameterDescriptor::PathParam("id".to_string()).name(),
            Some("id")
        );
        assert_eq!(ParameterDescriptor::HttpHeaderMap.name(), None);
        assert_eq!(ParameterDescriptor::RequestBody.name(), None);
    }
}
