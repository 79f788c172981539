//! Call-set descriptions: the declarative input of the compiler.
//!
//! A [`CallSetDescription`] says which calls a client offers and how each one
//! maps onto an HTTP request. It can be built in code with the fluent helpers
//! below, loaded from JSON, or produced by a type implementing [`CallSet`].
//!
//! ```
//! use callsheet::{CallDescription, CallSetDescription, ClientAttributes, HttpMethod,
//!     ParamDescription, RequestAttributes};
//!
//! let description = CallSetDescription::new("PeopleRepository")
//!     .client(ClientAttributes::new("https://people.example.com"))
//!     .call(
//!         CallDescription::http("get", RequestAttributes::new().value("/person/{id}"))
//!             .param(ParamDescription::path("id", "id"))
//!             .returns("Person"),
//!     )
//!     .call(
//!         CallDescription::http(
//!             "create",
//!             RequestAttributes::with_method(HttpMethod::Post)
//!                 .value("/person")
//!                 .header("Content-Type=application/json"),
//!         )
//!         .param(ParamDescription::body("person")),
//!     );
//!
//! assert_eq!(description.calls.len(), 2);
//! ```

use crate::metadata::HttpMethod;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A type that declares a call-set.
///
/// ```
/// use callsheet::{CallDescription, CallSet, CallSetDescription, ClientAttributes,
///     RequestAttributes};
///
/// struct StatusApi;
///
/// impl CallSet for StatusApi {
///     fn describe() -> CallSetDescription {
///         CallSetDescription::new("StatusApi")
///             .client(ClientAttributes::new("https://status.example.com"))
///             .call(CallDescription::http("health", RequestAttributes::new().value("/health")))
///     }
/// }
/// ```
pub trait CallSet {
    /// Returns the description of this call-set.
    fn describe() -> CallSetDescription;
}

/// The declarative description of a client's remote calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallSetDescription {
    /// Name of the declaring type; used as the client name when the root
    /// marker does not give one.
    pub type_name: String,

    /// The root marker. A description without it is not a call-set.
    pub client: Option<ClientAttributes>,

    /// Declared calls, HTTP or not.
    pub calls: Vec<CallDescription>,
}

impl CallSetDescription {
    /// Creates a description without a root marker and without calls.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            client: None,
            calls: Vec::new(),
        }
    }

    /// Loads a description from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClientDescription`] if the JSON does not match
    /// the description format.
    ///
    /// ```
    /// use callsheet::CallSetDescription;
    ///
    /// let description = CallSetDescription::from_json(r#"{
    ///     "type_name": "Entities",
    ///     "client": { "host": "https://www.example.com" },
    ///     "calls": [
    ///         { "name": "list", "request": { "value": "/entity", "query_params": ["page=0"] } }
    ///     ]
    /// }"#).unwrap();
    ///
    /// assert_eq!(description.calls[0].name, "list");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidClientDescription {
            reason: format!("Failed to parse description: {}", e),
        })
    }

    /// Sets the root marker.
    pub fn client(mut self, client: ClientAttributes) -> Self {
        self.client = Some(client);
        self
    }

    /// Adds a call.
    pub fn call(mut self, call: CallDescription) -> Self {
        self.calls.push(call);
        self
    }
}

/// Attributes of the root marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientAttributes {
    /// Client name; falls back to the description's type name.
    pub name: Option<String>,

    /// Base URL for calls declared with path fragments.
    pub host: String,
}

impl ClientAttributes {
    /// Creates root attributes for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            name: None,
            host: host.into(),
        }
    }

    /// Sets the client name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One declared call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallDescription {
    /// The call name used to invoke it.
    pub name: String,

    /// The HTTP marker. Calls without it are not HTTP calls and are skipped.
    pub request: Option<RequestAttributes>,

    /// Positional arguments.
    pub params: Vec<ParamDescription>,

    /// Opaque hint about the result, passed through to the transport.
    pub response_shape: Option<String>,
}

impl CallDescription {
    /// Creates a call without the HTTP marker.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an HTTP call.
    pub fn http(name: impl Into<String>, request: RequestAttributes) -> Self {
        Self {
            name: name.into(),
            request: Some(request),
            ..Self::default()
        }
    }

    /// Adds a positional argument.
    pub fn param(mut self, param: ParamDescription) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the result shape hint.
    pub fn returns(mut self, shape: impl Into<String>) -> Self {
        self.response_shape = Some(shape.into());
        self
    }
}

/// Attributes of the HTTP marker on a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestAttributes {
    /// HTTP method, `GET` unless set.
    pub http_method: HttpMethod,

    /// Path fragment or full URL. Alias of `url`.
    pub value: String,

    /// Path fragment or full URL. Takes precedence over `value`.
    pub url: String,

    /// Static headers as `name=value` entries.
    pub headers: Vec<String>,

    /// Static query parameters as `name=value` entries.
    pub query_params: Vec<String>,
}

impl RequestAttributes {
    /// Creates a `GET` marker without URL, headers or query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a marker with the given method.
    pub fn with_method(http_method: HttpMethod) -> Self {
        Self {
            http_method,
            ..Self::default()
        }
    }

    /// Sets the `value` alias.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Sets the `url` alias.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Adds a static `name=value` header entry.
    pub fn header(mut self, entry: impl Into<String>) -> Self {
        self.headers.push(entry.into());
        self
    }

    /// Adds a static `name=value` query parameter entry.
    pub fn query_param(mut self, entry: impl Into<String>) -> Self {
        self.query_params.push(entry.into());
        self
    }
}

/// Declared shape of an argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamShape {
    /// A single value.
    #[default]
    Scalar,
    /// A map from names to values or lists of values.
    Map,
}

/// A marker on an argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamMarker {
    /// Header value, or header map for map-shaped arguments.
    Header {
        /// Header name; required for scalar arguments.
        #[serde(default)]
        name: Option<String>,
    },
    /// Query parameter value, or query map for map-shaped arguments.
    Query {
        /// Parameter name; required for scalar arguments.
        #[serde(default)]
        name: Option<String>,
    },
    /// Path placeholder value.
    Path {
        /// Placeholder name.
        name: String,
    },
    /// Request body.
    Body,
    /// Full URL or path fragment.
    Url,
}

impl ParamMarker {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            ParamMarker::Header { .. } => "header",
            ParamMarker::Query { .. } => "query",
            ParamMarker::Path { .. } => "path",
            ParamMarker::Body => "body",
            ParamMarker::Url => "url",
        }
    }
}

/// One positional argument of a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamDescription {
    /// Argument name, used in error messages.
    pub name: String,

    /// Declared shape.
    pub shape: ParamShape,

    /// Markers; at most one is allowed.
    pub markers: Vec<ParamMarker>,
}

impl ParamDescription {
    /// Creates an unmarked scalar argument.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a single-value header argument.
    pub fn header(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self::new(name).marker(ParamMarker::Header {
            name: Some(header.into()),
        })
    }

    /// Creates a header map argument.
    pub fn header_map(name: impl Into<String>) -> Self {
        Self::new(name)
            .map_shaped()
            .marker(ParamMarker::Header { name: None })
    }

    /// Creates a single-value query parameter argument.
    pub fn query(name: impl Into<String>, param: impl Into<String>) -> Self {
        Self::new(name).marker(ParamMarker::Query {
            name: Some(param.into()),
        })
    }

    /// Creates a query parameter map argument.
    pub fn query_map(name: impl Into<String>) -> Self {
        Self::new(name)
            .map_shaped()
            .marker(ParamMarker::Query { name: None })
    }

    /// Creates a path parameter argument.
    pub fn path(name: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self::new(name).marker(ParamMarker::Path {
            name: placeholder.into(),
        })
    }

    /// Creates a request body argument.
    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name).marker(ParamMarker::Body)
    }

    /// Creates a URL argument.
    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name).marker(ParamMarker::Url)
    }

    /// Adds a marker.
    pub fn marker(mut self, marker: ParamMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Declares the argument as map-shaped.
    pub fn map_shaped(mut self) -> Self {
        self.shape = ParamShape::Map;
        self
    }
}
