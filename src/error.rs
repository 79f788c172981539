//! Error types for compiling call-set descriptions and invoking calls.
//!
//! Every failure surfaces as one [`Error`]. Compile-time variants come out of
//! [`ClientBuilder::build`](crate::ClientBuilder::build); the rest come out of
//! [`Client::invoke`](crate::Client::invoke) while a call is in flight. Errors
//! raised by a transport, interceptor or error handler are kept as the
//! `source` of the variant that wraps them.

use crate::metadata::HttpMethod;
use crate::pipeline::Stage;

/// A boxed error raised by a transport, interceptor or error handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for compiling and invoking calls.
///
/// # Examples
///
/// ```no_run
/// use callsheet::{Client, Error};
///
/// # async fn example(client: Client) {
/// match client.invoke("get_person", &[serde_json::json!(12)]).await {
///     Ok(result) => println!("Person: {}", result),
///     Err(Error::TransportFailure { method, url, source }) => {
///         eprintln!("[{}] {} failed: {}", method, url, source);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The description is not a call-set, or is structurally malformed.
    #[error("Invalid client description: {reason}")]
    InvalidClientDescription {
        /// What is wrong with the description
        reason: String,
    },

    /// A static header or query entry is not of the form `name=value`.
    #[error("Invalid name-value pair at call {call}: '{pair}'")]
    InvalidNameValuePair {
        /// The call declaring the entry
        call: String,
        /// The offending literal
        pair: String,
    },

    /// A single-value header, query or path argument was declared without a name.
    #[error("Unnamed {kind} at parameter {call}#{parameter}")]
    UnnamedParameter {
        /// The call declaring the argument
        call: String,
        /// The argument name, or its position when the argument has no name
        parameter: String,
        /// `header`, `query parameter` or `path parameter`
        kind: &'static str,
    },

    /// An argument carries more than one marker.
    #[error("Conflicting markers at parameter {call}#{parameter}: {markers}")]
    ConflictingMarkers {
        /// The call declaring the argument
        call: String,
        /// The argument name, or its position when the argument has no name
        parameter: String,
        /// The markers found on the argument
        markers: String,
    },

    /// The invoked call was not declared as an HTTP call.
    #[error("The call '{call}' is not declared as an HTTP call")]
    UnsupportedCall {
        /// The invoked call name
        call: String,
    },

    /// The number of argument values does not match the declared arguments.
    #[error("Call '{call}' declares {expected} arguments but was invoked with {actual}")]
    ArgumentCountMismatch {
        /// The invoked call name
        call: String,
        /// Number of declared arguments
        expected: usize,
        /// Number of supplied values
        actual: usize,
    },

    /// A path parameter was null or empty at invocation time.
    #[error("The value for path parameter '{name}' of call '{call}' is empty")]
    MissingPathParameter {
        /// The invoked call name
        call: String,
        /// The placeholder name
        name: String,
    },

    /// The resolved URL is not absolute.
    #[error("Unable to find a valid request URL for call '{call}'. Found: '{url}'")]
    UnresolvedUrl {
        /// The invoked call name
        call: String,
        /// The URL that was resolved
        url: String,
    },

    /// A request interceptor failed.
    #[error("Request interceptor {interceptor} failed for [{method}] {url}: {source}")]
    RequestInterceptionFailed {
        /// Name of the failing interceptor
        interceptor: String,
        /// Method of the request handed to the interceptor
        method: HttpMethod,
        /// URL of the request handed to the interceptor
        url: String,
        /// The interceptor's error
        #[source]
        source: BoxError,
    },

    /// The transport failed and no error handler was registered.
    #[error("Error while executing request [{method}] {url}: {source}")]
    TransportFailure {
        /// Method of the executed request
        method: HttpMethod,
        /// URL of the executed request
        url: String,
        /// The transport's error
        #[source]
        source: BoxError,
    },

    /// An error handler failed while recovering from a transport failure.
    #[error("Error handler {handler} failed for [{method}] {url}: {source} (transport error: {transport_error})")]
    ErrorRecoveryFailed {
        /// Name of the failing handler
        handler: String,
        /// Method of the executed request
        method: HttpMethod,
        /// URL of the executed request
        url: String,
        /// The transport error that triggered recovery
        transport_error: BoxError,
        /// The handler's error
        #[source]
        source: BoxError,
    },

    /// The error handler chain finished without producing a response.
    #[error("No response was returned for [{method}] {url}")]
    NoResponse {
        /// Method of the executed request
        method: HttpMethod,
        /// URL of the executed request
        url: String,
    },

    /// A response interceptor failed.
    #[error("Response interceptor {interceptor} failed for [{method}] {url}: {source}")]
    ResponseInterceptionFailed {
        /// Name of the failing interceptor
        interceptor: String,
        /// Method of the executed request
        method: HttpMethod,
        /// URL of the executed request
        url: String,
        /// The interceptor's error
        #[source]
        source: BoxError,
    },

    /// The call result could not be converted into the requested type.
    ///
    /// The raw result is preserved so it can be logged or inspected.
    #[error("Failed to deserialize result of call '{call}': {serde_error}")]
    DeserializationFailed {
        /// The invoked call name
        call: String,
        /// The result value as returned by the pipeline
        raw_result: serde_json::Value,
        /// The serde error message
        serde_error: String,
    },

    /// Invalid configuration was provided to a builder.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// Returns `true` for errors raised while compiling a description.
    ///
    /// These are surfaced by the client builder and never at invocation time.
    ///
    /// ```
    /// use callsheet::Error;
    ///
    /// let err = Error::InvalidNameValuePair {
    ///     call: "list".to_string(),
    ///     pair: "page".to_string(),
    /// };
    /// assert!(err.is_compile_error());
    ///
    /// let err = Error::UnsupportedCall { call: "list".to_string() };
    /// assert!(!err.is_compile_error());
    /// ```
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidClientDescription { .. }
                | Error::InvalidNameValuePair { .. }
                | Error::UnnamedParameter { .. }
                | Error::ConflictingMarkers { .. }
        )
    }

    /// Returns the pipeline stage an invocation error was raised in.
    ///
    /// Returns `None` for compile-time and configuration errors, and for
    /// [`Error::UnsupportedCall`], which is raised before the pipeline starts.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::ArgumentCountMismatch { .. }
            | Error::MissingPathParameter { .. }
            | Error::UnresolvedUrl { .. } => Some(Stage::Assembling),
            Error::RequestInterceptionFailed { .. } => Some(Stage::RequestIntercepting),
            Error::TransportFailure { .. } => Some(Stage::Executing),
            Error::ErrorRecoveryFailed { .. } | Error::NoResponse { .. } => {
                Some(Stage::ErrorRecovering)
            }
            Error::ResponseInterceptionFailed { .. } => Some(Stage::ResponseIntercepting),
            _ => None,
        }
    }

    /// Returns the transport error behind a failed execution, if there is one.
    ///
    /// This covers unrecovered transport failures as well as failures of the
    /// error handler chain.
    pub fn transport_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::TransportFailure { source, .. } => Some(source.as_ref()),
            Error::ErrorRecoveryFailed {
                transport_error, ..
            } => Some(transport_error.as_ref()),
            _ => None,
        }
    }
}

/// A specialized `Result` type for compiling and invoking calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_call_has_no_stage() {
        let err = Error::UnsupportedCall {
            call: "missing".to_string(),
        };
        assert_eq!(err.stage(), None);
        assert!(!err.is_compile_error());
    }

    #[test]
    fn test_assembly_errors_report_assembling() {
        let err = Error::MissingPathParameter {
            call: "get".to_string(),
            name: "id".to_string(),
        };
        assert_eq!(err.stage(), Some(Stage::Assembling));
    }
}
