//! Request interceptors, response interceptors and error handlers, and the
//! pipeline that chains them around a transport.
//!
//! An invocation moves through the stages of [`Stage`] in order. Each chain is
//! a fold: every interceptor or handler consumes the previous stage's value
//! and produces the next one. The first failure ends the invocation. The
//! execute-and-recover step between the two interceptor chains is an
//! [`Executor`].
//!
//! Closures implement the traits directly:
//!
//! ```
//! use callsheet::{Client, Response};
//!
//! let builder = Client::builder()
//!     .request_interceptor_fn(|mut request, _transport| {
//!         request.headers.add("X-Request-Name", request.call.clone());
//!         Ok(request)
//!     })
//!     .error_handler_fn(|_request, response, _error| {
//!         Ok(response.or_else(|| Some(Response::empty())))
//!     });
//! # let _ = builder;
//! ```

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;
use crate::transport::Transport;
use crate::Error;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// The stages of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Building the request from metadata and arguments.
    Assembling,
    /// Running request interceptors.
    RequestIntercepting,
    /// Executing the request on the transport.
    Executing,
    /// Running error handlers after a transport failure.
    ErrorRecovering,
    /// Running response interceptors.
    ResponseIntercepting,
    /// The result is ready.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Assembling => "assembling",
            Stage::RequestIntercepting => "request_intercepting",
            Stage::Executing => "executing",
            Stage::ErrorRecovering => "error_recovering",
            Stage::ResponseIntercepting => "response_intercepting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Processes a request before it is executed.
pub trait RequestInterceptor: Send + Sync {
    /// Returns the request to hand to the next interceptor.
    fn intercept(&self, request: Request, transport: &dyn Transport) -> Result<Request, BoxError>;

    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> RequestInterceptor for F
where
    F: Fn(Request, &dyn Transport) -> Result<Request, BoxError> + Send + Sync,
{
    fn intercept(&self, request: Request, transport: &dyn Transport) -> Result<Request, BoxError> {
        self(request, transport)
    }
}

/// Processes a response before its result is returned.
pub trait ResponseInterceptor: Send + Sync {
    /// Returns the response to hand to the next interceptor.
    ///
    /// `request` is the request that was executed.
    fn intercept(
        &self,
        response: Response,
        request: &Request,
        transport: &dyn Transport,
    ) -> Result<Response, BoxError>;

    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> ResponseInterceptor for F
where
    F: Fn(Response, &Request, &dyn Transport) -> Result<Response, BoxError> + Send + Sync,
{
    fn intercept(
        &self,
        response: Response,
        request: &Request,
        transport: &dyn Transport,
    ) -> Result<Response, BoxError> {
        self(response, request, transport)
    }
}

/// Recovers from a transport failure.
///
/// Handlers run in registration order. Each receives the response produced by
/// the previous handler (`None` for the first one) and either returns a
/// response, possibly `None`, for the next handler, or fails to abort the
/// invocation.
pub trait ErrorHandler: Send + Sync {
    /// Handles `error` raised while executing `request`.
    fn handle(
        &self,
        request: &Request,
        response: Option<Response>,
        error: &BoxError,
    ) -> Result<Option<Response>, BoxError>;

    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> ErrorHandler for F
where
    F: Fn(&Request, Option<Response>, &BoxError) -> Result<Option<Response>, BoxError>
        + Send
        + Sync,
{
    fn handle(
        &self,
        request: &Request,
        response: Option<Response>,
        error: &BoxError,
    ) -> Result<Option<Response>, BoxError> {
        self(request, response, error)
    }
}

/// Executes a request and recovers from transport failures.
///
/// The executor sits between the request and response interceptor chains. The
/// stock [`DefaultExecutor`] calls the transport once and hands a failure to
/// the error handlers. Replace it with
/// [`ClientBuilder::executor`](crate::ClientBuilder::executor) to put client-side
/// load balancing or failover around the transport.
///
/// # Examples
///
/// ```
/// use callsheet::{DefaultExecutor, ErrorHandler, Executor, Request, Response, Result, Transport};
/// use std::sync::Arc;
///
/// /// Tries a mirror before giving up.
/// struct Mirror(&'static str);
///
/// #[async_trait::async_trait]
/// impl Executor for Mirror {
///     async fn execute(
///         &self,
///         request: &Request,
///         transport: &dyn Transport,
///         error_handlers: &[Arc<dyn ErrorHandler>],
///     ) -> Result<Response> {
///         if let Ok(response) = transport.execute(request).await {
///             return Ok(response);
///         }
///         let mut mirrored = request.clone();
///         mirrored.url = mirrored.url.replacen("https://api.", self.0, 1);
///         DefaultExecutor.execute(&mirrored, transport, error_handlers).await
///     }
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes `request` on `transport`, running `error_handlers` on failure.
    async fn execute(
        &self,
        request: &Request,
        transport: &dyn Transport,
        error_handlers: &[Arc<dyn ErrorHandler>],
    ) -> crate::Result<Response>;
}

/// Calls the transport once; on failure, folds the error handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecutor;

impl DefaultExecutor {
    /// Runs `error_handlers` over a transport failure of `request`.
    ///
    /// Handlers run in order, each receiving the previous handler's response
    /// (`None` for the first one).
    ///
    /// # Errors
    ///
    /// * [`Error::TransportFailure`] if there are no handlers
    /// * [`Error::ErrorRecoveryFailed`] naming the first handler that failed
    /// * [`Error::NoResponse`] if the last handler returned `None`
    pub fn recover(
        request: &Request,
        error: BoxError,
        error_handlers: &[Arc<dyn ErrorHandler>],
    ) -> crate::Result<Response> {
        if error_handlers.is_empty() {
            return Err(Error::TransportFailure {
                method: request.http_method,
                url: request.url.clone(),
                source: error,
            });
        }

        tracing::debug!(
            stage = %Stage::ErrorRecovering,
            call = %request.call,
            handlers = error_handlers.len(),
            "Running error handlers"
        );

        let recovered = error_handlers.iter().try_fold(None, |current, handler| {
            handler
                .handle(request, current, &error)
                .map_err(|source| (handler.name().to_string(), source))
        });

        match recovered {
            Ok(Some(response)) => Ok(response),
            Ok(None) => {
                tracing::error!(
                    method = %request.http_method,
                    url = %request.url,
                    "Error handlers returned no response"
                );
                Err(Error::NoResponse {
                    method: request.http_method,
                    url: request.url.clone(),
                })
            }
            Err((handler, source)) => {
                tracing::error!(
                    handler = %handler,
                    method = %request.http_method,
                    url = %request.url,
                    error = %source,
                    "Error handler failed"
                );
                Err(Error::ErrorRecoveryFailed {
                    handler,
                    method: request.http_method,
                    url: request.url.clone(),
                    transport_error: error,
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl Executor for DefaultExecutor {
    async fn execute(
        &self,
        request: &Request,
        transport: &dyn Transport,
        error_handlers: &[Arc<dyn ErrorHandler>],
    ) -> crate::Result<Response> {
        tracing::debug!(
            stage = %Stage::Executing,
            call = %request.call,
            method = %request.http_method,
            url = %request.url,
            "Executing request"
        );

        let error = match transport.execute(request).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        tracing::warn!(
            error = %error,
            call = %request.call,
            method = %request.http_method,
            url = %request.url,
            "Request failed"
        );

        Self::recover(request, error, error_handlers)
    }
}

/// The ordered chains of one client.
#[derive(Clone)]
pub(crate) struct Pipeline {
    pub(crate) request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub(crate) response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    pub(crate) error_handlers: Vec<Arc<dyn ErrorHandler>>,
    pub(crate) executor: Arc<dyn Executor>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            error_handlers: Vec::new(),
            executor: Arc::new(DefaultExecutor),
        }
    }
}

impl Pipeline {
    /// Runs an assembled request through every stage and returns the final response.
    pub(crate) async fn run(&self, request: Request, transport: &dyn Transport) -> crate::Result<Response> {
        let request = self.intercept_request(request, transport)?;
        let response = self
            .executor
            .execute(&request, transport, &self.error_handlers)
            .await?;
        let response = self.intercept_response(response, &request, transport)?;

        tracing::debug!(
            stage = %Stage::Done,
            call = %request.call,
            method = %request.http_method,
            url = %request.url,
            "Invocation completed"
        );

        Ok(response)
    }

    fn intercept_request(&self, request: Request, transport: &dyn Transport) -> crate::Result<Request> {
        tracing::debug!(
            stage = %Stage::RequestIntercepting,
            call = %request.call,
            interceptors = self.request_interceptors.len(),
            "Running request interceptors"
        );

        self.request_interceptors
            .iter()
            .try_fold(request, |current, interceptor| {
                let (method, url) = (current.http_method, current.url.clone());
                interceptor.intercept(current, transport).map_err(|source| {
                    tracing::error!(
                        interceptor = interceptor.name(),
                        method = %method,
                        url = %url,
                        error = %source,
                        "Request interceptor failed"
                    );
                    Error::RequestInterceptionFailed {
                        interceptor: interceptor.name().to_string(),
                        method,
                        url,
                        source,
                    }
                })
            })
    }

    fn intercept_response(
        &self,
        response: Response,
        request: &Request,
        transport: &dyn Transport,
    ) -> crate::Result<Response> {
        tracing::debug!(
            stage = %Stage::ResponseIntercepting,
            call = %request.call,
            interceptors = self.response_interceptors.len(),
            "Running response interceptors"
        );

        self.response_interceptors
            .iter()
            .try_fold(response, |current, interceptor| {
                interceptor
                    .intercept(current, request, transport)
                    .map_err(|source| {
                        tracing::error!(
                            interceptor = interceptor.name(),
                            method = %request.http_method,
                            url = %request.url,
                            error = %source,
                            "Response interceptor failed"
                        );
                        Error::ResponseInterceptionFailed {
                            interceptor: interceptor.name().to_string(),
                            method: request.http_method,
                            url: request.url.clone(),
                            source,
                        }
                    })
            })
    }
}
