//! The client: a compiled dispatch table plus the invocation pipeline.
//!
//! The [`Client`] type is the main entry point for invoking declared calls.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    compiler::{Compiler, DefaultCompiler},
    description::{CallSet, CallSetDescription},
    error::BoxError,
    metadata::{ClientDescriptor, MethodDescriptor},
    pipeline::{ErrorHandler, Executor, Pipeline, RequestInterceptor, ResponseInterceptor, Stage},
    request::{self, Request},
    response::Response,
    transport::{ReqwestTransport, Transport},
    Error, Result,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A client built from a call-set description.
///
/// The client is designed to be reused across many invocations. Its compiled
/// descriptor is read-only and shared between clones.
///
/// # Examples
///
/// ```no_run
/// use callsheet::{CallDescription, CallSet, CallSetDescription, Client, ClientAttributes,
///     ParamDescription, RequestAttributes};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// struct People;
///
/// impl CallSet for People {
///     fn describe() -> CallSetDescription {
///         CallSetDescription::new("People")
///             .client(ClientAttributes::new("https://api.example.com"))
///             .call(
///                 CallDescription::http("get_person", RequestAttributes::new().value("/person/{id}"))
///                     .param(ParamDescription::path("id", "id")),
///             )
///     }
/// }
///
/// #[derive(Deserialize)]
/// struct Person {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), callsheet::Error> {
/// let client = Client::builder().build::<People>()?;
///
/// let person: Person = client.call("get_person", &[json!(12)]).await?;
/// println!("Person: {}", person.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    descriptor: ClientDescriptor,
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the compiled descriptor model.
    pub fn descriptor(&self) -> &ClientDescriptor {
        &self.inner.descriptor
    }

    /// Returns the client name.
    pub fn name(&self) -> &str {
        &self.inner.descriptor.name
    }

    /// Returns `true` if `call` was declared as an HTTP call.
    pub fn supports(&self, call: &str) -> bool {
        self.inner.descriptor.method(call).is_some()
    }

    /// Builds the request `call` would execute with `args`, without running
    /// interceptors or the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCall`] for unknown calls and any assembly
    /// error for bad arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use callsheet::{transport, CallDescription, CallSetDescription, Client, ClientAttributes,
    ///     ParamDescription, RequestAttributes, Response};
    /// use serde_json::json;
    ///
    /// let description = CallSetDescription::new("Entities")
    ///     .client(ClientAttributes::new("https://www.example.com"))
    ///     .call(
    ///         CallDescription::http("get", RequestAttributes::new().value("/entity/{id}"))
    ///             .param(ParamDescription::path("id", "id")),
    ///     );
    ///
    /// let client = Client::builder()
    ///     .transport(transport::from_fn(|_| Ok(Response::empty())))
    ///     .build_from(&description)
    ///     .unwrap();
    ///
    /// let request = client.assemble("get", &[json!(7)]).unwrap();
    /// assert_eq!(request.url, "https://www.example.com/entity/7");
    /// ```
    pub fn assemble(&self, call: &str, args: &[Value]) -> Result<Request> {
        let method = self.method(call)?;
        request::assemble(&self.inner.descriptor.host, method, call, args)
    }

    /// Invokes `call` with `args` and returns the raw parsed result.
    ///
    /// The request is assembled, run through the request interceptors,
    /// executed on the transport (with error recovery on failure) and run
    /// through the response interceptors.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed; see
    /// [`Error::stage`].
    pub async fn invoke(&self, call: &str, args: &[Value]) -> Result<Value> {
        let method = self.method(call)?;

        tracing::debug!(
            stage = %Stage::Assembling,
            client = %self.name(),
            call = %call,
            arguments = args.len(),
            "Assembling request"
        );

        let request = request::assemble(&self.inner.descriptor.host, method, call, args)?;
        let response = self
            .inner
            .pipeline
            .run(request, self.inner.transport.as_ref())
            .await?;

        Ok(response.into_result())
    }

    /// Invokes `call` and deserializes the result into `T`.
    ///
    /// # Errors
    ///
    /// Everything [`invoke`](Self::invoke) returns, plus
    /// [`Error::DeserializationFailed`] when the result does not fit `T`.
    pub async fn call<T>(&self, call: &str, args: &[Value]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let raw_result = self.invoke(call, args).await?;

        T::deserialize(&raw_result).map_err(|e| {
            tracing::error!(
                call = %call,
                error = %e,
                "Failed to deserialize result"
            );
            Error::DeserializationFailed {
                call: call.to_string(),
                raw_result: raw_result.clone(),
                serde_error: e.to_string(),
            }
        })
    }

    fn method(&self, call: &str) -> Result<&MethodDescriptor> {
        self.inner.descriptor.method(call).ok_or_else(|| {
            tracing::warn!(client = %self.name(), call = %call, "Unsupported call");
            Error::UnsupportedCall {
                call: call.to_string(),
            }
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.inner.descriptor.name)
            .field("host", &self.inner.descriptor.host)
            .field("calls", &self.inner.descriptor.methods.len())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Interceptors and error handlers run in the order they are registered.
///
/// # Examples
///
/// ```no_run
/// use callsheet::{ClientBuilder, ReqwestTransport, Response};
/// use std::time::Duration;
///
/// # fn example(description: callsheet::CallSetDescription) -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
///
/// let client = ClientBuilder::new()
///     .transport(transport)
///     .error_handler_fn(|_request, response, _error| {
///         Ok(response.or_else(|| Some(Response::empty())))
///     })
///     .build_from(&description)?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    compiler: Option<Arc<dyn Compiler>>,
    pipeline: Pipeline,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport that executes requests.
    ///
    /// Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the compiler that turns descriptions into descriptors.
    ///
    /// Defaults to [`DefaultCompiler`].
    pub fn compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Some(Arc::new(compiler));
        self
    }

    /// Sets the executor that runs the transport and the error handlers.
    ///
    /// Defaults to [`DefaultExecutor`](crate::DefaultExecutor).
    pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
        self.pipeline.executor = Arc::new(executor);
        self
    }

    /// Appends a request interceptor.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.pipeline.request_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends several request interceptors, keeping their order.
    pub fn request_interceptors(
        mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn RequestInterceptor>>,
    ) -> Self {
        self.pipeline.request_interceptors.extend(interceptors);
        self
    }

    /// Appends a closure as a request interceptor.
    pub fn request_interceptor_fn<F>(self, f: F) -> Self
    where
        F: Fn(Request, &dyn Transport) -> std::result::Result<Request, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.request_interceptor(f)
    }

    /// Appends a response interceptor.
    pub fn response_interceptor(
        mut self,
        interceptor: impl ResponseInterceptor + 'static,
    ) -> Self {
        self.pipeline.response_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends several response interceptors, keeping their order.
    pub fn response_interceptors(
        mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn ResponseInterceptor>>,
    ) -> Self {
        self.pipeline.response_interceptors.extend(interceptors);
        self
    }

    /// Appends a closure as a response interceptor.
    pub fn response_interceptor_fn<F>(self, f: F) -> Self
    where
        F: Fn(Response, &Request, &dyn Transport) -> std::result::Result<Response, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.response_interceptor(f)
    }

    /// Appends an error handler.
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.pipeline.error_handlers.push(Arc::new(handler));
        self
    }

    /// Appends several error handlers, keeping their order.
    pub fn error_handlers(
        mut self,
        handlers: impl IntoIterator<Item = Arc<dyn ErrorHandler>>,
    ) -> Self {
        self.pipeline.error_handlers.extend(handlers);
        self
    }

    /// Appends a closure as an error handler.
    pub fn error_handler_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Request, Option<Response>, &BoxError) -> std::result::Result<Option<Response>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler(f)
    }

    /// Builds a client for the call-set `T`.
    ///
    /// # Errors
    ///
    /// Returns a compile-time error if `T`'s description is invalid, or
    /// [`Error::ConfigurationError`] if the default transport cannot be built.
    pub fn build<T: CallSet>(self) -> Result<Client> {
        self.build_from(&T::describe())
    }

    /// Builds a client from an explicit description.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_from(self, description: &CallSetDescription) -> Result<Client> {
        let descriptor = match &self.compiler {
            Some(compiler) => compiler.compile(description)?,
            None => DefaultCompiler.compile(description)?,
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?),
        };

        tracing::debug!(
            client = %descriptor.name,
            host = %descriptor.host,
            calls = descriptor.methods.len(),
            request_interceptors = self.pipeline.request_interceptors.len(),
            response_interceptors = self.pipeline.response_interceptors.len(),
            error_handlers = self.pipeline.error_handlers.len(),
            "Client built"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                descriptor,
                transport,
                pipeline: self.pipeline,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{CallDescription, ClientAttributes, ParamDescription, RequestAttributes};
    use crate::transport;
    use serde_json::json;

    fn description() -> CallSetDescription {
        CallSetDescription::new("Entities")
            .client(ClientAttributes::new("https://www.example.com"))
            .call(
                CallDescription::http("get", RequestAttributes::new().value("/entity/{id}"))
                    .param(ParamDescription::path("id", "id")),
            )
            .call(CallDescription::new("local_helper"))
    }

    fn echo_client() -> Client {
        Client::builder()
            .transport(transport::from_fn(|request| {
                Ok(Response::new(json!(request.url)))
            }))
            .build_from(&description())
            .unwrap()
    }

    #[test]
    fn test_client_name_defaults_to_type_name() {
        let client = echo_client();
        assert_eq!(client.name(), "Entities");
        assert!(client.supports("get"));
        assert!(!client.supports("local_helper"));
    }

    #[tokio::test]
    async fn test_invoke_returns_parsed_result() {
        let result = echo_client().invoke("get", &[json!(3)]).await.unwrap();
        assert_eq!(result, json!("https://www.example.com/entity/3"));
    }

    #[tokio::test]
    async fn test_unsupported_call() {
        let result = echo_client().invoke("local_helper", &[]).await;
        match result {
            Err(Error::UnsupportedCall { call }) => assert_eq!(call, "local_helper"),
            _ => panic!("Expected UnsupportedCall, got {:?}", result),
        }
    }

    #[tokio::test]
    async fn test_typed_call_deserialization_failure() {
        let result: Result<u64> = echo_client().call("get", &[json!(3)]).await;
        match result {
            Err(Error::DeserializationFailed { call, raw_result, .. }) => {
                assert_eq!(call, "get");
                assert_eq!(raw_result, json!("https://www.example.com/entity/3"));
            }
            _ => panic!("Expected DeserializationFailed, got {:?}", result),
        }
    }

    #[test]
    fn test_build_surfaces_compile_errors() {
        let result = Client::builder()
            .transport(transport::from_fn(|_| Ok(Response::empty())))
            .build_from(&CallSetDescription::new("Plain"));

        let err = result.unwrap_err();
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_custom_compiler() {
        struct Fixed;

        impl Compiler for Fixed {
            fn compile(&self, _: &CallSetDescription) -> Result<ClientDescriptor> {
                let mut descriptor = ClientDescriptor {
                    name: "fixed".to_string(),
                    host: "https://fixed.example.com".to_string(),
                    ..ClientDescriptor::default()
                };
                descriptor
                    .methods
                    .insert("ping".to_string(), MethodDescriptor::default());
                Ok(descriptor)
            }
        }

        let client = Client::builder()
            .compiler(Fixed)
            .transport(transport::from_fn(|_| Ok(Response::empty())))
            .build_from(&CallSetDescription::new("Ignored"))
            .unwrap();

        assert_eq!(client.name(), "fixed");
        let request = client.assemble("ping", &[]).unwrap();
        assert_eq!(request.url, "https://fixed.example.com");
    }

    #[test]
    fn test_clients_share_descriptor() {
        let client = echo_client();
        let clone = client.clone();
        assert!(std::ptr::eq(client.descriptor(), clone.descriptor()));
    }
}
