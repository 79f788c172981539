//! # Callsheet - declarative HTTP clients
//!
//! Callsheet builds HTTP clients from declarations. A call-set description
//! names a host and a list of calls; each call carries an HTTP method, a URL
//! template, static headers and query parameters, and one marker per argument
//! telling where the argument goes in the request. The description is
//! compiled once, when the client is built, into a read-only dispatch table.
//! Invoking a call assembles a request from that table and the argument
//! values, then runs it through a pipeline of interceptors, a transport and
//! error handlers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use callsheet::{CallDescription, CallSet, CallSetDescription, Client, ClientAttributes,
//!     HttpMethod, ParamDescription, RequestAttributes};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! struct Employees;
//!
//! impl CallSet for Employees {
//!     fn describe() -> CallSetDescription {
//!         CallSetDescription::new("Employees")
//!             .client(ClientAttributes::new("https://api.example.com"))
//!             .call(
//!                 CallDescription::http(
//!                     "get_employee",
//!                     RequestAttributes::new()
//!                         .value("/employee/{id}")
//!                         .header("Accept=application/json"),
//!                 )
//!                 .param(ParamDescription::path("id", "id"))
//!                 .param(ParamDescription::header("trace", "X-Trace-Id")),
//!             )
//!             .call(
//!                 CallDescription::http(
//!                     "create_employee",
//!                     RequestAttributes::with_method(HttpMethod::Post).value("/employee"),
//!                 )
//!                 .param(ParamDescription::body("employee")),
//!             )
//!     }
//! }
//!
//! #[derive(Deserialize)]
//! struct Employee {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callsheet::Error> {
//!     let client = Client::builder().build::<Employees>()?;
//!
//!     // GET https://api.example.com/employee/12 with X-Trace-Id: abc
//!     let employee: Employee = client.call("get_employee", &[json!(12), json!("abc")]).await?;
//!     println!("Employee: {}", employee.name);
//!
//!     // POST https://api.example.com/employee with a JSON body
//!     let created: Employee = client
//!         .call("create_employee", &[json!({ "name": "Alice" })])
//!         .await?;
//!     println!("Created employee with ID: {}", created.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Compile once** - Descriptions are validated when the client is built; malformed ones never reach invocation
//! - **Argument placement** - Path placeholders, query parameters, headers, header and query maps, request bodies and whole URLs
//! - **Interceptors** - Ordered request and response interceptors, closures included
//! - **Error recovery** - An ordered chain of error handlers that can turn a transport failure into a response
//! - **Pluggable execution** - Swap the execute-and-recover step for failover or load balancing with an [`Executor`]
//! - **Pluggable transport** - `reqwest` by default, anything implementing [`Transport`] otherwise
//! - **Automatic logging** - Structured logging with `tracing` at every pipeline stage
//!
//! ## Error Handling
//!
//! Every failure names the stage it happened in, and wrapped failures keep
//! their cause:
//!
//! ```no_run
//! use callsheet::{Client, Error, TransportError};
//! use serde_json::json;
//!
//! # async fn example(client: Client) {
//! match client.invoke("get_employee", &[json!(12), json!("abc")]).await {
//!     Ok(result) => {
//!         println!("Success: {}", result);
//!     }
//!     Err(Error::TransportFailure { method, url, source }) => {
//!         if let Some(TransportError::HttpStatus { status, raw_response, .. }) =
//!             source.downcast_ref::<TransportError>()
//!         {
//!             eprintln!("[{}] {} returned {}: {}", method, url, status, raw_response);
//!         }
//!     }
//!     Err(e) => {
//!         eprintln!("Failed while {:?}: {}", e.stage(), e);
//!     }
//! }
//! # }
//! ```
//!
//! ## Loading Descriptions
//!
//! Descriptions are plain serde data and can be loaded from JSON:
//!
//! ```
//! use callsheet::{transport, CallSetDescription, Client, Response};
//! use serde_json::json;
//!
//! let description = CallSetDescription::from_json(r#"{
//!     "type_name": "Entities",
//!     "client": { "host": "https://www.example.com" },
//!     "calls": [
//!         {
//!             "name": "list",
//!             "request": { "value": "/entity", "query_params": ["page=0"] },
//!             "params": [{ "name": "tag", "markers": [{ "query": { "name": "tag" } }] }]
//!         }
//!     ]
//! }"#).unwrap();
//!
//! let client = Client::builder()
//!     .transport(transport::from_fn(|_| Ok(Response::empty())))
//!     .build_from(&description)
//!     .unwrap();
//!
//! let request = client.assemble("list", &[json!("red")]).unwrap();
//! assert_eq!(request.query_params.get("page").unwrap(), ["0"]);
//! assert_eq!(request.query_params.get("tag").unwrap(), ["red"]);
//! ```

mod client;
mod compiler;
mod description;
mod error;
mod metadata;
mod multimap;
mod pipeline;
mod request;
mod response;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use compiler::{Compiler, DefaultCompiler};
pub use description::{
    CallDescription, CallSet, CallSetDescription, ClientAttributes, ParamDescription,
    ParamMarker, ParamShape, RequestAttributes,
};
pub use error::{BoxError, Error, Result};
pub use metadata::{ClientDescriptor, HttpMethod, MethodDescriptor, ParameterDescriptor};
pub use multimap::MultiValueMap;
pub use pipeline::{
    DefaultExecutor, ErrorHandler, Executor, RequestInterceptor, ResponseInterceptor, Stage,
};
pub use request::{assemble, Request};
pub use response::Response;
pub use transport::{ReqwestTransport, ReqwestTransportBuilder, Transport, TransportError};
