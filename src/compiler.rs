//! Compilation of call-set descriptions into the descriptor model.
//!
//! The compiler runs once, when a client is built. Everything that can be
//! checked without arguments is checked here, so a malformed description
//! fails at build time and never at invocation time.

use crate::description::{
    CallDescription, CallSetDescription, ParamDescription, ParamMarker, ParamShape,
};
use crate::metadata::{ClientDescriptor, MethodDescriptor, ParameterDescriptor};
use crate::multimap::MultiValueMap;
use crate::{Error, Result};
use std::collections::HashMap;

/// Turns a [`CallSetDescription`] into a validated [`ClientDescriptor`].
///
/// Implement this trait to plug a different compiler into
/// [`ClientBuilder::compiler`](crate::ClientBuilder::compiler).
pub trait Compiler: Send + Sync {
    /// Compiles `description`.
    ///
    /// # Errors
    ///
    /// Returns a compile-time error (see [`Error::is_compile_error`]) if the
    /// description is not a valid call-set.
    fn compile(&self, description: &CallSetDescription) -> Result<ClientDescriptor>;
}

/// The stock compiler.
///
/// # Examples
///
/// ```
/// use callsheet::{CallDescription, CallSetDescription, ClientAttributes, Compiler,
///     DefaultCompiler, ParamDescription, ParameterDescriptor, RequestAttributes};
///
/// let description = CallSetDescription::new("Entities")
///     .client(ClientAttributes::new("https://www.example.com"))
///     .call(
///         CallDescription::http("list", RequestAttributes::new().value("/entity"))
///             .param(ParamDescription::query("page", "page")),
///     );
///
/// let descriptor = DefaultCompiler.compile(&description).unwrap();
/// let list = descriptor.method("list").unwrap();
/// assert_eq!(list.url_template, "/entity");
/// assert_eq!(list.parameters, vec![ParameterDescriptor::QueryParam("page".to_string())]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCompiler;

impl Compiler for DefaultCompiler {
    fn compile(&self, description: &CallSetDescription) -> Result<ClientDescriptor> {
        let client = description
            .client
            .as_ref()
            .ok_or_else(|| Error::InvalidClientDescription {
                reason: format!(
                    "'{}' is not marked as a call-set",
                    description.type_name
                ),
            })?;

        let name = client
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| description.type_name.clone());

        let mut methods = HashMap::new();
        for call in &description.calls {
            let Some(method) = compile_call(call)? else {
                tracing::trace!(call = %call.name, "Skipping call without HTTP marker");
                continue;
            };
            if methods.insert(call.name.clone(), method).is_some() {
                tracing::warn!(
                    client = %name,
                    call = %call.name,
                    "Duplicate call name, keeping the last declaration"
                );
            }
        }

        let descriptor = ClientDescriptor {
            name,
            host: client.host.clone(),
            methods,
        };
        validate(&descriptor)?;

        tracing::debug!(
            client = %descriptor.name,
            host = %descriptor.host,
            calls = descriptor.methods.len(),
            "Compiled call-set description"
        );

        Ok(descriptor)
    }
}

/// Compiles one call; returns `None` for calls without the HTTP marker.
fn compile_call(call: &CallDescription) -> Result<Option<MethodDescriptor>> {
    let Some(request) = &call.request else {
        return Ok(None);
    };

    // `url` and `value` are aliases; `url` wins when both are set
    let url_template = if request.url.is_empty() {
        request.value.clone()
    } else {
        request.url.clone()
    };

    let parameters = call
        .params
        .iter()
        .enumerate()
        .map(|(position, param)| classify_parameter(&call.name, position, param))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(MethodDescriptor {
        http_method: request.http_method,
        url_template,
        headers: parse_name_value_pairs(&call.name, &request.headers)?,
        query_params: parse_name_value_pairs(&call.name, &request.query_params)?,
        parameters,
        response_shape: call.response_shape.clone(),
    }))
}

/// Parses `name=value` entries, splitting on the first `=`.
fn parse_name_value_pairs(call: &str, entries: &[String]) -> Result<MultiValueMap> {
    let mut map = MultiValueMap::new();
    for entry in entries {
        let (name, value) =
            entry
                .split_once('=')
                .ok_or_else(|| Error::InvalidNameValuePair {
                    call: call.to_string(),
                    pair: entry.clone(),
                })?;
        map.add(name, value);
    }
    Ok(map)
}

fn classify_parameter(
    call: &str,
    position: usize,
    param: &ParamDescription,
) -> Result<ParameterDescriptor> {
    let label = || {
        if param.name.is_empty() {
            format!("arg{}", position)
        } else {
            param.name.clone()
        }
    };

    let marker = match param.markers.as_slice() {
        [] => return Ok(ParameterDescriptor::None),
        [marker] => marker,
        markers => {
            return Err(Error::ConflictingMarkers {
                call: call.to_string(),
                parameter: label(),
                markers: markers
                    .iter()
                    .map(ParamMarker::label)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    };

    let named = |name: &Option<String>, kind: &'static str| {
        name.clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::UnnamedParameter {
                call: call.to_string(),
                parameter: label(),
                kind,
            })
    };

    let descriptor = match (marker, param.shape) {
        (ParamMarker::Header { .. }, ParamShape::Map) => ParameterDescriptor::HttpHeaderMap,
        (ParamMarker::Query { .. }, ParamShape::Map) => ParameterDescriptor::QueryParamMap,
        (ParamMarker::Header { name }, ParamShape::Scalar) => {
            ParameterDescriptor::HttpHeader(named(name, "header")?)
        }
        (ParamMarker::Query { name }, ParamShape::Scalar) => {
            ParameterDescriptor::QueryParam(named(name, "query parameter")?)
        }
        (ParamMarker::Path { name }, _) => {
            ParameterDescriptor::PathParam(named(&Some(name.clone()), "path parameter")?)
        }
        (ParamMarker::Body, _) => ParameterDescriptor::RequestBody,
        (ParamMarker::Url, _) => ParameterDescriptor::Url,
    };

    Ok(descriptor)
}

/// Structural checks over the compiled model.
fn validate(descriptor: &ClientDescriptor) -> Result<()> {
    for (call, method) in &descriptor.methods {
        for (kind, label) in [
            (ParameterDescriptor::RequestBody, "request body"),
            (ParameterDescriptor::Url, "URL"),
        ] {
            let count = method.parameters.iter().filter(|p| **p == kind).count();
            if count > 1 {
                return Err(Error::InvalidClientDescription {
                    reason: format!(
                        "Call '{}' declares {} {} arguments, at most one is allowed",
                        call, count, label
                    ),
                });
            }
        }
    }
    Ok(())
}
