//! Concrete requests and their assembly from compiled metadata.

use crate::metadata::{HttpMethod, MethodDescriptor, ParameterDescriptor};
use crate::multimap::MultiValueMap;
use crate::{Error, Result};
use serde_json::Value;

/// A concrete HTTP request, produced once per invocation.
///
/// Request interceptors receive it by value and may rewrite any field before
/// it reaches the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Fully resolved absolute URL, without query parameters.
    pub url: String,

    /// The HTTP method.
    pub http_method: HttpMethod,

    /// Request headers.
    pub headers: MultiValueMap,

    /// Query parameters, appended to the URL by the transport.
    pub query_params: MultiValueMap,

    /// The request body, if any.
    pub body: Option<Value>,

    /// Opaque result hint copied from the call's metadata.
    pub response_shape: Option<String>,

    /// Name of the call that produced this request.
    pub call: String,
}

impl Request {
    /// Creates a `GET` request for `url` with no headers, parameters or body.
    pub fn new(call: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_method: HttpMethod::Get,
            headers: MultiValueMap::new(),
            query_params: MultiValueMap::new(),
            body: None,
            response_shape: None,
            call: call.into(),
        }
    }
}

/// Combines compiled call metadata with argument values into a [`Request`].
///
/// `host` is the base URL of the client that declared the call.
///
/// # Errors
///
/// * [`Error::ArgumentCountMismatch`] if `args` does not match the declared arguments
/// * [`Error::MissingPathParameter`] if a path argument is null or empty
/// * [`Error::UnresolvedUrl`] if the resolved URL is not absolute
///
/// # Examples
///
/// ```
/// use callsheet::{assemble, MethodDescriptor, ParameterDescriptor};
/// use serde_json::json;
///
/// let method = MethodDescriptor {
///     url_template: "/{type}/{ id }".to_string(),
///     parameters: vec![
///         ParameterDescriptor::PathParam("type".to_string()),
///         ParameterDescriptor::PathParam("id".to_string()),
///     ],
///     ..MethodDescriptor::default()
/// };
///
/// let request = assemble("https://x.com", &method, "get", &[json!("employee"), json!(12)]).unwrap();
/// assert_eq!(request.url, "https://x.com/employee/12");
/// ```
pub fn assemble(
    host: &str,
    method: &MethodDescriptor,
    call: &str,
    args: &[Value],
) -> Result<Request> {
    if args.len() != method.parameters.len() {
        return Err(Error::ArgumentCountMismatch {
            call: call.to_string(),
            expected: method.parameters.len(),
            actual: args.len(),
        });
    }
    let bound: Vec<(&ParameterDescriptor, &Value)> = method.parameters.iter().zip(args).collect();

    let url = resolve_url(host, method, call, &bound)?;

    let headers = merge_named(&method.headers, &bound, |p| match p {
        ParameterDescriptor::HttpHeader(name) => Some(NamedKind::Single(name.as_str())),
        ParameterDescriptor::HttpHeaderMap => Some(NamedKind::Map),
        _ => None,
    });
    let query_params = merge_named(&method.query_params, &bound, |p| match p {
        ParameterDescriptor::QueryParam(name) => Some(NamedKind::Single(name.as_str())),
        ParameterDescriptor::QueryParamMap => Some(NamedKind::Map),
        _ => None,
    });

    let body = bound
        .iter()
        .find(|(p, _)| **p == ParameterDescriptor::RequestBody)
        .map(|(_, value)| (*value).clone())
        .filter(|value| !value.is_null());

    Ok(Request {
        url,
        http_method: method.http_method,
        headers,
        query_params,
        body,
        response_shape: method.response_shape.clone(),
        call: call.to_string(),
    })
}

fn resolve_url(
    host: &str,
    method: &MethodDescriptor,
    call: &str,
    bound: &[(&ParameterDescriptor, &Value)],
) -> Result<String> {
    let url_argument = bound
        .iter()
        .find(|(p, _)| **p == ParameterDescriptor::Url)
        .map(|(_, value)| *value)
        .filter(|value| !value.is_null());

    let mut url = match url_argument {
        Some(value) => join_url(host, &string_form(value)),
        None if !method.url_template.is_empty() => join_url(host, &method.url_template),
        None => host.to_string(),
    };

    let mut path_values = Vec::new();
    for &(parameter, value) in bound {
        let ParameterDescriptor::PathParam(name) = parameter else {
            continue;
        };
        let value = match value {
            Value::Null => None,
            value => Some(string_form(value)).filter(|s| !s.is_empty()),
        }
        .ok_or_else(|| Error::MissingPathParameter {
            call: call.to_string(),
            name: name.clone(),
        })?;
        path_values.push((name.as_str(), value));
    }

    if !path_values.is_empty() {
        let (substituted, unused) = substitute_placeholders(&url, &path_values);
        for name in unused {
            tracing::debug!(call = %call, name = %name, url = %url, "No placeholder for path parameter");
        }
        url = substituted;
    }

    if !is_absolute_url(&url) {
        return Err(Error::UnresolvedUrl {
            call: call.to_string(),
            url,
        });
    }

    Ok(url)
}

/// Returns `true` if `candidate` starts with an `http` or `https` scheme.
pub(crate) fn is_absolute_url(candidate: &str) -> bool {
    let Some((scheme, rest)) = candidate.split_once("://") else {
        return false;
    };
    !rest.is_empty() && (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
}

/// Joins a path fragment to `host` with exactly one `/`; absolute URLs replace the host.
fn join_url(host: &str, candidate: &str) -> String {
    if is_absolute_url(candidate) {
        return candidate.to_string();
    }
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        candidate.trim_start_matches('/')
    )
}

/// Fills `{name}` placeholders in one pass, ignoring whitespace inside the braces.
///
/// Each value fills the first placeholder with its name that an earlier value
/// has not taken. Inserted text is never scanned again. Returns the new URL and
/// the names that found no placeholder.
fn substitute_placeholders<'a>(url: &str, values: &[(&'a str, String)]) -> (String, Vec<&'a str>) {
    let mut used = vec![false; values.len()];
    let mut out = String::with_capacity(url.len());
    let mut rest = url;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| i + open) else {
            break;
        };
        let placeholder = rest[open + 1..close].trim();
        let slot = values
            .iter()
            .enumerate()
            .position(|(i, (name, _))| !used[i] && *name == placeholder);

        match slot {
            Some(i) => {
                used[i] = true;
                out.push_str(&rest[..open]);
                out.push_str(&values[i].1);
                rest = &rest[close + 1..];
            }
            None => {
                out.push_str(&rest[..=open]);
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);

    let unused = values
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|((name, _), _)| *name)
        .collect();
    (out, unused)
}

/// The string form of an argument value: raw text for strings, JSON otherwise.
pub(crate) fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

enum NamedKind<'a> {
    Single(&'a str),
    Map,
}

/// Static entries first, then single-value arguments, then map arguments.
fn merge_named<'a>(
    statics: &MultiValueMap,
    bound: &[(&'a ParameterDescriptor, &Value)],
    kind_of: impl Fn(&'a ParameterDescriptor) -> Option<NamedKind<'a>>,
) -> MultiValueMap {
    let mut merged = statics.clone();

    for &(parameter, value) in bound {
        if let Some(NamedKind::Single(name)) = kind_of(parameter) {
            if !value.is_null() {
                merged.add(name, string_form(value));
            }
        }
    }

    for &(parameter, value) in bound {
        if !matches!(kind_of(parameter), Some(NamedKind::Map)) {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Object(entries) => {
                for (name, entry) in entries {
                    match entry {
                        Value::Null => {}
                        Value::Array(items) => {
                            for item in items.iter().filter(|item| !item.is_null()) {
                                merged.add(name.as_str(), string_form(item));
                            }
                        }
                        other => merged.add(name.as_str(), string_form(other)),
                    }
                }
            }
            other => {
                tracing::warn!(value = %other, "Ignoring map argument that is not an object");
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn method(url_template: &str, parameters: Vec<ParameterDescriptor>) -> MethodDescriptor {
        MethodDescriptor {
            url_template: url_template.to_string(),
            parameters,
            ..MethodDescriptor::default()
        }
    }

    #[test]
    fn test_host_only() {
        let request = assemble("https://x.com", &method("", vec![]), "get", &[]).unwrap();
        assert_eq!(request.url, "https://x.com");
        assert_eq!(request.call, "get");
    }

    #[test]
    fn test_template_joined_to_host() {
        let request = assemble("https://x.com", &method("/entity", vec![]), "get", &[]).unwrap();
        assert_eq!(request.url, "https://x.com/entity");

        let request = assemble("https://x.com/", &method("entity", vec![]), "get", &[]).unwrap();
        assert_eq!(request.url, "https://x.com/entity");
    }

    #[test]
    fn test_absolute_template_replaces_host() {
        let request = assemble("https://x.com", &method("https://y.com", vec![]), "get", &[]).unwrap();
        assert_eq!(request.url, "https://y.com");
    }

    #[test]
    fn test_url_argument() {
        let m = method("/ignored", vec![ParameterDescriptor::Url]);

        let request = assemble("https://x.com", &m, "list", &[json!("allEntities")]).unwrap();
        assert_eq!(request.url, "https://x.com/allEntities");

        let request = assemble("https://x.com", &m, "list", &[json!("https://y.com")]).unwrap();
        assert_eq!(request.url, "https://y.com");

        // a null URL argument falls back to the template
        let request = assemble("https://x.com", &m, "list", &[Value::Null]).unwrap();
        assert_eq!(request.url, "https://x.com/ignored");
    }

    #[test]
    fn test_path_substitution() {
        let m = method(
            "/{type}/{ id }",
            vec![
                ParameterDescriptor::PathParam("type".to_string()),
                ParameterDescriptor::PathParam("id".to_string()),
            ],
        );
        let request = assemble("https://x.com", &m, "get", &[json!("employee"), json!(12)]).unwrap();
        assert_eq!(request.url, "https://x.com/employee/12");
    }

    #[test]
    fn test_path_substitution_first_occurrence_only() {
        let values = [("id", "7".to_string()), ("missing", "7".to_string())];
        let (url, unused) = substitute_placeholders("https://x.com/{id}/copy/{id}", &values);
        assert_eq!(url, "https://x.com/7/copy/{id}");
        assert_eq!(unused, vec!["missing"]);
    }

    #[test]
    fn test_path_values_are_not_rescanned() {
        let m = method(
            "/{type}/{id}",
            vec![
                ParameterDescriptor::PathParam("type".to_string()),
                ParameterDescriptor::PathParam("id".to_string()),
            ],
        );
        let request = assemble("https://x.com", &m, "get", &[json!("{id}"), json!(5)]).unwrap();
        assert_eq!(request.url, "https://x.com/{id}/5");
    }

    #[test]
    fn test_repeated_path_name_fills_placeholders_in_order() {
        let m = method(
            "/{id}/copy/{id}",
            vec![
                ParameterDescriptor::PathParam("id".to_string()),
                ParameterDescriptor::PathParam("id".to_string()),
            ],
        );
        let request = assemble("https://x.com", &m, "get", &[json!(1), json!(2)]).unwrap();
        assert_eq!(request.url, "https://x.com/1/copy/2");
    }

    #[test]
    fn test_missing_path_parameter() {
        let m = method(
            "/{type}/{id}",
            vec![
                ParameterDescriptor::PathParam("type".to_string()),
                ParameterDescriptor::PathParam("id".to_string()),
            ],
        );
        for missing in [Value::Null, json!("")] {
            let result = assemble("https://x.com", &m, "get", &[missing, json!(12)]);
            match result {
                Err(Error::MissingPathParameter { call, name }) => {
                    assert_eq!(call, "get");
                    assert_eq!(name, "type");
                }
                _ => panic!("Expected MissingPathParameter, got {:?}", result),
            }
        }
    }

    #[test]
    fn test_unresolved_url() {
        let result = assemble("", &method("/entity", vec![]), "get", &[]);
        assert!(matches!(result, Err(Error::UnresolvedUrl { .. })));
    }

    #[test]
    fn test_argument_count_mismatch() {
        let m = method("", vec![ParameterDescriptor::None]);
        let result = assemble("https://x.com", &m, "get", &[]);
        assert!(matches!(
            result,
            Err(Error::ArgumentCountMismatch {
                expected: 1,
                actual: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_header_merge() {
        let mut m = method(
            "",
            vec![
                ParameterDescriptor::HttpHeader("Accept".to_string()),
                ParameterDescriptor::HttpHeader("NullIgnored".to_string()),
                ParameterDescriptor::HttpHeaderMap,
                ParameterDescriptor::QueryParam("page".to_string()),
            ],
        );
        m.headers.add("Accept", "application/json");

        let request = assemble(
            "https://x.com",
            &m,
            "get",
            &[
                json!("application/cbor"),
                Value::Null,
                json!({ "Test": ["t1", null, "t2"], "Skipped": null, "Single": 3 }),
                json!(2),
            ],
        )
        .unwrap();

        assert_eq!(
            request.headers.get("Accept").unwrap(),
            &["application/json".to_string(), "application/cbor".to_string()]
        );
        assert_eq!(
            request.headers.get("Test").unwrap(),
            &["t1".to_string(), "t2".to_string()]
        );
        assert_eq!(request.headers.first("Single"), Some("3"));
        assert!(!request.headers.contains_key("NullIgnored"));
        assert!(!request.headers.contains_key("Skipped"));
        assert!(!request.headers.contains_key("page"));
        assert_eq!(request.headers.iter().next().unwrap().0, "Accept");

        assert_eq!(request.query_params.first("page"), Some("2"));
        assert_eq!(request.query_params.len(), 1);
    }

    #[test]
    fn test_query_merge_mirrors_headers() {
        let mut m = method(
            "",
            vec![
                ParameterDescriptor::QueryParam("Authorization".to_string()),
                ParameterDescriptor::QueryParamMap,
                ParameterDescriptor::QueryParamMap,
            ],
        );
        m.query_params.add("Accept", "application/json");

        let request = assemble(
            "https://x.com",
            &m,
            "get",
            &[
                json!("Bearer token"),
                json!({ "Accept": "application/cbor", "Test": "test1" }),
                json!({ "X-Auth-Type": ["bearer", "basic", "oauth"], "Test": ["test2", "test3"] }),
            ],
        )
        .unwrap();

        let expected: MultiValueMap = [
            ("Accept", "application/json"),
            ("Accept", "application/cbor"),
            ("Authorization", "Bearer token"),
            ("Test", "test1"),
            ("Test", "test2"),
            ("Test", "test3"),
            ("X-Auth-Type", "bearer"),
            ("X-Auth-Type", "basic"),
            ("X-Auth-Type", "oauth"),
        ]
        .into_iter()
        .collect();
        assert_eq!(request.query_params, expected);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_body_and_shape() {
        let mut m = method("", vec![ParameterDescriptor::None, ParameterDescriptor::RequestBody]);
        m.http_method = HttpMethod::Post;
        m.response_shape = Some("Person".to_string());

        let request = assemble(
            "https://x.com",
            &m,
            "create",
            &[json!("ignored"), json!({ "name": "Testy" })],
        )
        .unwrap();
        assert_eq!(request.http_method, HttpMethod::Post);
        assert_eq!(request.body, Some(json!({ "name": "Testy" })));
        assert_eq!(request.response_shape.as_deref(), Some("Person"));

        let request = assemble("https://x.com", &m, "create", &[Value::Null, Value::Null]).unwrap();
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_string_form() {
        assert_eq!(string_form(&json!("text")), "text");
        assert_eq!(string_form(&json!(12)), "12");
        assert_eq!(string_form(&json!(true)), "true");
        assert_eq!(string_form(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("https://x.com"));
        assert!(is_absolute_url("HTTP://x.com/a"));
        assert!(!is_absolute_url("/entity"));
        assert!(!is_absolute_url("httpbin/entity"));
        assert!(!is_absolute_url("ftp://x.com"));
        assert!(!is_absolute_url("https://"));
    }
}
