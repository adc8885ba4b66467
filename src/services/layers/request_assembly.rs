//! Merges URL query-string and body parameters into one GraphQL request.

use http::header::CONTENT_TYPE;
use http::request::Parts;
use mediatype::names::APPLICATION;
use mediatype::names::JSON;
use mediatype::MediaType;
use serde_json_bytes::Value;

use crate::error::PipelineError;
use crate::graphql;
use crate::json_ext::Object;
use crate::services::layers::body_reader::BodyPayload;

/// The canonical request-parameter set, produced once per request.
#[derive(Debug)]
pub(crate) struct AssembledRequest {
    pub(crate) request: graphql::Request,
    /// `raw` was supplied, forcing the JSON representation.
    pub(crate) raw: bool,
    /// Per-request pretty override, when supplied.
    pub(crate) pretty: Option<bool>,
}

#[derive(Default)]
struct Params {
    query: Option<String>,
    variables: Option<Value>,
    operation_name: Option<String>,
    extensions: Option<Object>,
    raw: bool,
    pretty: Option<bool>,
}

/// Merge rule: for each of `query`, `variables`, and `operationName` the
/// body's value wins when present, the URL's otherwise. `raw` is set by
/// either source; a body `pretty` overrides a URL `pretty`.
pub(crate) fn assemble(
    parts: &Parts,
    payload: BodyPayload,
) -> Result<AssembledRequest, PipelineError> {
    let url = url_params(parts.uri.query().unwrap_or_default());
    let body = body_params(parts, payload)?;

    let variables = match body.variables.or(url.variables) {
        None => Object::default(),
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text.as_str()) {
            Ok(Value::Object(map)) => map,
            _ => return Err(PipelineError::InvalidVariablesJson),
        },
        Some(_) => return Err(PipelineError::InvalidVariablesJson),
    };

    let request = graphql::Request::builder()
        .and_query(body.query.or(url.query))
        .and_operation_name(body.operation_name.or(url.operation_name))
        .variables(variables)
        .extensions(body.extensions.unwrap_or_default())
        .build();

    Ok(AssembledRequest {
        request,
        raw: url.raw || body.raw,
        pretty: body.pretty.or(url.pretty),
    })
}

fn url_params(query_string: &str) -> Params {
    let mut params = Params::default();
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query_string).unwrap_or_default();
    for (key, value) in pairs {
        match key.as_str() {
            "query" => params.query = Some(value),
            "variables" => params.variables = Some(Value::String(value.into())),
            "operationName" => params.operation_name = Some(value),
            "raw" => params.raw = true,
            "pretty" => params.pretty = parse_pretty(&value),
            _ => {}
        }
    }
    params
}

fn parse_pretty(value: &str) -> Option<bool> {
    match value {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

fn body_params(parts: &Parts, payload: BodyPayload) -> Result<Params, PipelineError> {
    let text = match payload {
        BodyPayload::None => return Ok(Params::default()),
        BodyPayload::PreParsed(value) => {
            return Ok(match value {
                Value::Object(map) => params_from_object(map),
                _ => Params::default(),
            });
        }
        BodyPayload::Text(text) => text,
    };

    let media_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|content_type| MediaType::parse(content_type).ok());
    let Some(media_type) = media_type else {
        return Ok(Params::default());
    };

    if media_type.ty == APPLICATION && media_type.subty == JSON {
        let value = serde_json::from_str::<Value>(&text)
            .map_err(|_| PipelineError::InvalidBodyJson)?;
        return Ok(match value {
            Value::Object(map) => params_from_object(map),
            // A valid but non-object JSON body contributes no parameters.
            _ => Params::default(),
        });
    }
    if media_type.ty == APPLICATION && media_type.subty.as_str() == "graphql" {
        return Ok(Params {
            query: Some(text),
            ..Params::default()
        });
    }
    if media_type.ty == APPLICATION && media_type.subty.as_str() == "x-www-form-urlencoded" {
        return Ok(url_params(&text));
    }

    // Unknown content-types contribute no parameters, without failing.
    Ok(Params::default())
}

fn params_from_object(map: Object) -> Params {
    let mut params = Params::default();
    for (key, value) in map {
        match key.as_str() {
            "query" => {
                if let Value::String(query) = value {
                    params.query = Some(query.as_str().to_string());
                }
            }
            "variables" => params.variables = Some(value),
            "operationName" => {
                if let Value::String(name) = value {
                    params.operation_name = Some(name.as_str().to_string());
                }
            }
            "extensions" => {
                if let Value::Object(extensions) = value {
                    params.extensions = Some(extensions);
                }
            }
            "raw" => params.raw = true,
            "pretty" => {
                params.pretty = match value {
                    Value::Bool(pretty) => Some(pretty),
                    Value::String(text) => parse_pretty(text.as_str()),
                    _ => None,
                }
            }
            _ => {}
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use http::Request;
    use serde_json_bytes::json;

    use super::*;

    fn parts(uri: &str, content_type: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn url_only_request() {
        let parts = parts("/graphql?query=%7Btest%7D", None);
        let assembled = assemble(&parts, BodyPayload::None).unwrap();
        assert_eq!(assembled.request.query.as_deref(), Some("{test}"));
        assert!(!assembled.raw);
    }

    #[test]
    fn body_wins_over_url() {
        let parts = parts(
            "/graphql?query=%7Bfirst%7D&operationName=First",
            Some("application/json"),
        );
        let body = r#"{"query":"{second}"}"#.to_string();
        let assembled = assemble(&parts, BodyPayload::Text(body)).unwrap();
        assert_eq!(assembled.request.query.as_deref(), Some("{second}"));
        // operationName only came from the URL, so it survives the merge.
        assert_eq!(assembled.request.operation_name.as_deref(), Some("First"));
    }

    #[test]
    fn string_variables_are_parsed_from_either_source() {
        let parts = parts(
            "/graphql?variables=%7B%22who%22%3A%22Dolly%22%7D",
            None,
        );
        let assembled = assemble(&parts, BodyPayload::None).unwrap();
        assert_eq!(
            assembled.request.variables,
            json!({"who": "Dolly"}).as_object().unwrap().clone()
        );

        let parts = self::parts("/graphql", Some("application/json"));
        let body = r#"{"query":"{test}","variables":"{\"who\":\"Dolly\"}"}"#.to_string();
        let assembled = assemble(&parts, BodyPayload::Text(body)).unwrap();
        assert_eq!(
            assembled.request.variables,
            json!({"who": "Dolly"}).as_object().unwrap().clone()
        );
    }

    #[test]
    fn malformed_variables_are_rejected() {
        let parts = parts("/graphql?query=%7Btest%7D&variables=who%3Adolly", None);
        let err = assemble(&parts, BodyPayload::None).unwrap_err();
        assert_eq!(err.to_string(), "Variables are invalid JSON.");
    }

    #[test]
    fn non_object_variables_are_rejected() {
        let parts = parts("/graphql", Some("application/json"));
        let body = r#"{"query":"{test}","variables":[1,2]}"#.to_string();
        let err = assemble(&parts, BodyPayload::Text(body)).unwrap_err();
        assert_eq!(err.to_string(), "Variables are invalid JSON.");
    }

    #[test]
    fn malformed_json_body_is_rejected() {
        let parts = parts("/graphql", Some("application/json"));
        let err = assemble(&parts, BodyPayload::Text("{not json".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "POST body sent invalid JSON.");
    }

    #[test]
    fn graphql_body_is_the_query_itself() {
        let parts = parts("/graphql", Some("application/graphql"));
        let assembled = assemble(&parts, BodyPayload::Text("{test}".to_string())).unwrap();
        assert_eq!(assembled.request.query.as_deref(), Some("{test}"));
    }

    #[test]
    fn form_urlencoded_body() {
        let parts = parts("/graphql", Some("application/x-www-form-urlencoded"));
        let body = "query=%7Btest%7D&operationName=Op".to_string();
        let assembled = assemble(&parts, BodyPayload::Text(body)).unwrap();
        assert_eq!(assembled.request.query.as_deref(), Some("{test}"));
        assert_eq!(assembled.request.operation_name.as_deref(), Some("Op"));
    }

    #[test]
    fn unknown_content_type_contributes_nothing() {
        let parts = parts("/graphql?query=%7Btest%7D", Some("text/plain"));
        let assembled = assemble(&parts, BodyPayload::Text("ignored".to_string())).unwrap();
        assert_eq!(assembled.request.query.as_deref(), Some("{test}"));
    }

    #[test]
    fn raw_and_pretty_flags() {
        let parts = parts("/graphql?query=%7Btest%7D&raw&pretty=1", None);
        let assembled = assemble(&parts, BodyPayload::None).unwrap();
        assert!(assembled.raw);
        assert_eq!(assembled.pretty, Some(true));
    }
}
