//! Serializes the pipeline outcome into the final HTTP response.

use http::header::ALLOW;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use http::Response;
use http::StatusCode;
use serde_json_bytes::Value;

use crate::configuration::FormatErrorFn;
use crate::error::PipelineError;
use crate::graphql;
use crate::graphql::IntoGraphQLErrors;
use crate::json_ext::Object;
use crate::services::body;
use crate::services::body::Body;
use crate::services::APPLICATION_JSON_HEADER_VALUE;

/// The HTTP status and optional `Allow` header for an outcome.
///
/// An execution result with errors but no usable data counts as a whole-request
/// failure; partial data still earns a 200.
pub(crate) fn status_of(outcome: &Result<graphql::Response, PipelineError>) -> StatusCode {
    match outcome {
        Ok(response) if response.is_complete_failure() => StatusCode::INTERNAL_SERVER_ERROR,
        Ok(_) => StatusCode::OK,
        Err(error) => error.status(),
    }
}

pub(crate) fn json_response(
    outcome: Result<graphql::Response, PipelineError>,
    pretty: bool,
    format_error_fn: Option<&FormatErrorFn>,
) -> Response<Body> {
    let status = status_of(&outcome);
    let (allow, response) = match outcome {
        Ok(response) => (None, response),
        Err(error) => {
            let allow = error.allow_header();
            let errors = error.into_graphql_errors();
            (allow, graphql::Response::builder().errors(errors).build())
        }
    };

    let payload = payload_of(response, format_error_fn);
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, APPLICATION_JSON_HEADER_VALUE.clone());
    if let Some(allow) = allow {
        builder = builder.header(ALLOW, allow);
    }
    builder
        .body(body::from_bytes(serialize(&payload, pretty)))
        .expect("valid response")
}

pub(crate) fn html_response(status: StatusCode, page: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static(mime::TEXT_HTML.as_ref()))
        .body(body::from_bytes(page))
        .expect("valid response")
}

/// Assemble the response payload by hand so each error can pass through the
/// custom error formatter before serialization.
pub(crate) fn payload_of(
    response: graphql::Response,
    format_error_fn: Option<&FormatErrorFn>,
) -> Value {
    let mut payload = Object::default();
    if let Some(data) = response.data {
        payload.insert("data", data);
    }
    if !response.errors.is_empty() {
        let errors = response
            .errors
            .iter()
            .map(|error| format_error(error, format_error_fn))
            .collect();
        payload.insert("errors", Value::Array(errors));
    }
    if !response.extensions.is_empty() {
        payload.insert("extensions", Value::Object(response.extensions));
    }
    Value::Object(payload)
}

fn format_error(error: &graphql::Error, format_error_fn: Option<&FormatErrorFn>) -> Value {
    match format_error_fn {
        Some(format) => match format(error) {
            Value::Object(replacement) => Value::Object(replacement),
            // A formatter returning a non-object yields an empty error entry.
            _ => Value::Object(Object::default()),
        },
        None => serde_json_bytes::to_value(error).unwrap_or_default(),
    }
}

fn serialize(payload: &Value, pretty: bool) -> String {
    let serialized = if pretty {
        serde_json::to_string_pretty(payload)
    } else {
        serde_json::to_string(payload)
    };
    serialized.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json_bytes::json;

    use super::*;

    #[tokio::test]
    async fn success_payload_is_exactly_data() {
        let response = graphql::Response::builder()
            .data(json!({"test": "Hello World"}))
            .build();
        let http_response = json_response(Ok(response), false, None);
        assert_eq!(http_response.status(), StatusCode::OK);
        let bytes = body::into_bytes(http_response.into_body()).await.unwrap();
        assert_eq!(bytes, r#"{"data":{"test":"Hello World"}}"#.as_bytes());
    }

    #[tokio::test]
    async fn pipeline_error_payload() {
        let http_response = json_response(Err(PipelineError::MissingQuery), false, None);
        assert_eq!(http_response.status(), StatusCode::BAD_REQUEST);
        let bytes = body::into_bytes(http_response.into_body()).await.unwrap();
        assert_eq!(
            bytes,
            r#"{"errors":[{"message":"Must provide query string."}]}"#.as_bytes()
        );
    }

    #[tokio::test]
    async fn method_not_allowed_carries_the_allow_header() {
        let http_response = json_response(Err(PipelineError::MethodNotAllowed), false, None);
        assert_eq!(http_response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            http_response.headers().get(ALLOW).unwrap(),
            &http::HeaderValue::from_static("GET, POST")
        );
    }

    #[tokio::test]
    async fn complete_failure_is_a_server_error() {
        let response = graphql::Response::builder()
            .data(Value::Null)
            .error(graphql::Error::builder().message("Throws!").build())
            .build();
        let http_response = json_response(Ok(response), false, None);
        assert_eq!(http_response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = body::into_bytes(http_response.into_body()).await.unwrap();
        assert_eq!(
            bytes,
            r#"{"data":null,"errors":[{"message":"Throws!"}]}"#.as_bytes()
        );
    }

    #[tokio::test]
    async fn pretty_mode_uses_two_space_indentation() {
        let response = graphql::Response::builder()
            .data(json!({"test": "Hello World"}))
            .build();
        let http_response = json_response(Ok(response), true, None);
        let bytes = body::into_bytes(http_response.into_body()).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "{\n  \"data\": {\n    \"test\": \"Hello World\"\n  }\n}"
        );
    }

    #[tokio::test]
    async fn non_object_error_formatter_yields_empty_entries() {
        let format: FormatErrorFn = Arc::new(|_| Value::Null);
        let response = graphql::Response::builder()
            .data(json!({"thrower": null}))
            .error(graphql::Error::builder().message("Throws!").build())
            .build();
        let http_response = json_response(Ok(response), false, Some(&format));
        let bytes = body::into_bytes(http_response.into_body()).await.unwrap();
        assert_eq!(
            bytes,
            r#"{"data":{"thrower":null},"errors":[{}]}"#.as_bytes()
        );
    }
}
