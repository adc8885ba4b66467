use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::graphql::Error;
use crate::json_ext::Object;

/// A GraphQL `Response` as returned by execution, before HTTP formatting.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The errors raised during execution, if any.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The extensions of this response, if any.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(
        data: Option<Value>,
        errors: Vec<Error>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        extensions: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    /// `true` if the response carries errors but no usable data.
    ///
    /// Such a response is reported with a server-error status rather than 200,
    /// since nothing in it is actionable by the client.
    pub fn is_complete_failure(&self) -> bool {
        !self.errors.is_empty() && matches!(self.data, None | Some(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn test_response_serialization_order() {
        let response = Response::builder()
            .data(json!({"thrower": null}))
            .error(Error::builder().message("Throws!").build())
            .build();
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"data":{"thrower":null},"errors":[{"message":"Throws!"}]}"#
        );
    }

    #[test]
    fn test_complete_failure_detection() {
        let errors = vec![Error::builder().message("boom").build()];
        assert!(Response::builder().errors(errors.clone()).build().is_complete_failure());
        assert!(Response::builder()
            .data(Value::Null)
            .errors(errors.clone())
            .build()
            .is_complete_failure());
        assert!(!Response::builder()
            .data(json!({"test": "Hello World"}))
            .errors(errors)
            .build()
            .is_complete_failure());
        assert!(!Response::builder().data(Value::Null).build().is_complete_failure());
    }
}
