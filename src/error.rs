//! Errors raised while shepherding a request through the pipeline.

use std::fmt;

use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use http::header::HeaderValue;
use http::StatusCode;
use thiserror::Error;

use crate::graphql;
use crate::graphql::IntoGraphQLErrors;
use crate::graphql::Location;

/// Any error a request can die of before a well-formed GraphQL response
/// exists.
///
/// Each variant knows the HTTP status it is reported with; the formatter turns
/// the error into a GraphQL `errors` payload via
/// [`IntoGraphQLErrors`](crate::graphql::IntoGraphQLErrors).
#[derive(Error, Display, Debug, Clone)]
#[non_exhaustive]
pub enum PipelineError {
    /// GraphQL only supports GET and POST requests.
    MethodNotAllowed,

    /// Unsupported content-encoding "{encoding}".
    UnsupportedEncoding {
        /// The unsupported `Content-Encoding` value.
        encoding: String,
    },

    /// Unsupported charset "{charset}".
    UnsupportedCharset {
        /// The unsupported charset, upper-cased for display.
        charset: String,
    },

    /// Invalid request body: {reason}
    BodyReadFailed {
        /// What went wrong while reading the body stream.
        reason: String,
    },

    /// Request entity too large.
    EntityTooLarge,

    /// POST body sent invalid JSON.
    InvalidBodyJson,

    /// Variables are invalid JSON.
    InvalidVariablesJson,

    /// Must provide query string.
    MissingQuery,

    /// {0}
    ParseFailed(GraphQLErrors),

    /// {0}
    ValidationFailed(GraphQLErrors),

    /// Must provide operation name if query contains multiple operations.
    AmbiguousOperation,

    /// Unknown operation named "{name}".
    UnknownOperationName {
        /// The requested operation name.
        name: String,
    },

    /// Can only perform a mutation operation from a POST request.
    MutationViaGet,

    /// {reason}
    ExecuteHookFailed {
        /// The error message reported by the execute hook.
        reason: String,
    },

    /// {reason}
    OptionsResolutionFailed {
        /// The error message reported by the options resolver.
        reason: String,
    },

    /// {reason}
    ExtensionsFailed {
        /// The error message reported by the extensions hook.
        reason: String,
    },
}

impl PipelineError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::MethodNotAllowed | PipelineError::MutationViaGet => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            PipelineError::UnsupportedEncoding { .. }
            | PipelineError::UnsupportedCharset { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PipelineError::BodyReadFailed { .. }
            | PipelineError::EntityTooLarge
            | PipelineError::InvalidBodyJson
            | PipelineError::InvalidVariablesJson
            | PipelineError::MissingQuery
            | PipelineError::ParseFailed(_)
            | PipelineError::ValidationFailed(_)
            | PipelineError::ExecuteHookFailed { .. } => StatusCode::BAD_REQUEST,
            PipelineError::AmbiguousOperation
            | PipelineError::UnknownOperationName { .. }
            | PipelineError::OptionsResolutionFailed { .. }
            | PipelineError::ExtensionsFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `Allow` header to attach, if any.
    ///
    /// Only the coarse method check advertises the allowed methods. A mutation
    /// attempted over GET is still a 405, but GET is not categorically
    /// disallowed so no `Allow` header is sent.
    pub fn allow_header(&self) -> Option<HeaderValue> {
        match self {
            PipelineError::MethodNotAllowed => Some(HeaderValue::from_static("GET, POST")),
            _ => None,
        }
    }
}

impl IntoGraphQLErrors for PipelineError {
    fn into_graphql_errors(self) -> Vec<graphql::Error> {
        match self {
            PipelineError::ParseFailed(errors) | PipelineError::ValidationFailed(errors) => {
                errors.0
            }
            other => vec![graphql::Error::builder()
                .message(other.to_string())
                .build()],
        }
    }
}

/// A batch of GraphQL errors carried by a [`PipelineError`] variant.
///
/// Produced from apollo-compiler diagnostics; each diagnostic keeps its
/// source location so clients can point at the offending token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphQLErrors(pub(crate) Vec<graphql::Error>);

impl GraphQLErrors {
    pub(crate) fn from_diagnostics(errors: &DiagnosticList) -> Self {
        GraphQLErrors(
            errors
                .iter()
                .map(|diagnostic| {
                    let builder =
                        graphql::Error::builder().message(diagnostic.error.to_string());
                    match diagnostic.line_column_range().map(|range| range.start) {
                        Some(location) => builder
                            .location(Location {
                                line: location.line as u32,
                                column: location.column as u32,
                            })
                            .build(),
                        None => builder.build(),
                    }
                })
                .collect(),
        )
    }
}

impl<T> From<WithErrors<T>> for GraphQLErrors {
    fn from(value: WithErrors<T>) -> Self {
        Self::from_diagnostics(&value.errors)
    }
}

impl fmt::Display for GraphQLErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
