//! The GraphQL-over-HTTP service: a state machine from HTTP request to
//! HTTP response.
//!
//! Stages run strictly in order, each either producing the input of the next
//! or a [`PipelineError`] that goes straight to formatting. Nothing here is
//! shared between requests beyond the resolved options.

use std::sync::Arc;
use std::task::Poll;

use apollo_compiler::ast::OperationType;
use apollo_compiler::ExecutableDocument;
use futures::future::BoxFuture;
use http::Method;
use http::StatusCode;
use serde_json_bytes::Value;
use static_assertions::assert_impl_all;
use tower::BoxError;
use tower_service::Service;

use crate::configuration::ExecuteArgs;
use crate::configuration::ExtensionsArgs;
use crate::configuration::OptionsSource;
use crate::configuration::PipelineOptions;
use crate::context::Context;
use crate::error::GraphQLErrors;
use crate::error::PipelineError;
use crate::execution;
use crate::graphql;
use crate::graphql::IntoGraphQLErrors;
use crate::services::body::Body;
use crate::services::formatter;
use crate::services::graphiql;
use crate::services::layers::body_reader;
use crate::services::layers::content_negotiation;
use crate::services::layers::request_assembly;

assert_impl_all!(GraphQLService: Send, Sync);

/// A [`tower::Service`] handling one GraphQL HTTP endpoint.
#[derive(Clone)]
pub struct GraphQLService {
    options: OptionsSource,
}

impl GraphQLService {
    /// Build a service from fixed options, or from an options resolver via
    /// [`OptionsSource::Resolver`].
    pub fn new(options: impl Into<OptionsSource>) -> Self {
        Self {
            options: options.into(),
        }
    }
}

impl Service<http::Request<Body>> for GraphQLService {
    type Response = http::Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        let clone = self.clone();
        let this = std::mem::replace(self, clone);
        Box::pin(async move { Ok(this.call_inner(req).await) })
    }
}

impl GraphQLService {
    // Every failure is turned into a formatted HTTP response, so the service
    // itself never errors.
    async fn call_inner(self, req: http::Request<Body>) -> http::Response<Body> {
        let (mut parts, body) = req.into_parts();

        let options = match self.options.resolve(&parts).await {
            Ok(options) => options,
            Err(err) => {
                tracing::debug!("could not resolve pipeline options: {err}");
                return formatter::json_response(Err(err), false, None);
            }
        };
        let format_error_fn = options.format_error_fn.clone();
        let mut pretty = options.pretty;

        if parts.method != Method::GET && parts.method != Method::POST {
            return formatter::json_response(
                Err(PipelineError::MethodNotAllowed),
                pretty,
                format_error_fn.as_ref(),
            );
        }

        let payload = match body_reader::read_body(&mut parts, body, options.size_limit).await {
            Ok(payload) => payload,
            Err(err) => {
                return formatter::json_response(Err(err), pretty, format_error_fn.as_ref())
            }
        };
        let assembled = match request_assembly::assemble(&parts, payload) {
            Ok(assembled) => assembled,
            Err(err) => {
                return formatter::json_response(Err(err), pretty, format_error_fn.as_ref())
            }
        };
        if let Some(request_pretty) = assembled.pretty {
            pretty = request_pretty;
        }

        let wants_html = options.graphiql
            && !assembled.raw
            && content_negotiation::prefers_html(&parts.headers);

        let context = options
            .context
            .clone()
            .or_else(|| parts.extensions.get::<Context>().cloned())
            .unwrap_or_default();

        let request = assembled.request;
        let outcome = run_stages(&options, &parts.method, &request, context).await;

        if wants_html {
            // The page renders even on failure, showing the offending query
            // and its errors in the editor. A missing query is not an error
            // here: the editor simply opens empty.
            let status = match &outcome {
                Err(PipelineError::MissingQuery) => StatusCode::OK,
                _ => formatter::status_of(&outcome),
            };
            let result = match outcome {
                Ok(response) => Some(response),
                Err(PipelineError::MissingQuery) => None,
                Err(error) => Some(
                    graphql::Response::builder()
                        .errors(error.into_graphql_errors())
                        .build(),
                ),
            };
            let page = graphiql::render_graphiql(
                request.query.as_deref(),
                (!request.variables.is_empty()).then_some(&request.variables),
                request.operation_name.as_deref(),
                result.as_ref(),
            );
            return formatter::html_response(status, page);
        }

        formatter::json_response(outcome, pretty, format_error_fn.as_ref())
    }
}

/// Parse, select, check, validate, execute, extensions.
async fn run_stages(
    options: &PipelineOptions,
    method: &Method,
    request: &graphql::Request,
    context: Context,
) -> Result<graphql::Response, PipelineError> {
    let query = request
        .query
        .clone()
        .filter(|query| !query.trim().is_empty())
        .ok_or(PipelineError::MissingQuery)?;

    let document = match &options.parse_fn {
        Some(parse) => parse(options.schema.clone(), query)
            .await
            .map_err(|err| PipelineError::ParseFailed(hook_errors(err)))?,
        None => ExecutableDocument::parse(&options.schema, query, "GraphQL request")
            .map_err(|err| PipelineError::ParseFailed(err.into()))?,
    };
    let document = Arc::new(document);

    let operation_type = document
        .operations
        .get(request.operation_name.as_deref())
        .map(|operation| operation.operation_type)
        .map_err(|_| match &request.operation_name {
            Some(name) => PipelineError::UnknownOperationName { name: name.clone() },
            None => PipelineError::AmbiguousOperation,
        })?;

    if operation_type == OperationType::Mutation && method == Method::GET {
        return Err(PipelineError::MutationViaGet);
    }

    match &options.validate_fn {
        Some(validate) => {
            let errors = validate(options.schema.clone(), document.clone())
                .await
                .map_err(|err| PipelineError::ValidationFailed(hook_errors(err)))?;
            if !errors.is_empty() {
                return Err(PipelineError::ValidationFailed(GraphQLErrors(errors)));
            }
        }
        None => {
            (*document)
                .clone()
                .validate(&options.schema)
                .map_err(|err| PipelineError::ValidationFailed(err.into()))?;
        }
    }

    let args = ExecuteArgs {
        schema: options.schema.clone(),
        document: document.clone(),
        operation_name: request.operation_name.clone(),
        variables: request.variables.clone(),
        root_value: options.root_value.clone(),
        context: context.clone(),
        resolvers: options.resolvers.clone(),
    };
    let mut response = match &options.execute_fn {
        Some(execute) => execute(args)
            .await
            .map_err(|err| PipelineError::ExecuteHookFailed {
                reason: err.to_string(),
            })?,
        None => execution::execute(args).await,
    };

    if let Some(extensions_fn) = &options.extensions_fn {
        let value = extensions_fn(ExtensionsArgs {
            context,
            result: response.clone(),
        })
        .await
        .map_err(|err| PipelineError::ExtensionsFailed {
            reason: err.to_string(),
        })?;
        // Anything other than a mapping is ignored.
        if let Value::Object(extensions) = value {
            for (key, value) in extensions {
                response.extensions.insert(key, value);
            }
        }
    }

    Ok(response)
}

fn hook_errors(err: BoxError) -> GraphQLErrors {
    GraphQLErrors(vec![graphql::Error::builder()
        .message(err.to_string())
        .build()])
}
