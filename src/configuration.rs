//! Pipeline configuration and per-request option resolution.

use std::sync::Arc;

use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Schema;
use futures::future::BoxFuture;
use http::request::Parts;
use serde_json_bytes::Value;
use tower::BoxError;

use crate::context::Context;
use crate::error::PipelineError;
use crate::execution::ResolverMap;
use crate::graphql;
use crate::json_ext::Object;

/// Default cap on the decoded request body, in bytes.
pub(crate) const DEFAULT_SIZE_LIMIT: usize = 1024 * 1024;

/// Replaces the default query parsing step.
pub type ParseFn = Arc<
    dyn Fn(Arc<Valid<Schema>>, String) -> BoxFuture<'static, Result<ExecutableDocument, BoxError>>
        + Send
        + Sync,
>;

/// Replaces the default document validation step.
///
/// Returning a non-empty list of errors rejects the request before execution.
pub type ValidateFn = Arc<
    dyn Fn(
            Arc<Valid<Schema>>,
            Arc<ExecutableDocument>,
        ) -> BoxFuture<'static, Result<Vec<graphql::Error>, BoxError>>
        + Send
        + Sync,
>;

/// Replaces the default executor.
pub type ExecuteFn =
    Arc<dyn Fn(ExecuteArgs) -> BoxFuture<'static, Result<graphql::Response, BoxError>> + Send + Sync>;

/// Maps each GraphQL error to the JSON value actually serialized for it.
pub type FormatErrorFn = Arc<dyn Fn(&graphql::Error) -> Value + Send + Sync>;

/// Computes the `extensions` member of the response from the finished result.
pub type ExtensionsFn =
    Arc<dyn Fn(ExtensionsArgs) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// Resolves [`PipelineOptions`] from the head of each inbound request.
pub type OptionsResolver =
    Arc<dyn Fn(&Parts) -> BoxFuture<'static, Result<PipelineOptions, BoxError>> + Send + Sync>;

/// Everything the executor needs for one operation.
#[derive(Clone)]
#[non_exhaustive]
pub struct ExecuteArgs {
    /// The validated schema.
    pub schema: Arc<Valid<Schema>>,
    /// The parsed (and, unless a validate hook said otherwise, validated) document.
    pub document: Arc<ExecutableDocument>,
    /// The operation selected for execution.
    pub operation_name: Option<String>,
    /// Coerced variable values.
    pub variables: Object,
    /// The configured root value, if any.
    pub root_value: Option<Value>,
    /// The request-scoped context.
    pub context: Context,
    /// The resolver map backing the default executor.
    pub resolvers: Arc<ResolverMap>,
}

/// Input to the extensions hook.
#[derive(Clone)]
#[non_exhaustive]
pub struct ExtensionsArgs {
    /// The request-scoped context.
    pub context: Context,
    /// The execution result the extensions are computed from.
    pub result: graphql::Response,
}

/// Per-request pipeline behavior.
///
/// Options are either fixed for the service lifetime or recomputed per
/// request through [`OptionsSource::Resolver`].
#[derive(Clone)]
#[non_exhaustive]
pub struct PipelineOptions {
    /// The schema requests are parsed, validated, and executed against.
    pub schema: Arc<Valid<Schema>>,
    /// Field resolvers for the default executor.
    pub resolvers: Arc<ResolverMap>,
    /// Root value handed to resolvers, and the fallback source of field data.
    pub root_value: Option<Value>,
    /// A context to use instead of a fresh one per request.
    pub context: Option<Context>,
    /// Pretty-print JSON responses by default.
    pub pretty: bool,
    /// Serve the GraphiQL page to browsers that prefer HTML.
    pub graphiql: bool,
    /// Maximum decoded body size in bytes.
    pub size_limit: usize,
    /// Custom parse step.
    pub parse_fn: Option<ParseFn>,
    /// Custom validation step.
    pub validate_fn: Option<ValidateFn>,
    /// Custom executor.
    pub execute_fn: Option<ExecuteFn>,
    /// Custom per-error serialization.
    pub format_error_fn: Option<FormatErrorFn>,
    /// Response extensions hook.
    pub extensions_fn: Option<ExtensionsFn>,
}

#[buildstructor::buildstructor]
impl PipelineOptions {
    /// Constructor
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        schema: Arc<Valid<Schema>>,
        resolvers: Option<Arc<ResolverMap>>,
        root_value: Option<Value>,
        context: Option<Context>,
        pretty: Option<bool>,
        graphiql: Option<bool>,
        size_limit: Option<usize>,
        parse_fn: Option<ParseFn>,
        validate_fn: Option<ValidateFn>,
        execute_fn: Option<ExecuteFn>,
        format_error_fn: Option<FormatErrorFn>,
        extensions_fn: Option<ExtensionsFn>,
    ) -> Self {
        Self {
            schema,
            resolvers: resolvers.unwrap_or_default(),
            root_value,
            context,
            pretty: pretty.unwrap_or_default(),
            graphiql: graphiql.unwrap_or_default(),
            size_limit: size_limit.unwrap_or(DEFAULT_SIZE_LIMIT),
            parse_fn,
            validate_fn,
            execute_fn,
            format_error_fn,
            extensions_fn,
        }
    }
}

/// Where a request's options come from.
#[derive(Clone)]
pub enum OptionsSource {
    /// One set of options for the lifetime of the service.
    Static(Arc<PipelineOptions>),
    /// Options recomputed from the request head, each request.
    Resolver(OptionsResolver),
}

impl OptionsSource {
    /// Resolve the options for one request.
    ///
    /// A failing resolver is a server error, not a client one.
    pub(crate) async fn resolve(
        &self,
        parts: &Parts,
    ) -> Result<Arc<PipelineOptions>, PipelineError> {
        match self {
            OptionsSource::Static(options) => Ok(options.clone()),
            OptionsSource::Resolver(resolver) => resolver(parts)
                .await
                .map(Arc::new)
                .map_err(|err| PipelineError::OptionsResolutionFailed {
                    reason: err.to_string(),
                }),
        }
    }
}

impl From<PipelineOptions> for OptionsSource {
    fn from(options: PipelineOptions) -> Self {
        OptionsSource::Static(Arc::new(options))
    }
}
