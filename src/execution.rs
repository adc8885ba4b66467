//! The default executor: resolves root fields against a resolver map.
//!
//! This is deliberately a shallow executor. Each root field of the selected
//! operation is resolved by a registered resolver (or looked up on the root
//! value), and the resolver returns the complete JSON value for that field.
//! Nested selection sets are the resolver's responsibility.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use apollo_compiler::ast;
use apollo_compiler::ast::OperationType;
use apollo_compiler::executable::Selection;
use futures::future::BoxFuture;
use serde_json_bytes::Value;

use crate::configuration::ExecuteArgs;
use crate::context::Context;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Path;

/// Everything a resolver gets to see for one field.
#[derive(Clone)]
#[non_exhaustive]
pub struct ResolverContext {
    /// The request-scoped context.
    pub context: Context,
    /// Coerced argument values for this field.
    pub args: Object,
    /// The configured root value, if any.
    pub root_value: Option<Value>,
    /// The field name as spelled in the schema (not the alias).
    pub field_name: String,
}

/// An error raised by a field resolver.
///
/// The message surfaces verbatim in the response `errors`, with the path of
/// the failing field attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverError {
    /// The error message.
    pub message: String,
}

impl ResolverError {
    /// A resolver error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

type BoxResolver =
    Arc<dyn Fn(ResolverContext) -> BoxFuture<'static, Result<Value, ResolverError>> + Send + Sync>;

/// Field resolvers for the root operation types, keyed by field name.
#[derive(Clone, Default)]
pub struct ResolverMap {
    query: HashMap<String, BoxResolver>,
    mutation: HashMap<String, BoxResolver>,
    subscription: HashMap<String, BoxResolver>,
}

impl ResolverMap {
    /// An empty resolver map. Fields without a resolver fall back to the
    /// root value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for a field of the query root type.
    pub fn query<F, Fut>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResolverError>> + Send + 'static,
    {
        self.query
            .insert(name.into(), Arc::new(move |ctx| Box::pin(resolver(ctx))));
        self
    }

    /// Register a resolver for a field of the mutation root type.
    pub fn mutation<F, Fut>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResolverError>> + Send + 'static,
    {
        self.mutation
            .insert(name.into(), Arc::new(move |ctx| Box::pin(resolver(ctx))));
        self
    }

    /// Register a resolver for a field of the subscription root type.
    ///
    /// Subscriptions are executed like queries, one response per request.
    pub fn subscription<F, Fut>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ResolverError>> + Send + 'static,
    {
        self.subscription
            .insert(name.into(), Arc::new(move |ctx| Box::pin(resolver(ctx))));
        self
    }

    fn for_operation(&self, operation_type: OperationType) -> &HashMap<String, BoxResolver> {
        match operation_type {
            OperationType::Query => &self.query,
            OperationType::Mutation => &self.mutation,
            OperationType::Subscription => &self.subscription,
        }
    }
}

/// Execute the selected operation of `args.document` against the resolver map.
///
/// Field errors never abort execution: a failed nullable field becomes `null`
/// in the data with an entry in `errors`, and a failed non-null field nulls
/// out the whole `data` member while the remaining siblings still run.
pub(crate) async fn execute(args: ExecuteArgs) -> graphql::Response {
    let operation = match args.document.operations.get(args.operation_name.as_deref()) {
        Ok(operation) => operation,
        Err(_) => {
            // The pipeline selects the operation before execution, so this
            // only fires for a custom validate hook that rewrote the document.
            return graphql::Response::builder()
                .error(
                    graphql::Error::builder()
                        .message("operation not found in document")
                        .build(),
                )
                .build();
        }
    };

    let root_type_name = args
        .schema
        .root_operation(operation.operation_type)
        .map(|name| name.to_string())
        .unwrap_or_else(|| {
            match operation.operation_type {
                OperationType::Query => "Query",
                OperationType::Mutation => "Mutation",
                OperationType::Subscription => "Subscription",
            }
            .to_string()
        });
    let resolvers = args.resolvers.for_operation(operation.operation_type);

    let mut data = Object::default();
    let mut errors = Vec::new();
    let mut null_data = false;

    for selection in &operation.selection_set.selections {
        let Selection::Field(field) = selection else {
            // Root fragments are not supported by the shallow executor.
            continue;
        };
        let response_key = field.response_key().to_string();

        if field.name == "__typename" {
            data.insert(response_key.as_str(), Value::String(root_type_name.clone().into()));
            continue;
        }

        let resolved = match resolvers.get(field.name.as_str()) {
            Some(resolver) => {
                let resolver_context = ResolverContext {
                    context: args.context.clone(),
                    args: coerce_arguments(field.arguments.as_slice(), &args.variables),
                    root_value: args.root_value.clone(),
                    field_name: field.name.to_string(),
                };
                resolver(resolver_context).await
            }
            None => Ok(root_field_fallback(args.root_value.as_ref(), field.name.as_str())),
        };

        match resolved {
            Ok(Value::Null) if field.ty().is_non_null() => {
                errors.push(
                    graphql::Error::builder()
                        .message(format!(
                            "Cannot return null for non-nullable field {root_type_name}.{name}.",
                            name = field.name,
                        ))
                        .path(Path::from_key(response_key))
                        .build(),
                );
                null_data = true;
            }
            Ok(value) => {
                data.insert(response_key.as_str(), value);
            }
            Err(err) => {
                errors.push(
                    graphql::Error::builder()
                        .message(err.message)
                        .path(Path::from_key(response_key.clone()))
                        .build(),
                );
                if field.ty().is_non_null() {
                    null_data = true;
                } else {
                    data.insert(response_key.as_str(), Value::Null);
                }
            }
        }
    }

    let data = if null_data {
        Value::Null
    } else {
        Value::Object(data)
    };
    graphql::Response::builder().data(data).errors(errors).build()
}

fn root_field_fallback(root_value: Option<&Value>, field_name: &str) -> Value {
    root_value
        .and_then(|value| value.as_object())
        .and_then(|object| object.get(field_name))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Coerce literal and variable arguments into plain JSON values.
fn coerce_arguments(arguments: &[apollo_compiler::Node<ast::Argument>], variables: &Object) -> Object {
    arguments
        .iter()
        .map(|argument| {
            (
                argument.name.as_str().into(),
                ast_value_to_json(&argument.value, variables),
            )
        })
        .collect()
}

fn ast_value_to_json(value: &ast::Value, variables: &Object) -> Value {
    match value {
        ast::Value::Null => Value::Null,
        ast::Value::Boolean(b) => Value::Bool(*b),
        ast::Value::Enum(name) => Value::String(name.as_str().into()),
        ast::Value::String(s) => Value::String(s.as_str().into()),
        ast::Value::Int(i) => i
            .try_to_i32()
            .ok()
            .map(|i| Value::Number(i.into()))
            .unwrap_or(Value::Null),
        ast::Value::Float(f) => f
            .try_to_f64()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ast::Value::Variable(name) => variables
            .get(name.as_str())
            .cloned()
            .unwrap_or(Value::Null),
        ast::Value::List(items) => Value::Array(
            items
                .iter()
                .map(|item| ast_value_to_json(item, variables))
                .collect(),
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| {
                    (name.as_str().into(), ast_value_to_json(value, variables))
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;
    use serde_json_bytes::json;

    use super::*;

    const SDL: &str = r#"
        type Query {
            test(who: String): String
            thrower: String
            nonNullThrower: String!
        }
        type Mutation {
            writeTest: String
        }
    "#;

    fn args_for(query: &str, variables: Object, resolvers: ResolverMap) -> ExecuteArgs {
        let schema =
            Arc::new(Schema::parse_and_validate(SDL, "schema.graphql").expect("valid schema"));
        let document = ExecutableDocument::parse(&schema, query, "query.graphql")
            .expect("valid document");
        ExecuteArgs {
            schema,
            document: Arc::new(document),
            operation_name: None,
            variables,
            root_value: None,
            context: Context::new(),
            resolvers: Arc::new(resolvers),
        }
    }

    fn hello_resolvers() -> ResolverMap {
        ResolverMap::new()
            .query("test", |ctx: ResolverContext| async move {
                match ctx.args.get("who").and_then(|who| who.as_str()) {
                    Some(who) => Ok(json!(format!("Hello {who}"))),
                    None => Ok(json!("Hello World")),
                }
            })
            .query("thrower", |_ctx| async { Err("Throws!".into()) })
            .query("nonNullThrower", |_ctx| async { Err("Throws!".into()) })
    }

    #[tokio::test]
    async fn resolves_root_fields_with_arguments() {
        let args = args_for(
            "query ($who: String) { test(who: $who) }",
            json!({"who": "Dolly"}).as_object().unwrap().clone(),
            hello_resolvers(),
        );
        let response = execute(args).await;
        assert_eq!(response.data, Some(json!({"test": "Hello Dolly"})));
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn nullable_field_error_keeps_sibling_data() {
        let args = args_for("{ test thrower }", Object::default(), hello_resolvers());
        let response = execute(args).await;
        assert_eq!(
            response.data,
            Some(json!({"test": "Hello World", "thrower": null}))
        );
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Throws!");
        assert_eq!(response.errors[0].path, Some(Path::from_key("thrower")));
    }

    #[tokio::test]
    async fn non_null_field_error_nulls_data() {
        let args = args_for("{ nonNullThrower }", Object::default(), hello_resolvers());
        let response = execute(args).await;
        assert_eq!(response.data, Some(Value::Null));
        assert_eq!(response.errors.len(), 1);
        assert!(response.is_complete_failure());
    }

    #[tokio::test]
    async fn missing_resolver_falls_back_to_root_value() {
        let mut args = args_for("{ test }", Object::default(), ResolverMap::new());
        args.root_value = Some(json!({"test": "from root"}));
        let response = execute(args).await;
        assert_eq!(response.data, Some(json!({"test": "from root"})));
    }

    #[tokio::test]
    async fn aliases_use_the_response_key() {
        let args = args_for("{ greeting: test }", Object::default(), hello_resolvers());
        let response = execute(args).await;
        assert_eq!(response.data, Some(json!({"greeting": "Hello World"})));
    }

    #[tokio::test]
    async fn typename_resolves_to_the_root_type() {
        let args = args_for("{ __typename }", Object::default(), ResolverMap::new());
        let response = execute(args).await;
        assert_eq!(response.data, Some(json!({"__typename": "Query"})));
    }
}
