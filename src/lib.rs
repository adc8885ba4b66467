//! A GraphQL-over-HTTP request pipeline, exposed as a [`tower::Service`].
//!
//! The service accepts any GET or POST request carrying a GraphQL query (in
//! the URL query string or in a JSON, form-urlencoded, or `application/graphql`
//! body), runs it through parsing, operation selection, validation, and
//! execution against an [`apollo_compiler`] schema, and serializes the result
//! as JSON or as an interactive GraphiQL page, depending on content
//! negotiation.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use apollo_compiler::Schema;
//! use graphql_http::{GraphQLService, PipelineOptions, ResolverMap};
//! use serde_json_bytes::json;
//!
//! let schema = Arc::new(
//!     Schema::parse_and_validate("type Query { test: String }", "schema.graphql").unwrap(),
//! );
//! let resolvers = ResolverMap::new().query("test", |_ctx| async { Ok(json!("Hello World")) });
//! let service = GraphQLService::new(
//!     PipelineOptions::builder()
//!         .schema(schema)
//!         .resolvers(Arc::new(resolvers))
//!         .graphiql(true)
//!         .build(),
//! );
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod configuration;
mod context;
mod error;
mod execution;
pub mod graphql;
mod json_ext;
mod services;

pub use configuration::ExecuteArgs;
pub use configuration::ExecuteFn;
pub use configuration::ExtensionsArgs;
pub use configuration::ExtensionsFn;
pub use configuration::FormatErrorFn;
pub use configuration::OptionsResolver;
pub use configuration::OptionsSource;
pub use configuration::ParseFn;
pub use configuration::PipelineOptions;
pub use configuration::ValidateFn;
pub use context::Context;
pub use error::GraphQLErrors;
pub use error::PipelineError;
pub use execution::ResolverContext;
pub use execution::ResolverError;
pub use execution::ResolverMap;
pub use json_ext::Object;
pub use json_ext::Path;
pub use json_ext::PathElement;
pub use services::body;
pub use services::Body;
pub use services::GraphQLService;
pub use services::layers::body_reader::PreParsedBody;
