//! The tower service and supporting layers of the request pipeline.

use http::HeaderValue;

pub mod body;
pub(crate) mod formatter;
pub(crate) mod graphiql;
pub(crate) mod layers;
pub(crate) mod pipeline;

pub use body::Body;
pub use pipeline::GraphQLService;

pub(crate) static APPLICATION_JSON_HEADER_VALUE: HeaderValue =
    HeaderValue::from_static("application/json");
