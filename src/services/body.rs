//! Body type and helpers shared across the pipeline.

use axum::Error as AxumError;
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use http_body_util::Empty;
use http_body_util::Full;

/// The HTTP body type accepted and produced by the pipeline.
pub type Body = UnsyncBoxBody<Bytes, AxumError>;

/// Create an empty [`Body`].
pub fn empty() -> Body {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Create a full [`Body`] from the supplied chunk.
pub fn from_bytes<T: Into<Bytes>>(chunk: T) -> Body {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Buffer a body into contiguous bytes.
pub(crate) async fn into_bytes<B: HttpBody>(body: B) -> Result<Bytes, B::Error> {
    Ok(body.collect().await?.to_bytes())
}
