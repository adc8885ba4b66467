//! Reads the request body: size ceiling, content-encoding, charset decoding.

use async_compression::tokio::write::GzipDecoder;
use async_compression::tokio::write::ZlibDecoder;
use bytes::Bytes;
use http::header::CONTENT_ENCODING;
use http::header::CONTENT_LENGTH;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::HeaderMap;
use mediatype::names::CHARSET;
use mediatype::MediaType;
use mediatype::ReadParams;
use serde_json_bytes::Value;
use tokio::io::AsyncWriteExt;

use crate::error::PipelineError;
use crate::services::body;
use crate::services::body::Body;

/// A structured body decoded by an upstream collaborator (e.g. a multipart
/// layer) and stowed as a request extension.
///
/// When present, body reading and decoding are skipped entirely and this
/// value feeds request assembly directly.
#[derive(Clone, Debug)]
pub struct PreParsedBody(pub Value);

/// What the body contributed to request assembly.
#[derive(Debug)]
pub(crate) enum BodyPayload {
    /// No body, or no declared content-type.
    None,
    /// Decoded body text, dispatched by content-type during assembly.
    Text(String),
    /// A pre-parsed structured body.
    PreParsed(Value),
}

pub(crate) async fn read_body(
    parts: &mut Parts,
    body: Body,
    size_limit: usize,
) -> Result<BodyPayload, PipelineError> {
    if let Some(PreParsedBody(value)) = parts.extensions.remove::<PreParsedBody>() {
        return Ok(BodyPayload::PreParsed(value));
    }

    // Without a declared content-type the body cannot contribute parameters,
    // so it is not read at all.
    if !parts.headers.contains_key(CONTENT_TYPE) {
        return Ok(BodyPayload::None);
    }

    if let Some(length) = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
    {
        if length > size_limit {
            return Err(PipelineError::EntityTooLarge);
        }
    }

    let bytes = body::into_bytes(body)
        .await
        .map_err(|err| PipelineError::BodyReadFailed {
            reason: err.to_string(),
        })?;
    if bytes.len() > size_limit {
        return Err(PipelineError::EntityTooLarge);
    }

    let bytes = decode_content_encoding(&parts.headers, bytes).await?;
    if bytes.len() > size_limit {
        return Err(PipelineError::EntityTooLarge);
    }

    Ok(BodyPayload::Text(decode_charset(&parts.headers, &bytes)?))
}

async fn decode_content_encoding(
    headers: &HeaderMap,
    bytes: Bytes,
) -> Result<Bytes, PipelineError> {
    let encoding = match headers.get(CONTENT_ENCODING) {
        Some(value) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        None => return Ok(bytes),
    };

    match encoding.trim().to_ascii_lowercase().as_str() {
        "" | "identity" => Ok(bytes),
        "gzip" => {
            let mut decoder = GzipDecoder::new(Vec::new());
            write_decoded(&mut decoder, &bytes).await?;
            Ok(Bytes::from(decoder.into_inner()))
        }
        "deflate" => {
            let mut decoder = ZlibDecoder::new(Vec::new());
            write_decoded(&mut decoder, &bytes).await?;
            Ok(Bytes::from(decoder.into_inner()))
        }
        _ => Err(PipelineError::UnsupportedEncoding { encoding }),
    }
}

async fn write_decoded<D>(decoder: &mut D, bytes: &[u8]) -> Result<(), PipelineError>
where
    D: tokio::io::AsyncWrite + Unpin,
{
    decoder
        .write_all(bytes)
        .await
        .map_err(|err| PipelineError::BodyReadFailed {
            reason: format!("cannot decompress request body: {err}"),
        })?;
    decoder
        .shutdown()
        .await
        .map_err(|err| PipelineError::BodyReadFailed {
            reason: format!("cannot decompress request body: {err}"),
        })
}

fn decode_charset(headers: &HeaderMap, bytes: &[u8]) -> Result<String, PipelineError> {
    let charset = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|content_type| {
            MediaType::parse(content_type)
                .ok()
                .and_then(|media_type| media_type.get_param(CHARSET).map(|v| v.unquoted_str().into_owned()))
        });

    match charset.as_deref() {
        None => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(charset) => match charset.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(String::from_utf8_lossy(bytes).into_owned()),
            "utf-16" => Ok(decode_utf16(bytes)),
            other => Err(PipelineError::UnsupportedCharset {
                charset: other.to_ascii_uppercase(),
            }),
        },
    }
}

// UTF-16 with byte-order-mark detection, defaulting to little-endian.
fn decode_utf16(bytes: &[u8]) -> String {
    let (bytes, big_endian) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        _ => (bytes, false),
    };
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}
