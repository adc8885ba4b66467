//! Extensions to the JSON value model used by GraphQL responses.

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

/// A JSON object.
pub type Object = JsonMap<ByteString, Value>;

/// One segment of a response path, as found in the `path` of a GraphQL error.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// A list index.
    Index(usize),
    /// A field name (or alias).
    Key(String),
}

/// The JSON path to a field in the response data, as found in the `path` of a
/// GraphQL error.
///
/// Serializes to a JSON array mixing strings and integers, per the GraphQL
/// spec response format.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    /// A path made of a single field key.
    pub fn from_key(key: impl Into<String>) -> Self {
        Path(vec![PathElement::Key(key.into())])
    }

    /// Append a list index to the path.
    pub fn with_index(mut self, index: usize) -> Self {
        self.0.push(PathElement::Index(index));
        self
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => f.write_str(key)?,
            }
        }
        Ok(())
    }
}
