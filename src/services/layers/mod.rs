pub(crate) mod body_reader;
pub(crate) mod content_negotiation;
pub(crate) mod request_assembly;
