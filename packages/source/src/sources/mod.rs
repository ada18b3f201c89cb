//! Feed adapter implementations.

pub mod chicago;
pub mod newsapi;
pub mod sf;

use serde::de::DeserializeOwned;

use crate::SourceError;

/// Decodes a response body into a feed's native shape.
///
/// Bodies are read as text first so a malformed payload surfaces as
/// [`SourceError::Json`] rather than a transport error.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    Ok(serde_json::from_str(body)?)
}
