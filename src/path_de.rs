//! JSON loading with the failing JSON path in every error.
use serde::de::DeserializeOwned;

use crate::error::LoadError;
use crate::schema::SchemaDef;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_load_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_load_error)
}

pub fn schema_from_str(src: &str) -> Result<SchemaDef, LoadError> {
    from_str_with_path(src)
}

pub fn schema_from_slice(bytes: &[u8]) -> Result<SchemaDef, LoadError> {
    from_slice_with_path(bytes)
}

fn into_load_error(err: serde_path_to_error::Error<serde_json::Error>) -> LoadError {
    let path = err.path().to_string();
    let message = err.into_inner().to_string();
    tracing::warn!(%path, %message, "definition rejected");
    LoadError { path, message }
}
