use axum::{
    body::Bytes,
    extract::{Path, State},
    http::Uri,
    Json,
};
use common::types::SaveAck;
use configs::CorruptPolicy;
use serde_json::{Map, Value};
use service::{errors::StoreError, storage::ValidKey};
use tracing::{debug, error, warn};

use crate::errors::ApiError;
use crate::routes::AppState;

fn parse_key(raw: &str) -> Result<ValidKey, ApiError> {
    ValidKey::parse(raw).map_err(|e| {
        warn!(key = %raw, error = %e, "rejected storage key");
        ApiError::InvalidKey
    })
}

/// Documents must be a JSON object or array at the top level.
fn parse_document(body: &[u8]) -> Result<Value, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "request body is not valid JSON");
        ApiError::InvalidBody
    })?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(ApiError::InvalidBody),
    }
}

/// `GET /api/storage/:key`: the stored document, created as `{}` on first access.
pub async fn load_collection(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let key = parse_key(&raw_key)?;
    let default_doc = Value::Object(Map::new());
    match state.store.load(&key, default_doc.clone()).await {
        Ok(doc) => Ok(Json(doc)),
        Err(e @ StoreError::Corrupt { .. }) => match state.settings.on_corrupt {
            CorruptPolicy::UseDefault => {
                warn!(%key, error = %e, "serving default for corrupt collection");
                Ok(Json(default_doc))
            }
            CorruptPolicy::Fail => {
                warn!(%key, error = %e, "refusing to serve corrupt collection");
                Err(ApiError::LoadFailed)
            }
        },
        Err(e) => {
            error!(%key, error = %e, "failed to load collection");
            Err(ApiError::LoadFailed)
        }
    }
}

/// `POST|PUT /api/storage/:key`: replace the document with the request body.
pub async fn save_collection(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
    body: Bytes,
) -> Result<Json<SaveAck>, ApiError> {
    let key = parse_key(&raw_key)?;
    let doc = parse_document(&body)?;
    state.store.save(&key, &doc).await.map_err(|e| {
        error!(%key, error = %e, "failed to save collection");
        ApiError::SaveFailed
    })?;
    Ok(Json(SaveAck { success: true }))
}

/// Any method on `/api/storage`, `/api/storage/` or a path with more than one
/// segment after it.
pub async fn reject_malformed_path(uri: Uri) -> ApiError {
    warn!(path = %uri.path(), "storage path does not name a single key");
    ApiError::InvalidKey
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_containers_are_documents() {
        assert!(parse_document(br#"{"a":1}"#).is_ok());
        assert!(parse_document(b"[]").is_ok());
        assert_eq!(parse_document(b"42"), Err(ApiError::InvalidBody));
        assert_eq!(parse_document(br#""text""#), Err(ApiError::InvalidBody));
        assert_eq!(parse_document(b"null"), Err(ApiError::InvalidBody));
        assert_eq!(parse_document(b""), Err(ApiError::InvalidBody));
        assert_eq!(parse_document(b"{\"a\":"), Err(ApiError::InvalidBody));
    }

    #[test]
    fn keys_are_validated() {
        assert!(parse_key("employees").is_ok());
        assert_eq!(parse_key("../secrets"), Err(ApiError::InvalidKey));
    }
}
