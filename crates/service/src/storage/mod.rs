//! Storage abstractions for service layer
//!
//! One JSON document per collection key, persisted as `{key}.json` under a
//! base directory. The HTTP layer talks to the [`CollectionStore`] trait so
//! it can be driven by other implementations in tests.

pub mod document_store;
pub mod key;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
pub use document_store::DocumentStore;
pub use key::{KeyError, ValidKey};

#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Return the stored document, writing and returning `default_value` if
    /// the collection does not exist yet.
    async fn load(&self, key: &ValidKey, default_value: Value) -> Result<Value, StoreError>;
    /// Replace the stored document.
    async fn save(&self, key: &ValidKey, value: &Value) -> Result<(), StoreError>;
}
