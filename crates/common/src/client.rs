//! Typed client for the `/api/storage/:key` endpoints.
//!
//! [`ServerBacked`] is the load-on-mount, write-through-on-change value the
//! browser front end keeps per collection, with failures surfaced to the
//! caller instead of being logged and dropped.

use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::ErrorBody;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Clone, Debug)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Send `X-API-Key` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/api/storage/{}", self.base_url, key)
    }

    fn request(&self, method: Method, key: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url_for(key));
        match &self.api_key {
            Some(k) => builder.header("X-API-Key", k),
            None => builder,
        }
    }

    /// Fetch the document stored under `key`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T, ClientError> {
        let resp = self
            .request(Method::GET, key)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Replace the document stored under `key` with `value`.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let resp = self
            .request(Method::POST, key)
            .json(value)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        check_status(resp).await?;
        debug!(%key, "collection saved");
        Ok(())
    }
}

async fn check_status(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(ClientError::Status { status: status.as_u16(), message })
}

/// Local copy of one collection, kept in sync with the server.
pub struct ServerBacked<T> {
    client: StorageClient,
    key: String,
    value: T,
    last_error: Option<ClientError>,
}

impl<T> ServerBacked<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Load `key` from the server. Any failure falls back to `initial`; the
    /// error is kept in [`ServerBacked::last_error`] so callers can show it.
    pub async fn mount(client: StorageClient, key: impl Into<String>, initial: T) -> Self {
        let key = key.into();
        let (value, last_error) = match client.load::<T>(&key).await {
            Ok(v) => (v, None),
            Err(e) => {
                warn!(%key, error = %e, "failed to load collection; using initial value");
                (initial, Some(e))
            }
        };
        Self { client, key, value, last_error }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Write the full new value; it becomes the local value only once the
    /// server acknowledged it.
    pub async fn set(&mut self, new_value: T) -> Result<(), ClientError> {
        match self.client.save(&self.key, &new_value).await {
            Ok(()) => {
                self.value = new_value;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to save collection; local value unchanged");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Derive the next value from the current one and [`set`](Self::set) it.
    pub async fn update<F>(&mut self, f: F) -> Result<(), ClientError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value);
        self.set(next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_trims_trailing_slash() {
        let c = StorageClient::new("http://localhost:3000/");
        assert_eq!(c.url_for("shifts"), "http://localhost:3000/api/storage/shifts");
    }

    #[tokio::test]
    async fn mount_falls_back_when_unreachable() -> anyhow::Result<()> {
        // grab a free port, then release it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let client = StorageClient::new(format!("http://{addr}"));
        let tags = ServerBacked::mount(client, "tags", vec!["initial".to_string()]).await;
        assert_eq!(tags.get(), &vec!["initial".to_string()]);
        assert!(matches!(tags.last_error(), Some(ClientError::Network(_))));
        Ok(())
    }

    #[tokio::test]
    async fn failed_set_keeps_previous_value() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let client = StorageClient::new(format!("http://{addr}"));
        let mut shifts = ServerBacked::mount(client, "shifts", Vec::<u32>::new()).await;
        let res = shifts.update(|prev| {
            let mut next = prev.clone();
            next.push(1);
            next
        });
        assert!(res.await.is_err());
        assert!(shifts.get().is_empty());
        Ok(())
    }
}
