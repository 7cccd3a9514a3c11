//! Environment/runtime helpers
//!
//! Sanity checks run once at startup.

use std::path::PathBuf;

use tracing::warn;

/// Return the frontend bundle directory if it exists; warn otherwise so that
/// a missing build is visible in the logs instead of surfacing as 404s.
pub async fn frontend_dir(dir: &str) -> Option<PathBuf> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Some(PathBuf::from(dir)),
        _ => {
            warn!(frontend_dir = %dir, "frontend assets directory not found; static assets disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_frontend_dir_is_none() {
        let dir = std::env::temp_dir().join(format!("frontend_{}", uuid::Uuid::new_v4()));
        assert!(frontend_dir(&dir.to_string_lossy()).await.is_none());

        tokio::fs::create_dir_all(&dir).await.unwrap();
        assert_eq!(frontend_dir(&dir.to_string_lossy()).await, Some(dir.clone()));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
