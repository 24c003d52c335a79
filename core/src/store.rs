use std::path::Path;
use std::path::PathBuf;

use themer_protocol::ThemeId;
use tokio::io::AsyncWriteExt;

use crate::error::ThemeError;

pub const MARKER_FILE: &str = "id";

/// Persists the id of the active theme in a single marker file.
///
/// The store does not know which themes exist; validating ids is left to
/// its callers.
#[derive(Debug, Clone)]
pub struct ActiveThemeStore {
    marker_path: PathBuf,
}

impl ActiveThemeStore {
    pub fn new(marker_path: impl Into<PathBuf>) -> Self {
        Self {
            marker_path: marker_path.into(),
        }
    }

    /// Store whose marker lives inside `staging_dir`, next to the staged theme.
    pub fn in_staging_dir(staging_dir: &Path) -> Self {
        Self::new(staging_dir.join(MARKER_FILE))
    }

    /// Returns `Ok(None)` when no marker exists. A marker holding only
    /// whitespace also counts as no active theme.
    pub async fn read(&self) -> Result<Option<ThemeId>, ThemeError> {
        let contents = match tokio::fs::read_to_string(&self.marker_path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ThemeError::StoreRead {
                    path: self.marker_path.clone(),
                    source,
                });
            }
        };
        let id = contents.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }

    /// Overwrites the marker and syncs it to disk before returning.
    pub async fn write(&self, id: &str) -> Result<(), ThemeError> {
        let map_err = |source| ThemeError::StoreWrite {
            path: self.marker_path.clone(),
            source,
        };
        let mut file = tokio::fs::File::create(&self.marker_path)
            .await
            .map_err(map_err)?;
        file.write_all(id.as_bytes()).await.map_err(map_err)?;
        file.sync_all().await.map_err(map_err)?;
        Ok(())
    }
}
