//! Theme discovery.
//!
//! Every direct subdirectory of the themes root is a candidate bundle. A
//! bundle is valid when it holds a parseable `theme.json` manifest and a
//! readable `index.scss`. Invalid bundles are skipped with a warning; they
//! never abort the scan.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use themer_protocol::Theme;
use themer_protocol::ThemeManifest;
use tracing::warn;

use crate::error::ThemeError;

pub const MANIFEST_FILE: &str = "theme.json";
pub const STYLESHEET_FILE: &str = "index.scss";

/// An entry that was skipped while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeLoadWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Valid themes found by one scan, in directory iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeCatalog {
    themes: Vec<Theme>,
    load_warnings: Vec<ThemeLoadWarning>,
}

impl ThemeCatalog {
    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|theme| theme.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|theme| theme.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn load_warnings(&self) -> &[ThemeLoadWarning] {
        &self.load_warnings
    }

    fn skip(&mut self, path: PathBuf, err: &ThemeError) {
        warn!(path = %path.display(), error = %err, "skipping theme");
        self.load_warnings.push(ThemeLoadWarning {
            path,
            message: err.to_string(),
        });
    }
}

/// Reads theme bundles from disk. Holds no cache; every scan hits the
/// filesystem again.
#[derive(Debug, Clone)]
pub struct ThemeRepository {
    themes_root: PathBuf,
}

impl ThemeRepository {
    pub fn new(themes_root: impl Into<PathBuf>) -> Self {
        Self {
            themes_root: themes_root.into(),
        }
    }

    /// Source directory a theme id resolves to, or `None` when the id is not
    /// a single directory name below the themes root. The id is not checked
    /// against any catalog.
    pub fn theme_dir(&self, id: &str) -> Option<PathBuf> {
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.themes_root.join(name)),
            _ => None,
        }
    }

    pub async fn scan(&self) -> ThemeCatalog {
        let mut catalog = ThemeCatalog::default();
        let root = &self.themes_root;

        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(source) => {
                let err = ThemeError::ReadDir {
                    path: root.clone(),
                    source,
                };
                catalog.skip(root.clone(), &err);
                return catalog;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    let err = ThemeError::ReadDir {
                        path: root.clone(),
                        source,
                    };
                    catalog.skip(root.clone(), &err);
                    break;
                }
            };
            let path = entry.path();

            // Symlinks are not followed, matching a plain directory listing.
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => {}
                Ok(_) => continue,
                Err(source) => {
                    catalog.skip(path.clone(), &ThemeError::ReadDir { path, source });
                    continue;
                }
            }

            let Ok(id) = entry.file_name().into_string() else {
                warn!(path = %path.display(), "skipping theme with non UTF-8 directory name");
                catalog.load_warnings.push(ThemeLoadWarning {
                    path,
                    message: "directory name is not valid UTF-8".to_string(),
                });
                continue;
            };

            match load_theme(id, &path).await {
                Ok(theme) => catalog.themes.push(theme),
                Err(err) => catalog.skip(path, &err),
            }
        }

        catalog
    }
}

async fn load_theme(id: String, dir: &Path) -> Result<Theme, ThemeError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest_src = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|source| ThemeError::ReadManifest {
            path: manifest_path.clone(),
            source,
        })?;
    let manifest: ThemeManifest =
        serde_json::from_str(&manifest_src).map_err(|source| ThemeError::InvalidManifest {
            path: manifest_path,
            source,
        })?;

    let stylesheet_path = dir.join(STYLESHEET_FILE);
    let stylesheet_source = tokio::fs::read_to_string(&stylesheet_path)
        .await
        .map_err(|source| ThemeError::ReadStylesheet {
            path: stylesheet_path,
            source,
        })?;

    Ok(Theme {
        id,
        manifest,
        source_path: dir.to_path_buf(),
        stylesheet_source,
    })
}
