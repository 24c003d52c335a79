use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_TOML_FILE: &str = "themer.toml";

const THEMES_DIRNAME: &str = "themes";
const FRONTEND_DIRNAME: &str = "frontend";
const ACTIVE_DIRNAME: &str = "active";
const DEFAULT_NAMESPACE: &str = "themes";

fn default_sass_command() -> Vec<String> {
    vec!["sass".to_string(), "--no-source-map".to_string()]
}

/// Optional overrides read from `themer.toml` in the install directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    namespace: Option<String>,
    /// Program and leading arguments; the stylesheet entry path is appended.
    sass_command: Option<Vec<String>>,
}

/// Resolved runtime configuration.
///
/// All paths are fixed relative to the install directory:
/// `themes/` holds the bundles and `frontend/active/` is the staging
/// directory served to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemerConfig {
    pub install_dir: PathBuf,
    pub themes_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub namespace: String,
    pub sass_command: Vec<String>,
}

impl ThemerConfig {
    pub fn with_defaults(install_dir: &Path) -> Self {
        Self {
            install_dir: install_dir.to_path_buf(),
            themes_dir: install_dir.join(THEMES_DIRNAME),
            staging_dir: install_dir.join(FRONTEND_DIRNAME).join(ACTIVE_DIRNAME),
            namespace: DEFAULT_NAMESPACE.to_string(),
            sass_command: default_sass_command(),
        }
    }

    /// Loads the layout for `install_dir`, applying `themer.toml` when present.
    pub fn load(install_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::with_defaults(install_dir);
        let path = install_dir.join(CONFIG_TOML_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(config),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let overrides: ConfigToml =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;

        if let Some(namespace) = overrides.namespace {
            config.namespace = namespace;
        }
        if let Some(sass_command) = overrides.sass_command {
            config.sass_command = sass_command;
        }
        Ok(config)
    }
}
