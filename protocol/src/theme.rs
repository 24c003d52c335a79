use std::path::PathBuf;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Directory name of a theme bundle under the themes root.
pub type ThemeId = String;

/// Static metadata declared by the theme author in `theme.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ThemeManifest {
    pub name: String,
    pub author: String,
    pub version: String,
}

/// A discovered theme bundle.
///
/// Field names on the wire follow what the theming frontend reads:
/// `config`, `folder` and `scss`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Theme {
    pub id: ThemeId,
    #[serde(rename = "config")]
    pub manifest: ThemeManifest,
    #[serde(rename = "folder")]
    pub source_path: PathBuf,
    #[serde(rename = "scss")]
    pub stylesheet_source: String,
}
