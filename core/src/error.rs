use std::path::PathBuf;

/// Failures of the theme lifecycle components.
///
/// Discovery variants are recovered inside the repository scan, staging
/// variants inside activation. Only the store read errors reach callers.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("failed to read themes directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read theme manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid theme manifest {path}: {source}")]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read theme stylesheet {path}: {source}")]
    ReadStylesheet {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read active theme marker {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write active theme marker {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to empty staging directory {path}: {source}")]
    EmptyStaging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("theme id '{id}' is not a directory name")]
    InvalidThemeId { id: String },
    #[error("failed to copy theme assets from {from} to {to}: {source}")]
    CopyAssets {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write placeholder {path}: {source}")]
    WritePlaceholder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compile stylesheet {path}: {source}")]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
    #[error("failed to write compiled stylesheet {path}: {source}")]
    WriteCss {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the external stylesheet compiler.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to spawn stylesheet compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stylesheet compiler exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("stylesheet compiler produced non UTF-8 output: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("no stylesheet compiler command configured")]
    EmptyCommand,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
