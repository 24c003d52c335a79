//! Theme activation: stage a bundle into the active directory and compile it.
//!
//! Activation is a sequence of independently fallible steps and is not
//! transactional. Staging (empty, copy, marker, placeholder) stops at its
//! first failure; compiling is attempted regardless, and nothing already
//! written is rolled back.

use std::cmp::Ordering;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use themer_protocol::ThemeId;
use tracing::error;
use tracing::info;

use crate::compiler::StylesheetCompiler;
use crate::error::ThemeError;
use crate::repository::STYLESHEET_FILE;
use crate::store::ActiveThemeStore;

pub const PLACEHOLDER_FILE: &str = ".gitkeep";
pub const COMPILED_FILE: &str = "index.css";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActivationStep {
    EmptyStaging,
    CopyAssets,
    WriteMarker,
    WritePlaceholder,
    Compile,
}

const STAGING_STEPS: [ActivationStep; 4] = [
    ActivationStep::EmptyStaging,
    ActivationStep::CopyAssets,
    ActivationStep::WriteMarker,
    ActivationStep::WritePlaceholder,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Failed(String),
    Skipped,
}

/// What happened to each step of one activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub theme_id: ThemeId,
    pub steps: Vec<(ActivationStep, StepStatus)>,
}

impl ActivationReport {
    pub fn status(&self, step: ActivationStep) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|(recorded, _)| *recorded == step)
            .map(|(_, status)| status)
    }

    pub fn is_staged(&self) -> bool {
        STAGING_STEPS
            .iter()
            .all(|step| self.status(*step) == Some(&StepStatus::Completed))
    }

    pub fn is_complete(&self) -> bool {
        self.is_staged() && self.status(ActivationStep::Compile) == Some(&StepStatus::Completed)
    }
}

pub struct ThemeActivator {
    staging_dir: PathBuf,
    store: ActiveThemeStore,
    compiler: Arc<dyn StylesheetCompiler>,
}

impl ThemeActivator {
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        store: ActiveThemeStore,
        compiler: Arc<dyn StylesheetCompiler>,
    ) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            store,
            compiler,
        }
    }

    pub fn store(&self) -> &ActiveThemeStore {
        &self.store
    }

    /// Stages `source_dir` as theme `id` and compiles it. The caller vouches
    /// for `source_dir`; it is not checked against any catalog. Without a
    /// source the copy step fails, and compiling is still attempted.
    pub async fn activate(&self, id: &str, source_dir: Option<&Path>) -> ActivationReport {
        let mut steps = Vec::with_capacity(STAGING_STEPS.len() + 1);

        match self.stage(id, source_dir).await {
            Ok(()) => {
                steps.extend(STAGING_STEPS.map(|step| (step, StepStatus::Completed)));
            }
            Err((failed_step, err)) => {
                error!(theme_id = id, step = ?failed_step, error = %err, "applying theme failed");
                let message = err.to_string();
                steps.extend(STAGING_STEPS.map(|step| {
                    let status = match step.cmp(&failed_step) {
                        Ordering::Less => StepStatus::Completed,
                        Ordering::Equal => StepStatus::Failed(message.clone()),
                        Ordering::Greater => StepStatus::Skipped,
                    };
                    (step, status)
                }));
            }
        }

        let compile_status = match self.compile().await {
            Ok(()) => StepStatus::Completed,
            Err(err) => {
                error!(theme_id = id, error = %err, "failed to compile theme stylesheet");
                StepStatus::Failed(err.to_string())
            }
        };
        steps.push((ActivationStep::Compile, compile_status));

        let report = ActivationReport {
            theme_id: id.to_string(),
            steps,
        };
        if report.is_complete() {
            info!(theme_id = id, "theme activated");
        }
        report
    }

    async fn stage(
        &self,
        id: &str,
        source_dir: Option<&Path>,
    ) -> Result<(), (ActivationStep, ThemeError)> {
        let staging = &self.staging_dir;

        empty_dir(staging).await.map_err(|source| {
            (
                ActivationStep::EmptyStaging,
                ThemeError::EmptyStaging {
                    path: staging.clone(),
                    source,
                },
            )
        })?;

        let Some(source_dir) = source_dir else {
            return Err((
                ActivationStep::CopyAssets,
                ThemeError::InvalidThemeId { id: id.to_string() },
            ));
        };
        copy_dir_contents(source_dir, staging)
            .await
            .map_err(|source| {
                (
                    ActivationStep::CopyAssets,
                    ThemeError::CopyAssets {
                        from: source_dir.to_path_buf(),
                        to: staging.clone(),
                        source,
                    },
                )
            })?;

        self.store
            .write(id)
            .await
            .map_err(|err| (ActivationStep::WriteMarker, err))?;

        let placeholder = staging.join(PLACEHOLDER_FILE);
        tokio::fs::write(&placeholder, "").await.map_err(move |source| {
            (
                ActivationStep::WritePlaceholder,
                ThemeError::WritePlaceholder {
                    path: placeholder,
                    source,
                },
            )
        })?;

        Ok(())
    }

    async fn compile(&self) -> Result<(), ThemeError> {
        let entry = self.staging_dir.join(STYLESHEET_FILE);
        let compiled = self
            .compiler
            .compile(&entry)
            .await
            .map_err(move |source| ThemeError::Compile {
                path: entry,
                source,
            })?;

        let output = self.staging_dir.join(COMPILED_FILE);
        tokio::fs::write(&output, compiled.css)
            .await
            .map_err(move |source| ThemeError::WriteCss {
                path: output,
                source,
            })
    }
}

/// Removes everything inside `dir`, creating it when missing.
async fn empty_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await?;
        } else {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Recursively copies the contents of `from` into `to`, following symlinks.
/// Refuses when `to` lies inside `from`.
async fn copy_dir_contents(from: &Path, to: &Path) -> io::Result<()> {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || copy_dir_contents_blocking(&from, &to))
        .await
        .map_err(io::Error::other)?
}

fn copy_dir_contents_blocking(from: &Path, to: &Path) -> io::Result<()> {
    if !std::fs::metadata(from)?.is_dir() {
        return Err(io::Error::other(format!(
            "{} is not a directory",
            from.display()
        )));
    }

    if std::fs::canonicalize(to)?.starts_with(std::fs::canonicalize(from)?) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot copy {} into itself", from.display()),
        ));
    }

    for entry in walkdir::WalkDir::new(from).min_depth(1).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
