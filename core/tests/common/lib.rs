//! Fixtures shared by the `themer-core` integration tests.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use async_channel::Receiver;
use async_trait::async_trait;
use tempfile::TempDir;
use themer_core::CompileError;
use themer_core::CompiledStylesheet;
use themer_core::StylesheetCompiler;
use themer_core::ThemerConfig;
use themer_protocol::InboundEvent;
use themer_protocol::OutboundEvent;
use themer_protocol::ThemesReply;
use tokio::sync::Semaphore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A throwaway install directory laid out with the default config.
pub struct TestInstall {
    pub dir: TempDir,
    pub config: ThemerConfig,
}

impl TestInstall {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let config = ThemerConfig::with_defaults(dir.path());
        std::fs::create_dir_all(&config.themes_dir)?;
        Ok(Self { dir, config })
    }

    /// Writes a complete theme bundle under `themes/<id>/` and returns its
    /// directory.
    pub fn write_theme(&self, id: &str, name: &str, scss: &str) -> Result<PathBuf> {
        let theme_dir = self.config.themes_dir.join(id);
        std::fs::create_dir_all(&theme_dir)?;
        let manifest = serde_json::json!({
            "name": name,
            "author": "themer tests",
            "version": "1.0.0",
        });
        std::fs::write(
            theme_dir.join("theme.json"),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        std::fs::write(theme_dir.join("index.scss"), scss)?;
        Ok(theme_dir)
    }

    /// Adds an extra file to an existing bundle, creating parent directories.
    pub fn write_asset(&self, id: &str, relative: &str, contents: &str) -> Result<()> {
        let path = self.config.themes_dir.join(id).join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn staged_files(&self) -> Result<Vec<String>> {
        relative_files(&self.config.staging_dir)
    }

    pub fn read_staged(&self, relative: &str) -> Result<String> {
        let path = self.config.staging_dir.join(relative);
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Sorted paths of every regular file below `root`, relative to it and
/// joined with `/`.
pub fn relative_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let parts: Vec<_> = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push(parts.join("/"));
    }
    files.sort();
    Ok(files)
}

/// Compiler that returns the entry file unchanged and counts invocations.
#[derive(Default)]
pub struct EchoCompiler {
    calls: AtomicUsize,
}

impl EchoCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StylesheetCompiler for EchoCompiler {
    async fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        read_entry(entry).await
    }
}

/// Compiler that always fails the way a broken Sass install would.
pub struct FailingCompiler;

#[async_trait]
impl StylesheetCompiler for FailingCompiler {
    async fn compile(&self, _entry: &Path) -> Result<CompiledStylesheet, CompileError> {
        Err(CompileError::Failed {
            status: Some(65),
            stderr: "Error: expected \"}\".".to_string(),
        })
    }
}

/// Compiler that holds every compile until a permit is released, so tests
/// can keep an activation in flight.
pub struct GatedCompiler {
    permits: Semaphore,
    started: Semaphore,
}

impl GatedCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Semaphore::new(0),
            started: Semaphore::new(0),
        })
    }

    /// Waits until a compile call is blocked on the gate.
    pub async fn wait_started(&self) -> Result<()> {
        let permit = tokio::time::timeout(DEFAULT_TIMEOUT, self.started.acquire())
            .await
            .context("timed out waiting for a compile to start")??;
        permit.forget();
        Ok(())
    }

    pub fn release(&self) {
        self.permits.add_permits(1);
    }
}

#[async_trait]
impl StylesheetCompiler for GatedCompiler {
    async fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, CompileError> {
        self.started.add_permits(1);
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
        read_entry(entry).await
    }
}

async fn read_entry(entry: &Path) -> Result<CompiledStylesheet, CompileError> {
    let css = tokio::fs::read_to_string(entry)
        .await
        .map_err(|source| CompileError::Spawn {
            program: "test-compiler".to_string(),
            source,
        })?;
    Ok(CompiledStylesheet { css })
}

/// Parses an inbound bus event from JSON.
pub fn inbound(value: serde_json::Value) -> Result<InboundEvent> {
    Ok(serde_json::from_value(value)?)
}

pub async fn next_event(rx_event: &Receiver<OutboundEvent>) -> Result<OutboundEvent> {
    tokio::time::timeout(DEFAULT_TIMEOUT, rx_event.recv())
        .await
        .context("timed out waiting for an outbound event")?
        .context("event bus closed")
}

/// Waits for the next event and requires it to be a themes reply.
pub async fn next_reply(rx_event: &Receiver<OutboundEvent>) -> Result<ThemesReply> {
    match next_event(rx_event).await? {
        OutboundEvent::ThemesReply(reply) => Ok(reply),
        other => anyhow::bail!("expected a themes reply, got {other:?}"),
    }
}
