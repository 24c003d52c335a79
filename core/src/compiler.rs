use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStylesheet {
    pub css: String,
}

/// Turns a stylesheet entry point into CSS.
#[async_trait]
pub trait StylesheetCompiler: Send + Sync {
    async fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, CompileError>;
}

/// Runs an external Sass compiler and reads the CSS from its stdout.
#[derive(Debug, Clone)]
pub struct SassCommand {
    command: Vec<String>,
}

impl SassCommand {
    /// `command` is the program followed by any leading arguments; the
    /// entry path is appended as the last argument.
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl StylesheetCompiler for SassCommand {
    async fn compile(&self, entry: &Path) -> Result<CompiledStylesheet, CompileError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(CompileError::EmptyCommand);
        };

        let output = tokio::process::Command::new(program)
            .args(args)
            .arg(entry)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let css =
            String::from_utf8(output.stdout).map_err(|source| CompileError::InvalidUtf8 { source })?;
        Ok(CompiledStylesheet { css })
    }
}
