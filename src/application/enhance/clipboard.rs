use std::{
    io::{self, Write},
    path::PathBuf,
    process::{Command, Stdio},
    sync::Mutex,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::util::lock::mutex_lock;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard command `{program}` could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write to clipboard command: {0}")]
    Io(#[from] io::Error),
    #[error("clipboard command exited with {exit_code:?}: {stderr}")]
    Command {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("clipboard task aborted: {0}")]
    Join(String),
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// System clipboard seam.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// In-process clipboard that records every write.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    writes: Mutex<Vec<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent contents, if anything was written.
    pub fn contents(&self) -> Option<String> {
        mutex_lock(&self.writes, "application::enhance::clipboard", "contents")
            .last()
            .cloned()
    }

    pub fn writes(&self) -> Vec<String> {
        mutex_lock(&self.writes, "application::enhance::clipboard", "writes").clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        mutex_lock(&self.writes, "application::enhance::clipboard", "write_text")
            .push(text.to_string());
        Ok(())
    }
}

/// Clipboard that pipes text into an external command such as `wl-copy`,
/// `pbcopy` or `xclip -selection clipboard`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line. Returns `None` when blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    fn run(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ClipboardError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ClipboardError::Command {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || clipboard.run(&text))
            .await
            .map_err(|err| ClipboardError::Join(err.to_string()))?
    }
}

/// Clipboard that rejects every write.
#[derive(Debug, Clone, Default)]
pub struct NoClipboard;

#[async_trait]
impl Clipboard for NoClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable(
            "no clipboard command configured".to_string(),
        ))
    }
}
