//! Diagram engines used by the enhancement pass.

use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::PathBuf,
    process::{Command, Stdio},
    sync::Arc,
    time::Instant,
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

const ENGINE_TARGET: &str = "application::enhance::engine";

/// Source of one diagram handed to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    pub id: String,
    pub source: String,
}

#[derive(Debug, Error)]
pub enum DiagramEngineError {
    #[error("diagram engine unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("failed to prepare diagram cache directory: {0}")]
    CacheInit(io::Error),
    #[error("failed to stage diagram source: {0}")]
    Io(io::Error),
    #[error("diagram CLI not found: {0}")]
    NotFound(io::Error),
    #[error("diagram CLI failed for `{id}` (exit {exit_code:?}): {stderr}")]
    Cli {
        id: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("failed to read rendered SVG: {0}")]
    Read(io::Error),
    #[error("diagram render task aborted: {0}")]
    Join(String),
    #[error("diagram engine returned {actual} results for {expected} diagrams")]
    Mismatch { expected: usize, actual: usize },
}

/// Renders a batch of diagrams to SVG markup, one result per source and in
/// the same order. A single failure fails the whole batch.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    async fn render_batch(
        &self,
        diagrams: &[DiagramSource],
    ) -> Result<Vec<String>, DiagramEngineError>;
}

/// Engine backed by the mermaid CLI (`mmdc`), caching SVG output by the
/// sha256 of the diagram source.
#[derive(Debug, Clone)]
pub struct MermaidCliEngine {
    inner: Arc<MermaidCli>,
}

#[derive(Debug)]
struct MermaidCli {
    cli_path: PathBuf,
    cache_dir: PathBuf,
}

impl MermaidCliEngine {
    pub fn new(
        cli_path: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Self, DiagramEngineError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(DiagramEngineError::CacheInit)?;
        Ok(Self {
            inner: Arc::new(MermaidCli {
                cli_path: cli_path.into(),
                cache_dir,
            }),
        })
    }
}

#[async_trait]
impl DiagramEngine for MermaidCliEngine {
    async fn render_batch(
        &self,
        diagrams: &[DiagramSource],
    ) -> Result<Vec<String>, DiagramEngineError> {
        if diagrams.is_empty() {
            return Ok(Vec::new());
        }

        let cli = Arc::clone(&self.inner);
        let batch = diagrams.to_vec();
        let started_at = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            batch
                .iter()
                .map(|diagram| cli.render(diagram))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|err| DiagramEngineError::Join(err.to_string()))?;

        match &result {
            Ok(svgs) => info!(
                target = ENGINE_TARGET,
                op = "mermaid::render_batch",
                result = "ok",
                diagrams = svgs.len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "Diagram batch rendered"
            ),
            Err(err) => warn!(
                target = ENGINE_TARGET,
                op = "mermaid::render_batch",
                result = "error",
                diagrams = diagrams.len(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "Diagram batch failed"
            ),
        }
        result
    }
}

impl MermaidCli {
    fn render(&self, diagram: &DiagramSource) -> Result<String, DiagramEngineError> {
        let cache_path = self
            .cache_dir
            .join(format!("{}.svg", source_digest(&diagram.source)));
        match fs::read_to_string(&cache_path) {
            Ok(svg) => {
                debug!(
                    target = ENGINE_TARGET,
                    op = "mermaid::render",
                    result = "cache_hit",
                    diagram_id = %diagram.id,
                    cache_path = %cache_path.display(),
                    "Diagram served from cache"
                );
                return Ok(svg);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(
                    target = ENGINE_TARGET,
                    op = "mermaid::render",
                    result = "cache_read_error",
                    diagram_id = %diagram.id,
                    error = %err,
                    "Cached diagram unreadable; re-rendering"
                );
            }
        }

        let mut input = NamedTempFile::new().map_err(DiagramEngineError::Io)?;
        input
            .write_all(diagram.source.as_bytes())
            .map_err(DiagramEngineError::Io)?;
        input.flush().map_err(DiagramEngineError::Io)?;

        let output = tempfile::Builder::new()
            .suffix(".svg")
            .tempfile_in(&self.cache_dir)
            .map_err(DiagramEngineError::Io)?;

        let status = Command::new(&self.cli_path)
            .arg("--input")
            .arg(input.path())
            .arg("--output")
            .arg(output.path())
            .arg("--outputFormat")
            .arg("svg")
            .arg("--quiet")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => DiagramEngineError::NotFound(err),
                _ => DiagramEngineError::Io(err),
            })?;

        if !status.status.success() {
            return Err(DiagramEngineError::Cli {
                id: diagram.id.clone(),
                exit_code: status.status.code(),
                stderr: String::from_utf8_lossy(&status.stderr).trim().to_string(),
            });
        }

        match output.persist(&cache_path) {
            Ok(_) => {}
            // A concurrent render already stored the same diagram.
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => return Err(DiagramEngineError::Io(err.error)),
        }

        fs::read_to_string(&cache_path).map_err(DiagramEngineError::Read)
    }
}

fn source_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

/// Engine that always fails; used when no diagram renderer is configured so
/// diagrams degrade to their raw source.
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DiagramEngine for UnavailableEngine {
    async fn render_batch(
        &self,
        _diagrams: &[DiagramSource],
    ) -> Result<Vec<String>, DiagramEngineError> {
        Err(DiagramEngineError::Unavailable {
            reason: self.reason.clone(),
        })
    }
}
