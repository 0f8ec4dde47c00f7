//! Enhancement pass over a mounted fragment.
//!
//! The pass is idempotent: listener slots are replaced rather than stacked,
//! and only diagrams still pending are handed to the engine.

pub mod clipboard;
pub mod dom;
pub mod engine;
pub mod zoom;

use std::{sync::Arc, time::Duration, time::Instant};

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::application::hooks::Hook;

pub use clipboard::{Clipboard, ClipboardError, CommandClipboard, MemoryClipboard, NoClipboard};
pub use dom::{
    ContentRoot, DiagramInstance, DiagramRegistry, DiagramState, ElementKey, HookElement,
    Listener,
};
pub use engine::{
    DiagramEngine, DiagramEngineError, DiagramSource, MermaidCliEngine, UnavailableEngine,
};
pub use zoom::{ZoomAction, ZoomLevel};

const ENHANCE_TARGET: &str = "application::enhance";

/// How long a successful copy shows the confirmation glyph.
pub const DEFAULT_COPY_FEEDBACK: Duration = Duration::from_millis(2000);

/// Outcome of one pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnhanceReport {
    pub listeners_bound: usize,
    pub diagrams_rendered: usize,
    pub diagrams_failed: usize,
}

/// Post-mount pass the stable view schedules for every new fragment.
#[async_trait]
pub trait EnhancePass: Send + Sync {
    async fn enhance(&self, root: &ContentRoot) -> EnhanceReport;
}

/// Binds copy and zoom listeners and activates diagrams.
#[derive(Clone)]
pub struct Enhancer {
    clipboard: Arc<dyn Clipboard>,
    engine: Arc<dyn DiagramEngine>,
    copy_feedback: Duration,
}

impl Enhancer {
    pub fn new(clipboard: Arc<dyn Clipboard>, engine: Arc<dyn DiagramEngine>) -> Self {
        Self {
            clipboard,
            engine,
            copy_feedback: DEFAULT_COPY_FEEDBACK,
        }
    }

    pub fn with_copy_feedback(mut self, duration: Duration) -> Self {
        self.copy_feedback = duration;
        self
    }

    fn bind_listeners(&self, root: &ContentRoot) -> usize {
        let elements = root.interactive_elements();
        let mut bound = 0;
        for element in elements {
            let listener = match element.key.hook {
                Hook::CodeCopy => self.copy_listener(&element),
                Hook::ZoomIn => zoom_listener(&element, ZoomAction::In),
                Hook::ZoomOut => zoom_listener(&element, ZoomAction::Out),
                Hook::ZoomReset => zoom_listener(&element, ZoomAction::Reset),
                _ => None,
            };
            if let Some(listener) = listener {
                root.bind(element.key, listener);
                bound += 1;
            }
        }
        bound
    }

    fn copy_listener(&self, element: &HookElement) -> Option<Listener> {
        let code_index = element.code_index?;
        let ordinal = element.key.ordinal;
        let clipboard = Arc::clone(&self.clipboard);
        let feedback = self.copy_feedback;

        Some(Arc::new(move |root: &ContentRoot| {
            let Some(text) = root.code_text(code_index) else {
                return;
            };
            let Ok(handle) = Handle::try_current() else {
                warn!(
                    target = ENHANCE_TARGET,
                    op = "copy",
                    "No async runtime available for clipboard write"
                );
                return;
            };
            let clipboard = Arc::clone(&clipboard);
            let root = root.clone();
            handle.spawn(async move {
                copy_with_feedback(clipboard.as_ref(), &root, ordinal, &text, feedback).await;
            });
        }))
    }

    async fn activate_diagrams(&self, root: &ContentRoot) -> (usize, usize) {
        let batch = root.begin_diagram_batch();
        if batch.is_empty() {
            return (0, 0);
        }

        let started_at = Instant::now();
        match self.engine.render_batch(&batch).await {
            Ok(svgs) if svgs.len() == batch.len() => {
                for (diagram, svg) in batch.iter().zip(svgs) {
                    root.complete_diagram(&diagram.id, svg);
                }
                debug!(
                    target = ENHANCE_TARGET,
                    op = "activate_diagrams",
                    result = "ok",
                    diagrams = batch.len(),
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Diagrams revealed"
                );
                (batch.len(), 0)
            }
            outcome => {
                let error = match outcome {
                    Ok(svgs) => DiagramEngineError::Mismatch {
                        expected: batch.len(),
                        actual: svgs.len(),
                    },
                    Err(err) => err,
                };
                counter!("qbank_diagram_render_failure_total").increment(batch.len() as u64);
                warn!(
                    target = ENHANCE_TARGET,
                    op = "activate_diagrams",
                    result = "degraded",
                    diagrams = batch.len(),
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %error,
                    "Diagram rendering failed; revealing raw source"
                );
                for diagram in &batch {
                    root.fail_diagram(&diagram.id);
                }
                (0, batch.len())
            }
        }
    }
}

#[async_trait]
impl EnhancePass for Enhancer {
    async fn enhance(&self, root: &ContentRoot) -> EnhanceReport {
        counter!("qbank_enhance_pass_total").increment(1);
        let listeners_bound = self.bind_listeners(root);
        let (diagrams_rendered, diagrams_failed) = self.activate_diagrams(root).await;

        let report = EnhanceReport {
            listeners_bound,
            diagrams_rendered,
            diagrams_failed,
        };
        info!(
            target = ENHANCE_TARGET,
            op = "enhance",
            listeners = report.listeners_bound,
            diagrams_rendered = report.diagrams_rendered,
            diagrams_failed = report.diagrams_failed,
            "Enhancement pass complete"
        );
        report
    }
}

fn zoom_listener(element: &HookElement, action: ZoomAction) -> Option<Listener> {
    let target = element.target.clone()?;
    Some(Arc::new(move |root: &ContentRoot| {
        if let Some(level) = root.zoom(&target, action) {
            debug!(
                target = ENHANCE_TARGET,
                op = "zoom",
                diagram_id = %target,
                percent = level.percent(),
                "Diagram zoom changed"
            );
        }
    }))
}

async fn copy_with_feedback(
    clipboard: &dyn Clipboard,
    root: &ContentRoot,
    ordinal: usize,
    text: &str,
    feedback: Duration,
) {
    match clipboard.write_text(text).await {
        Ok(()) => {
            let generation = root.confirm_copy(ordinal);
            tokio::time::sleep(feedback).await;
            root.revert_copy(ordinal, generation);
        }
        Err(err) => {
            counter!("qbank_clipboard_failure_total").increment(1);
            warn!(
                target = ENHANCE_TARGET,
                op = "copy",
                result = "error",
                error = %err,
                "Clipboard write failed"
            );
        }
    }
}
