//! Memoising mount point for rendered fragments.
//!
//! The view re-mounts only when the `html` prop changes by value. Every new
//! fragment gets exactly one deferred enhancement pass; the diagram state of
//! the previous fragment is dropped together with its [`ContentRoot`].

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::debug;

use crate::application::enhance::{ContentRoot, EnhancePass};
use crate::util::html::escape_attribute;

const VIEW_TARGET: &str = "application::view";

/// Default delay between committing a fragment and enhancing it.
pub const DEFAULT_ENHANCE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentViewProps {
    pub html: String,
    pub class_name: Option<String>,
}

impl ContentViewProps {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            class_name: None,
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Same `html` as the mounted fragment; nothing was re-mounted.
    Unchanged,
    /// A new fragment was mounted and an enhancement pass scheduled.
    Replaced,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no async runtime available to schedule the enhancement pass")]
    NoRuntime,
}

struct Mounted {
    html: String,
    root: ContentRoot,
}

pub struct StableContentView {
    pass: Arc<dyn EnhancePass>,
    delay: Duration,
    class_name: Option<String>,
    mounted: Option<Mounted>,
    pending: Option<JoinHandle<()>>,
}

impl StableContentView {
    pub fn new(pass: Arc<dyn EnhancePass>) -> Self {
        Self {
            pass,
            delay: DEFAULT_ENHANCE_DELAY,
            class_name: None,
            mounted: None,
            pending: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Apply new props. Only a change of `html` re-mounts the fragment.
    pub fn update(&mut self, props: ContentViewProps) -> Result<ViewUpdate, ViewError> {
        let ContentViewProps { html, class_name } = props;
        self.class_name = class_name;

        if self
            .mounted
            .as_ref()
            .is_some_and(|mounted| mounted.html == html)
        {
            return Ok(ViewUpdate::Unchanged);
        }

        let handle = Handle::try_current().map_err(|_| ViewError::NoRuntime)?;
        self.cancel_pending();

        let root = ContentRoot::mount(html.clone());
        let pass = Arc::clone(&self.pass);
        let delay = self.delay;
        let scheduled = root.clone();
        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            pass.enhance(&scheduled).await;
        }));
        self.mounted = Some(Mounted { html, root });

        debug!(
            target = VIEW_TARGET,
            op = "update",
            delay_ms = delay.as_millis() as u64,
            "Fragment mounted; enhancement scheduled"
        );
        Ok(ViewUpdate::Replaced)
    }

    pub fn root(&self) -> Option<&ContentRoot> {
        self.mounted.as_ref().map(|mounted| &mounted.root)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Whether a scheduled pass has not finished yet.
    pub fn has_pending_pass(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the scheduled pass, if any, to finish.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending.take() {
            // Aborted passes have nothing to report.
            let _ = handle.await;
        }
    }

    /// Container markup with the live fragment inside.
    pub fn container_html(&self) -> String {
        let inner = self.root().map(ContentRoot::html).unwrap_or_default();
        match self.class_name.as_deref() {
            Some(class) if !class.trim().is_empty() => {
                format!("<div class=\"{}\">{inner}</div>", escape_attribute(class))
            }
            _ => format!("<div>{inner}</div>"),
        }
    }

    /// Drop the mounted fragment and cancel any pending pass.
    pub fn unmount(&mut self) {
        self.cancel_pending();
        self.mounted = None;
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take()
            && !handle.is_finished()
        {
            handle.abort();
            debug!(
                target = VIEW_TARGET,
                op = "cancel_pending",
                "Pending enhancement pass cancelled"
            );
        }
    }
}

impl Drop for StableContentView {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::application::enhance::EnhanceReport;

    #[derive(Default)]
    struct CountingPass {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl EnhancePass for CountingPass {
        async fn enhance(&self, _root: &ContentRoot) -> EnhanceReport {
            self.runs.fetch_add(1, Ordering::SeqCst);
            EnhanceReport::default()
        }
    }

    fn view() -> (StableContentView, Arc<CountingPass>) {
        let pass = Arc::new(CountingPass::default());
        (StableContentView::new(pass.clone()), pass)
    }

    #[tokio::test(start_paused = true)]
    async fn same_html_enhances_once() {
        let (mut view, pass) = view();
        let first = view.update(ContentViewProps::new("<p>a</p>")).expect("update");
        let second = view
            .update(ContentViewProps::new("<p>a</p>").with_class_name("wide"))
            .expect("update");

        assert_eq!(first, ViewUpdate::Replaced);
        assert_eq!(second, ViewUpdate::Unchanged);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 1);
        assert_eq!(view.container_html(), "<div class=\"wide\"><p>a</p></div>");
    }

    #[tokio::test(start_paused = true)]
    async fn pass_waits_for_the_deferred_tick() {
        let (mut view, pass) = view();
        view.update(ContentViewProps::new("<p>a</p>")).expect("update");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 0);
        assert!(view.has_pending_pass());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_cancels_pending_pass() {
        let (mut view, pass) = view();
        view.update(ContentViewProps::new("<p>a</p>")).expect("update");
        view.unmount();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 0);
        assert!(view.root().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_before_the_tick_runs_only_latest() {
        let (mut view, pass) = view();
        view.update(ContentViewProps::new("<p>a</p>")).expect("update");
        view.update(ContentViewProps::new("<p>b</p>")).expect("update");

        view.settle().await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 1);
        assert_eq!(
            view.root().map(ContentRoot::committed_html).as_deref(),
            Some("<p>b</p>")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_pass() {
        let (mut view, pass) = view();
        view.update(ContentViewProps::new("<p>a</p>")).expect("update");
        drop(view);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn update_without_runtime_is_rejected() {
        let (mut view, _) = view();
        let err = view
            .update(ContentViewProps::new("<p>a</p>"))
            .expect_err("no runtime");
        assert!(matches!(err, ViewError::NoRuntime));
        assert!(view.root().is_none());
    }
}
