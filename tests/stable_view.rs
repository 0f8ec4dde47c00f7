use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use qbank_render::application::{
    enhance::{ContentRoot, EnhancePass, EnhanceReport, Enhancer, MemoryClipboard, UnavailableEngine},
    render::render,
    view::{ContentViewProps, StableContentView, ViewUpdate},
};

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

#[tokio::test(start_paused = true)]
async fn class_name_change_does_not_reenhance() {
    let pass = Arc::new(CountingPass::default());
    let mut view = StableContentView::new(pass.clone());
    let html = render("# Title\n\n```rust\nlet a = 1;\n```\n");

    view.update(ContentViewProps::new(html.clone()).with_class_name("narrow"))
        .expect("update");
    view.settle().await;

    let outcome = view
        .update(ContentViewProps::new(html).with_class_name("wide"))
        .expect("update");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(outcome, ViewUpdate::Unchanged);
    assert_eq!(pass.runs.load(Ordering::SeqCst), 1);
    assert_eq!(view.class_name(), Some("wide"));
}

#[tokio::test(start_paused = true)]
async fn new_html_triggers_a_fresh_pass() {
    let pass = Arc::new(CountingPass::default());
    let mut view = StableContentView::new(pass.clone()).with_delay(Duration::ZERO);

    view.update(ContentViewProps::new("<p>one</p>")).expect("update");
    view.settle().await;
    view.update(ContentViewProps::new("<p>two</p>")).expect("update");
    view.settle().await;

    assert_eq!(pass.runs.load(Ordering::SeqCst), 2);
    assert!(view.container_html().contains("<p>two</p>"));
}

#[tokio::test(start_paused = true)]
async fn view_runs_the_real_enhancer() {
    let enhancer = Enhancer::new(
        Arc::new(MemoryClipboard::new()),
        Arc::new(UnavailableEngine::new("offline")),
    );
    let mut view = StableContentView::new(Arc::new(enhancer));
    view.update(
        ContentViewProps::new(render("```mermaid\ngraph LR;X-->Y;\n```\n"))
            .with_class_name("question-content"),
    )
    .expect("update");
    view.settle().await;

    let html = view.container_html();
    assert!(html.starts_with("<div class=\"question-content\">"));
    assert!(html.contains("diagram-degraded"));
    assert!(html.contains("graph LR;X--&gt;Y;"));
}
