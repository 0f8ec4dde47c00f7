//! Live model of a mounted fragment.
//!
//! The committed HTML is never edited in place. Hook elements, code texts and
//! diagrams are indexed once at mount time; per-diagram state, listener slots
//! and copy feedback live in explicit maps, and [`ContentRoot::html`]
//! serialises the current view by rewriting the committed markup from them.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    rc::Rc,
    sync::{Arc, Mutex},
};

use lol_html::{
    ElementContentHandlers, RewriteStrSettings, Selector, element, html_content::ContentType,
    html_content::Element, rewrite_str, text,
};
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::application::hooks::{COPIED_GLYPH, Hook, TARGET_ATTRIBUTE};
use crate::util::html::decode_entities;
use crate::util::lock::mutex_lock;

use super::engine::DiagramSource;
use super::zoom::{ZoomAction, ZoomLevel};

const DOM_TARGET: &str = "application::enhance::dom";

/// Click handler stored in an element's listener slot.
pub type Listener = Arc<dyn Fn(&ContentRoot) + Send + Sync>;

/// Identifies a hook element by its hook and its position among elements
/// carrying the same hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey {
    pub hook: Hook,
    pub ordinal: usize,
}

impl ElementKey {
    pub fn new(hook: Hook, ordinal: usize) -> Self {
        Self { hook, ordinal }
    }
}

/// Interactive element discovered while indexing the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookElement {
    pub key: ElementKey,
    /// Diagram id from the `data-target` attribute (zoom controls).
    pub target: Option<String>,
    /// Index of the code block whose text a copy button copies.
    pub code_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramState {
    Pending,
    Rendering,
    Rendered,
    Failed,
}

/// Transient per-diagram state. Dropped together with its [`ContentRoot`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramInstance {
    pub id: String,
    pub source_text: String,
    pub state: DiagramState,
    pub zoom: ZoomLevel,
    pub svg: Option<String>,
}

impl DiagramInstance {
    fn new(id: String, source_text: String) -> Self {
        Self {
            id,
            source_text,
            state: DiagramState::Pending,
            zoom: ZoomLevel::default(),
            svg: None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.state == DiagramState::Rendered
    }
}

/// Diagrams keyed by anchor id, iterated in document order.
#[derive(Debug, Clone, Default)]
pub struct DiagramRegistry {
    order: Vec<String>,
    instances: HashMap<String, DiagramInstance>,
}

impl DiagramRegistry {
    fn register(&mut self, instance: DiagramInstance) {
        if self.instances.contains_key(&instance.id) {
            warn!(
                target = DOM_TARGET,
                diagram_id = %instance.id,
                "Duplicate diagram id ignored"
            );
            return;
        }
        self.order.push(instance.id.clone());
        self.instances.insert(instance.id.clone(), instance);
    }

    pub fn get(&self, id: &str) -> Option<&DiagramInstance> {
        self.instances.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut DiagramInstance> {
        self.instances.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagramInstance> {
        self.order.iter().filter_map(|id| self.instances.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CopyFeedback {
    generation: u64,
    confirmed: bool,
}

#[derive(Default)]
struct RootState {
    committed: String,
    elements: Vec<HookElement>,
    code_texts: Vec<String>,
    diagrams: DiagramRegistry,
    listeners: HashMap<ElementKey, Listener>,
    copy_feedback: HashMap<usize, CopyFeedback>,
}

/// Cloneable handle to a mounted fragment and its transient state.
#[derive(Clone)]
pub struct ContentRoot {
    inner: Arc<Mutex<RootState>>,
}

impl fmt::Debug for ContentRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock("debug");
        f.debug_struct("ContentRoot")
            .field("elements", &state.elements.len())
            .field("diagrams", &state.diagrams.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl ContentRoot {
    /// Commit `html` and index its hook elements. Markup that cannot be
    /// indexed is still mounted, just without interactive behaviour.
    pub fn mount(html: impl Into<String>) -> Self {
        let committed = html.into();
        let index = match scan(&committed) {
            Ok(index) => index,
            Err(err) => {
                warn!(
                    target = DOM_TARGET,
                    error = %err,
                    "Failed to index mounted fragment; enhancement disabled"
                );
                FragmentIndex::default()
            }
        };

        let mut diagrams = DiagramRegistry::default();
        for (id, source) in index.diagrams {
            diagrams.register(DiagramInstance::new(id, source));
        }

        Self {
            inner: Arc::new(Mutex::new(RootState {
                committed,
                elements: index.elements,
                code_texts: index.code_texts,
                diagrams,
                listeners: HashMap::new(),
                copy_feedback: HashMap::new(),
            })),
        }
    }

    fn lock(&self, op: &'static str) -> std::sync::MutexGuard<'_, RootState> {
        mutex_lock(&self.inner, DOM_TARGET, op)
    }

    /// The fragment exactly as it was mounted.
    pub fn committed_html(&self) -> String {
        self.lock("committed_html").committed.clone()
    }

    pub fn elements(&self, hook: Hook) -> Vec<ElementKey> {
        self.lock("elements")
            .elements
            .iter()
            .filter(|element| element.key.hook == hook)
            .map(|element| element.key)
            .collect()
    }

    pub fn interactive_elements(&self) -> Vec<HookElement> {
        self.lock("interactive_elements")
            .elements
            .iter()
            .filter(|element| element.key.hook.is_interactive())
            .cloned()
            .collect()
    }

    /// Put `listener` into the element's slot, replacing any previous one.
    pub fn bind(&self, key: ElementKey, listener: Listener) {
        self.lock("bind").listeners.insert(key, listener);
    }

    pub fn listener_count(&self) -> usize {
        self.lock("listener_count").listeners.len()
    }

    /// Dispatch a click. Returns `false` when the element has no listener.
    pub fn click(&self, key: ElementKey) -> bool {
        let listener = self.lock("click").listeners.get(&key).cloned();
        match listener {
            Some(listener) => {
                listener(self);
                true
            }
            None => {
                debug!(
                    target = DOM_TARGET,
                    hook = key.hook.class(),
                    ordinal = key.ordinal,
                    "Click on element without listener"
                );
                false
            }
        }
    }

    pub fn code_text(&self, code_index: usize) -> Option<String> {
        self.lock("code_text").code_texts.get(code_index).cloned()
    }

    pub fn diagram(&self, id: &str) -> Option<DiagramInstance> {
        self.lock("diagram").diagrams.get(id).cloned()
    }

    pub fn diagrams(&self) -> Vec<DiagramInstance> {
        self.lock("diagrams").diagrams.iter().cloned().collect()
    }

    /// Move every pending diagram to `Rendering` and return their sources.
    pub fn begin_diagram_batch(&self) -> Vec<DiagramSource> {
        let mut state = self.lock("begin_diagram_batch");
        let ids: Vec<String> = state
            .diagrams
            .iter()
            .filter(|instance| instance.state == DiagramState::Pending)
            .map(|instance| instance.id.clone())
            .collect();

        ids.into_iter()
            .filter_map(|id| {
                let instance = state.diagrams.get_mut(&id)?;
                instance.state = DiagramState::Rendering;
                Some(DiagramSource {
                    id: instance.id.clone(),
                    source: instance.source_text.clone(),
                })
            })
            .collect()
    }

    pub fn complete_diagram(&self, id: &str, svg: String) {
        let mut state = self.lock("complete_diagram");
        if let Some(instance) = state.diagrams.get_mut(id) {
            instance.state = DiagramState::Rendered;
            instance.svg = Some(svg);
        }
    }

    pub fn fail_diagram(&self, id: &str) {
        let mut state = self.lock("fail_diagram");
        if let Some(instance) = state.diagrams.get_mut(id) {
            instance.state = DiagramState::Failed;
            instance.svg = None;
        }
    }

    /// Apply a zoom action to a rendered diagram. Diagrams that are not yet
    /// interactive ignore zoom requests.
    pub fn zoom(&self, id: &str, action: ZoomAction) -> Option<ZoomLevel> {
        let mut state = self.lock("zoom");
        let instance = state.diagrams.get_mut(id)?;
        if !instance.is_rendered() {
            return None;
        }
        instance.zoom = instance.zoom.apply(action);
        Some(instance.zoom)
    }

    /// Show the confirmation glyph on a copy button and return the token
    /// that [`ContentRoot::revert_copy`] must present.
    pub fn confirm_copy(&self, ordinal: usize) -> u64 {
        let mut state = self.lock("confirm_copy");
        let feedback = state.copy_feedback.entry(ordinal).or_default();
        feedback.generation += 1;
        feedback.confirmed = true;
        feedback.generation
    }

    /// Restore the idle glyph unless a newer confirmation superseded `generation`.
    pub fn revert_copy(&self, ordinal: usize, generation: u64) -> bool {
        let mut state = self.lock("revert_copy");
        match state.copy_feedback.get_mut(&ordinal) {
            Some(feedback) if feedback.generation == generation => {
                feedback.confirmed = false;
                true
            }
            _ => false,
        }
    }

    pub fn copy_confirmed(&self, ordinal: usize) -> bool {
        self.lock("copy_confirmed")
            .copy_feedback
            .get(&ordinal)
            .is_some_and(|feedback| feedback.confirmed)
    }

    /// Serialise the live fragment.
    pub fn html(&self) -> String {
        let (committed, diagrams, confirmed) = {
            let state = self.lock("html");
            let confirmed: HashSet<usize> = state
                .copy_feedback
                .iter()
                .filter(|(_, feedback)| feedback.confirmed)
                .map(|(ordinal, _)| *ordinal)
                .collect();
            (state.committed.clone(), state.diagrams.clone(), confirmed)
        };

        match serialize(&committed, &diagrams, &confirmed) {
            Ok(html) => html,
            Err(err) => {
                warn!(
                    target = DOM_TARGET,
                    error = %err,
                    "Failed to serialise live fragment; returning committed markup"
                );
                committed
            }
        }
    }
}

#[derive(Debug, Default)]
struct FragmentIndex {
    elements: Vec<HookElement>,
    code_texts: Vec<String>,
    diagrams: Vec<(String, String)>,
}

type Handler<'h> = (Cow<'h, Selector>, ElementContentHandlers<'h>);

fn scan(html: &str) -> Result<FragmentIndex, lol_html::errors::RewritingError> {
    let index = Rc::new(RefCell::new(FragmentIndex::default()));
    let in_anchor = Rc::new(RefCell::new(false));

    let mut handlers: Vec<Handler<'_>> = vec![
        element!(Hook::CodeBlock.selector(), {
            let index = Rc::clone(&index);
            move |_el| {
                index.borrow_mut().code_texts.push(String::new());
                Ok(())
            }
        }),
        text!(format!("{} code", Hook::CodeBlock.selector()), {
            let index = Rc::clone(&index);
            move |chunk| {
                if let Some(text) = index.borrow_mut().code_texts.last_mut() {
                    text.push_str(chunk.as_str());
                }
                Ok(())
            }
        }),
        element!(Hook::DiagramAnchor.selector(), {
            let index = Rc::clone(&index);
            let in_anchor = Rc::clone(&in_anchor);
            move |el| {
                let id = el.get_attribute("id").filter(|id| !id.is_empty());
                *in_anchor.borrow_mut() = id.is_some();
                if let Some(id) = id {
                    index.borrow_mut().diagrams.push((id, String::new()));
                }
                Ok(())
            }
        }),
        text!(Hook::DiagramAnchor.selector(), {
            let index = Rc::clone(&index);
            let in_anchor = Rc::clone(&in_anchor);
            move |chunk| {
                if *in_anchor.borrow()
                    && let Some((_, source)) = index.borrow_mut().diagrams.last_mut()
                {
                    source.push_str(chunk.as_str());
                }
                Ok(())
            }
        }),
    ];

    for hook in [Hook::CodeCopy, Hook::ZoomIn, Hook::ZoomOut, Hook::ZoomReset] {
        handlers.push(element!(hook.selector(), {
            let index = Rc::clone(&index);
            move |el| {
                let mut index = index.borrow_mut();
                let ordinal = index
                    .elements
                    .iter()
                    .filter(|element| element.key.hook == hook)
                    .count();
                let code_index = match hook {
                    Hook::CodeCopy => index.code_texts.len().checked_sub(1),
                    _ => None,
                };
                index.elements.push(HookElement {
                    key: ElementKey::new(hook, ordinal),
                    target: el.get_attribute(TARGET_ATTRIBUTE),
                    code_index,
                });
                Ok(())
            }
        }));
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )?;

    let mut index = index.take();
    for text in &mut index.code_texts {
        *text = decode_entities(text);
    }
    for (_, source) in &mut index.diagrams {
        *source = decode_entities(source);
    }
    Ok(index)
}

fn serialize(
    committed: &str,
    diagrams: &DiagramRegistry,
    confirmed_copies: &HashSet<usize>,
) -> Result<String, lol_html::errors::RewritingError> {
    let copy_ordinal = Rc::new(RefCell::new(0usize));
    let state_of = |id: Option<String>| {
        id.and_then(|id| diagrams.get(&id))
            .map(|instance| instance.state)
    };

    rewrite_str(
        committed,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(Hook::Diagram.selector(), |el| {
                    let class = match state_of(el.get_attribute("data-diagram-id")) {
                        Some(DiagramState::Rendered) => Some("diagram-revealed"),
                        Some(DiagramState::Failed) => Some("diagram-degraded"),
                        _ => None,
                    };
                    if let Some(class) = class {
                        add_class(el, class)?;
                    }
                    Ok(())
                }),
                element!(Hook::DiagramPlaceholder.selector(), |el| {
                    if matches!(
                        state_of(el.get_attribute(TARGET_ATTRIBUTE)),
                        Some(DiagramState::Rendered | DiagramState::Failed)
                    ) {
                        el.set_attribute("hidden", "")?;
                    }
                    Ok(())
                }),
                element!(Hook::DiagramToolbar.selector(), |el| {
                    if state_of(el.get_attribute(TARGET_ATTRIBUTE))
                        == Some(DiagramState::Rendered)
                    {
                        el.remove_attribute("hidden");
                        el.set_attribute("data-interactive", "true")?;
                    }
                    Ok(())
                }),
                element!(Hook::ZoomLabel.selector(), |el| {
                    if let Some(instance) = el
                        .get_attribute(TARGET_ATTRIBUTE)
                        .and_then(|id| diagrams.get(&id))
                    {
                        el.set_inner_content(
                            &format!("{}%", instance.zoom.percent()),
                            ContentType::Text,
                        );
                    }
                    Ok(())
                }),
                element!(Hook::DiagramAnchor.selector(), |el| {
                    let Some(instance) = el.get_attribute("id").and_then(|id| diagrams.get(&id))
                    else {
                        return Ok(());
                    };
                    match (instance.state, instance.svg.as_deref()) {
                        (DiagramState::Rendered, Some(svg)) => {
                            el.remove_attribute("hidden");
                            el.set_attribute("style", &instance.zoom.css_transform())?;
                            el.set_inner_content(svg, ContentType::Html);
                        }
                        (DiagramState::Failed, _) => {
                            el.remove_attribute("hidden");
                        }
                        _ => {}
                    }
                    Ok(())
                }),
                element!(Hook::CodeCopy.selector(), {
                    let copy_ordinal = Rc::clone(&copy_ordinal);
                    move |el| {
                        let mut ordinal = copy_ordinal.borrow_mut();
                        if confirmed_copies.contains(&ordinal) {
                            el.set_inner_content(COPIED_GLYPH, ContentType::Text);
                            el.set_attribute("data-icon", "copied")?;
                        }
                        *ordinal += 1;
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
}

fn add_class(
    el: &mut Element<'_, '_>,
    class: &str,
) -> Result<(), lol_html::errors::AttributeNameError> {
    let value = match el.get_attribute("class") {
        Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
        _ => class.to_string(),
    };
    el.set_attribute("class", &value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = concat!(
        "<h1 id=\"t\">T</h1>",
        "<div class=\"code-block hook-code-block\" data-language=\"rust\">",
        "<div class=\"code-block-header\"><span>rust</span>",
        "<button class=\"hook-code-copy\" data-icon=\"copy\">⧉</button></div>",
        "<pre><code><span class=\"syntax-k\">let</span> a = 1 &lt; 2;\n</code></pre></div>",
        "<figure class=\"hook-diagram\" data-diagram-id=\"diagram-a\">",
        "<div class=\"hook-diagram-placeholder\" data-target=\"diagram-a\">Loading</div>",
        "<div class=\"hook-diagram-toolbar\" data-target=\"diagram-a\" data-interactive=\"false\" hidden>",
        "<button class=\"hook-zoom-out\" data-target=\"diagram-a\">-</button>",
        "<span class=\"hook-zoom-label\" data-target=\"diagram-a\">100%</span>",
        "<button class=\"hook-zoom-in\" data-target=\"diagram-a\">+</button>",
        "<button class=\"hook-zoom-reset\" data-target=\"diagram-a\">Reset</button>",
        "</div>",
        "<div class=\"hook-diagram-anchor\" id=\"diagram-a\" hidden>A--&gt;B</div>",
        "</figure>"
    );

    #[test]
    fn mount_indexes_hooks_code_and_diagrams() {
        let root = ContentRoot::mount(FRAGMENT);
        assert_eq!(root.interactive_elements().len(), 4);
        assert_eq!(root.code_text(0).as_deref(), Some("let a = 1 < 2;\n"));

        let diagram = root.diagram("diagram-a").expect("diagram registered");
        assert_eq!(diagram.source_text, "A-->B");
        assert_eq!(diagram.state, DiagramState::Pending);

        let zoom_in = root
            .interactive_elements()
            .into_iter()
            .find(|element| element.key.hook == Hook::ZoomIn)
            .expect("zoom in");
        assert_eq!(zoom_in.target.as_deref(), Some("diagram-a"));

        let copy = root
            .interactive_elements()
            .into_iter()
            .find(|element| element.key.hook == Hook::CodeCopy)
            .expect("copy");
        assert_eq!(copy.code_index, Some(0));
    }

    #[test]
    fn html_is_unchanged_before_any_state_change() {
        let root = ContentRoot::mount(FRAGMENT);
        assert_eq!(root.html(), FRAGMENT);
    }

    #[test]
    fn rendered_diagram_is_revealed_with_svg() {
        let root = ContentRoot::mount(FRAGMENT);
        let batch = root.begin_diagram_batch();
        assert_eq!(batch.len(), 1);
        assert!(root.begin_diagram_batch().is_empty());

        root.complete_diagram("diagram-a", "<svg id=\"s\"></svg>".to_string());
        let html = root.html();
        assert!(html.contains("diagram-revealed"));
        assert!(html.contains("<svg id=\"s\"></svg>"));
        assert!(html.contains("data-interactive=\"true\""));
        assert!(html.contains(
            "class=\"hook-diagram-placeholder\" data-target=\"diagram-a\" hidden=\"\""
        ));
        assert!(!html.contains("A--&gt;B"));
    }

    #[test]
    fn failed_diagram_reveals_raw_source() {
        let root = ContentRoot::mount(FRAGMENT);
        root.begin_diagram_batch();
        root.fail_diagram("diagram-a");

        let html = root.html();
        assert!(html.contains("<div class=\"hook-diagram-anchor\" id=\"diagram-a\">A--&gt;B</div>"));
        assert!(html.contains("diagram-degraded"));
        assert!(html.contains("data-interactive=\"false\" hidden"));
    }

    #[test]
    fn zoom_requires_rendered_diagram_and_updates_label() {
        let root = ContentRoot::mount(FRAGMENT);
        assert_eq!(root.zoom("diagram-a", ZoomAction::In), None);

        root.begin_diagram_batch();
        root.complete_diagram("diagram-a", "<svg></svg>".to_string());
        root.zoom("diagram-a", ZoomAction::In);
        let level = root.zoom("diagram-a", ZoomAction::In).expect("zoomed");
        assert_eq!(level.percent(), 120);

        let html = root.html();
        assert!(html.contains(">120%</span>"));
        assert!(html.contains("transform: scale(1.2)"));
        assert_eq!(root.zoom("missing", ZoomAction::In), None);
    }

    #[test]
    fn copy_feedback_reverts_only_for_latest_generation() {
        let root = ContentRoot::mount(FRAGMENT);
        let first = root.confirm_copy(0);
        let second = root.confirm_copy(0);
        assert!(root.html().contains("data-icon=\"copied\""));

        assert!(!root.revert_copy(0, first));
        assert!(root.copy_confirmed(0));
        assert!(root.revert_copy(0, second));
        assert!(!root.copy_confirmed(0));
        assert!(root.html().contains("data-icon=\"copy\">⧉"));
    }

    #[test]
    fn binding_replaces_listener_slot() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let root = ContentRoot::mount(FRAGMENT);
        let key = ElementKey::new(Hook::CodeCopy, 0);
        let clicks = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let clicks = Arc::clone(&clicks);
            root.bind(
                key,
                Arc::new(move |_| {
                    clicks.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        assert_eq!(root.listener_count(), 1);
        assert!(root.click(key));
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
        assert!(!root.click(ElementKey::new(Hook::ZoomIn, 0)));
    }
}
