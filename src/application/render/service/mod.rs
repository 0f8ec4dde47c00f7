mod anchors;
mod blocks;
pub(crate) mod config;
mod highlight;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use metrics::counter;
use once_cell::sync::{Lazy, OnceCell};
use syntect::{
    dumps::from_uncompressed_data,
    html::ClassStyle,
    parsing::{SyntaxSet, SyntaxSetBuilder},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::render::types::{
    ContentDocument, RenderError, RenderService, RenderedFragment,
};
use crate::config::DEFAULT_DIAGRAM_LANGUAGE;
use crate::util::html::escape_html;

use anchors::apply_heading_ids;
use config::{build_sanitizer, default_options};
use rewrite::{RewriteOutcome, rewrite_ast};

/// Stylesheet for the `syntax-` prefixed highlight classes, generated at build time.
pub const SYNTAX_THEME_CSS: &str = include_str!(env!("SYNTAX_THEME_CSS_FILE"));

/// Comrak-based transformer with Syntect highlighting and Ammonia sanitisation.
///
/// Code fences tagged with the diagram language become deferred diagram
/// blocks; every other code block gains a copy affordance.
pub struct MarkdownTransformer {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
    diagram_language: String,
}

impl MarkdownTransformer {
    pub fn new(config: &RenderPipelineConfig) -> Self {
        Self {
            options: default_options(),
            syntax_set: load_syntax_set(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_sanitizer(),
            diagram_language: config.diagram_language.clone(),
        }
    }

    /// Render markdown, degrading to an escaped `<pre>` when any stage fails.
    pub fn render(&self, markdown: &str) -> RenderedFragment {
        counter!("qbank_render_total").increment(1);

        match self.try_render(&ContentDocument::new(markdown)) {
            Ok(fragment) => {
                debug!(
                    target = "application::render",
                    headings = fragment.headings.len(),
                    code_blocks = fragment.code_blocks.len(),
                    diagrams = fragment.diagrams.len(),
                    "Rendered markdown"
                );
                fragment
            }
            Err(err) => {
                counter!("qbank_render_fallback_total").increment(1);
                warn!(
                    target = "application::render",
                    error = %err,
                    "Markdown rendering failed; emitting escaped source"
                );
                fallback_fragment(markdown)
            }
        }
    }
}

impl Default for MarkdownTransformer {
    fn default() -> Self {
        Self::new(&RenderPipelineConfig::default())
    }
}

impl RenderService for MarkdownTransformer {
    fn try_render(&self, document: &ContentDocument) -> Result<RenderedFragment, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &document.raw_markdown, &self.options);

        let outcome = rewrite_stage(
            root,
            &self.syntax_set,
            &self.class_style,
            &self.diagram_language,
        )?;
        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = sanitize_stage(&rendered_html, &self.sanitizer);
        let restored_html = restore_stage(sanitized_html, &outcome)?;
        let html = apply_heading_ids(&restored_html, &outcome.headings)?;

        Ok(RenderedFragment {
            html,
            headings: outcome.headings,
            code_blocks: outcome.code_blocks,
            diagrams: outcome.diagrams,
        })
    }
}

/// Load the syntax pack dumped by the build script. A corrupt pack leaves
/// only the plain-text syntax, so highlighting degrades instead of panicking.
pub(crate) fn load_syntax_set() -> SyntaxSet {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    match from_uncompressed_data::<SyntaxSet>(syntax_bytes) {
        Ok(set) => set,
        Err(err) => {
            warn!(
                target = "application::render::highlight",
                error = %err,
                "Syntax pack unreadable; highlighting disabled"
            );
            plain_text_syntax_set()
        }
    }
}

/// Set holding only the plain-text syntax, which `highlight_code` always
/// falls back to.
pub(crate) fn plain_text_syntax_set() -> SyntaxSet {
    let mut builder = SyntaxSetBuilder::new();
    builder.add_plain_text_syntax();
    builder.build()
}

fn fallback_fragment(markdown: &str) -> RenderedFragment {
    RenderedFragment {
        html: format!(
            "<pre class=\"markdown-fallback\">{}</pre>",
            escape_html(markdown)
        ),
        ..RenderedFragment::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    pub diagram_language: String,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            diagram_language: DEFAULT_DIAGRAM_LANGUAGE.to_string(),
        }
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            diagram_language: settings.diagram_language.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

static RENDER_SERVICE: Lazy<Arc<MarkdownTransformer>> =
    Lazy::new(|| Arc::new(MarkdownTransformer::new(&active_render_config())));

/// Set the pipeline configuration. Must run before the shared transformer is
/// first used; later calls are rejected.
pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

/// Access the shared transformer, initialised on first use.
pub fn render_service() -> Arc<MarkdownTransformer> {
    Arc::clone(&RENDER_SERVICE)
}

/// Render markdown to an injectable HTML fragment with the shared transformer.
pub fn render(markdown: &str) -> String {
    render_service().render(markdown).html
}

fn rewrite_stage<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    diagram_language: &str,
) -> Result<RewriteOutcome, RenderError> {
    rewrite_ast(root, syntax_set, class_style, diagram_language)
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn sanitize_stage(html: &str, sanitizer: &ammonia::Builder<'static>) -> String {
    sanitizer.clean(html).to_string()
}

fn restore_stage(html: String, outcome: &RewriteOutcome) -> Result<String, RenderError> {
    outcome.fragments.iter().try_fold(html, |acc, fragment| {
        let placeholder = fragment.placeholder_html();
        if !acc.contains(&placeholder) {
            return Err(RenderError::document(format!(
                "placeholder {} lost during sanitisation",
                fragment.placeholder
            )));
        }
        Ok(acc.replacen(&placeholder, &fragment.html, 1))
    })
}
