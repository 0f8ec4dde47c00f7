//! Markdown transformer and table-of-contents extraction.
//!
//! Rendering is pure: markdown in, an injectable HTML fragment out. The only
//! non-deterministic output is the diagram anchor ids.

mod service;
mod toc;
mod types;

pub use service::{
    MarkdownTransformer, RenderConfigError, RenderPipelineConfig, SYNTAX_THEME_CSS,
    configure_render_service, render, render_service,
};
pub use toc::{TocEntry, extract_toc};
pub use types::{
    CodeBlockInstance, ContentDocument, DiagramBlock, RenderError, RenderService,
    RenderedFragment, RenderedHeading,
};
