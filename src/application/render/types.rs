use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Markdown owned by the caller, typically a question's solution or transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub raw_markdown: String,
}

impl ContentDocument {
    pub fn new(raw_markdown: impl Into<String>) -> Self {
        Self {
            raw_markdown: raw_markdown.into(),
        }
    }
}

/// Heading encountered while rendering, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedHeading {
    pub level: u8,
    pub anchor: String,
    pub text: String,
}

/// Fenced or indented code block emitted with a copy affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockInstance {
    pub language: String,
    pub raw_text: String,
}

/// Diagram block emitted for deferred rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramBlock {
    pub id: String,
    pub source_text: String,
}

/// Output of the markdown transformer.
///
/// `html` is the injectable fragment; the remaining fields describe what the
/// transformer emitted so callers can decide whether enhancement is needed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderedFragment {
    pub html: String,
    pub headings: Vec<RenderedHeading>,
    pub code_blocks: Vec<CodeBlockInstance>,
    pub diagrams: Vec<DiagramBlock>,
}

impl RenderedFragment {
    pub fn contains_code(&self) -> bool {
        !self.code_blocks.is_empty()
    }

    pub fn contains_diagrams(&self) -> bool {
        !self.diagrams.is_empty()
    }
}

/// Structured errors raised inside the rendering pipeline. They never escape
/// [`super::MarkdownTransformer::render`], which degrades to escaped text.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

impl RenderError {
    pub(crate) fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }
}

/// Trait exposed by the rendering pipeline. Implementations must be pure:
/// given the same input they produce the same markup, apart from the
/// process-unique diagram identifiers.
pub trait RenderService: Send + Sync {
    fn try_render(&self, document: &ContentDocument) -> Result<RenderedFragment, RenderError>;
}
