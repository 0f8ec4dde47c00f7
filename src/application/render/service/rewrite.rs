use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::html::ClassStyle;
use syntect::parsing::SyntaxSet;
use tracing::warn;
use uuid::Uuid;

use crate::application::render::types::{
    CodeBlockInstance, DiagramBlock, RenderError, RenderedHeading,
};
use crate::domain::slug::AnchorSlugger;
use crate::util::html::{escape_html, normalize_whitespace};

use super::{blocks, highlight};

#[derive(Debug)]
pub(crate) struct RewriteOutcome {
    pub(crate) headings: Vec<RenderedHeading>,
    pub(crate) code_blocks: Vec<CodeBlockInstance>,
    pub(crate) diagrams: Vec<DiagramBlock>,
    pub(crate) fragments: Vec<BlockFragment>,
    nonce: String,
}

/// Generated markup parked behind a placeholder until sanitisation is done.
#[derive(Debug, Clone)]
pub(crate) struct BlockFragment {
    pub(crate) placeholder: String,
    pub(crate) html: String,
}

impl BlockFragment {
    /// The block-level wrapper comrak emits around the placeholder.
    pub(crate) fn placeholder_html(&self) -> String {
        format!("<div>{}</div>", self.placeholder)
    }
}

pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
    diagram_language: &str,
) -> Result<RewriteOutcome, RenderError> {
    let mut walker = RewriteWalker::new(syntax_set, class_style, diagram_language);
    walker.visit_nodes(root)?;
    Ok(walker.outcome)
}

struct RewriteWalker<'w> {
    syntax_set: &'w SyntaxSet,
    class_style: &'w ClassStyle,
    diagram_language: &'w str,
    outcome: RewriteOutcome,
    slugger: AnchorSlugger,
}

impl<'w> RewriteWalker<'w> {
    fn new(
        syntax_set: &'w SyntaxSet,
        class_style: &'w ClassStyle,
        diagram_language: &'w str,
    ) -> Self {
        Self {
            syntax_set,
            class_style,
            diagram_language,
            outcome: RewriteOutcome {
                headings: Vec::new(),
                code_blocks: Vec::new(),
                diagrams: Vec::new(),
                fragments: Vec::new(),
                nonce: Uuid::new_v4().simple().to_string(),
            },
            slugger: AnchorSlugger::new(),
        }
    }

    fn visit_nodes<'a>(&mut self, node: &'a AstNode<'a>) -> Result<(), RenderError> {
        if let Some(level) = heading_level(node) {
            strip_inline_html(node);
            let text = normalize_whitespace(&collect_inline_text(node));
            let anchor = self.slugger.anchor_for(&text);
            self.outcome.headings.push(RenderedHeading {
                level,
                anchor,
                text,
            });
        }

        if let Some(literal) = raw_html_block(node) {
            let escaped = escape_html(literal.trim_end_matches('\n'));
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: format!("<p>{escaped}</p>\n"),
            });
        } else if let Some(literal) = raw_html_inline(node) {
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlInline(escape_html(&literal));
        } else if let Some((info, literal)) = extract_code_block(node) {
            let language = info.split_whitespace().next().map(str::to_string);
            match language {
                Some(lang) if lang.eq_ignore_ascii_case(self.diagram_language) => {
                    self.emit_diagram(node, &literal);
                }
                other => {
                    let lang = other.unwrap_or_else(|| highlight::PLAIN_LANGUAGE.to_string());
                    self.emit_code_block(node, &lang, &literal);
                }
            }
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }

    fn emit_code_block(&mut self, node: &AstNode<'_>, language: &str, literal: &str) {
        let pre = highlight::highlight_code(language, literal, self.syntax_set, self.class_style)
            .unwrap_or_else(|err| {
                warn!(
                    target = "application::render::highlight",
                    language,
                    error = %err,
                    "Syntax highlighting failed; emitting plain code"
                );
                highlight::plain_code(language, literal)
            });

        self.outcome.code_blocks.push(CodeBlockInstance {
            language: language.to_string(),
            raw_text: literal.to_string(),
        });
        self.park(node, blocks::code_block_html(language, &pre));
    }

    fn emit_diagram(&mut self, node: &AstNode<'_>, literal: &str) {
        let id = blocks::allocate_diagram_id();
        let html = blocks::diagram_html(&id, literal);
        self.outcome.diagrams.push(DiagramBlock {
            id,
            source_text: literal.to_string(),
        });
        self.park(node, html);
    }

    fn park(&mut self, node: &AstNode<'_>, html: String) {
        let placeholder = format!(
            "QBANKBLOCK{}X{}",
            self.outcome.nonce,
            self.outcome.fragments.len()
        );
        let fragment = BlockFragment { placeholder, html };

        let mut data = node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: fragment.placeholder_html(),
        });
        self.outcome.fragments.push(fragment);
    }
}

fn strip_inline_html<'a>(heading: &'a AstNode<'a>) {
    let tags: Vec<&'a AstNode<'a>> = heading
        .descendants()
        .filter(|node| matches!(node.data.borrow().value, NodeValue::HtmlInline(_)))
        .collect();
    for tag in tags {
        tag.detach();
    }
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn raw_html_block(node: &AstNode<'_>) -> Option<String> {
    let data = node.data.borrow();
    if let NodeValue::HtmlBlock(block) = &data.value {
        Some(block.literal.clone())
    } else {
        None
    }
}

fn raw_html_inline(node: &AstNode<'_>) -> Option<String> {
    let data = node.data.borrow();
    if let NodeValue::HtmlInline(literal) = &data.value {
        Some(literal.clone())
    } else {
        None
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        let info = block.info.trim().to_string();
        let literal = block.literal.clone();
        Some((info, literal))
    } else {
        None
    }
}

fn heading_level(node: &AstNode<'_>) -> Option<u8> {
    let data = node.data.borrow();
    if let NodeValue::Heading(heading) = &data.value {
        Some(heading.level)
    } else {
        None
    }
}
