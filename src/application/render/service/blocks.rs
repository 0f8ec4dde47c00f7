//! Markup templates for generated code and diagram blocks.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::application::hooks::{COPY_GLYPH, Hook, TARGET_ATTRIBUTE};
use crate::application::enhance::zoom::ZoomLevel;
use crate::util::html::{escape_attribute, escape_html};

const RANDOM_SUFFIX_LEN: usize = 6;

static DIAGRAM_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Allocate a process-unique diagram anchor id.
///
/// The monotonic sequence guarantees uniqueness inside the process; the random
/// base-36 suffix keeps ids from separate processes (or a restarted preview)
/// from lining up.
pub(crate) fn allocate_diagram_id() -> String {
    let sequence = DIAGRAM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let random = Uuid::new_v4().as_u128();
    let mut suffix = to_base36(random);
    suffix.truncate(RANDOM_SUFFIX_LEN);
    format!("diagram-{}{suffix}", to_base36(u128::from(sequence)))
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Wrap a highlighted `<pre>` element in the copyable code-block container.
pub(crate) fn code_block_html(language: &str, pre_html: &str) -> String {
    let lang = escape_attribute(&language.to_ascii_lowercase());
    let label = escape_html(language);
    format!(
        concat!(
            "<div class=\"code-block {block}\" data-language=\"{lang}\">",
            "<div class=\"code-block-header\">",
            "<span class=\"code-block-language\">{label}</span>",
            "<button type=\"button\" class=\"code-copy-button {copy}\" data-icon=\"copy\" aria-label=\"Copy code\">{glyph}</button>",
            "</div>",
            "{pre}",
            "</div>"
        ),
        block = Hook::CodeBlock.class(),
        copy = Hook::CodeCopy.class(),
        glyph = COPY_GLYPH,
        lang = lang,
        label = label,
        pre = pre_html,
    )
}

/// Diagram container: a visible loading placeholder, a hidden toolbar that is
/// not yet interactive, and a hidden anchor carrying the raw source as text.
pub(crate) fn diagram_html(id: &str, source: &str) -> String {
    let id = escape_attribute(id);
    let default_zoom = ZoomLevel::default();
    format!(
        concat!(
            "<figure class=\"diagram-block {diagram}\" data-diagram-id=\"{id}\">",
            "<div class=\"diagram-loading {placeholder}\" {target}=\"{id}\">Rendering diagram…</div>",
            "<div class=\"diagram-toolbar {toolbar}\" {target}=\"{id}\" data-interactive=\"false\" hidden>",
            "<button type=\"button\" class=\"diagram-zoom-out {zoom_out}\" {target}=\"{id}\" aria-label=\"Zoom out\">−</button>",
            "<span class=\"diagram-zoom-label {zoom_label}\" {target}=\"{id}\">{percent}%</span>",
            "<button type=\"button\" class=\"diagram-zoom-in {zoom_in}\" {target}=\"{id}\" aria-label=\"Zoom in\">+</button>",
            "<button type=\"button\" class=\"diagram-zoom-reset {zoom_reset}\" {target}=\"{id}\" aria-label=\"Reset zoom\">Reset</button>",
            "</div>",
            "<div class=\"diagram-viewport\">",
            "<div class=\"diagram-anchor mermaid {anchor}\" id=\"{id}\" hidden>{source}</div>",
            "</div>",
            "</figure>"
        ),
        diagram = Hook::Diagram.class(),
        placeholder = Hook::DiagramPlaceholder.class(),
        toolbar = Hook::DiagramToolbar.class(),
        zoom_out = Hook::ZoomOut.class(),
        zoom_label = Hook::ZoomLabel.class(),
        zoom_in = Hook::ZoomIn.class(),
        zoom_reset = Hook::ZoomReset.class(),
        anchor = Hook::DiagramAnchor.class(),
        target = TARGET_ATTRIBUTE,
        percent = default_zoom.percent(),
        id = id,
        source = escape_html(source),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagram_ids_are_unique_and_prefixed() {
        let first = allocate_diagram_id();
        let second = allocate_diagram_id();
        assert_ne!(first, second);
        assert!(first.starts_with("diagram-"));
        assert!(
            first["diagram-".len()..]
                .chars()
                .all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase())
        );
    }

    #[test]
    fn base36_encodes_digits_and_letters() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn diagram_template_hides_toolbar_and_anchor() {
        let html = diagram_html("diagram-x", "graph TD; A-->B");
        assert!(html.contains("data-interactive=\"false\" hidden>"));
        assert!(html.contains("id=\"diagram-x\" hidden>graph TD; A--&gt;B</div>"));
        assert!(html.contains("hook-diagram-placeholder"));
        assert!(html.contains(">100%<"));
    }

    #[test]
    fn code_block_template_carries_language_and_copy_button() {
        let html = code_block_html("Rust", "<pre></pre>");
        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("<span class=\"code-block-language\">Rust</span>"));
        assert!(html.contains("hook-code-copy"));
    }
}
