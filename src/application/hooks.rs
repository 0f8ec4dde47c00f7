//! Hook classes shared between the markdown transformer and the enhancement
//! pass.
//!
//! Hook classes exist only as query targets; styling uses the sibling
//! presentational classes emitted next to them.

/// Every element the enhancement pass needs to locate in a rendered fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hook {
    CodeBlock,
    CodeCopy,
    Diagram,
    DiagramPlaceholder,
    DiagramToolbar,
    DiagramAnchor,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ZoomLabel,
}

impl Hook {
    pub const fn class(self) -> &'static str {
        match self {
            Hook::CodeBlock => "hook-code-block",
            Hook::CodeCopy => "hook-code-copy",
            Hook::Diagram => "hook-diagram",
            Hook::DiagramPlaceholder => "hook-diagram-placeholder",
            Hook::DiagramToolbar => "hook-diagram-toolbar",
            Hook::DiagramAnchor => "hook-diagram-anchor",
            Hook::ZoomIn => "hook-zoom-in",
            Hook::ZoomOut => "hook-zoom-out",
            Hook::ZoomReset => "hook-zoom-reset",
            Hook::ZoomLabel => "hook-zoom-label",
        }
    }

    /// CSS selector matching elements carrying this hook.
    pub fn selector(self) -> String {
        format!(".{}", self.class())
    }

    /// Whether elements with this hook receive a click listener.
    pub const fn is_interactive(self) -> bool {
        matches!(
            self,
            Hook::CodeCopy | Hook::ZoomIn | Hook::ZoomOut | Hook::ZoomReset
        )
    }
}

/// Attribute naming the diagram a toolbar element controls.
pub const TARGET_ATTRIBUTE: &str = "data-target";

/// Glyph shown on an idle copy button.
pub const COPY_GLYPH: &str = "⧉";
/// Glyph shown while a successful copy is being confirmed.
pub const COPIED_GLYPH: &str = "✓";
