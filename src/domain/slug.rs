//! Heading anchor slugs.
//!
//! Slugs keep ASCII word characters, hyphens and CJK ideographs so that
//! headings such as “中文标题” stay readable in fragment links. Headings whose
//! text collapses to nothing fall back to a positional `heading-<index>` anchor
//! so table-of-contents links never dangle.

use std::collections::{HashMap, HashSet};

/// Derive the slug for a heading's display text.
///
/// Returns `None` when nothing survives the character filter.
pub fn derive_heading_slug(text: &str) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if pending_separator {
            slug.push('-');
            pending_separator = false;
        }
        for lower in ch.to_lowercase() {
            if is_slug_char(lower) {
                slug.push(lower);
            }
        }
    }

    (!slug.is_empty()).then_some(slug)
}

/// Positional anchor used when a heading produces no slug.
pub fn fallback_anchor(index: usize) -> String {
    format!("heading-{index}")
}

fn is_slug_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || is_cjk_ideograph(ch)
}

fn is_cjk_ideograph(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2FA1F
    )
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings are fed in document order. Duplicates receive monotonic suffixes
/// (`section`, `section-2`, `section-3`) and empty slugs fall back to the
/// heading's position. A suffix is skipped when another heading already owns
/// that anchor, so every issued anchor is distinct.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
    issued: HashSet<String>,
    position: usize,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the anchor for the next heading in the document.
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let index = self.position;
        self.position += 1;

        let base = derive_heading_slug(heading).unwrap_or_else(|| fallback_anchor(index));
        let mut suffix = self.occurrences.get(&base).copied().unwrap_or(1);
        let mut anchor = base.clone();
        while self.issued.contains(&anchor) {
            suffix += 1;
            anchor = format!("{base}-{suffix}");
        }

        self.occurrences.insert(base, suffix);
        self.issued.insert(anchor.clone());
        anchor
    }
}
