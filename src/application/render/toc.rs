use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use lol_html::{RewriteStrSettings, element, html_content::EndTag, rewrite_str, text};
use serde::Serialize;
use tracing::debug;

use crate::domain::slug::fallback_anchor;
use crate::util::html::{decode_entities, normalize_whitespace};

/// Navigation entry derived from a rendered fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Footnote reference markers inside headings; their digits are not heading text.
const FOOTNOTE_REF_SELECTOR: &str =
    "h1 sup.footnote-ref, h2 sup.footnote-ref, h3 sup.footnote-ref";

/// Collect the level 1–3 headings of `html` in document order.
///
/// Headings without an `id` get the positional `heading-<n>` anchor. Footnote
/// markers are left out of the entry text. Input that cannot be parsed yields
/// an empty list.
pub fn extract_toc(html: &str) -> Vec<TocEntry> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let entries: Rc<RefCell<Vec<TocEntry>>> = Rc::new(RefCell::new(Vec::new()));
    let in_footnote_ref = Rc::new(Cell::new(false));

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("h1, h2, h3", {
                    let entries = Rc::clone(&entries);
                    move |el| {
                        let level = match el.tag_name().as_str() {
                            "h1" => 1,
                            "h2" => 2,
                            _ => 3,
                        };
                        let mut entries = entries.borrow_mut();
                        let id = el
                            .get_attribute("id")
                            .map(|value| value.trim().to_string())
                            .filter(|value| !value.is_empty())
                            .unwrap_or_else(|| fallback_anchor(entries.len()));
                        entries.push(TocEntry {
                            id,
                            text: String::new(),
                            level,
                        });
                        Ok(())
                    }
                }),
                element!(FOOTNOTE_REF_SELECTOR, {
                    let in_footnote_ref = Rc::clone(&in_footnote_ref);
                    move |el| {
                        in_footnote_ref.set(true);
                        if let Some(handlers) = el.end_tag_handlers() {
                            let in_footnote_ref = Rc::clone(&in_footnote_ref);
                            let handler: lol_html::EndTagHandler<'static> =
                                Box::new(move |_end: &mut EndTag<'_>| {
                                    in_footnote_ref.set(false);
                                    Ok(())
                                });
                            handlers.push(handler);
                        }
                        Ok(())
                    }
                }),
                text!("h1, h2, h3", {
                    let entries = Rc::clone(&entries);
                    let in_footnote_ref = Rc::clone(&in_footnote_ref);
                    move |chunk| {
                        if in_footnote_ref.get() {
                            return Ok(());
                        }
                        if let Some(entry) = entries.borrow_mut().last_mut() {
                            entry.text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    );

    if let Err(err) = result {
        debug!(
            target = "application::render::toc",
            error = %err,
            "Unparseable fragment; table of contents left empty"
        );
        return Vec::new();
    }

    let mut entries = entries.take();
    for entry in &mut entries {
        entry.text = normalize_whitespace(&decode_entities(&entry.text));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_levels_one_to_three_in_order() {
        let html = "<h1 id=\"a\">A</h1><h4 id=\"skip\">S</h4><h2 id=\"b\">B</h2><h3 id=\"c\">C</h3>";
        let toc = extract_toc(html);
        let ids: Vec<_> = toc.iter().map(|entry| entry.id.as_str()).collect();
        let levels: Vec<_> = toc.iter().map(|entry| entry.level).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(levels, [1, 2, 3]);
    }

    #[test]
    fn missing_ids_fall_back_to_position() {
        let toc = extract_toc("<h2 id=\"x\">X</h2><h2>Untitled</h2>");
        assert_eq!(toc[1].id, "heading-1");
    }

    #[test]
    fn text_includes_nested_markup_decoded() {
        let toc = extract_toc("<h2 id=\"q\">Why <code>a &amp; b</code>\n matters</h2>");
        assert_eq!(toc[0].text, "Why a & b matters");
    }

    #[test]
    fn footnote_markers_are_not_heading_text() {
        let html = concat!(
            "<h1 id=\"title\">Title<sup class=\"footnote-ref\">",
            "<a href=\"#fn-1\" id=\"fnref-1\">1</a></sup> notes</h1>",
            "<h2 id=\"plain\">Plain<sup>2</sup></h2>",
        );
        let toc = extract_toc(html);
        assert_eq!(toc[0].text, "Title notes");
        assert_eq!(toc[1].text, "Plain2");
    }

    #[test]
    fn empty_or_garbage_input_yields_nothing() {
        assert!(extract_toc("").is_empty());
        assert!(extract_toc("   ").is_empty());
        assert!(extract_toc("<<<>>> not html at all").is_empty());
    }
}
