use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::application::render::types::{RenderError, RenderedHeading};

/// Stamp the slugged anchors onto the heading elements, in document order.
///
/// Every heading in the formatted HTML originates from a markdown heading
/// (raw HTML headings were escaped), so the sequences must line up exactly.
pub(crate) fn apply_heading_ids(
    html: &str,
    headings: &[RenderedHeading],
) -> Result<String, RenderError> {
    if headings.is_empty() {
        return Ok(html.to_string());
    }

    let headings_shared = Rc::new(headings.to_vec());
    let index = Rc::new(RefCell::new(0usize));
    let error_slot = Rc::new(RefCell::new(None));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("h1, h2, h3, h4, h5, h6", {
                let headings_shared = Rc::clone(&headings_shared);
                let index = Rc::clone(&index);
                let error_slot = Rc::clone(&error_slot);
                move |el| {
                    let mut idx = index.borrow_mut();
                    let Some(info) = headings_shared.get(*idx) else {
                        *error_slot.borrow_mut() =
                            Some(RenderError::document("unexpected extra heading"));
                        return Ok(());
                    };
                    *idx += 1;

                    let tag_name = el.tag_name();
                    let level = tag_name
                        .strip_prefix('h')
                        .and_then(|value| value.parse::<u8>().ok())
                        .unwrap_or(0);
                    if level != info.level {
                        *error_slot.borrow_mut() = Some(RenderError::document(format!(
                            "heading level mismatch: expected h{}, found {}",
                            info.level, tag_name
                        )));
                        return Ok(());
                    }

                    el.set_attribute("id", &info.anchor)?;
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::document(err.to_string()))?;

    if let Some(err) = error_slot.borrow_mut().take() {
        return Err(err);
    }

    let applied = *index.borrow();
    if applied != headings.len() {
        return Err(RenderError::document(format!(
            "expected {} headings, found {applied}",
            headings.len()
        )));
    }

    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, anchor: &str) -> RenderedHeading {
        RenderedHeading {
            level,
            anchor: anchor.to_string(),
            text: anchor.to_string(),
        }
    }

    #[test]
    fn applies_ids_in_order() {
        let html = "<h1>A</h1><p>x</p><h2>B</h2>";
        let output =
            apply_heading_ids(html, &[heading(1, "a"), heading(2, "b")]).expect("ids applied");
        assert_eq!(output, "<h1 id=\"a\">A</h1><p>x</p><h2 id=\"b\">B</h2>");
    }

    #[test]
    fn rejects_level_mismatch() {
        let err = apply_heading_ids("<h3>A</h3>", &[heading(1, "a")]).expect_err("mismatch");
        assert!(err.to_string().contains("heading level mismatch"));
    }

    #[test]
    fn rejects_missing_heading() {
        let err = apply_heading_ids("<p>none</p>", &[heading(1, "a")]).expect_err("missing");
        assert!(err.to_string().contains("expected 1 headings"));
    }
}
