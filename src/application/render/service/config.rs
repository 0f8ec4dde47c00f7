use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitizer applied to the markdown-derived markup before generated blocks
/// are restored. Raw HTML from the source has already been escaped at this
/// point; the sanitizer mainly guards link and image URLs.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "img",
        "input",
        "li",
        "ol",
        "p",
        "section",
        "span",
        "strong",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["alt", "title", "width", "height", "loading"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    // Raw HTML nodes are escaped during the AST rewrite; generated blocks must
    // pass through verbatim.
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::build_sanitizer;

    #[test]
    fn sanitizer_drops_script_urls() {
        let html = build_sanitizer()
            .clean("<p><a href=\"javascript:alert(1)\">x</a></p>")
            .to_string();
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn sanitizer_preserves_strikethrough_and_placeholders() {
        let html = build_sanitizer()
            .clean("<p><del>Removed</del></p><div>QBANKBLOCKabcX0</div>")
            .to_string();
        assert!(html.contains("<del>Removed</del>"));
        assert!(html.contains("<div>QBANKBLOCKabcX0</div>"));
    }
}
