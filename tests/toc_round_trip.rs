use qbank_render::application::render::{extract_toc, render};

#[test]
fn toc_follows_rendered_headings() {
    let html = render("# One\n\ntext\n\n## Two\n\n### Three\n\n#### Four\n");
    let toc = extract_toc(&html);

    assert_eq!(toc.len(), 3);
    let summary: Vec<_> = toc
        .iter()
        .map(|entry| (entry.id.as_str(), entry.text.as_str(), entry.level))
        .collect();
    assert_eq!(
        summary,
        [("one", "One", 1), ("two", "Two", 2), ("three", "Three", 3)]
    );
}

#[test]
fn toc_links_to_fallback_and_cjk_anchors() {
    let html = render("# 中文标题\n\n## ???\n");
    let toc = extract_toc(&html);
    assert_eq!(toc[0].id, "中文标题");
    assert_eq!(toc[1].id, "heading-1");
    assert_eq!(toc[1].text, "???");
}

#[test]
fn toc_of_fixture_matches_heading_metadata() {
    let markdown = include_str!("fixtures/two_sum_solution.md");
    let fragment = qbank_render::application::render::render_service().render(markdown);
    let toc = extract_toc(&fragment.html);

    let expected: Vec<_> = fragment
        .headings
        .iter()
        .filter(|heading| heading.level <= 3)
        .map(|heading| heading.anchor.clone())
        .collect();
    let actual: Vec<_> = toc.into_iter().map(|entry| entry.id).collect();
    assert_eq!(actual, expected);
}

#[test]
fn toc_tolerates_foreign_markup() {
    assert!(extract_toc("").is_empty());
    let toc = extract_toc("<div><h2>Loose <b>heading</b></h2><h3 id=\"\">Blank id</h3></div>");
    assert_eq!(toc[0].id, "heading-0");
    assert_eq!(toc[0].text, "Loose heading");
    assert_eq!(toc[1].id, "heading-1");
}

#[test]
fn repeated_headings_get_distinct_toc_links() {
    let toc = extract_toc(&render("# Intro\n\n# Intro\n\n# Intro 2\n"));
    let ids: Vec<_> = toc.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(ids, ["intro", "intro-2", "intro-2-2"]);
}

#[test]
fn footnote_reference_is_not_part_of_toc_text() {
    let markdown = "# Title[^1]\n\nBody.\n\n[^1]: A note.\n";
    let fragment = qbank_render::application::render::render_service().render(markdown);
    let toc = extract_toc(&fragment.html);

    assert_eq!(toc.len(), 1);
    assert_eq!(toc[0].text, "Title");
    assert_eq!(toc[0].text, fragment.headings[0].text);
}
