use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;
use crate::util::html::{escape_attribute, escape_html};

/// Language label used when a block declares none.
pub(crate) const PLAIN_LANGUAGE: &str = "text";

/// Highlight `code` with the syntax matching `language`, falling back to plain
/// text for unknown tokens. Returns the `<pre>` element; the generator escapes
/// the code for HTML embedding.
pub(crate) fn highlight_code(
    language: &str,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let syntax =
        find_syntax(syntax_set, language).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: language.to_string(),
                message: err.to_string(),
            })?;
    }

    let highlighted = generator.finalize();
    Ok(wrap_pre(language, &highlighted))
}

/// Unhighlighted variant used when the highlighter itself fails.
pub(crate) fn plain_code(language: &str, code: &str) -> String {
    let mut escaped = escape_html(code);
    if !escaped.ends_with('\n') {
        escaped.push('\n');
    }
    wrap_pre(language, &escaped)
}

fn wrap_pre(language: &str, inner: &str) -> String {
    let lang = escape_attribute(&language.to_ascii_lowercase());
    format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{lang}\"><code class=\"language-{lang} syntax-code\">{inner}</code></pre>"
    )
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}
