//! Markdown to HTML rendering.

use pulldown_cmark::{html, Options, Parser};

/// Render CommonMark text (plus tables and strikethrough) to an HTML fragment.
pub fn render(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
