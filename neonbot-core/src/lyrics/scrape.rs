//! Pulling plain lyrics text out of a Genius song page.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static LYRICS_CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-lyrics-container="true"]"#).expect("valid lyrics container selector")
});
static LEGACY_LYRICS_DIV: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.lyrics").expect("valid legacy lyrics selector"));

/// Lyrics blocks found on the page, cleaned and joined by a blank line.
/// Empty when the page has no recognisable lyrics markup.
pub fn extract_lyrics(page_html: &str) -> String {
    let document = Html::parse_document(page_html);

    let mut parts: Vec<String> = document.select(&LYRICS_CONTAINER).map(block_text).collect();
    if parts.is_empty() {
        if let Some(legacy) = document.select(&LEGACY_LYRICS_DIV).next() {
            parts.push(block_text(legacy));
        }
    }

    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn block_text(container: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(container, &mut raw);
    raw.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Text nodes are already entity-decoded by the parser. Source newlines are
/// plain whitespace; only `<br>` and nested blocks break a line.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace('\n', " ")),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            // Genius marks ads and annotations embedded in the lyrics this way.
            Node::Element(el) if el.attr("data-exclude-from-selection").is_some() => {}
            Node::Element(el) => {
                let Some(nested) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = matches!(el.name(), "div" | "p");
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                collect_text(nested, out);
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
