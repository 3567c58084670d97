//! Canonical text extraction.
//!
//! Markup is parsed, non-content elements are dropped and the remaining text
//! nodes are joined with single spaces. The result is then filtered to
//! printable ASCII plus the Japanese and CJK blocks, so that invisible
//! characters and decorative symbols never cause spurious changes.
//!
//! Decoded `<` and `&` in markup text become their fullwidth forms, so
//! canonical text parses back to itself and normalizing is idempotent.

use {
    scraper::{Html, Node},
    sitewatch_common::StrategyKind,
};

/// Elements whose text never counts as page content.
const EXCLUDED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "img", "audio", "video", "picture", "source",
    "track", "object", "embed", "iframe", "frame", "svg", "canvas",
];

/// Markup-significant characters in extracted text and their inert
/// fullwidth stand-ins, both inside [`ALLOWED_RANGES`].
pub const INERT_MARKUP: &[(char, char)] = &[('<', '\u{FF1C}'), ('&', '\u{FF06}')];

/// Inclusive code point ranges kept by [`clean_text`].
const ALLOWED_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007E),   // ASCII printable
    (0x3040, 0x309F),   // Hiragana
    (0x30A0, 0x30FF),   // Katakana
    (0x3400, 0x4DBF),   // CJK Extension A
    (0x4E00, 0x9FFF),   // CJK Unified Ideographs
    (0x3300, 0x33FF),   // CJK Compatibility
    (0xF900, 0xFAFF),   // CJK Compatibility Ideographs
    (0xFE30, 0xFE4F),   // CJK Compatibility Forms
    (0xFF00, 0xFFEF),   // Halfwidth and Fullwidth Forms
    (0x20000, 0x2A6DF), // CJK Extension B
    (0x2A700, 0x2B73F), // CJK Extension C
    (0x2B740, 0x2B81F), // CJK Extension D
    (0x2B820, 0x2CEAF), // CJK Extension E
];

/// Raw fetched body to canonical text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNormalizer;

impl ContentNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Rendered-browser bodies are already plain text and skip markup
    /// stripping.
    pub fn normalize(&self, raw: &str, strategy: StrategyKind) -> String {
        if strategy.yields_rendered_text() {
            clean_text(raw)
        } else {
            clean_text(&extract_text(raw))
        }
    }
}

/// Visible text of an HTML document, text nodes joined by a space, with
/// [`INERT_MARKUP`] substitutions applied.
fn extract_text(markup: &str) -> String {
    let doc = Html::parse_document(markup);
    let mut parts: Vec<&str> = Vec::new();

    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| EXCLUDED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    parts
        .join(" ")
        .chars()
        .map(|c| {
            INERT_MARKUP
                .iter()
                .find_map(|&(from, to)| (from == c).then_some(to))
                .unwrap_or(c)
        })
        .collect()
}

/// Collapse whitespace, replace characters outside the allow-list with a
/// space, then collapse again.
pub fn clean_text(input: &str) -> String {
    let filtered: String = collapse_whitespace(input)
        .chars()
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect();
    collapse_whitespace(&filtered)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_allowed(c: char) -> bool {
    let cp = u32::from(c);
    ALLOWED_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&cp))
}
