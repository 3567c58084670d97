use std::collections::BTreeSet;

use crate::normalize::INERT_MARKUP;

/// Keyword verdict for one piece of canonical text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatch {
    pub matched: bool,
    /// Keywords found, as configured (trimmed, original case).
    pub matched_keywords: BTreeSet<String>,
    pub total_keywords: usize,
}

/// Case-insensitive substring matcher over a comma-delimited keyword list.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Split on commas, trim, drop empty entries. `None` yields an empty
    /// matcher.
    pub fn parse(list: Option<&str>) -> Self {
        let keywords = list
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn evaluate(&self, text: &str) -> KeywordMatch {
        if self.keywords.is_empty() {
            return KeywordMatch::default();
        }
        let haystack = fold(text);
        let matched_keywords: BTreeSet<String> = self
            .keywords
            .iter()
            .filter(|k| haystack.contains(&fold(k)))
            .cloned()
            .collect();
        KeywordMatch {
            matched: !matched_keywords.is_empty(),
            matched_keywords,
            total_keywords: self.keywords.len(),
        }
    }
}

/// Lowercase and undo the normalizer's inert markup substitutions, so
/// `AT&T` matches either rendering.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            INERT_MARKUP
                .iter()
                .find_map(|&(from, to)| (to == c).then_some(from))
                .unwrap_or(c)
        })
        .collect()
}

/// One-shot form of [`KeywordMatcher::evaluate`].
pub fn match_keywords(text: &str, list: Option<&str>) -> KeywordMatch {
    KeywordMatcher::parse(list).evaluate(text)
}
