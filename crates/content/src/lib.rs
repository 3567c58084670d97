//! Turning fetched pages into canonical text, keyword verdicts and
//! fingerprints.

pub mod fingerprint;
pub mod keywords;
pub mod normalize;

pub use {
    fingerprint::fingerprint,
    keywords::{KeywordMatch, KeywordMatcher, match_keywords},
    normalize::{ContentNormalizer, clean_text},
};
