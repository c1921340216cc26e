//! Heuristic matching between free-text supplier categories and the material
//! categories bought as basic materials.
//!
//! The matching rule sits behind [`CategoryMatcher`] so the registry
//! analytics never depend on how "apt" is decided.

use std::{collections::BTreeSet, sync::OnceLock};

use regex::Regex;

use crate::data::normalize_text;

static DELIMITERS: OnceLock<Regex> = OnceLock::new();

fn delimiters() -> &'static Regex {
    DELIMITERS.get_or_init(|| {
        Regex::new(r"\s*(?:[,;/|+()\n]|\s-\s|\sE\s)\s*").expect("delimiter pattern is valid")
    })
}

/// Splits free text on common list delimiters (`, ; / | + ( )`, a spaced
/// dash, the conjunction "e") after accent and case normalization. Tokens
/// shorter than `min_len` characters are dropped.
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    let normalized = normalize_text(text);
    delimiters()
        .split(&normalized)
        .map(str::trim)
        .filter(|token| token.chars().count() >= min_len.max(1))
        .map(str::to_string)
        .collect()
}

/// Normalized tokens of every category observed on basic-material lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicCategories {
    tokens: BTreeSet<String>,
}

impl BasicCategories {
    /// Tokens of `texts` as the given matcher splits them.
    pub fn collect<I, S>(matcher: &dyn CategoryMatcher, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = texts
            .into_iter()
            .flat_map(|text| matcher.tokens(text.as_ref()))
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

pub trait CategoryMatcher {
    fn tokens(&self, text: &str) -> Vec<String>;

    fn is_apt(&self, registry_category: &str, basic: &BasicCategories) -> bool;
}

/// Apt when any registry token is a substring of a basic token or the other
/// way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOverlap {
    pub min_token_len: usize,
}

impl Default for TokenOverlap {
    fn default() -> Self {
        Self { min_token_len: 3 }
    }
}

impl CategoryMatcher for TokenOverlap {
    fn tokens(&self, text: &str) -> Vec<String> {
        tokenize(text, self.min_token_len)
    }

    fn is_apt(&self, registry_category: &str, basic: &BasicCategories) -> bool {
        self.tokens(registry_category)
            .iter()
            .any(|token| {
                basic
                    .tokens()
                    .any(|b| b.contains(token.as_str()) || token.contains(b))
            })
    }
}
