//! Case-insensitive term matching inside leaf text.

use regex::{Regex, RegexBuilder};

use crate::text_helpers::is_word_char;
use crate::types::MatchMode;

/// A piece of a split leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Piece<'t> {
    Plain(&'t str),
    Match(&'t str),
}

/// Compiled matcher for one term.
#[derive(Clone, Debug)]
pub struct TermMatcher {
    regex: Regex,
}

impl TermMatcher {
    /// Compile a matcher. Returns `None` for blank terms.
    ///
    /// In word-bounded mode a `\b` assertion is only placed at term edges that
    /// are word characters, so terms like `C++` or `.NET` still match.
    /// Matching folds case but not diacritics.
    pub fn new(term: &str, mode: MatchMode) -> Option<Self> {
        if term.trim().is_empty() {
            return None;
        }

        let escaped = regex::escape(term);
        let pattern = match mode {
            MatchMode::Substring => escaped,
            MatchMode::WordBounded => {
                let lead = term.chars().next().is_some_and(is_word_char);
                let trail = term.chars().next_back().is_some_and(is_word_char);
                format!(
                    "{}{}{}",
                    if lead { r"\b" } else { "" },
                    escaped,
                    if trail { r"\b" } else { "" },
                )
            }
        };

        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(regex) => Some(Self { regex }),
            Err(err) => {
                tracing::warn!(term, error = %err, "could not compile term matcher");
                None
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Split `text` on every occurrence, keeping order. Empty plain pieces are omitted.
    pub fn split<'t>(&self, text: &'t str) -> Vec<Piece<'t>> {
        let mut pieces = Vec::new();
        let mut last = 0;
        for m in self.regex.find_iter(text) {
            if m.start() > last {
                pieces.push(Piece::Plain(&text[last..m.start()]));
            }
            pieces.push(Piece::Match(m.as_str()));
            last = m.end();
        }
        if last < text.len() {
            pieces.push(Piece::Plain(&text[last..]));
        }
        pieces
    }
}
