//! Compiles a [`FilterCriteria`] expression into a reusable text predicate.

use regex::{Regex, RegexBuilder};

use super::error::CoreError;
use super::filter::FilterCriteria;

#[derive(Debug, Clone)]
enum MatcherKind {
    Never,
    Literal {
        needle: String,
        case_sensitive: bool,
        exact: bool,
    },
    Pattern(Regex),
}

/// A compiled name/content predicate: substring, exact or regex, with case handling.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    kind: MatcherKind,
}

impl TextMatcher {
    /// Builds a matcher for the criteria's expression.
    ///
    /// An empty expression is contained in every text, so it matches everything unless
    /// `exact_match` is set. A malformed regex is returned as
    /// [`CoreError::InvalidPattern`]; the filter engine turns that into a matcher that
    /// never matches.
    pub fn new(criteria: &FilterCriteria) -> Result<Self, CoreError> {
        let kind = if criteria.is_regex {
            let pattern = if criteria.exact_match {
                format!(r"\A(?:{})\z", criteria.expression)
            } else {
                criteria.expression.clone()
            };
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(!criteria.is_case_sensitive)
                .build()?;
            MatcherKind::Pattern(regex)
        } else {
            let needle = if criteria.is_case_sensitive {
                criteria.expression.clone()
            } else {
                criteria.expression.to_lowercase()
            };
            MatcherKind::Literal {
                needle,
                case_sensitive: criteria.is_case_sensitive,
                exact: criteria.exact_match,
            }
        };
        Ok(Self { kind })
    }

    pub fn never() -> Self {
        Self {
            kind: MatcherKind::Never,
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.kind {
            MatcherKind::Never => false,
            MatcherKind::Pattern(regex) => regex.is_match(text),
            MatcherKind::Literal {
                needle,
                case_sensitive,
                exact,
            } => {
                if *case_sensitive {
                    Self::compare(text, needle, *exact)
                } else {
                    Self::compare(&text.to_lowercase(), needle, *exact)
                }
            }
        }
    }

    fn compare(haystack: &str, needle: &str, exact: bool) -> bool {
        if exact {
            haystack == needle
        } else {
            haystack.contains(needle)
        }
    }
}
