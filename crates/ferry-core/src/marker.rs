//! Success-marker policy.
//!
//! After a prefix is exported, its lexicographically last key is tested
//! against the configured patterns; a match means a zero-byte marker is
//! written for that prefix (Spark/Hadoop `_SUCCESS` style).

use regex::RegexSet;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("invalid success marker pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Compiled "last key" matcher.
///
/// `Disabled` is its own variant so callers can skip computing last keys
/// entirely when no patterns are configured.
#[derive(Debug, Clone, Default)]
pub enum SuccessMatcher {
    #[default]
    Disabled,
    Patterns(RegexSet),
}

impl SuccessMatcher {
    /// Compile `patterns`. Each pattern must match the whole key.
    pub fn build<S: AsRef<str>>(patterns: &[S]) -> Result<Self, MarkerError> {
        if patterns.is_empty() {
            return Ok(SuccessMatcher::Disabled);
        }

        // Compile one by one first so the error names the offending pattern.
        let mut anchored = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let full = format!("^(?:{pattern})$");
            regex::Regex::new(&full).map_err(|source| MarkerError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            anchored.push(full);
        }

        let set = RegexSet::new(&anchored).map_err(|source| MarkerError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;
        Ok(SuccessMatcher::Patterns(set))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, SuccessMatcher::Patterns(_))
    }

    pub fn is_match(&self, key: &str) -> bool {
        match self {
            SuccessMatcher::Disabled => false,
            SuccessMatcher::Patterns(set) => set.is_match(key),
        }
    }

    /// The matcher as a plain predicate.
    pub fn into_predicate(self) -> impl Fn(&str) -> bool + Send + Sync + 'static {
        move |key: &str| self.is_match(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ONE: &[&str] = &[r".*\.success$"];
    const TWO: &[&str] = &[r".*\.success$", ".*/success"];
    const REJECTED: &[&str] = &["dfd", "a.suc", "a.successer"];

    #[rstest]
    #[case::one_regexp(ONE, &["a.success", "other.success"])]
    #[case::two_regexps(TWO, &["path/to/a.success", "other.success", "path/to/success"])]
    fn matches_any_pattern(#[case] patterns: &[&str], #[case] accepted: &[&str]) {
        let matcher = SuccessMatcher::build(patterns).unwrap();
        assert!(matcher.is_enabled());
        for key in accepted {
            assert!(matcher.is_match(key), "expected {key} to match");
        }
        for key in REJECTED {
            assert!(!matcher.is_match(key), "expected {key} not to match");
        }
    }

    #[test]
    fn pattern_order_does_not_matter() {
        let forward = SuccessMatcher::build(TWO).unwrap();
        let reversed: Vec<&str> = TWO.iter().rev().copied().collect();
        let backward = SuccessMatcher::build(&reversed).unwrap();
        for key in ["path/to/a.success", "path/to/success", "dfd", "a.successer"] {
            assert_eq!(forward.is_match(key), backward.is_match(key), "{key}");
        }
    }

    #[test]
    fn empty_pattern_list_disables_matching() {
        let matcher = SuccessMatcher::build::<&str>(&[]).unwrap();
        assert!(!matcher.is_enabled());
        let predicate = matcher.into_predicate();
        for key in ["a.success", "other.success", "path/to/success", "", "_SUCCESS"] {
            assert!(!predicate(key));
        }
    }

    #[test]
    fn patterns_match_the_whole_key() {
        let matcher = SuccessMatcher::build(&["success"]).unwrap();
        assert!(matcher.is_match("success"));
        assert!(!matcher.is_match("path/to/success"));
        assert!(!matcher.is_match("successful"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = SuccessMatcher::build(&[r".*\.ok$", "part-(["]).unwrap_err();
        let MarkerError::InvalidPattern { pattern, .. } = err;
        assert_eq!(pattern, "part-([");
    }
}
