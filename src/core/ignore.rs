//! Ignore rules for recorded file paths.
//!
//! Patterns are compiled once, when the rules are built, and then matched
//! against every save without recompilation.

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};

/// A precompiled set of glob patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid pattern.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let pattern = p.as_ref();
                Pattern::new(pattern).map_err(|e| {
                    Error::Config(format!("invalid ignore pattern {pattern:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether a workspace-relative, forward-slash path is ignored.
    #[must_use]
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative_path, options))
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether there are no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
