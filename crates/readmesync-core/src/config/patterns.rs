//! Gitignore-style exclusion matching using the ignore crate

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::{Result, SyncError};

/// Pattern matcher for source exclusions
///
/// Paths are matched relative to the source root being walked.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    gitignore: Option<Gitignore>,
}

impl PatternMatcher {
    /// Create a matcher that excludes nothing
    #[must_use]
    pub const fn new() -> Self {
        Self { gitignore: None }
    }

    /// Build a matcher from exclusion patterns
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Pattern`] if a pattern is not valid glob syntax.
    pub fn with_exclusions(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::new());
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|source| SyncError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?;
        }

        let gitignore = builder.build().map_err(|source| SyncError::Pattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self {
            gitignore: Some(gitignore),
        })
    }

    /// Whether a single walked entry is excluded (parents are not consulted)
    #[must_use]
    pub fn is_excluded(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.gitignore
            .as_ref()
            .is_some_and(|gi| gi.matched(rel_path, is_dir).is_ignore())
    }

    /// Whether a path or any of its parent directories is excluded
    #[must_use]
    pub fn is_excluded_with_parents(&self, rel_path: &Path) -> bool {
        self.gitignore.as_ref().is_some_and(|gi| {
            gi.matched_path_or_any_parents(rel_path, false)
                .is_ignore()
        })
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}
