//! Exclusion of individual changes by identifier

use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::error::MigrationError;
use crate::model::SchemaChange;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Identifiers (`schema.table[.column|index|constraint]`, `schema.object`)
/// or glob patterns over them, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    entries: Vec<(String, Option<Pattern>)>,
}

impl ExclusionFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, MigrationError> {
        let mut entries = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            // Brackets quote identifiers here; they are never glob character classes
            let literal = raw.replace(['[', ']'], "");
            let pattern = if literal.contains(['*', '?']) {
                Some(
                    Pattern::new(&literal).map_err(|source| MigrationError::InvalidExclusion {
                        pattern: raw.to_string(),
                        source,
                    })?,
                )
            } else {
                None
            };
            entries.push((literal, pattern));
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_excluded(&self, change: &SchemaChange) -> bool {
        let identifier = change.identifier();
        self.entries.iter().any(|(literal, pattern)| match pattern {
            Some(pattern) => pattern.matches_with(&identifier, MATCH_OPTIONS),
            None => literal.eq_ignore_ascii_case(&identifier),
        })
    }

    /// Remove excluded changes, keeping the order of the rest.
    /// Returns the kept changes and how many were dropped.
    pub fn apply(&self, changes: Vec<SchemaChange>) -> (Vec<SchemaChange>, usize) {
        if self.is_empty() {
            return (changes, 0);
        }
        let before = changes.len();
        let kept: Vec<SchemaChange> = changes
            .into_iter()
            .filter(|change| {
                let excluded = self.is_excluded(change);
                if excluded {
                    debug!("Excluding {}", change);
                }
                !excluded
            })
            .collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }
}
