//! Where diff entries come from
//!
//! The detector only sees [`DiffEntry`] values; this module produces them
//! from a git repository or from two snapshot directories.

mod git;
mod snapshot;

pub use git::{configured_user_name, GitDiffSource};
pub use snapshot::SnapshotDiffSource;

use std::path::Path;

use crate::model::DiffEntry;

/// A provider of changed schema files.
pub trait DiffSource {
    fn diff_entries(&self) -> anyhow::Result<Vec<DiffEntry>>;
}

/// Actor recorded in migration names: `git config user.name`, then
/// `$USER`/`$USERNAME`, then `unknown`.
pub fn default_actor(repo_path: &Path) -> String {
    configured_user_name(repo_path)
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_sql_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}
