//! Changed schema files between two directory snapshots

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use super::{is_sql_path, DiffSource};
use crate::error::MigrationError;
use crate::model::DiffEntry;
use crate::util::read_sql_file;

/// Two on-disk copies of a schema tree. Files are matched by their path
/// relative to each root.
#[derive(Debug, Clone)]
pub struct SnapshotDiffSource {
    old_root: PathBuf,
    new_root: PathBuf,
}

impl SnapshotDiffSource {
    pub fn new(old_root: impl Into<PathBuf>, new_root: impl Into<PathBuf>) -> Self {
        Self {
            old_root: old_root.into(),
            new_root: new_root.into(),
        }
    }
}

impl DiffSource for SnapshotDiffSource {
    fn diff_entries(&self) -> anyhow::Result<Vec<DiffEntry>> {
        let old_files = collect_sql_files(&self.old_root)?;
        let mut new_files = collect_sql_files(&self.new_root)?;

        let mut entries = Vec::new();
        for (relative, old_path) in &old_files {
            let old_content = read_sql_file(old_path)?;
            match new_files.remove(relative) {
                Some(new_path) => {
                    let new_content = read_sql_file(&new_path)?;
                    if old_content != new_content {
                        entries.push(DiffEntry::modified(relative, &old_content, &new_content));
                    }
                }
                None => entries.push(DiffEntry::deleted(relative, &old_content)),
            }
        }
        for (relative, new_path) in &new_files {
            entries.push(DiffEntry::added(relative, &read_sql_file(new_path)?));
        }

        info!(
            "snapshot: {} changed schema file(s) between {} and {}",
            entries.len(),
            self.old_root.display(),
            self.new_root.display()
        );
        Ok(entries)
    }
}

/// `.sql` files under `root`, keyed by `/`-separated relative path.
fn collect_sql_files(root: &Path) -> Result<BTreeMap<String, PathBuf>, MigrationError> {
    if !root.is_dir() {
        return Err(MigrationError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if is_sql_path(&relative) {
            files.insert(relative, path.to_path_buf());
        }
    }
    Ok(files)
}
