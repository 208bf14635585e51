//! rust-sqlmigrate: migration scripts from a git-versioned SQL Server schema tree
//!
//! This library compares two versions of a file-per-object schema tree,
//! works out the schema changes between them and renders a dependency-ordered
//! forward migration plus its rollback. Generated scripts can be split into
//! per-object segments for review and reassembled afterwards.

pub mod ddl;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod project;
pub mod resolve;
pub mod script;
pub mod source;
pub mod split;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

pub use error::MigrationError;

use script::{ChangeSummary, ExclusionFilter, MigrationInfo, DEFAULT_HISTORY_TABLE};
use source::{default_actor, DiffSource, GitDiffSource};

/// Options for generating a migration
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Path inside the git repository
    pub repo_path: PathBuf,
    /// Schema tree root (absolute, or relative to `repo_path`)
    pub schema_path: PathBuf,
    /// Database named in script headers (defaults to the schema directory name)
    pub database: Option<String>,
    /// Existing directory the forward script is written to
    pub output_dir: PathBuf,
    /// Author recorded in the file name (defaults to the git user)
    pub actor: Option<String>,
    /// Base revision (defaults to `HEAD`)
    pub from_ref: Option<String>,
    /// Target revision (defaults to the working tree)
    pub to_ref: Option<String>,
    /// Change identifiers or glob patterns to leave out
    pub excludes: Vec<String>,
    /// Migration history table named in the rollback note
    pub history_table: Option<String>,
}

/// Where a generated migration was written
#[derive(Debug, Clone)]
pub struct GeneratedMigration {
    pub forward_path: PathBuf,
    pub reverse_path: PathBuf,
    pub summary: ChangeSummary,
    pub excluded: usize,
}

/// Options for splitting a migration script
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Script to split
    pub script_path: PathBuf,
    /// Existing directory that receives the segments and `manifest.json`
    pub output_dir: PathBuf,
}

/// Generate a migration from the git working tree or between two refs.
///
/// Returns `None` when no schema change survives detection and exclusions;
/// nothing is written in that case.
pub fn generate_migration(options: GenerateOptions) -> Result<Option<GeneratedMigration>> {
    let source = GitDiffSource::open(
        &options.repo_path,
        &options.schema_path,
        options.from_ref.as_deref(),
        options.to_ref.as_deref(),
    )?;
    let actor = options
        .actor
        .clone()
        .unwrap_or_else(|| default_actor(source.repo_root()));

    generate_migration_with(&source, &options, &actor, Utc::now())
}

/// Generate a migration from any diff source. Git refs in `options` are ignored.
pub fn generate_migration_with(
    source: &dyn DiffSource,
    options: &GenerateOptions,
    actor: &str,
    generated_at: DateTime<Utc>,
) -> Result<Option<GeneratedMigration>> {
    if !options.output_dir.is_dir() {
        return Err(MigrationError::DirectoryNotFound {
            path: options.output_dir.clone(),
        }
        .into());
    }
    let exclusions = ExclusionFilter::new(options.excludes.as_slice())?;

    // Step 1: Collect changed files
    let entries = source.diff_entries()?;

    // Step 2: Detect schema changes (renames merged)
    let changes = detect::detect_changes(&entries);

    // Step 3: Order, filter and render both scripts in memory
    let info = MigrationInfo {
        database: options
            .database
            .clone()
            .unwrap_or_else(|| database_name(&options.schema_path)),
        actor: actor.to_string(),
        generated_at,
        history_table: options
            .history_table
            .clone()
            .unwrap_or_else(|| DEFAULT_HISTORY_TABLE.to_string()),
    };
    let Some(scripts) = script::build_migration(changes, &info, &exclusions) else {
        info!("No schema changes to migrate");
        return Ok(None);
    };

    // Step 4: Write the pair
    let reverse_dir = reverse_directory(&options.output_dir)?;
    std::fs::create_dir_all(&reverse_dir).map_err(|source| MigrationError::FileWriteError {
        path: reverse_dir.clone(),
        source,
    })?;
    let forward_path = options.output_dir.join(&scripts.file_name);
    let reverse_path = reverse_dir.join(&scripts.file_name);
    util::write_files_atomically(&[
        (forward_path.as_path(), scripts.forward.as_str()),
        (reverse_path.as_path(), scripts.reverse.as_str()),
    ])?;

    info!(
        "Wrote migration {} ({} change(s))",
        forward_path.display(),
        scripts.summary.total()
    );

    Ok(Some(GeneratedMigration {
        forward_path,
        reverse_path,
        summary: scripts.summary,
        excluded: scripts.excluded,
    }))
}

/// Split a migration script into per-object segment files.
pub fn split_script(options: SplitOptions) -> Result<split::Manifest> {
    Ok(split::split_to_directory(
        &options.script_path,
        &options.output_dir,
    )?)
}

/// Reassemble a split directory into one script.
pub fn reconstruct_script(split_dir: &Path) -> Result<String> {
    Ok(split::reconstruct_from_directory(split_dir)?)
}

fn database_name(schema_path: &Path) -> String {
    schema_path
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(schema_path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("Database")
        .to_string()
}

/// Sibling folder `<output dir name>_reverse`.
fn reverse_directory(output_dir: &Path) -> Result<PathBuf, MigrationError> {
    let output_dir = output_dir
        .canonicalize()
        .map_err(|_| MigrationError::DirectoryNotFound {
            path: output_dir.to_path_buf(),
        })?;
    let name = output_dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("migrations");
    let parent = output_dir.parent().unwrap_or(&output_dir);
    Ok(parent.join(format!("{name}_reverse")))
}
