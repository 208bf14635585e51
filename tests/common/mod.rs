//! Common test utilities for rust-sqlmigrate tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use rust_sqlmigrate::source::SnapshotDiffSource;
use rust_sqlmigrate::{generate_migration_with, GenerateOptions, GeneratedMigration};

pub const ACTOR: &str = "alice";

/// Fixed generation time so file names are predictable
pub fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 12, 12, 34, 56).unwrap()
}

/// Test context with an old and a new schema tree plus an output directory,
/// all inside one temporary directory.
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub old_dir: PathBuf,
    pub new_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        let old_dir = root.join("old").join("SalesDb");
        let new_dir = root.join("new").join("SalesDb");
        let output_dir = root.join("migrations");
        for dir in [&old_dir, &new_dir, &output_dir] {
            fs::create_dir_all(dir).expect("Failed to create directory");
        }

        Self {
            _temp_dir: temp_dir,
            old_dir,
            new_dir,
            output_dir,
        }
    }

    pub fn write_old(&self, relative: &str, content: &str) -> &Self {
        write_file(&self.old_dir, relative, content);
        self
    }

    pub fn write_new(&self, relative: &str, content: &str) -> &Self {
        write_file(&self.new_dir, relative, content);
        self
    }

    pub fn write_both(&self, relative: &str, content: &str) -> &Self {
        self.write_old(relative, content).write_new(relative, content)
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            repo_path: self.new_dir.clone(),
            schema_path: self.new_dir.clone(),
            database: None,
            output_dir: self.output_dir.clone(),
            actor: Some(ACTOR.to_string()),
            from_ref: None,
            to_ref: None,
            excludes: vec![],
            history_table: None,
        }
    }

    /// Generate a migration between the two trees with default options.
    pub fn generate(&self) -> Option<GeneratedMigration> {
        self.generate_with(self.options())
    }

    pub fn generate_with(&self, options: GenerateOptions) -> Option<GeneratedMigration> {
        let source = SnapshotDiffSource::new(&self.old_dir, &self.new_dir);
        generate_migration_with(&source, &options, ACTOR, generated_at())
            .expect("Migration generation failed")
    }

    /// Generate and return (forward, reverse) script text, panicking if nothing changed.
    pub fn generate_scripts(&self) -> (String, String) {
        let generated = self.generate().expect("Expected schema changes");
        (read(&generated.forward_path), read(&generated.reverse_path))
    }
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent directory");
    fs::write(path, content).expect("Failed to write file");
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}

/// The statement batches of a script, comment lines removed, header dropped.
pub fn statements(script: &str) -> Vec<String> {
    rust_sqlmigrate::parser::split_batches(script)
        .into_iter()
        .map(|b| {
            b.content
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Position of the first statement containing `needle`.
pub fn position_of(statements: &[String], needle: &str) -> usize {
    statements
        .iter()
        .position(|s| s.contains(needle))
        .unwrap_or_else(|| panic!("No statement contains '{needle}':\n{statements:#?}"))
}
