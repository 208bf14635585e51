//! Changed schema files from a git repository

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{is_sql_path, DiffSource};
use crate::error::MigrationError;
use crate::model::{ChangeType, DiffEntry};
use crate::util::decode_sql_text;

/// Compares `from_ref` (default `HEAD`) with `to_ref`, or with the working
/// tree when no `to_ref` is given. Only paths under the schema subtree are
/// considered.
#[derive(Debug, Clone)]
pub struct GitDiffSource {
    repo_root: PathBuf,
    /// Schema subtree relative to the repository root, `/`-separated
    pathspec: String,
    from_ref: String,
    to_ref: Option<String>,
}

impl GitDiffSource {
    /// Open the repository containing `repo_path` and scope it to `schema_path`
    /// (absolute, or relative to `repo_path`).
    pub fn open(
        repo_path: &Path,
        schema_path: &Path,
        from_ref: Option<&str>,
        to_ref: Option<&str>,
    ) -> Result<Self, MigrationError> {
        let toplevel = run_git(repo_path, &["rev-parse", "--show-toplevel"]).map_err(|e| match e {
            MigrationError::GitCommandFailed { .. } => MigrationError::NotARepository {
                path: repo_path.to_path_buf(),
            },
            other => other,
        })?;
        let repo_root = PathBuf::from(String::from_utf8_lossy(&toplevel).trim());

        let schema_dir = if schema_path.is_absolute() {
            schema_path.to_path_buf()
        } else {
            repo_path.join(schema_path)
        };
        let pathspec = relative_pathspec(&repo_root, &schema_dir)?;
        debug!("Repository {}, schema pathspec '{}'", repo_root.display(), pathspec);

        Ok(Self {
            repo_root,
            pathspec,
            from_ref: from_ref.unwrap_or("HEAD").to_string(),
            to_ref: to_ref.map(str::to_string),
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn git(&self, args: &[&str]) -> Result<Vec<u8>, MigrationError> {
        run_git(&self.repo_root, args)
    }

    /// `git show <ref>:<path>`, decoded.
    fn show(&self, reference: &str, path: &str) -> Result<String, MigrationError> {
        let object = format!("{reference}:{path}");
        let bytes = self.git(&["show", object.as_str()])?;
        decode_sql_text(&bytes).ok_or_else(|| MigrationError::InvalidEncoding {
            path: PathBuf::from(path),
        })
    }

    /// New-side content: the `to_ref` blob, or the working-tree file.
    fn new_content(&self, path: &str) -> Result<String, MigrationError> {
        match &self.to_ref {
            Some(to_ref) => self.show(to_ref, path),
            None => crate::util::read_sql_file(&self.repo_root.join(path)),
        }
    }

    fn name_status(&self) -> Result<Vec<(ChangeType, String)>, MigrationError> {
        let mut args = vec!["diff", "--name-status", "--no-renames", "-z", self.from_ref.as_str()];
        if let Some(to_ref) = &self.to_ref {
            args.push(to_ref.as_str());
        }
        args.extend(["--", self.pathspec.as_str()]);
        let output = self.git(&args)?;
        Ok(parse_name_status(&String::from_utf8_lossy(&output)))
    }

    fn untracked(&self) -> Result<Vec<String>, MigrationError> {
        let output = self.git(&[
            "ls-files",
            "--others",
            "--exclude-standard",
            "-z",
            "--",
            self.pathspec.as_str(),
        ])?;
        Ok(String::from_utf8_lossy(&output)
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl DiffSource for GitDiffSource {
    fn diff_entries(&self) -> anyhow::Result<Vec<DiffEntry>> {
        let mut changed = self.name_status()?;
        if self.to_ref.is_none() {
            changed.extend(
                self.untracked()?
                    .into_iter()
                    .map(|path| (ChangeType::Added, path)),
            );
        }

        let mut entries = Vec::new();
        for (change_type, path) in changed {
            if !is_sql_path(&path) {
                debug!("Skipping non-SQL path {}", path);
                continue;
            }
            let entry = match change_type {
                ChangeType::Added => DiffEntry::added(&path, &self.new_content(&path)?),
                ChangeType::Deleted => {
                    DiffEntry::deleted(&path, &self.show(&self.from_ref, &path)?)
                }
                ChangeType::Modified => DiffEntry::modified(
                    &path,
                    &self.show(&self.from_ref, &path)?,
                    &self.new_content(&path)?,
                ),
            };
            entries.push(entry);
        }

        info!(
            "git: {} changed schema file(s) between {} and {}",
            entries.len(),
            self.from_ref,
            self.to_ref.as_deref().unwrap_or("the working tree")
        );
        Ok(entries)
    }
}

/// `git config user.name` for the repository at `repo_path`, if set.
pub fn configured_user_name(repo_path: &Path) -> Option<String> {
    let output = run_git(repo_path, &["config", "user.name"]).ok()?;
    let name = String::from_utf8_lossy(&output).trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn run_git(dir: &Path, args: &[&str]) -> Result<Vec<u8>, MigrationError> {
    let command = args.join(" ");
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|source| MigrationError::GitSpawnError {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(MigrationError::GitCommandFailed {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Parse `git diff --name-status -z` output. Type changes count as modifications;
/// unknown statuses are skipped.
fn parse_name_status(output: &str) -> Vec<(ChangeType, String)> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut changes = Vec::new();
    while let (Some(status), Some(path)) = (fields.next(), fields.next()) {
        let change_type = match status.chars().next() {
            Some('A') => ChangeType::Added,
            Some('D') => ChangeType::Deleted,
            Some('M') | Some('T') => ChangeType::Modified,
            _ => {
                debug!("Ignoring git status '{}' for {}", status, path);
                continue;
            }
        };
        changes.push((change_type, path.to_string()));
    }
    changes
}

/// The schema directory as a pathspec relative to the repository root.
fn relative_pathspec(repo_root: &Path, schema_dir: &Path) -> Result<String, MigrationError> {
    let canonical = |p: &Path| {
        p.canonicalize()
            .map_err(|_| MigrationError::DirectoryNotFound { path: p.to_path_buf() })
    };
    let root = canonical(repo_root)?;
    let schema = canonical(schema_dir)?;
    let relative = schema
        .strip_prefix(&root)
        .map_err(|_| MigrationError::NotARepository {
            path: schema_dir.to_path_buf(),
        })?;

    let spec = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(if spec.is_empty() { ".".to_string() } else { spec })
}
