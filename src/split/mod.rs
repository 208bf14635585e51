//! Splitting a migration script into per-object segments, and back
//!
//! A script is cut at its `GO` lines and every batch is attributed to the
//! object it works on (see [`attribution`]). Consecutive batches on the same
//! object form one segment; a segment file is written per run together with
//! a `manifest.json` recording the execution order. Because segments are
//! runs, concatenating them in manifest order replays every statement in its
//! original relative order.

pub mod attribution;
pub mod manifest;

pub use attribution::{classify_batch, BatchKind, ObjectKey, ScriptContext};
pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILE};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::MigrationError;
use crate::parser::{join_batches, split_batches, ScriptBatch};

/// A run of batches on one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: ObjectKey,
    pub batches: Vec<ScriptBatch>,
}

impl Segment {
    /// `<###>_<objectType>_<schema>_<name>.sql`, 1-based.
    pub fn file_name(&self, position: usize) -> String {
        format!(
            "{:03}_{}_{}_{}.sql",
            position,
            sanitize_file_part(&self.key.object_type),
            sanitize_file_part(&self.key.schema),
            sanitize_file_part(&self.key.name)
        )
    }

    /// Segment file content: each batch followed by its own `GO` (with the
    /// batch's repeat count, if any).
    pub fn content(&self) -> String {
        join_batches(&self.batches)
    }
}

/// Cut a script into segments, in execution order.
pub fn split_script(script: &str) -> Vec<Segment> {
    let batches: Vec<ScriptBatch> = split_batches(script)
        .into_iter()
        .map(ScriptBatch::from)
        .collect();
    let texts: Vec<&str> = batches.iter().map(|b| b.text.as_str()).collect();
    let context = ScriptContext::scan(&texts);

    let mut segments: Vec<Segment> = Vec::new();
    let mut annotations: Vec<ScriptBatch> = Vec::new();

    for batch in batches {
        let key = match classify_batch(&batch.text, &context) {
            BatchKind::Annotation => {
                annotations.push(batch);
                continue;
            }
            BatchKind::Object(key) => key,
            BatchKind::Control(kind) => ObjectKey::control(kind),
            BatchKind::Unattributed => {
                debug!("No object recognized in batch: {}", first_line(&batch.text));
                ObjectKey::unattributed()
            }
        };

        let mut run = std::mem::take(&mut annotations);
        run.push(batch);
        match segments.last_mut() {
            Some(last) if last.key.same_as(&key) => last.batches.extend(run),
            _ => segments.push(Segment { key, batches: run }),
        }
    }

    // Trailing comments or PRINTs stay with whatever ran last
    if !annotations.is_empty() {
        match segments.last_mut() {
            Some(last) => last.batches.extend(annotations),
            None => segments.push(Segment {
                key: ObjectKey::unattributed(),
                batches: annotations,
            }),
        }
    }

    segments
}

/// Manifest describing `segments` in order.
pub fn build_manifest(segments: &[Segment]) -> Manifest {
    Manifest::new(
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| ManifestEntry {
                object_type: segment.key.object_type.clone(),
                object_name: segment.key.object_name(),
                segment_file: segment.file_name(i + 1),
            })
            .collect(),
    )
}

/// Split the script at `script_path` into `output_dir`.
///
/// The directory must exist. Segment files and the manifest overwrite any
/// files of the same name, and are written all together or not at all.
pub fn split_to_directory(
    script_path: &Path,
    output_dir: &Path,
) -> Result<Manifest, MigrationError> {
    if !output_dir.is_dir() {
        return Err(MigrationError::DirectoryNotFound {
            path: output_dir.to_path_buf(),
        });
    }

    let script = crate::util::read_sql_file(script_path)?;
    let segments = split_script(&script);
    let manifest = build_manifest(&segments);
    let manifest_json = manifest
        .to_json()
        .map_err(|source| MigrationError::ManifestError {
            path: output_dir.join(MANIFEST_FILE),
            source,
        })?;

    let files: Vec<(String, String)> = segments
        .iter()
        .zip(&manifest.execution_order)
        .map(|(segment, entry)| (entry.segment_file.clone(), segment.content()))
        .collect();

    let mut writes: Vec<(PathBuf, &str)> = files
        .iter()
        .map(|(name, content)| (output_dir.join(name), content.as_str()))
        .collect();
    writes.push((output_dir.join(MANIFEST_FILE), manifest_json.as_str()));
    let writes: Vec<(&Path, &str)> = writes.iter().map(|(p, c)| (p.as_path(), *c)).collect();
    crate::util::write_files_atomically(&writes)?;
    debug!("Wrote {} segment(s) and {}", files.len(), MANIFEST_FILE);

    info!(
        "Split {} into {} segment(s) in {}",
        script_path.display(),
        manifest.total_segments,
        output_dir.display()
    );
    Ok(manifest)
}

/// Concatenate the segments listed in `dir`'s manifest, in order.
pub fn reconstruct_from_directory(dir: &Path) -> Result<String, MigrationError> {
    if !dir.is_dir() {
        return Err(MigrationError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let manifest = Manifest::read(dir)?;
    let mut batches: Vec<ScriptBatch> = Vec::new();
    for entry in &manifest.execution_order {
        let path = dir.join(&entry.segment_file);
        if !path.is_file() {
            return Err(MigrationError::SegmentMissing { path });
        }
        let content = crate::util::read_sql_file(&path)?;
        batches.extend(split_batches(&content).into_iter().map(ScriptBatch::from));
    }

    debug!(
        "Reassembled {} batch(es) from {} segment(s)",
        batches.len(),
        manifest.total_segments
    );
    Ok(join_batches(&batches))
}

fn sanitize_file_part(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn first_line(batch: &str) -> &str {
    batch.lines().next().unwrap_or_default()
}
