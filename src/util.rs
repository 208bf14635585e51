//! Shared utility helpers.

use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;

use crate::error::MigrationError;

/// Case-insensitive substring search without allocating an uppercase copy.
#[inline]
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

/// Case-insensitive starts_with check without allocating.
#[inline]
pub fn starts_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

/// Case-insensitive find. Returns the byte offset of the first occurrence of `needle`.
#[inline]
pub fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle_bytes = needle.as_bytes();
    let haystack_bytes = haystack.as_bytes();
    if needle_bytes.is_empty() || needle_bytes.len() > haystack_bytes.len() {
        return None;
    }
    haystack_bytes
        .windows(needle_bytes.len())
        .position(|window| window.eq_ignore_ascii_case(needle_bytes))
}

/// Decode raw file bytes as text: UTF-8 first, Windows-1252 as fallback.
///
/// A leading BOM is stripped and CRLF line endings become LF, so two
/// checkouts of the same file on different platforms compare equal.
pub fn decode_sql_text(bytes: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, had_errors) = WINDOWS_1252.decode(bytes);
            if had_errors {
                return None;
            }
            decoded.into_owned()
        }
    };
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);
    Some(text.replace("\r\n", "\n"))
}

/// Read a SQL file from disk using [`decode_sql_text`].
pub fn read_sql_file(path: &Path) -> Result<String, MigrationError> {
    let bytes = std::fs::read(path).map_err(|e| MigrationError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode_sql_text(&bytes).ok_or_else(|| MigrationError::InvalidEncoding {
        path: path.to_path_buf(),
    })
}

/// Write a set of files so that either all of them land or none does.
///
/// Every file is first written to a `.tmp` sibling; the staged files are
/// renamed into place only once all writes succeeded. On failure the staged
/// files, and any target already renamed, are removed.
pub fn write_files_atomically(files: &[(&Path, &str)]) -> Result<(), MigrationError> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(files.len());
    for (path, content) in files {
        let temp = staging_path(path);
        if let Err(source) = std::fs::write(&temp, content) {
            let _ = std::fs::remove_file(&temp);
            remove_all(staged.iter().map(|(temp, _)| temp.as_path()));
            return Err(MigrationError::FileWriteError {
                path: path.to_path_buf(),
                source,
            });
        }
        staged.push((temp, path));
    }

    for (i, (temp, path)) in staged.iter().enumerate() {
        if let Err(source) = std::fs::rename(temp, path) {
            remove_all(staged[..i].iter().map(|(_, path)| *path));
            remove_all(staged[i..].iter().map(|(temp, _)| temp.as_path()));
            return Err(MigrationError::FileWriteError {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn remove_all<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}
