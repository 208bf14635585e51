//! `manifest.json`: the execution order of a split script

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MigrationError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub total_segments: usize,
    pub execution_order: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub object_type: String,
    /// `schema.name`
    pub object_name: String,
    pub segment_file: String,
}

impl Manifest {
    pub fn new(execution_order: Vec<ManifestEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            total_segments: execution_order.len(),
            execution_order,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read `manifest.json` from a split directory.
    pub fn read(dir: &Path) -> Result<Self, MigrationError> {
        let path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path).map_err(|source| MigrationError::FileReadError {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| MigrationError::ManifestError { path, source })
    }
}
