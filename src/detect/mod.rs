//! Change detection: version-control diff entries to typed schema changes
//!
//! Each [`DiffEntry`] is routed by its path. Table files go through the
//! column-level diff; every other kind of file is one object-level change.
//! The flat list is then passed through rename detection.

mod rename;
mod table_diff;

pub use rename::{detect_renames, is_structural_rename};
pub use table_diff::diff_table;

use tracing::{debug, info};

use crate::model::{ChangeType, DiffEntry, ObjectType, SchemaChange};
use crate::parser::{
    definition_text, normalize_whitespace, parse_constraint_definition, parse_extended_property,
    parse_index_header, parse_module_header, DefinitionExtractor, ScanningExtractor,
};
use crate::project::{classify_path, ObjectLocation};

/// Detect schema changes using the default scanning extractor.
pub fn detect_changes(entries: &[DiffEntry]) -> Vec<SchemaChange> {
    detect_changes_with(entries, &ScanningExtractor)
}

/// Detect schema changes, extracting table bodies with `extractor`.
pub fn detect_changes_with(
    entries: &[DiffEntry],
    extractor: &dyn DefinitionExtractor,
) -> Vec<SchemaChange> {
    let mut changes = Vec::new();

    for entry in entries {
        let Some(location) = classify_path(&entry.path) else {
            debug!("Ignoring {} (not a schema object file)", entry.path);
            continue;
        };
        let detected = detect_entry(entry, &location, extractor);
        debug!("{} -> {} change(s)", entry.path, detected.len());
        changes.extend(detected);
    }

    let raw_count = changes.len();
    let changes = detect_renames(changes);
    info!(
        "Detected {} schema change(s) from {} file(s) ({} merged as renames)",
        changes.len(),
        entries.len(),
        raw_count - changes.len()
    );
    changes
}

fn detect_entry(
    entry: &DiffEntry,
    location: &ObjectLocation,
    extractor: &dyn DefinitionExtractor,
) -> Vec<SchemaChange> {
    let old_definition = definition_text(&entry.old_content);
    let new_definition = definition_text(&entry.new_content);

    if entry.change_type == ChangeType::Modified
        && normalize_whitespace(&old_definition) == normalize_whitespace(&new_definition)
    {
        debug!("{} changed only in whitespace", entry.path);
        return Vec::new();
    }

    // The side that exists; for modifications the new one names the object.
    let describing = match entry.change_type {
        ChangeType::Deleted => &old_definition,
        _ => &new_definition,
    };
    let identity = identify(location, describing, extractor);

    if location.object_type == ObjectType::Table && entry.change_type == ChangeType::Modified {
        return diff_table(
            &identity.schema,
            &identity.name,
            &old_definition,
            &new_definition,
            extractor,
        );
    }

    let change = match entry.change_type {
        ChangeType::Added => SchemaChange::added(
            location.object_type,
            &identity.schema,
            &identity.name,
            &new_definition,
        ),
        ChangeType::Deleted => SchemaChange::deleted(
            location.object_type,
            &identity.schema,
            &identity.name,
            &old_definition,
        ),
        ChangeType::Modified => SchemaChange::modified(
            location.object_type,
            &identity.schema,
            &identity.name,
            &old_definition,
            &new_definition,
        ),
    };

    let change = match identity.table {
        Some(table) => change.on_table(&table),
        None => change,
    };
    vec![change]
}

/// Name, schema and owning table of the object a file defines.
struct ObjectIdentity {
    schema: String,
    name: String,
    table: Option<String>,
}

/// Take identity from the definition when it parses, otherwise from the path.
fn identify(
    location: &ObjectLocation,
    definition: &str,
    extractor: &dyn DefinitionExtractor,
) -> ObjectIdentity {
    let from_path = ObjectIdentity {
        schema: location.schema.clone(),
        name: location.name_from_stem().to_string(),
        table: location.owner_from_stem().map(str::to_string),
    };

    match location.object_type {
        ObjectType::Table => match extractor.extract_table(definition) {
            Some(table) => ObjectIdentity {
                table: Some(table.name.clone()),
                schema: table.schema,
                name: table.name,
            },
            None => ObjectIdentity {
                table: Some(location.file_stem.clone()),
                name: location.file_stem.clone(),
                ..from_path
            },
        },
        ObjectType::Index => match parse_index_header(definition) {
            Some(header) => ObjectIdentity {
                schema: header.schema,
                name: header.name,
                table: Some(header.table),
            },
            None => from_path,
        },
        ObjectType::Constraint => match parse_constraint_definition(definition) {
            Some(header) => ObjectIdentity {
                schema: header.schema.unwrap_or(from_path.schema),
                name: header.name,
                table: header.table.or(from_path.table),
            },
            None => from_path,
        },
        ObjectType::Trigger
        | ObjectType::View
        | ObjectType::StoredProcedure
        | ObjectType::Function => match parse_module_header(definition) {
            Some(header) => ObjectIdentity {
                schema: header.schema,
                name: header.name,
                table: header.parent.map(|(_, table)| table).or(from_path.table),
            },
            None => ObjectIdentity {
                name: location.file_stem.clone(),
                table: None,
                ..from_path
            },
        },
        ObjectType::ExtendedProperty => match parse_extended_property(definition) {
            Some(call) => {
                let name = match call.levels.get(2) {
                    Some(level) => format!("{}.{}", level.level_name, call.property_name),
                    None => call.property_name.clone(),
                };
                ObjectIdentity {
                    schema: call.schema().to_string(),
                    table: call.level1_name().map(str::to_string),
                    name,
                }
            }
            None => from_path,
        },
        ObjectType::Column => from_path,
    }
}
