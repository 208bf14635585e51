//! Forward and rollback script assembly

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::summary::ChangeSummary;
use crate::ddl::{generate_all, generate_reverse_all};
use crate::model::{ChangeType, ObjectType, SchemaChange};
use crate::parser::join_batches;
use crate::resolve::resolve_order;

/// Default table the migration runner records applied scripts in.
pub const DEFAULT_HISTORY_TABLE: &str = "[dbo].[__MigrationHistory]";

/// Facts printed in script headers.
#[derive(Debug, Clone)]
pub struct ScriptMetadata {
    pub migration_name: String,
    pub database: String,
    pub actor: String,
    pub generated_at: DateTime<Utc>,
    pub history_table: String,
}

const RULE: &str = "-- =============================================";

/// Build the forward script: header, then every change's DDL in dependency
/// order inside one transaction.
pub fn build_script(changes: &[SchemaChange], metadata: &ScriptMetadata) -> String {
    let ordered = resolve_order(changes.to_vec());
    let summary = ChangeSummary::from_changes(&ordered);
    let batches = generate_all(&ordered);

    let mut header = String::new();
    header_lines(&mut header, "Migration", metadata, &summary);
    let _ = writeln!(header, "{RULE}");

    wrap_in_transaction(&header, &batches)
}

/// Build the rollback script for `changes` (the forward change list).
///
/// The header lists what the rollback undoes by object category and ends with
/// the history-table cleanup the operator has to run by hand, since rollback
/// scripts are never recorded as applied.
pub fn build_reverse_script(changes: &[SchemaChange], metadata: &ScriptMetadata) -> String {
    let summary = ChangeSummary::from_changes(changes);
    let batches = generate_reverse_all(changes);

    let mut header = String::new();
    header_lines(&mut header, "Rollback of migration", metadata, &summary);
    let _ = writeln!(header, "--");
    let _ = writeln!(header, "-- Reverts, by category:");
    for (object_type, entries) in group_by_category(changes) {
        let _ = writeln!(header, "--   {} ({}):", category_label(object_type), entries.len());
        for entry in entries {
            let _ = writeln!(header, "--     {entry}");
        }
    }
    let _ = writeln!(header, "--");
    let _ = writeln!(
        header,
        "-- NOTE: rollback scripts are not recorded in the migration history."
    );
    let _ = writeln!(
        header,
        "-- After running this script, remove the forward migration's entry by hand:"
    );
    let _ = writeln!(
        header,
        "--   DELETE FROM {} WHERE [MigrationId] = '{}';",
        metadata.history_table,
        metadata.migration_name.replace('\'', "''")
    );
    let _ = writeln!(header, "{RULE}");

    wrap_in_transaction(&header, &batches)
}

fn header_lines(out: &mut String, title: &str, metadata: &ScriptMetadata, summary: &ChangeSummary) {
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "-- {title}: {}", metadata.migration_name);
    let _ = writeln!(out, "-- Database: {}", metadata.database);
    let _ = writeln!(
        out,
        "-- Generated: {}",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "-- Author: {}", metadata.actor);
    let _ = writeln!(
        out,
        "-- Changes: {} ({} tables, {} indexes, {} other)",
        summary.total(),
        summary.tables,
        summary.indexes,
        summary.other
    );
    let _ = writeln!(
        out,
        "--   Added: {}, Modified: {}, Deleted: {}",
        summary.added, summary.modified, summary.deleted
    );
}

fn wrap_in_transaction(header: &str, batches: &[String]) -> String {
    let mut script = String::new();
    script.push_str(header);
    script.push('\n');
    script.push_str(&join_batches(&["SET XACT_ABORT ON;", "BEGIN TRANSACTION;"]));
    script.push_str(&join_batches(batches));
    script.push_str(&join_batches(&["COMMIT TRANSACTION;"]));
    script
}

/// What each change's rollback does, grouped by object kind.
fn group_by_category(changes: &[SchemaChange]) -> BTreeMap<ObjectType, Vec<String>> {
    let mut groups: BTreeMap<ObjectType, Vec<String>> = BTreeMap::new();
    for change in changes {
        let action = match change.change_type {
            ChangeType::Added => "remove added",
            ChangeType::Deleted => "restore deleted",
            ChangeType::Modified if change.is_rename() => "undo rename of",
            ChangeType::Modified => "revert changes to",
        };
        groups
            .entry(change.object_type)
            .or_default()
            .push(format!("{action} {}", change.identifier()));
    }
    groups
}

fn category_label(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::Table => "Tables",
        ObjectType::Column => "Columns",
        ObjectType::Index => "Indexes",
        ObjectType::Constraint => "Constraints",
        ObjectType::Trigger => "Triggers",
        ObjectType::View => "Views",
        ObjectType::StoredProcedure => "Stored procedures",
        ObjectType::Function => "Functions",
        ObjectType::ExtendedProperty => "Extended properties",
    }
}
