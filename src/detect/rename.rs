//! Rename detection
//!
//! A Deleted and an Added change of the same kind on the same table are
//! merged into one rename when the deleted definition, with its name swapped
//! for the added one, is identical to the added definition after whitespace
//! normalization. Anything beyond the name differing keeps them apart: SQL
//! Server has no single statement that renames and alters at once.
//!
//! Pairing is greedy. Deleted changes are visited in input order and each
//! takes the first unmatched Added candidate in input order. Two columns of
//! the same shape swapping names can therefore pair up "wrong"; that is the
//! documented behavior.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{
    ChangeType, ObjectType, RenameType, SchemaChange, PROP_IS_RENAME, PROP_OLD_NAME,
    PROP_RENAME_TYPE,
};
use crate::parser::{normalize_whitespace, replace_identifier};

type GroupKey = (ObjectType, String, Option<String>);

fn group_key(change: &SchemaChange) -> GroupKey {
    (
        change.object_type,
        change.schema.to_lowercase(),
        change.table_name.as_ref().map(|t| t.to_lowercase()),
    )
}

/// Whether `added` is `deleted` under a different name and nothing else.
pub fn is_structural_rename(deleted: &SchemaChange, added: &SchemaChange) -> bool {
    let old_name = deleted.identifier_name();
    let new_name = added.identifier_name();
    if old_name.eq_ignore_ascii_case(new_name) {
        return false;
    }
    let substituted = replace_identifier(&deleted.old_definition, old_name, new_name);
    normalize_whitespace(&substituted) == normalize_whitespace(&added.new_definition)
}

/// Merge structurally identical Deleted + Added pairs into rename-tagged
/// Modified changes. The merged change takes the Deleted change's position;
/// the Added change is removed. Everything else passes through unchanged.
pub fn detect_renames(changes: Vec<SchemaChange>) -> Vec<SchemaChange> {
    let mut added_by_group: HashMap<GroupKey, Vec<usize>> = HashMap::new();
    for (index, change) in changes.iter().enumerate() {
        if change.change_type == ChangeType::Added
            && RenameType::from_object_type(change.object_type).is_some()
        {
            added_by_group
                .entry(group_key(change))
                .or_default()
                .push(index);
        }
    }

    if added_by_group.is_empty() {
        return changes;
    }

    // deleted index -> matched added index
    let mut pairs: HashMap<usize, usize> = HashMap::new();
    let mut consumed = vec![false; changes.len()];

    for (index, deleted) in changes.iter().enumerate() {
        if deleted.change_type != ChangeType::Deleted {
            continue;
        }
        let Some(candidates) = added_by_group.get(&group_key(deleted)) else {
            continue;
        };
        let matched = candidates
            .iter()
            .copied()
            .find(|&candidate| {
                !consumed[candidate] && is_structural_rename(deleted, &changes[candidate])
            });
        if let Some(added_index) = matched {
            consumed[added_index] = true;
            pairs.insert(index, added_index);
        }
    }

    if pairs.is_empty() {
        return changes;
    }

    let mut slots: Vec<Option<SchemaChange>> = changes.into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(slots.len() - pairs.len());

    for index in 0..slots.len() {
        if consumed[index] {
            continue;
        }
        let Some(change) = slots[index].take() else {
            continue;
        };
        match pairs.get(&index).and_then(|&added| slots[added].take()) {
            Some(added) => result.push(merge_rename(change, added)),
            None => result.push(change),
        }
    }

    result
}

fn merge_rename(deleted: SchemaChange, added: SchemaChange) -> SchemaChange {
    let Some(rename_type) = RenameType::from_object_type(deleted.object_type) else {
        return deleted;
    };
    let old_name = deleted.identifier_name().to_string();

    debug!(
        "Detected {} rename: {} -> {}",
        rename_type.as_str(),
        old_name,
        added.identifier_name()
    );

    let mut merged = SchemaChange::modified(
        added.object_type,
        &added.schema,
        &added.object_name,
        &deleted.old_definition,
        &added.new_definition,
    );
    merged.table_name = added.table_name.or(deleted.table_name);
    merged.column_name = added.column_name;
    merged.properties = deleted.properties;
    merged.properties.extend(added.properties);

    merged
        .with_property(PROP_IS_RENAME, "true")
        .with_property(PROP_OLD_NAME, &old_name)
        .with_property(PROP_RENAME_TYPE, rename_type.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(change_type: ChangeType, table: &str, name: &str, def: &str) -> SchemaChange {
        let change = match change_type {
            ChangeType::Added => SchemaChange::added(ObjectType::Column, "dbo", name, def),
            ChangeType::Deleted => SchemaChange::deleted(ObjectType::Column, "dbo", name, def),
            ChangeType::Modified => {
                SchemaChange::modified(ObjectType::Column, "dbo", name, def, def)
            }
        };
        change.on_table(table).for_column(name)
    }

    #[test]
    fn test_identical_shape_is_merged() {
        let changes = vec![
            column(
                ChangeType::Deleted,
                "Users",
                "EmailAddress",
                "[EmailAddress] NVARCHAR(100) NOT NULL",
            ),
            column(ChangeType::Added, "Users", "Email", "[Email] NVARCHAR(100) NOT NULL"),
        ];
        let result = detect_renames(changes);
        assert_eq!(result.len(), 1);
        let rename = &result[0];
        assert_eq!(rename.change_type, ChangeType::Modified);
        assert!(rename.is_rename());
        assert_eq!(rename.property(PROP_OLD_NAME), Some("EmailAddress"));
        assert_eq!(rename.property(PROP_RENAME_TYPE), Some("Column"));
        assert_eq!(rename.column_name.as_deref(), Some("Email"));
        assert_eq!(rename.old_definition, "[EmailAddress] NVARCHAR(100) NOT NULL");
    }

    #[test]
    fn test_type_change_is_not_a_rename() {
        let changes = vec![
            column(
                ChangeType::Deleted,
                "Users",
                "EmailAddress",
                "[EmailAddress] NVARCHAR(100) NOT NULL",
            ),
            column(ChangeType::Added, "Users", "Email", "[Email] NVARCHAR(200) NOT NULL"),
        ];
        let result = detect_renames(changes.clone());
        assert_eq!(result, changes);
    }

    #[test]
    fn test_different_tables_never_pair() {
        let changes = vec![
            column(ChangeType::Deleted, "A", "Old", "[Old] INT"),
            column(ChangeType::Added, "B", "New", "[New] INT"),
        ];
        assert_eq!(detect_renames(changes).len(), 2);
    }

    #[test]
    fn test_first_match_wins_and_position_is_kept() {
        let changes = vec![
            column(ChangeType::Modified, "T", "Keep", "[Keep] INT"),
            column(ChangeType::Deleted, "T", "A", "[A] INT"),
            column(ChangeType::Deleted, "T", "B", "[B] INT"),
            column(ChangeType::Added, "T", "X", "[X] INT"),
            column(ChangeType::Added, "T", "Y", "[Y] INT"),
        ];
        let result = detect_renames(changes);
        let summary: Vec<(&str, Option<&str>)> = result
            .iter()
            .map(|c| (c.identifier_name(), c.property(PROP_OLD_NAME)))
            .collect();
        assert_eq!(
            summary,
            vec![("Keep", None), ("X", Some("A")), ("Y", Some("B"))]
        );
    }

    #[test]
    fn test_index_rename() {
        let changes = vec![
            SchemaChange::deleted(
                ObjectType::Index,
                "dbo",
                "IX_T_Old",
                "CREATE NONCLUSTERED INDEX [IX_T_Old] ON [dbo].[T] ([A] ASC);",
            )
            .on_table("T"),
            SchemaChange::added(
                ObjectType::Index,
                "dbo",
                "IX_T_New",
                "CREATE NONCLUSTERED INDEX [IX_T_New]\n    ON [dbo].[T] ([A] ASC);",
            )
            .on_table("T"),
        ];
        let result = detect_renames(changes);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].object_name, "IX_T_New");
        assert_eq!(result[0].property(PROP_RENAME_TYPE), Some("Index"));
    }

    #[test]
    fn test_views_are_not_rename_candidates() {
        let changes = vec![
            SchemaChange::deleted(
                ObjectType::View,
                "dbo",
                "vOld",
                "CREATE VIEW [dbo].[vOld] AS SELECT 1",
            ),
            SchemaChange::added(
                ObjectType::View,
                "dbo",
                "vNew",
                "CREATE VIEW [dbo].[vNew] AS SELECT 1",
            ),
        ];
        assert_eq!(detect_renames(changes).len(), 2);
    }
}
