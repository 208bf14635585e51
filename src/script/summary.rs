//! Change counts and migration file naming

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{ChangeType, ObjectType, SchemaChange};

/// Counts used in script headers and file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Distinct tables touched by table or column changes
    pub tables: usize,
    pub indexes: usize,
    /// Everything that is neither a table/column nor an index change
    pub other: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub by_type: BTreeMap<ObjectType, usize>,
}

impl ChangeSummary {
    pub fn from_changes(changes: &[SchemaChange]) -> Self {
        let mut summary = ChangeSummary::default();
        let mut tables: HashSet<(String, String)> = HashSet::new();

        for change in changes {
            match change.object_type {
                ObjectType::Table | ObjectType::Column => {
                    tables.insert((
                        change.schema.to_lowercase(),
                        change.owner_table().to_lowercase(),
                    ));
                }
                ObjectType::Index => summary.indexes += 1,
                _ => summary.other += 1,
            }
            match change.change_type {
                ChangeType::Added => summary.added += 1,
                ChangeType::Modified => summary.modified += 1,
                ChangeType::Deleted => summary.deleted += 1,
            }
            *summary.by_type.entry(change.object_type).or_default() += 1;
        }

        summary.tables = tables.len();
        summary
    }

    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

/// Migration name: `_<yyyyMMdd_HHmmss>_<actor>_<N>tables_<N>indexes_<N>other`.
pub fn migration_name(generated_at: DateTime<Utc>, actor: &str, summary: &ChangeSummary) -> String {
    format!(
        "_{}_{}_{}tables_{}indexes_{}other",
        generated_at.format("%Y%m%d_%H%M%S"),
        sanitize_actor(actor),
        summary.tables,
        summary.indexes,
        summary.other
    )
}

/// Keep actor names file-system safe: anything but letters, digits, `-` and
/// `.` becomes `_`.
fn sanitize_actor(actor: &str) -> String {
    let cleaned: String = actor
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn column(table: &str, name: &str) -> SchemaChange {
        SchemaChange::added(ObjectType::Column, "dbo", name, "[x] INT")
            .on_table(table)
            .for_column(name)
    }

    #[test]
    fn test_tables_count_distinct_owners() {
        let changes = vec![
            column("Users", "A"),
            column("Users", "B"),
            SchemaChange::added(ObjectType::Table, "dbo", "Orders", "CREATE TABLE ...")
                .on_table("Orders"),
            SchemaChange::deleted(ObjectType::Index, "dbo", "IX", "CREATE INDEX ...")
                .on_table("Orders"),
            SchemaChange::modified(ObjectType::View, "dbo", "v", "a", "b"),
            SchemaChange::added(ObjectType::Constraint, "dbo", "DF", "x").on_table("Users"),
        ];
        let summary = ChangeSummary::from_changes(&changes);
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.indexes, 1);
        assert_eq!(summary.other, 2);
        assert_eq!((summary.added, summary.modified, summary.deleted), (4, 1, 1));
        assert_eq!(summary.total(), 6);
        assert_eq!(summary.by_type.get(&ObjectType::Column), Some(&2));
    }

    #[test]
    fn test_migration_name() {
        let at = Utc.with_ymd_and_hms(2025, 8, 12, 12, 34, 56).unwrap();
        let summary = ChangeSummary {
            tables: 2,
            indexes: 1,
            other: 3,
            ..Default::default()
        };
        assert_eq!(
            migration_name(at, "alice", &summary),
            "_20250812_123456_alice_2tables_1indexes_3other"
        );
        assert_eq!(
            migration_name(at, "Jane Doe/ops", &summary),
            "_20250812_123456_Jane_Doe_ops_2tables_1indexes_3other"
        );
    }
}
