//! `sp_rename` statements for rename-tagged changes

use crate::model::{RenameType, SchemaChange, PROP_OLD_NAME, PROP_RENAME_TYPE};
use crate::parser::identifier_utils::{escape_literal, quote_name, quote_table_child};

/// `EXEC sp_rename '<old>', '<new>', '<COLUMN|INDEX|OBJECT>';`
///
/// Columns and indexes are addressed through their table; constraints and
/// triggers are schema-scoped objects. When the rename metadata is missing
/// the result is a comment, never a statement.
pub fn rename_statement(change: &SchemaChange) -> String {
    let old_name = change.property(PROP_OLD_NAME).filter(|n| !n.is_empty());
    let rename_type = change.property(PROP_RENAME_TYPE).and_then(RenameType::parse);

    let (Some(old_name), Some(rename_type)) = (old_name, rename_type) else {
        return format!(
            "-- Cannot generate rename for {}: OldName or RenameType is missing.",
            change.identifier()
        );
    };

    let new_name = change.identifier_name();
    let (qualified_old, token) = match rename_type {
        RenameType::Column | RenameType::Index => {
            let Some(table) = change.table_name.as_deref() else {
                return format!(
                    "-- Cannot generate rename for {}: owning table is unknown.",
                    change.identifier()
                );
            };
            let token = if rename_type == RenameType::Column {
                "COLUMN"
            } else {
                "INDEX"
            };
            (quote_table_child(&change.schema, table, old_name), token)
        }
        RenameType::Constraint | RenameType::Trigger => {
            (quote_name(&change.schema, old_name), "OBJECT")
        }
    };

    format!(
        "EXEC sp_rename '{}', '{}', '{}';",
        escape_literal(&qualified_old),
        escape_literal(new_name),
        token
    )
}
