//! Constraint statements, including column-keyed DEFAULT replacement
//!
//! SQL Server names inline defaults itself (`DF__Users__Activ__3B75D760`), so
//! a default constraint is never dropped by the name in source control.
//! Instead the constraint currently bound to the target column is looked up
//! in `sys.default_constraints` and dropped under whatever name it has.

use tracing::debug;

use super::{placeholder, verbatim, GenerationContext};
use crate::model::{ChangeType, SchemaChange};
use crate::parser::identifier_utils::{bracket, escape_literal, quote_name};
use crate::parser::{parse_constraint_definition, ConstraintHeader, ConstraintKind};

/// Batch that drops whatever DEFAULT constraint is bound to a column.
pub fn default_drop_by_column(schema: &str, table: &str, column: &str) -> String {
    let qualified = quote_name(schema, table);
    let literal_table = escape_literal(&qualified);
    format!(
        "DECLARE @df_name sysname;\n\
         SELECT @df_name = dc.name\n\
         FROM sys.default_constraints dc\n\
         INNER JOIN sys.columns c ON c.object_id = dc.parent_object_id AND c.column_id = dc.parent_column_id\n\
         WHERE dc.parent_object_id = OBJECT_ID(N'{literal_table}') AND c.name = N'{}';\n\
         IF @df_name IS NOT NULL\n\
         \x20   EXEC(N'ALTER TABLE {literal_table} DROP CONSTRAINT ' + QUOTENAME(@df_name));",
        escape_literal(column)
    )
}

/// Batch that drops the column's current default, then runs `add_statement`.
pub fn default_replace_by_column(
    schema: &str,
    table: &str,
    column: &str,
    add_statement: &str,
) -> String {
    format!(
        "{}\n{}",
        default_drop_by_column(schema, table, column),
        terminated(add_statement)
    )
}

pub(super) fn generate_constraint(
    change: &SchemaChange,
    context: &GenerationContext<'_>,
) -> Vec<String> {
    match change.change_type {
        ChangeType::Added => {
            if context.is_inlined_default(change) {
                debug!("{} folded into its column's ADD statement", change);
                return Vec::new();
            }
            add_constraint(change, &change.new_definition)
        }
        ChangeType::Deleted => vec![drop_constraint(change, &change.old_definition)],
        ChangeType::Modified => {
            let new_header = parse_constraint_definition(&change.new_definition);
            if new_header.as_ref().map(|h| h.kind) == Some(ConstraintKind::Default) {
                return add_constraint(change, &change.new_definition);
            }
            let mut batches = vec![drop_constraint(change, &change.old_definition)];
            batches.extend(verbatim(&change.new_definition));
            batches
        }
    }
}

/// Added or replaced constraint. DEFAULTs go through column-keyed replacement.
fn add_constraint(change: &SchemaChange, definition: &str) -> Vec<String> {
    let Some(header) = parse_constraint_definition(definition) else {
        return verbatim(definition);
    };
    if header.kind != ConstraintKind::Default {
        return verbatim(definition);
    }
    match (owner(change, &header), header.default_column.as_deref()) {
        (Some((schema, table)), Some(column)) => vec![default_replace_by_column(
            &schema,
            &table,
            column,
            definition.trim(),
        )],
        _ => verbatim(definition),
    }
}

fn drop_constraint(change: &SchemaChange, definition: &str) -> String {
    let header = parse_constraint_definition(definition);
    let owner = match &header {
        Some(header) => owner(change, header),
        None => change
            .table_name
            .as_ref()
            .map(|t| (change.schema.clone(), t.clone())),
    };
    let Some((schema, table)) = owner else {
        return placeholder(change, "owning table unknown");
    };

    if let Some(header) = &header {
        if header.kind == ConstraintKind::Default {
            if let Some(column) = &header.default_column {
                return default_drop_by_column(&schema, &table, column);
            }
        }
    }

    format!(
        "ALTER TABLE {} DROP CONSTRAINT {};",
        quote_name(&schema, &table),
        bracket(&change.object_name)
    )
}

/// Owning `(schema, table)`: the definition wins, the change record fills gaps.
fn owner(change: &SchemaChange, header: &ConstraintHeader) -> Option<(String, String)> {
    let table = header.table.clone().or_else(|| change.table_name.clone())?;
    let schema = header.schema.clone().unwrap_or_else(|| change.schema.clone());
    Some((schema, table))
}

fn terminated(statement: &str) -> String {
    let trimmed = statement.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}
