//! Column-level diff of two `CREATE TABLE` bodies

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::model::{ObjectType, SchemaChange, PROP_UNPARSED};
use crate::parser::identifier_utils::quote_name;
use crate::parser::table_parser::{ColumnItem, TableConstraintItem};
use crate::parser::{normalize_whitespace, DefinitionExtractor};

/// Diff two versions of a table file's definition.
///
/// Columns are matched by name case-insensitively. A column whose normalized
/// definition is unchanged produces nothing. Named table-level constraints
/// are matched the same way and surface as `ALTER TABLE … ADD` constraint
/// changes. When either side cannot be extracted the whole table is reported
/// as one `Unparsed` modification.
pub fn diff_table(
    schema: &str,
    table: &str,
    old_definition: &str,
    new_definition: &str,
    extractor: &dyn DefinitionExtractor,
) -> Vec<SchemaChange> {
    let (Some(old), Some(new)) = (
        extractor.extract_table(old_definition),
        extractor.extract_table(new_definition),
    ) else {
        warn!(
            "Could not extract the column list of {}; flagging for manual review",
            quote_name(schema, table)
        );
        return vec![SchemaChange::modified(
            ObjectType::Table,
            schema,
            table,
            old_definition,
            new_definition,
        )
        .on_table(table)
        .with_property(PROP_UNPARSED, "true")];
    };

    let schema = new.schema.as_str();
    let table = new.name.as_str();

    let mut changes = diff_columns(schema, table, &old.columns, &new.columns);
    changes.extend(diff_constraints(
        schema,
        table,
        &old.constraints,
        &new.constraints,
    ));

    debug!(
        "Table {} diff produced {} change(s)",
        quote_name(schema, table),
        changes.len()
    );
    changes
}

fn diff_columns(
    schema: &str,
    table: &str,
    old: &[ColumnItem],
    new: &[ColumnItem],
) -> Vec<SchemaChange> {
    let new_by_name: HashMap<String, &ColumnItem> =
        new.iter().map(|c| (c.name.to_lowercase(), c)).collect();
    let old_by_name: HashMap<String, &ColumnItem> =
        old.iter().map(|c| (c.name.to_lowercase(), c)).collect();

    let mut changes = Vec::new();

    for old_column in old {
        match new_by_name.get(&old_column.name.to_lowercase()) {
            None => changes.push(
                SchemaChange::deleted(
                    ObjectType::Column,
                    schema,
                    &old_column.name,
                    &old_column.definition,
                )
                .on_table(table)
                .for_column(&old_column.name),
            ),
            Some(new_column) => {
                if normalize_whitespace(&old_column.definition)
                    != normalize_whitespace(&new_column.definition)
                {
                    changes.push(
                        SchemaChange::modified(
                            ObjectType::Column,
                            schema,
                            &new_column.name,
                            &old_column.definition,
                            &new_column.definition,
                        )
                        .on_table(table)
                        .for_column(&new_column.name),
                    );
                }
            }
        }
    }

    for new_column in new {
        if !old_by_name.contains_key(&new_column.name.to_lowercase()) {
            changes.push(
                SchemaChange::added(
                    ObjectType::Column,
                    schema,
                    &new_column.name,
                    &new_column.definition,
                )
                .on_table(table)
                .for_column(&new_column.name),
            );
        }
    }

    changes
}

fn diff_constraints(
    schema: &str,
    table: &str,
    old: &[TableConstraintItem],
    new: &[TableConstraintItem],
) -> Vec<SchemaChange> {
    let qualified = quote_name(schema, table);
    let as_statement =
        |item: &TableConstraintItem| format!("ALTER TABLE {qualified} ADD {};", item.definition);

    let new_by_name: HashMap<String, &TableConstraintItem> =
        new.iter().map(|c| (c.name.to_lowercase(), c)).collect();
    let old_by_name: HashMap<String, &TableConstraintItem> =
        old.iter().map(|c| (c.name.to_lowercase(), c)).collect();

    let mut changes = Vec::new();

    for old_item in old {
        match new_by_name.get(&old_item.name.to_lowercase()) {
            None => changes.push(
                SchemaChange::deleted(
                    ObjectType::Constraint,
                    schema,
                    &old_item.name,
                    &as_statement(old_item),
                )
                .on_table(table),
            ),
            Some(new_item) => {
                if normalize_whitespace(&old_item.definition)
                    != normalize_whitespace(&new_item.definition)
                {
                    changes.push(
                        SchemaChange::modified(
                            ObjectType::Constraint,
                            schema,
                            &new_item.name,
                            &as_statement(old_item),
                            &as_statement(new_item),
                        )
                        .on_table(table),
                    );
                }
            }
        }
    }

    for new_item in new {
        if !old_by_name.contains_key(&new_item.name.to_lowercase()) {
            changes.push(
                SchemaChange::added(
                    ObjectType::Constraint,
                    schema,
                    &new_item.name,
                    &as_statement(new_item),
                )
                .on_table(table),
            );
        }
    }

    changes
}
