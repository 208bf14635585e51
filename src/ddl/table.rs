//! Table and column statements

use tracing::{debug, warn};

use super::constraint::default_drop_by_column;
use super::{placeholder, verbatim, GenerationContext};
use crate::model::{ChangeType, SchemaChange};
use crate::parser::identifier_utils::{bracket, quote_name};
use crate::parser::column_parser::parenthesize;
use crate::parser::{normalize_whitespace, parse_column_definition, ParsedColumn};
use crate::util::contains_ci;

pub(super) fn generate_table(change: &SchemaChange) -> Vec<String> {
    let table = quote_name(&change.schema, &change.object_name);
    match change.change_type {
        ChangeType::Added => verbatim(&change.new_definition),
        ChangeType::Deleted => vec![format!("DROP TABLE {table};")],
        ChangeType::Modified if change.is_unparsed() => {
            warn!("Table {table} needs manual review: column list could not be parsed");
            vec![format!(
                "-- MANUAL REVIEW: table {table} changed but its column list could not be parsed.\n\
                 -- No statements were generated for it; compare the two definitions and script the change by hand."
            )]
        }
        ChangeType::Modified => vec![format!(
            "-- Table {table} modified; column and constraint changes follow as separate statements."
        )],
    }
}

pub(super) fn generate_column(
    change: &SchemaChange,
    context: &GenerationContext<'_>,
) -> Vec<String> {
    let Some(table_name) = change.table_name.as_deref() else {
        return vec![placeholder(change, "owning table unknown")];
    };
    let table = quote_name(&change.schema, table_name);
    let column = change.identifier_name();

    match change.change_type {
        ChangeType::Added => {
            if let Some((parsed, expression)) = context.inline_default_for(change) {
                debug!("Inlining default {expression} into ADD of {table}.{}", bracket(column));
                return vec![format!(
                    "ALTER TABLE {table} ADD {};",
                    parsed.definition_with_default(&expression)
                )];
            }
            vec![format!("ALTER TABLE {table} ADD {};", change.new_definition.trim())]
        }
        ChangeType::Deleted => {
            let mut batches = Vec::new();
            if has_default(&change.old_definition) {
                batches.push(default_drop_by_column(&change.schema, table_name, column));
            }
            batches.push(format!("ALTER TABLE {table} DROP COLUMN {};", bracket(column)));
            batches
        }
        ChangeType::Modified => alter_column(change, &table),
    }
}

fn alter_column(change: &SchemaChange, table: &str) -> Vec<String> {
    let old = parse_column_definition(&change.old_definition);
    let new = parse_column_definition(&change.new_definition);

    let recreate = old.as_ref().is_some_and(ParsedColumn::is_computed)
        || new.as_ref().is_some_and(ParsedColumn::is_computed);
    if recreate {
        return vec![
            format!(
                "ALTER TABLE {table} DROP COLUMN {};",
                bracket(change.identifier_name())
            ),
            format!("ALTER TABLE {table} ADD {};", change.new_definition.trim()),
        ];
    }

    let (Some(old), Some(new)) = (old, new) else {
        return vec![placeholder(change, "column definition could not be parsed")];
    };
    if clause_changed(&old.identity, &new.identity) {
        return vec![placeholder(change, "IDENTITY cannot be changed with ALTER COLUMN")];
    }
    let Some(definition) = new.alter_column_definition() else {
        return vec![placeholder(change, "column definition could not be parsed")];
    };

    // ALTER COLUMN leaves defaults alone, so a changed default is swapped separately
    let default_changed = clause_changed(&old.default_expression, &new.default_expression);
    let (schema, table_name, column) = (
        change.schema.as_str(),
        change.owner_table(),
        change.identifier_name(),
    );

    let mut batches = Vec::new();
    if default_changed && old.default_expression.is_some() {
        batches.push(default_drop_by_column(schema, table_name, column));
    }
    batches.push(format!("ALTER TABLE {table} ALTER COLUMN {definition};"));
    if default_changed {
        if let Some(expression) = &new.default_expression {
            let name = new
                .default_constraint_name
                .as_deref()
                .map(|name| format!("CONSTRAINT {} ", bracket(name)))
                .unwrap_or_default();
            batches.push(format!(
                "ALTER TABLE {table} ADD {name}DEFAULT {} FOR {};",
                parenthesize(expression),
                bracket(column)
            ));
        }
    }
    batches
}

fn clause_changed(old: &Option<String>, new: &Option<String>) -> bool {
    old.as_deref().map(normalize_whitespace) != new.as_deref().map(normalize_whitespace)
}

fn has_default(definition: &str) -> bool {
    match parse_column_definition(definition) {
        Some(parsed) => parsed.default_expression.is_some(),
        None => contains_ci(definition, " DEFAULT"),
    }
}
