//! Index statements

use super::{placeholder, verbatim};
use crate::model::{ChangeType, SchemaChange};
use crate::parser::identifier_utils::{bracket, quote_name};
use crate::parser::parse_index_header;

pub(super) fn generate_index(change: &SchemaChange) -> Vec<String> {
    match change.change_type {
        ChangeType::Added => verbatim(&change.new_definition),
        ChangeType::Deleted => vec![drop_index(change, &change.old_definition)],
        ChangeType::Modified => {
            let mut batches = vec![drop_index(change, &change.old_definition)];
            batches.extend(verbatim(&change.new_definition));
            batches
        }
    }
}

/// `DROP INDEX [name] ON [schema].[table];` for the index as `definition` describes it.
fn drop_index(change: &SchemaChange, definition: &str) -> String {
    let (name, schema, table) = match parse_index_header(definition) {
        Some(header) => (header.name, header.schema, header.table),
        None => match &change.table_name {
            Some(table) => (
                change.object_name.clone(),
                change.schema.clone(),
                table.clone(),
            ),
            None => return placeholder(change, "index table unknown"),
        },
    };
    format!(
        "DROP INDEX {} ON {};",
        bracket(&name),
        quote_name(&schema, &table)
    )
}
