//! Triggers, views, stored procedures and functions
//!
//! Modules are never altered in place: a modification drops the old object
//! and creates the new one from its full definition.

use super::verbatim;
use crate::model::{ChangeType, ObjectType, SchemaChange};
use crate::parser::identifier_utils::quote_name;

fn drop_keyword(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::Trigger => "TRIGGER",
        ObjectType::View => "VIEW",
        ObjectType::StoredProcedure => "PROCEDURE",
        _ => "FUNCTION",
    }
}

pub(super) fn generate_module(change: &SchemaChange) -> Vec<String> {
    let drop = format!(
        "DROP {} {};",
        drop_keyword(change.object_type),
        quote_name(&change.schema, &change.object_name)
    );
    match change.change_type {
        ChangeType::Added => verbatim(&change.new_definition),
        ChangeType::Deleted => vec![drop],
        ChangeType::Modified => {
            let mut batches = vec![drop];
            batches.extend(verbatim(&change.new_definition));
            batches
        }
    }
}
