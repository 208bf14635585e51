//! Extended property calls

use tracing::warn;

use super::verbatim;
use crate::model::{ChangeType, SchemaChange};
use crate::parser::identifier_utils::escape_literal;
use crate::parser::{parse_extended_property, ExtendedPropertyCall};

pub(super) fn generate_extended_property(change: &SchemaChange) -> Vec<String> {
    match change.change_type {
        ChangeType::Added => verbatim(&change.new_definition),
        ChangeType::Deleted => {
            let Some(old) = parse_extended_property(&change.old_definition) else {
                return vec![parse_error(change, "drop")];
            };
            vec![drop_call(&old)]
        }
        ChangeType::Modified => {
            let (Some(old), Some(new)) = (
                parse_extended_property(&change.old_definition),
                parse_extended_property(&change.new_definition),
            ) else {
                return vec![parse_error(change, "update")];
            };
            vec![update_call(&old, &new)]
        }
    }
}

fn drop_call(old: &ExtendedPropertyCall) -> String {
    format!(
        "EXEC sp_dropextendedproperty @name = N'{}', {};",
        escape_literal(&old.property_name),
        old.level_arguments()
    )
}

/// New value, old levels: the property stays attached where it was.
fn update_call(old: &ExtendedPropertyCall, new: &ExtendedPropertyCall) -> String {
    let value = match &new.property_value {
        Some(value) => format!("N'{}'", escape_literal(value)),
        None => "NULL".to_string(),
    };
    format!(
        "EXEC sp_updateextendedproperty @name = N'{}', @value = {}, {};",
        escape_literal(&new.property_name),
        value,
        old.level_arguments()
    )
}

fn parse_error(change: &SchemaChange, action: &str) -> String {
    warn!("Could not parse extended property call for {}", change.identifier());
    format!(
        "-- ERROR: could not parse the extended property definition of {}; {action} it manually.",
        change.identifier()
    )
}
