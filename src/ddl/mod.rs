//! DDL generation
//!
//! [`generate`] turns one [`SchemaChange`] into the batches that apply it.
//! Each object kind has its own sub-generator; renames are handled before
//! kind dispatch. Nothing here fails: input that cannot be interpreted
//! becomes a `-- ` comment so the script stays loadable and the problem is
//! visible to the reviewer.
//!
//! Generators never keep state between calls. Anything a generator needs to
//! know about the rest of the run (paired default constraints) comes from the
//! read-only [`GenerationContext`].

mod constraint;
mod extended_property;
mod index;
mod programmability;
mod rename;
mod reverse;
mod table;

pub use constraint::{default_drop_by_column, default_replace_by_column};
pub use rename::rename_statement;
pub use reverse::{generate_reverse, generate_reverse_all, invert_changes};

use tracing::debug;

use crate::model::{ChangeType, ObjectType, SchemaChange};
use crate::parser::{
    parse_column_definition, parse_constraint_definition, split_batches, ConstraintKind,
    ParsedColumn,
};

/// Read-only view of every change in the current run.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    changes: &'a [SchemaChange],
}

impl<'a> GenerationContext<'a> {
    pub fn new(changes: &'a [SchemaChange]) -> Self {
        Self { changes }
    }

    /// A context with no sibling changes.
    pub fn empty() -> GenerationContext<'static> {
        GenerationContext { changes: &[] }
    }

    pub fn changes(&self) -> &'a [SchemaChange] {
        self.changes
    }

    /// For an added NOT NULL column, the expression of an added DEFAULT
    /// constraint on the same column, if the run has one.
    pub fn inline_default_for(&self, column: &SchemaChange) -> Option<(ParsedColumn, String)> {
        if column.object_type != ObjectType::Column || column.change_type != ChangeType::Added {
            return None;
        }
        let parsed = parse_column_definition(&column.new_definition)?;
        if !parsed.is_not_null() || parsed.is_computed() {
            return None;
        }
        let expression = self
            .changes
            .iter()
            .filter(|c| {
                c.object_type == ObjectType::Constraint && c.change_type == ChangeType::Added
            })
            .find_map(|c| default_target(c, column))?;
        Some((parsed, expression))
    }

    /// Whether an added DEFAULT constraint is folded into its column's `ADD`.
    pub fn is_inlined_default(&self, constraint: &SchemaChange) -> bool {
        if constraint.object_type != ObjectType::Constraint
            || constraint.change_type != ChangeType::Added
        {
            return false;
        }
        self.changes
            .iter()
            .filter(|c| c.object_type == ObjectType::Column && c.change_type == ChangeType::Added)
            .any(|column| {
                default_target(constraint, column).is_some()
                    && self.inline_default_for(column).is_some()
            })
    }
}

/// If `constraint` is a DEFAULT on `column`'s table and column, its expression.
fn default_target(constraint: &SchemaChange, column: &SchemaChange) -> Option<String> {
    let header = parse_constraint_definition(&constraint.new_definition)?;
    if header.kind != ConstraintKind::Default {
        return None;
    }
    let target_column = header.default_column.as_deref()?;
    let target_table = header
        .table
        .as_deref()
        .or(constraint.table_name.as_deref())?;
    let target_schema = header.schema.as_deref().unwrap_or(&constraint.schema);

    let same_column = target_column.eq_ignore_ascii_case(column.identifier_name())
        && target_table.eq_ignore_ascii_case(column.table_name.as_deref()?)
        && target_schema.eq_ignore_ascii_case(&column.schema);
    if same_column {
        header.default_expression
    } else {
        None
    }
}

/// Forward DDL for one change. An empty result means the change is covered
/// by another change's statement.
pub fn generate(change: &SchemaChange, context: &GenerationContext<'_>) -> Vec<String> {
    if change.change_type == ChangeType::Modified && change.is_rename() {
        return vec![rename::rename_statement(change)];
    }

    match change.object_type {
        ObjectType::Table => table::generate_table(change),
        ObjectType::Column => table::generate_column(change, context),
        ObjectType::Index => index::generate_index(change),
        ObjectType::Constraint => constraint::generate_constraint(change, context),
        ObjectType::Trigger
        | ObjectType::View
        | ObjectType::StoredProcedure
        | ObjectType::Function => programmability::generate_module(change),
        ObjectType::ExtendedProperty => extended_property::generate_extended_property(change),
    }
}

/// Forward DDL for an ordered change list, using the list as its own context.
pub fn generate_all(changes: &[SchemaChange]) -> Vec<String> {
    let context = GenerationContext::new(changes);
    let mut batches = Vec::new();
    for change in changes {
        let generated = generate(change, &context);
        if generated.is_empty() {
            debug!("{} produced no statements", change);
        }
        batches.extend(generated);
    }
    batches
}

/// Definition text as its own batches, for statements emitted verbatim.
pub(crate) fn verbatim(definition: &str) -> Vec<String> {
    split_batches(definition)
        .into_iter()
        .map(|b| b.content.trim().to_string())
        .collect()
}

/// A comment standing in for a statement that could not be generated.
pub(crate) fn placeholder(change: &SchemaChange, reason: &str) -> String {
    format!(
        "-- Unsupported change: {} {} {} ({}). Review and script it manually.",
        change.change_type,
        change.object_type,
        change.identifier(),
        reason
    )
}
