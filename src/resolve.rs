//! Dependency ordering of schema changes
//!
//! Changes run in three phases: drops, then modifications, then creates.
//! Within the drop phase dependents go first (foreign keys before the tables
//! they tie together); the create phase mirrors that (tables before the
//! columns, indexes and keys hung on them). Modifications keep their input
//! order. The sort is stable, so changes of equal rank keep their relative
//! order too.

use crate::model::{ChangeType, ObjectType, SchemaChange};
use crate::parser::{parse_constraint_definition, ConstraintKind};
use crate::util::{contains_ci, starts_with_ci};

/// Execution phase of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Drop,
    Modify,
    Create,
}

impl Phase {
    pub fn of(change: &SchemaChange) -> Self {
        match change.change_type {
            ChangeType::Deleted => Phase::Drop,
            ChangeType::Modified => Phase::Modify,
            ChangeType::Added => Phase::Create,
        }
    }
}

/// Whether a constraint change is a foreign key.
///
/// The definition is parsed first; text hints and the `FK_` naming
/// convention cover definitions that do not parse.
pub fn is_foreign_key(change: &SchemaChange) -> bool {
    if change.object_type != ObjectType::Constraint {
        return false;
    }
    let definition = change.effective_definition();
    if let Some(header) = parse_constraint_definition(definition) {
        if header.kind != ConstraintKind::Unknown {
            return header.kind == ConstraintKind::ForeignKey;
        }
    }
    contains_ci(definition, "FOREIGN KEY")
        || contains_ci(definition, "REFERENCES")
        || starts_with_ci(&change.object_name, "FK_")
}

fn drop_rank(change: &SchemaChange) -> u8 {
    match change.object_type {
        ObjectType::ExtendedProperty => 0,
        ObjectType::Constraint if is_foreign_key(change) => 1,
        ObjectType::Constraint => 2,
        ObjectType::Index => 3,
        ObjectType::Column => 4,
        ObjectType::Trigger
        | ObjectType::View
        | ObjectType::StoredProcedure
        | ObjectType::Function => 5,
        ObjectType::Table => 6,
    }
}

fn create_rank(change: &SchemaChange) -> u8 {
    match change.object_type {
        ObjectType::Table => 0,
        ObjectType::Column => 1,
        ObjectType::Index => 2,
        ObjectType::Constraint if is_foreign_key(change) => 4,
        ObjectType::Constraint => 3,
        ObjectType::Trigger
        | ObjectType::View
        | ObjectType::StoredProcedure
        | ObjectType::Function => 5,
        ObjectType::ExtendedProperty => 6,
    }
}

/// Sort key: phase first, then category rank within the phase.
pub fn order_key(change: &SchemaChange) -> (Phase, u8) {
    let phase = Phase::of(change);
    let rank = match phase {
        Phase::Drop => drop_rank(change),
        Phase::Modify => 0,
        Phase::Create => create_rank(change),
    };
    (phase, rank)
}

/// Order changes for safe sequential execution.
pub fn resolve_order(changes: Vec<SchemaChange>) -> Vec<SchemaChange> {
    let mut keyed: Vec<((Phase, u8), SchemaChange)> =
        changes.into_iter().map(|c| (order_key(&c), c)).collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, change)| change).collect()
}
