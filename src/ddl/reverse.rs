//! Rollback DDL
//!
//! A rollback is the forward generation of the inverted change: Added
//! becomes Deleted (remove the new object), Deleted becomes Added (recreate
//! it from the old definition) and Modified swaps its definitions, pointing
//! renames back at the old name. Rollback output is for human review; it is
//! never executed automatically.

use super::{generate, GenerationContext};
use crate::model::SchemaChange;
use crate::resolve::resolve_order;

/// Invert every change, keeping input order.
pub fn invert_changes(changes: &[SchemaChange]) -> Vec<SchemaChange> {
    changes.iter().map(SchemaChange::inverted).collect()
}

/// Rollback batches for one forward change.
///
/// `context` must be built over the inverted change list so paired defaults
/// are recognized from the rollback's point of view. The first batch is
/// labelled with the change it undoes.
pub fn generate_reverse(change: &SchemaChange, context: &GenerationContext<'_>) -> Vec<String> {
    labelled(change, generate(&change.inverted(), context))
}

/// Rollback batches for a whole run, in dependency order for the rollback.
pub fn generate_reverse_all(changes: &[SchemaChange]) -> Vec<String> {
    let inverted = resolve_order(invert_changes(changes));
    let context = GenerationContext::new(&inverted);
    inverted
        .iter()
        .flat_map(|change| labelled(&change.inverted(), generate(change, &context)))
        .collect()
}

fn labelled(forward: &SchemaChange, mut batches: Vec<String>) -> Vec<String> {
    if let Some(first) = batches.first_mut() {
        *first = format!("-- Undo: {forward}\n{first}");
    }
    batches
}
