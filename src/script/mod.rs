//! Migration script assembly
//!
//! Takes the detected change list and produces the forward migration, its
//! rollback and the file name both are written under.

mod builder;
mod exclusion;
mod summary;

pub use builder::{build_reverse_script, build_script, ScriptMetadata, DEFAULT_HISTORY_TABLE};
pub use exclusion::ExclusionFilter;
pub use summary::{migration_name, ChangeSummary};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::model::SchemaChange;
use crate::resolve::resolve_order;

/// Everything needed to name and head a migration, minus the name itself.
#[derive(Debug, Clone)]
pub struct MigrationInfo {
    pub database: String,
    pub actor: String,
    pub generated_at: DateTime<Utc>,
    pub history_table: String,
}

/// A generated migration pair, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct MigrationScripts {
    /// `<migration name>.sql`, shared by the forward and rollback file
    pub file_name: String,
    pub migration_name: String,
    pub forward: String,
    pub reverse: String,
    pub summary: ChangeSummary,
    /// Changes removed by the exclusion filter
    pub excluded: usize,
}

/// Order, filter and render a change list. `None` when nothing is left to
/// migrate.
pub fn build_migration(
    changes: Vec<SchemaChange>,
    info: &MigrationInfo,
    exclusions: &ExclusionFilter,
) -> Option<MigrationScripts> {
    let ordered = resolve_order(changes);
    let (kept, excluded) = exclusions.apply(ordered);
    if excluded > 0 {
        info!("Excluded {} change(s)", excluded);
    }
    if kept.is_empty() {
        return None;
    }

    let summary = ChangeSummary::from_changes(&kept);
    let migration_name = migration_name(info.generated_at, &info.actor, &summary);
    let metadata = ScriptMetadata {
        migration_name: migration_name.clone(),
        database: info.database.clone(),
        actor: info.actor.clone(),
        generated_at: info.generated_at,
        history_table: info.history_table.clone(),
    };

    Some(MigrationScripts {
        file_name: format!("{migration_name}.sql"),
        forward: build_script(&kept, &metadata),
        reverse: build_reverse_script(&kept, &metadata),
        migration_name,
        summary,
        excluded,
    })
}
