//! Schema tree layout conventions
//!
//! A database's schema tree stores one object per file:
//!
//! ```text
//! <database>/
//!   <schema>/
//!     Tables/Users.sql
//!     Indexes/Users.IX_Users_Email.sql
//!     Constraints/Users.DF_Users_Active.sql
//!     Triggers/Users.TR_Users_Audit.sql
//!     Views/vActiveUsers.sql
//!     StoredProcedures/GetUser.sql
//!     Functions/fnFullName.sql
//!     ExtendedProperties/Users.MS_Description.sql
//! ```
//!
//! The folder directly above the file decides the object kind and the folder
//! above that names the schema.

use crate::model::ObjectType;

/// Where a schema file sits in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub object_type: ObjectType,
    pub schema: String,
    /// File stem, e.g. `Users` or `Users.IX_Users_Email`
    pub file_stem: String,
}

impl ObjectLocation {
    /// For `<Table>.<Object>` file names, the table prefix.
    pub fn owner_from_stem(&self) -> Option<&str> {
        self.file_stem.split_once('.').map(|(owner, _)| owner)
    }

    /// For `<Table>.<Object>` file names, the object part; otherwise the whole stem.
    pub fn name_from_stem(&self) -> &str {
        self.file_stem
            .split_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.file_stem)
    }
}

/// Map a folder name to the object kind it holds.
pub fn folder_object_type(folder: &str) -> Option<ObjectType> {
    let normalized: String = folder
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.as_str() {
        "tables" => Some(ObjectType::Table),
        "indexes" | "indices" => Some(ObjectType::Index),
        "constraints" => Some(ObjectType::Constraint),
        "triggers" => Some(ObjectType::Trigger),
        "views" => Some(ObjectType::View),
        "storedprocedures" | "procedures" => Some(ObjectType::StoredProcedure),
        "functions" => Some(ObjectType::Function),
        "extendedproperties" => Some(ObjectType::ExtendedProperty),
        _ => None,
    }
}

/// Classify a repository-relative path. Returns `None` for files outside
/// the layout (non-`.sql` files, unknown folders).
pub fn classify_path(path: &str) -> Option<ObjectLocation> {
    let normalized = path.replace('\\', "/");
    let mut segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

    let file_name = segments.pop()?;
    let file_stem = strip_sql_extension(file_name)?;
    let folder = segments.pop()?;
    let object_type = folder_object_type(folder)?;
    let schema = segments.pop().unwrap_or("dbo");

    Some(ObjectLocation {
        object_type,
        schema: schema.to_string(),
        file_stem: file_stem.to_string(),
    })
}

fn strip_sql_extension(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ext.eq_ignore_ascii_case("sql") && !stem.is_empty() {
        Some(stem)
    } else {
        None
    }
}
