//! Schema change model: version-control diff entries in, typed schema changes out

mod change;

pub use change::{
    ChangeType, ObjectType, RenameType, SchemaChange, PROP_IS_RENAME, PROP_OLD_NAME,
    PROP_RENAME_TYPE, PROP_UNPARSED,
};

/// One changed file between two versions of the schema tree.
///
/// `path` is relative to the repository (or snapshot) root and always uses `/`
/// separators. Content of the side that does not exist is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: String,
    pub change_type: ChangeType,
    pub old_content: String,
    pub new_content: String,
}

impl DiffEntry {
    pub fn added(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            change_type: ChangeType::Added,
            old_content: String::new(),
            new_content: content.to_string(),
        }
    }

    pub fn deleted(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            change_type: ChangeType::Deleted,
            old_content: content.to_string(),
            new_content: String::new(),
        }
    }

    pub fn modified(path: &str, old_content: &str, new_content: &str) -> Self {
        Self {
            path: path.to_string(),
            change_type: ChangeType::Modified,
            old_content: old_content.to_string(),
            new_content: new_content.to_string(),
        }
    }
}
