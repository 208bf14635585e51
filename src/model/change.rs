//! Schema change records produced by change detection

use std::collections::BTreeMap;
use std::fmt;

/// Property key marking a change as a rename (`"true"`).
pub const PROP_IS_RENAME: &str = "IsRename";
/// Property key holding the identifier the object had before a rename.
pub const PROP_OLD_NAME: &str = "OldName";
/// Property key holding the [`RenameType`] token of a rename.
pub const PROP_RENAME_TYPE: &str = "RenameType";
/// Property key marking a table change whose body could not be parsed.
pub const PROP_UNPARSED: &str = "Unparsed";

/// Kind of schema object a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Table,
    Column,
    Index,
    Constraint,
    Trigger,
    View,
    StoredProcedure,
    Function,
    ExtendedProperty,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "Table",
            ObjectType::Column => "Column",
            ObjectType::Index => "Index",
            ObjectType::Constraint => "Constraint",
            ObjectType::Trigger => "Trigger",
            ObjectType::View => "View",
            ObjectType::StoredProcedure => "StoredProcedure",
            ObjectType::Function => "Function",
            ObjectType::ExtendedProperty => "ExtendedProperty",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a detected difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Deleted,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "Added",
            ChangeType::Deleted => "Deleted",
            ChangeType::Modified => "Modified",
        }
    }

    /// The opposite direction, used when building rollback scripts.
    pub fn inverse(&self) -> Self {
        match self {
            ChangeType::Added => ChangeType::Deleted,
            ChangeType::Deleted => ChangeType::Added,
            ChangeType::Modified => ChangeType::Modified,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object kinds `sp_rename` understands, as recorded in the `RenameType` property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameType {
    Column,
    Index,
    Constraint,
    Trigger,
}

impl RenameType {
    pub fn from_object_type(object_type: ObjectType) -> Option<Self> {
        match object_type {
            ObjectType::Column => Some(RenameType::Column),
            ObjectType::Index => Some(RenameType::Index),
            ObjectType::Constraint => Some(RenameType::Constraint),
            ObjectType::Trigger => Some(RenameType::Trigger),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenameType::Column => "Column",
            RenameType::Index => "Index",
            RenameType::Constraint => "Constraint",
            RenameType::Trigger => "Trigger",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "column" => Some(RenameType::Column),
            "index" => Some(RenameType::Index),
            "constraint" => Some(RenameType::Constraint),
            "trigger" => Some(RenameType::Trigger),
            _ => None,
        }
    }
}

/// One detected schema difference.
///
/// Added changes carry only `new_definition`, Deleted only `old_definition`,
/// Modified both. `table_name` is set for table-scoped objects (columns,
/// indexes, constraints, triggers) and for the table itself; `column_name`
/// only for columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChange {
    pub object_type: ObjectType,
    pub schema: String,
    pub table_name: Option<String>,
    pub object_name: String,
    pub column_name: Option<String>,
    pub change_type: ChangeType,
    pub old_definition: String,
    pub new_definition: String,
    pub properties: BTreeMap<String, String>,
}

impl SchemaChange {
    fn new(
        object_type: ObjectType,
        change_type: ChangeType,
        schema: &str,
        object_name: &str,
        old_definition: String,
        new_definition: String,
    ) -> Self {
        Self {
            object_type,
            schema: schema.to_string(),
            table_name: None,
            object_name: object_name.to_string(),
            column_name: None,
            change_type,
            old_definition,
            new_definition,
            properties: BTreeMap::new(),
        }
    }

    pub fn added(object_type: ObjectType, schema: &str, name: &str, definition: &str) -> Self {
        Self::new(
            object_type,
            ChangeType::Added,
            schema,
            name,
            String::new(),
            definition.to_string(),
        )
    }

    pub fn deleted(object_type: ObjectType, schema: &str, name: &str, definition: &str) -> Self {
        Self::new(
            object_type,
            ChangeType::Deleted,
            schema,
            name,
            definition.to_string(),
            String::new(),
        )
    }

    pub fn modified(
        object_type: ObjectType,
        schema: &str,
        name: &str,
        old_definition: &str,
        new_definition: &str,
    ) -> Self {
        Self::new(
            object_type,
            ChangeType::Modified,
            schema,
            name,
            old_definition.to_string(),
            new_definition.to_string(),
        )
    }

    /// Set the owning table.
    pub fn on_table(mut self, table: &str) -> Self {
        self.table_name = Some(table.to_string());
        self
    }

    /// Mark this change as a column change; the object name is the column name.
    pub fn for_column(mut self, column: &str) -> Self {
        self.column_name = Some(column.to_string());
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    pub fn is_rename(&self) -> bool {
        self.property(PROP_IS_RENAME)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn is_unparsed(&self) -> bool {
        self.property(PROP_UNPARSED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// The identifier this change is about: column name for columns, object name otherwise.
    pub fn identifier_name(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.object_name)
    }

    /// Owning table, falling back to the object name for table changes.
    pub fn owner_table(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.object_name)
    }

    /// The definition that describes the object's current shape for this change.
    pub fn effective_definition(&self) -> &str {
        if self.new_definition.is_empty() {
            &self.old_definition
        } else {
            &self.new_definition
        }
    }

    /// Dotted identifier used by exclusion lists:
    /// `schema.table[.column|index|constraint|trigger]` or `schema.object`.
    pub fn identifier(&self) -> String {
        match self.object_type {
            ObjectType::Table => format!("{}.{}", self.schema, self.object_name),
            ObjectType::View | ObjectType::StoredProcedure | ObjectType::Function => {
                format!("{}.{}", self.schema, self.object_name)
            }
            _ => match &self.table_name {
                Some(table) => format!("{}.{}.{}", self.schema, table, self.identifier_name()),
                None => format!("{}.{}", self.schema, self.identifier_name()),
            },
        }
    }

    /// The same change seen from the other side: Added and Deleted swap,
    /// definitions swap, and a rename points back at its old name.
    pub fn inverted(&self) -> Self {
        let mut inverted = Self {
            change_type: self.change_type.inverse(),
            old_definition: self.new_definition.clone(),
            new_definition: self.old_definition.clone(),
            ..self.clone()
        };

        if self.is_rename() {
            if let Some(old_name) = self.property(PROP_OLD_NAME) {
                let current = self.identifier_name().to_string();
                let old_name = old_name.to_string();
                if inverted.column_name.is_some() {
                    inverted.column_name = Some(old_name.clone());
                }
                inverted.object_name = old_name;
                inverted
                    .properties
                    .insert(PROP_OLD_NAME.to_string(), current);
            }
        }

        inverted
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.object_type,
            self.identifier(),
            self.change_type
        )
    }
}
