//! Change detection and rename merging through the public API

use pretty_assertions::assert_eq;

use rust_sqlmigrate::ddl::generate_all;
use rust_sqlmigrate::detect::detect_changes;
use rust_sqlmigrate::model::{
    ChangeType, DiffEntry, ObjectType, PROP_OLD_NAME, PROP_RENAME_TYPE,
};
use rust_sqlmigrate::resolve::resolve_order;

const TABLE_PATH: &str = "SalesDb/dbo/Tables/T.sql";

fn table_change(old: &str, new: &str) -> Vec<DiffEntry> {
    vec![DiffEntry::modified(TABLE_PATH, old, new)]
}

// ============================================================================
// Rename detection
// ============================================================================

#[test]
fn test_column_rename_becomes_sp_rename() {
    let entries = table_change(
        "CREATE TABLE [dbo].[T]([Id] INT, [OldCol] VARCHAR(50))",
        "CREATE TABLE [dbo].[T]([Id] INT, [NewCol] VARCHAR(50))",
    );
    let changes = detect_changes(&entries);

    assert_eq!(changes.len(), 1, "Rename should merge into one change: {changes:#?}");
    let rename = &changes[0];
    assert_eq!(rename.change_type, ChangeType::Modified);
    assert!(rename.is_rename());
    assert_eq!(rename.property(PROP_OLD_NAME), Some("OldCol"));
    assert_eq!(rename.property(PROP_RENAME_TYPE), Some("Column"));

    assert_eq!(
        generate_all(&changes),
        vec!["EXEC sp_rename '[dbo].[T].[OldCol]', 'NewCol', 'COLUMN';"]
    );
}

#[test]
fn test_rename_with_type_change_stays_drop_and_add() {
    let entries = table_change(
        "CREATE TABLE [dbo].[T]([Id] INT, [OldCol] VARCHAR(50))",
        "CREATE TABLE [dbo].[T]([Id] INT, [NewCol] VARCHAR(100))",
    );
    let changes = detect_changes(&entries);

    let kinds: Vec<(ChangeType, &str)> = changes
        .iter()
        .map(|c| (c.change_type, c.identifier_name()))
        .collect();
    assert_eq!(
        kinds,
        vec![(ChangeType::Deleted, "OldCol"), (ChangeType::Added, "NewCol")]
    );
    assert!(changes.iter().all(|c| !c.is_rename()));
}

#[test]
fn test_renames_pair_first_match_in_order() {
    let entries = table_change(
        "CREATE TABLE [dbo].[T]([A] INT, [B] INT)",
        "CREATE TABLE [dbo].[T]([X] INT, [Y] INT)",
    );
    let changes = detect_changes(&entries);
    let pairs: Vec<(&str, Option<&str>)> = changes
        .iter()
        .map(|c| (c.identifier_name(), c.property(PROP_OLD_NAME)))
        .collect();
    assert_eq!(pairs, vec![("X", Some("A")), ("Y", Some("B"))]);
}

#[test]
fn test_index_file_rename() {
    let entries = vec![
        DiffEntry::deleted(
            "SalesDb/dbo/Indexes/Users.IX_Users_Mail.sql",
            "CREATE NONCLUSTERED INDEX [IX_Users_Mail] ON [dbo].[Users] ([Email])",
        ),
        DiffEntry::added(
            "SalesDb/dbo/Indexes/Users.IX_Users_Email.sql",
            "CREATE NONCLUSTERED INDEX [IX_Users_Email] ON [dbo].[Users] ([Email])",
        ),
    ];
    let changes = detect_changes(&entries);
    assert_eq!(changes.len(), 1);
    assert_eq!(
        generate_all(&changes),
        vec!["EXEC sp_rename '[dbo].[Users].[IX_Users_Mail]', 'IX_Users_Email', 'INDEX';"]
    );
}

// ============================================================================
// Whitespace insensitivity
// ============================================================================

#[test]
fn test_reformatted_table_has_no_changes() {
    let entries = table_change(
        "CREATE TABLE [dbo].[T]([Id] INT NOT NULL, [Amount] DECIMAL(10,2) NULL)",
        "CREATE TABLE [dbo].[T]\n(\n    [Id]     INT           NOT NULL,\n    [Amount] DECIMAL(10, 2) NULL\n);\n",
    );
    assert!(detect_changes(&entries).is_empty());
}

#[test]
fn test_crlf_and_session_options_are_ignored() {
    let entries = vec![DiffEntry::modified(
        "SalesDb/dbo/Views/vUsers.sql",
        "CREATE VIEW [dbo].[vUsers] AS SELECT [Id] FROM [dbo].[Users]",
        "SET ANSI_NULLS ON\nGO\nSET QUOTED_IDENTIFIER ON\nGO\nCREATE VIEW [dbo].[vUsers]\nAS SELECT [Id] FROM [dbo].[Users]\nGO\n",
    )];
    assert!(detect_changes(&entries).is_empty());
}

// ============================================================================
// Table diff
// ============================================================================

#[test]
fn test_column_changes_are_table_scoped() {
    let entries = table_change(
        "CREATE TABLE [dbo].[T]([Id] INT NOT NULL, [Name] NVARCHAR(50) NULL, [Legacy] INT NULL)",
        "CREATE TABLE [dbo].[T]([Id] INT NOT NULL, [Name] NVARCHAR(200) NULL, [Email] NVARCHAR(100) NULL)",
    );
    let changes = resolve_order(detect_changes(&entries));

    assert!(changes.iter().all(|c| c.object_type == ObjectType::Column));
    assert!(changes.iter().all(|c| c.table_name.as_deref() == Some("T")));

    assert_eq!(
        generate_all(&changes),
        vec![
            "ALTER TABLE [dbo].[T] DROP COLUMN [Legacy];",
            "ALTER TABLE [dbo].[T] ALTER COLUMN [Name] NVARCHAR(200) NULL;",
            "ALTER TABLE [dbo].[T] ADD [Email] NVARCHAR(100) NULL;",
        ]
    );
}

#[test]
fn test_unparseable_table_is_flagged_for_review() {
    let entries = table_change(
        "CREATE TABLE [dbo].[T]([Id] INT)",
        "CREATE TABLE [dbo].[T]([Id] INT",
    );
    let changes = detect_changes(&entries);
    assert_eq!(changes.len(), 1);
    assert!(changes[0].is_unparsed());

    let batches = generate_all(&changes);
    assert!(batches[0].starts_with("-- MANUAL REVIEW"), "{batches:?}");
}
