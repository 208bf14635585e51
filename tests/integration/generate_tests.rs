//! Integration tests for the generate workflow over snapshot trees

use pretty_assertions::assert_eq;

use crate::common::{position_of, read, statements, TestContext};

const USERS_V1: &str = "\
CREATE TABLE [dbo].[Users]
(
    [Id] INT NOT NULL,
    [Name] NVARCHAR(50) NULL,
    CONSTRAINT [PK_Users] PRIMARY KEY CLUSTERED ([Id] ASC)
);
GO
";

const USERS_V2: &str = "\
CREATE TABLE [dbo].[Users]
(
    [Id]    INT           NOT NULL,
    [Name]  NVARCHAR(50)  NULL,
    [Email] NVARCHAR(100) NULL,
    CONSTRAINT [PK_Users] PRIMARY KEY CLUSTERED ([Id] ASC)
);
GO
";

const VIEW: &str = "CREATE VIEW [dbo].[vUsers]\nAS\nSELECT [Id], [Name] FROM [dbo].[Users];\nGO\n";

// ============================================================================
// Basic generation
// ============================================================================

#[test]
fn test_generate_writes_forward_and_reverse() {
    let ctx = TestContext::new();
    ctx.write_old("dbo/Tables/Users.sql", USERS_V1)
        .write_new("dbo/Tables/Users.sql", USERS_V2)
        .write_new("dbo/Views/vUsers.sql", VIEW);

    let generated = ctx.generate().expect("Expected a migration");

    let file_name = "_20250812_123456_alice_1tables_0indexes_1other.sql";
    assert_eq!(
        generated.forward_path.file_name().unwrap().to_str(),
        Some(file_name)
    );
    assert_eq!(
        generated.reverse_path.file_name().unwrap().to_str(),
        Some(file_name)
    );
    assert_eq!(
        generated
            .reverse_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str()),
        Some("migrations_reverse")
    );

    let forward = read(&generated.forward_path);
    assert!(forward.contains("-- Database: SalesDb\n"));
    assert!(forward.contains("-- Author: alice\n"));
    assert!(forward.contains("-- Changes: 2 (1 tables, 0 indexes, 1 other)\n"));

    let forward_statements = statements(&forward);
    assert_eq!(
        forward_statements,
        vec![
            "SET XACT_ABORT ON;",
            "BEGIN TRANSACTION;",
            "ALTER TABLE [dbo].[Users] ADD [Email] NVARCHAR(100) NULL;",
            "CREATE VIEW [dbo].[vUsers]\nAS\nSELECT [Id], [Name] FROM [dbo].[Users];",
            "COMMIT TRANSACTION;",
        ]
    );

    let reverse = read(&generated.reverse_path);
    let reverse_statements = statements(&reverse);
    let drop_view = position_of(&reverse_statements, "DROP VIEW [dbo].[vUsers];");
    let drop_column = position_of(&reverse_statements, "DROP COLUMN [Email];");
    assert!(drop_column < drop_view);
    assert!(reverse.contains(
        "DELETE FROM [dbo].[__MigrationHistory] WHERE [MigrationId] = '_20250812_123456_alice_1tables_0indexes_1other';"
    ));
}

#[test]
fn test_unchanged_trees_produce_nothing() {
    let ctx = TestContext::new();
    ctx.write_both("dbo/Tables/Users.sql", USERS_V1);
    ctx.write_old("dbo/Views/vUsers.sql", VIEW)
        .write_new("dbo/Views/vUsers.sql", &VIEW.replace('\n', "\r\n"));

    assert!(ctx.generate().is_none());
    assert_eq!(std::fs::read_dir(&ctx.output_dir).unwrap().count(), 0);
}

#[test]
fn test_missing_output_directory_is_an_error() {
    let ctx = TestContext::new();
    ctx.write_new("dbo/Views/vUsers.sql", VIEW);

    let mut options = ctx.options();
    options.output_dir = ctx.output_dir.join("does-not-exist");
    let source = rust_sqlmigrate::source::SnapshotDiffSource::new(&ctx.old_dir, &ctx.new_dir);
    let result = rust_sqlmigrate::generate_migration_with(
        &source,
        &options,
        "alice",
        crate::common::generated_at(),
    );
    assert!(result.is_err());
}

// ============================================================================
// Renames, defaults and ordering end to end
// ============================================================================

#[test]
fn test_column_rename_end_to_end() {
    let ctx = TestContext::new();
    ctx.write_old(
        "dbo/Tables/T.sql",
        "CREATE TABLE [dbo].[T]([Id] INT, [OldCol] VARCHAR(50))",
    )
    .write_new(
        "dbo/Tables/T.sql",
        "CREATE TABLE [dbo].[T]([Id] INT, [NewCol] VARCHAR(50))",
    );

    let (forward, reverse) = ctx.generate_scripts();
    assert!(
        statements(&forward).contains(
            &"EXEC sp_rename '[dbo].[T].[OldCol]', 'NewCol', 'COLUMN';".to_string()
        ),
        "{forward}"
    );
    assert!(
        statements(&reverse).contains(
            &"EXEC sp_rename '[dbo].[T].[NewCol]', 'OldCol', 'COLUMN';".to_string()
        ),
        "{reverse}"
    );
}

#[test]
fn test_not_null_column_with_default_file() {
    let ctx = TestContext::new();
    ctx.write_old("dbo/Tables/Users.sql", USERS_V1)
        .write_new(
            "dbo/Tables/Users.sql",
            &USERS_V1.replace(
                "[Name] NVARCHAR(50) NULL,",
                "[Name] NVARCHAR(50) NULL,\n    [Active] BIT NOT NULL,",
            ),
        )
        .write_new(
            "dbo/Constraints/Users.DF_Users_Active.sql",
            "ALTER TABLE [dbo].[Users] ADD CONSTRAINT [DF_Users_Active] DEFAULT ((1)) FOR [Active];\nGO\n",
        );

    let (forward, reverse) = ctx.generate_scripts();
    let forward_statements = statements(&forward);
    assert!(forward_statements.contains(
        &"ALTER TABLE [dbo].[Users] ADD [Active] BIT DEFAULT ((1)) NOT NULL;".to_string()
    ));
    assert!(!forward.contains("ADD CONSTRAINT [DF_Users_Active]"));

    // The inline default gets a system name, so the rollback finds it by column
    let reverse_statements = statements(&reverse);
    let drop_default = position_of(&reverse_statements, "sys.default_constraints");
    let drop_column = position_of(&reverse_statements, "DROP COLUMN [Active];");
    assert!(drop_default < drop_column);
}

#[test]
fn test_foreign_key_dropped_before_table() {
    let ctx = TestContext::new();
    ctx.write_old(
        "dbo/Tables/Customers.sql",
        "CREATE TABLE [dbo].[Customers] ([Id] INT NOT NULL)",
    )
    .write_old(
        "dbo/Constraints/Orders.FK_Orders_Customers.sql",
        "ALTER TABLE [dbo].[Orders] ADD CONSTRAINT [FK_Orders_Customers] FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customers] ([Id]);",
    );

    let (forward, reverse) = ctx.generate_scripts();
    let forward_statements = statements(&forward);
    assert!(
        position_of(&forward_statements, "DROP CONSTRAINT [FK_Orders_Customers]")
            < position_of(&forward_statements, "DROP TABLE [dbo].[Customers]")
    );

    let reverse_statements = statements(&reverse);
    assert!(
        position_of(&reverse_statements, "CREATE TABLE [dbo].[Customers]")
            < position_of(&reverse_statements, "ADD CONSTRAINT [FK_Orders_Customers]")
    );
}

#[test]
fn test_exclusions_remove_changes() {
    let ctx = TestContext::new();
    ctx.write_old("dbo/Tables/Users.sql", USERS_V1)
        .write_new("dbo/Tables/Users.sql", USERS_V2)
        .write_new("dbo/Views/vUsers.sql", VIEW);

    let mut options = ctx.options();
    options.excludes = vec!["dbo.vUsers".to_string()];
    let generated = ctx.generate_with(options).expect("Column change remains");

    assert_eq!(generated.excluded, 1);
    assert_eq!(generated.summary.other, 0);
    assert!(!read(&generated.forward_path).contains("vUsers"));
}

#[test]
fn test_everything_excluded_writes_nothing() {
    let ctx = TestContext::new();
    ctx.write_new("dbo/Views/vUsers.sql", VIEW);

    let mut options = ctx.options();
    options.excludes = vec!["dbo.v*".to_string()];
    assert!(ctx.generate_with(options).is_none());
    assert_eq!(std::fs::read_dir(&ctx.output_dir).unwrap().count(), 0);
}
