//! Dependency ordering and DDL generation over hand-built change lists

use pretty_assertions::assert_eq;

use rust_sqlmigrate::ddl::{generate_all, generate_reverse_all};
use rust_sqlmigrate::model::{ObjectType, SchemaChange};
use rust_sqlmigrate::resolve::resolve_order;

fn fk_deleted() -> SchemaChange {
    SchemaChange::deleted(
        ObjectType::Constraint,
        "dbo",
        "FK_Orders_Customers",
        "ALTER TABLE [dbo].[Orders] ADD CONSTRAINT [FK_Orders_Customers] FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customers] ([Id]);",
    )
    .on_table("Orders")
}

fn customers_deleted() -> SchemaChange {
    SchemaChange::deleted(
        ObjectType::Table,
        "dbo",
        "Customers",
        "CREATE TABLE [dbo].[Customers] ([Id] INT NOT NULL)",
    )
    .on_table("Customers")
}

fn position(batches: &[String], needle: &str) -> usize {
    batches
        .iter()
        .position(|b| b.contains(needle))
        .unwrap_or_else(|| panic!("'{needle}' not generated: {batches:#?}"))
}

#[test]
fn test_foreign_key_dropped_before_referenced_table() {
    let ordered = resolve_order(vec![customers_deleted(), fk_deleted()]);
    let batches = generate_all(&ordered);
    assert_eq!(
        batches,
        vec![
            "ALTER TABLE [dbo].[Orders] DROP CONSTRAINT [FK_Orders_Customers];",
            "DROP TABLE [dbo].[Customers];",
        ]
    );
}

#[test]
fn test_table_created_before_its_columns_and_indexes() {
    let changes = vec![
        SchemaChange::added(
            ObjectType::Index,
            "dbo",
            "IX_Audit_At",
            "CREATE INDEX [IX_Audit_At] ON [dbo].[Audit] ([At])",
        )
        .on_table("Audit"),
        SchemaChange::added(ObjectType::Column, "dbo", "Note", "[Note] NVARCHAR(MAX) NULL")
            .on_table("Audit")
            .for_column("Note"),
        SchemaChange::added(
            ObjectType::Table,
            "dbo",
            "Audit",
            "CREATE TABLE [dbo].[Audit] ([Id] INT NOT NULL, [At] DATETIME2 NOT NULL)",
        )
        .on_table("Audit"),
    ];
    let batches = generate_all(&resolve_order(changes));

    let table = position(&batches, "CREATE TABLE [dbo].[Audit]");
    let column = position(&batches, "ADD [Note]");
    let index = position(&batches, "CREATE INDEX [IX_Audit_At]");
    assert!(table < column && column < index, "{batches:#?}");
}

#[test]
fn test_drops_precede_modifications_precede_creates() {
    let changes = vec![
        SchemaChange::added(
            ObjectType::View,
            "dbo",
            "vNew",
            "CREATE VIEW [dbo].[vNew] AS SELECT 1",
        ),
        SchemaChange::modified(
            ObjectType::StoredProcedure,
            "dbo",
            "GetAll",
            "CREATE PROCEDURE [dbo].[GetAll] AS SELECT 1",
            "CREATE PROCEDURE [dbo].[GetAll] AS SELECT 2",
        ),
        SchemaChange::deleted(
            ObjectType::View,
            "dbo",
            "vOld",
            "CREATE VIEW [dbo].[vOld] AS SELECT 1",
        ),
    ];
    let batches = generate_all(&resolve_order(changes));
    assert_eq!(
        batches,
        vec![
            "DROP VIEW [dbo].[vOld];",
            "DROP PROCEDURE [dbo].[GetAll];",
            "CREATE PROCEDURE [dbo].[GetAll] AS SELECT 2",
            "CREATE VIEW [dbo].[vNew] AS SELECT 1",
        ]
    );
}

#[test]
fn test_default_inlined_into_not_null_column() {
    let changes = vec![
        SchemaChange::added(
            ObjectType::Constraint,
            "dbo",
            "DF_Users_Active",
            "ALTER TABLE [dbo].[Users] ADD CONSTRAINT [DF_Users_Active] DEFAULT ((1)) FOR [Active];",
        )
        .on_table("Users"),
        SchemaChange::added(ObjectType::Column, "dbo", "Active", "[Active] BIT NOT NULL")
            .on_table("Users")
            .for_column("Active"),
    ];
    let batches = generate_all(&resolve_order(changes));
    assert_eq!(
        batches,
        vec!["ALTER TABLE [dbo].[Users] ADD [Active] BIT DEFAULT ((1)) NOT NULL;"]
    );
}

#[test]
fn test_reverse_recreates_in_safe_order() {
    let batches: Vec<String> = generate_reverse_all(&[customers_deleted(), fk_deleted()])
        .into_iter()
        .map(|b| {
            b.lines()
                .filter(|l| !l.starts_with("-- Undo:"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    let table = position(&batches, "CREATE TABLE [dbo].[Customers]");
    let fk = position(&batches, "ADD CONSTRAINT [FK_Orders_Customers]");
    assert!(table < fk, "{batches:#?}");
}
