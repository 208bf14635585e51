//! Script splitting: attribution, clustering, round trip and idempotence

use pretty_assertions::assert_eq;

use rust_sqlmigrate::parser::{join_batches, split_batches, ScriptBatch};
use rust_sqlmigrate::split::{build_manifest, split_script, Segment};

/// A table rebuild in the shape schema-compare tools emit, surrounded by
/// unrelated changes.
const REBUILD_SCRIPT: &str = "\
SET XACT_ABORT ON;
GO
BEGIN TRANSACTION;
GO
PRINT N'Dropping [dbo].[FK_Orders_Customers]...';
GO
ALTER TABLE [dbo].[Orders] DROP CONSTRAINT [FK_Orders_Customers];
GO
PRINT N'Starting rebuilding table [dbo].[Customers]...';
GO
CREATE TABLE [dbo].[tmp_ms_xx_Customers] (
    [Id]    INT            NOT NULL,
    [Code]  CHAR(3)        NOT NULL,
    [Name]  NVARCHAR(200)  NULL,
    CONSTRAINT [tmp_ms_xx_constraint_PK_Customers] PRIMARY KEY CLUSTERED ([Id] ASC)
);
GO
IF EXISTS (SELECT TOP 1 1 FROM [dbo].[Customers])
BEGIN
    INSERT INTO [dbo].[tmp_ms_xx_Customers] ([Id], [Name])
    SELECT [Id], [Name] FROM [dbo].[Customers] ORDER BY [Id] ASC;
END
GO
DROP TABLE [dbo].[Customers];
GO
EXECUTE sp_rename N'[dbo].[tmp_ms_xx_Customers]', N'Customers';
GO
EXECUTE sp_rename N'[dbo].[tmp_ms_xx_constraint_PK_Customers]', N'PK_Customers', N'OBJECT';
GO
CREATE NONCLUSTERED INDEX [IX_Customers_Code] ON [dbo].[Customers] ([Code]);
GO
ALTER TABLE [dbo].[Orders] WITH NOCHECK
    ADD CONSTRAINT [FK_Orders_Customers] FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customers] ([Id]);
GO
ALTER TABLE [dbo].[Orders] WITH CHECK CHECK CONSTRAINT [FK_Orders_Customers];
GO
PRINT N'Altering [dbo].[vOrders]...';
GO
CREATE OR ALTER VIEW [dbo].[vOrders] AS SELECT [Id] FROM [dbo].[Orders];
GO
EXEC sp_rename '[dbo].[Orders].[OldCol]', 'NewCol', 'COLUMN';
GO
COMMIT TRANSACTION;
GO
";

fn segment_files(segments: &[Segment]) -> Vec<String> {
    build_manifest(segments)
        .execution_order
        .into_iter()
        .map(|e| e.segment_file)
        .collect()
}

fn original_batches(script: &str) -> Vec<String> {
    split_batches(script)
        .into_iter()
        .map(|b| b.content.trim().to_string())
        .collect()
}

fn reassemble(segments: &[Segment]) -> String {
    let batches: Vec<ScriptBatch> = segments.iter().flat_map(|s| s.batches.clone()).collect();
    join_batches(&batches)
}

#[test]
fn test_table_rebuild_stays_in_one_segment() {
    let segments = split_script(REBUILD_SCRIPT);
    assert_eq!(
        segment_files(&segments),
        vec![
            "001_Script_control_set_options.sql",
            "002_Script_control_begin_transaction.sql",
            "003_Table_dbo_Customers.sql",
            "004_View_dbo_vOrders.sql",
            "005_Table_dbo_Orders.sql",
            "006_Script_control_commit_transaction.sql",
        ]
    );

    let rebuild = &segments[2];
    assert!(rebuild.batches[0].text.starts_with("PRINT N'Dropping"));
    assert!(rebuild
        .batches
        .iter()
        .any(|b| b.text.starts_with("DROP TABLE [dbo].[Customers]")));
    assert!(rebuild
        .batches
        .last()
        .unwrap()
        .text
        .contains("CHECK CONSTRAINT [FK_Orders_Customers]"));
}

#[test]
fn test_manifest_object_names() {
    let manifest = build_manifest(&split_script(REBUILD_SCRIPT));
    assert_eq!(manifest.version, "1.0");
    assert_eq!(manifest.total_segments, 6);
    assert_eq!(manifest.execution_order[2].object_type, "Table");
    assert_eq!(manifest.execution_order[2].object_name, "dbo.Customers");
    assert_eq!(manifest.execution_order[3].object_name, "dbo.vOrders");
}

#[test]
fn test_round_trip_preserves_statement_order() {
    let segments = split_script(REBUILD_SCRIPT);
    let rebuilt = reassemble(&segments);
    assert_eq!(original_batches(&rebuilt), original_batches(REBUILD_SCRIPT));
}

#[test]
fn test_splitting_is_idempotent() {
    let first = split_script(REBUILD_SCRIPT);
    let second = split_script(&reassemble(&first));
    assert_eq!(build_manifest(&second), build_manifest(&first));
    assert_eq!(second, first);
}

#[test]
fn test_without_rebuild_constraints_and_indexes_are_their_own_objects() {
    let script = "\
ALTER TABLE [dbo].[Orders] DROP CONSTRAINT [FK_Orders_Customers];
GO
DROP INDEX [IX_Orders_Date] ON [dbo].[Orders];
GO
CREATE INDEX [IX_Orders_Date] ON [dbo].[Orders] ([OrderDate], [Id]);
GO
";
    assert_eq!(
        segment_files(&split_script(script)),
        vec![
            "001_Constraint_dbo_FK_Orders_Customers.sql",
            "002_Index_dbo_Orders.IX_Orders_Date.sql",
        ]
    );
}

#[test]
fn test_empty_script_has_no_segments() {
    assert!(split_script("").is_empty());
    assert_eq!(build_manifest(&[]).total_segments, 0);
}

#[test]
fn test_repeated_batches_keep_their_count() {
    let script = "\
CREATE TABLE [dbo].[Counters] ([Id] INT IDENTITY(1,1) NOT NULL);
GO
INSERT INTO [dbo].[Counters] DEFAULT VALUES;
GO 3
CREATE VIEW [dbo].[vCounters] AS SELECT [Id] FROM [dbo].[Counters];
GO
";
    let segments = split_script(script);
    assert_eq!(segments[1].key.name, "misc");
    assert_eq!(segments[1].batches[0].repeat, 3);
    assert_eq!(
        segments[1].content(),
        "INSERT INTO [dbo].[Counters] DEFAULT VALUES;\nGO 3\n\n"
    );

    let rebuilt = reassemble(&segments);
    assert!(rebuilt.contains("DEFAULT VALUES;\nGO 3\n"));
    assert_eq!(split_script(&rebuilt), segments);
}
