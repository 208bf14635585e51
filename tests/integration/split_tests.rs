//! Integration tests for splitting generated scripts and reassembling them

use std::fs;

use pretty_assertions::assert_eq;

use rust_sqlmigrate::split::{Manifest, MANIFEST_FILE};
use rust_sqlmigrate::{reconstruct_script, split_script, SplitOptions};

use crate::common::{statements, TestContext};

fn migration_script(ctx: &TestContext) -> std::path::PathBuf {
    ctx.write_old(
        "dbo/Tables/Customers.sql",
        "CREATE TABLE [dbo].[Customers] ([Id] INT NOT NULL, [Name] NVARCHAR(50) NULL)",
    )
    .write_new(
        "dbo/Tables/Customers.sql",
        "CREATE TABLE [dbo].[Customers] ([Id] INT NOT NULL, [Name] NVARCHAR(200) NULL, [Code] CHAR(3) NULL)",
    )
    .write_old(
        "dbo/Indexes/Customers.IX_Customers_Name.sql",
        "CREATE INDEX [IX_Customers_Name] ON [dbo].[Customers] ([Name])",
    )
    .write_new(
        "dbo/Indexes/Customers.IX_Customers_Name.sql",
        "CREATE INDEX [IX_Customers_Name] ON [dbo].[Customers] ([Name]) INCLUDE ([Code])",
    )
    .write_new(
        "dbo/StoredProcedures/GetCustomers.sql",
        "CREATE PROCEDURE [dbo].[GetCustomers]\nAS\nBEGIN\n    SELECT [Id], [Name] FROM [dbo].[Customers];\nEND\nGO\n",
    );
    ctx.generate().expect("Expected a migration").forward_path
}

#[test]
fn test_split_writes_segments_and_manifest() {
    let ctx = TestContext::new();
    let script_path = migration_script(&ctx);
    let split_dir = ctx.output_dir.join("split");
    fs::create_dir(&split_dir).unwrap();

    let manifest = split_script(SplitOptions {
        script_path,
        output_dir: split_dir.clone(),
    })
    .expect("Split should succeed");

    let files: Vec<&str> = manifest
        .execution_order
        .iter()
        .map(|e| e.segment_file.as_str())
        .collect();
    assert_eq!(
        files,
        vec![
            "001_Script_control_set_options.sql",
            "002_Script_control_begin_transaction.sql",
            "003_Index_dbo_Customers.IX_Customers_Name.sql",
            "004_Table_dbo_Customers.sql",
            "005_StoredProcedure_dbo_GetCustomers.sql",
            "006_Script_control_commit_transaction.sql",
        ]
    );
    for file in &files {
        assert!(split_dir.join(file).is_file(), "{file} should be written");
    }

    let on_disk = Manifest::read(&split_dir).unwrap();
    assert_eq!(on_disk, manifest);
    assert_eq!(on_disk.total_segments, 6);

    // Modified index: drop and recreate land in the same segment
    let index_segment =
        fs::read_to_string(split_dir.join("003_Index_dbo_Customers.IX_Customers_Name.sql"))
            .unwrap();
    assert!(index_segment
        .starts_with("DROP INDEX [IX_Customers_Name] ON [dbo].[Customers];\nGO\n"));
    assert!(index_segment.contains("INCLUDE ([Code])\nGO\n"));
}

#[test]
fn test_reconstruct_matches_original_statements() {
    let ctx = TestContext::new();
    let script_path = migration_script(&ctx);
    let original = fs::read_to_string(&script_path).unwrap();
    let split_dir = ctx.output_dir.join("split");
    fs::create_dir(&split_dir).unwrap();

    split_script(SplitOptions {
        script_path,
        output_dir: split_dir.clone(),
    })
    .unwrap();
    let rebuilt = reconstruct_script(&split_dir).unwrap();

    assert_eq!(statements(&rebuilt), statements(&original));
}

#[test]
fn test_split_of_reconstruction_is_identical() {
    let ctx = TestContext::new();
    let script_path = migration_script(&ctx);
    let first_dir = ctx.output_dir.join("first");
    let second_dir = ctx.output_dir.join("second");
    fs::create_dir(&first_dir).unwrap();
    fs::create_dir(&second_dir).unwrap();

    let first = split_script(SplitOptions {
        script_path,
        output_dir: first_dir.clone(),
    })
    .unwrap();

    let rebuilt_path = ctx.output_dir.join("rebuilt.sql");
    fs::write(&rebuilt_path, reconstruct_script(&first_dir).unwrap()).unwrap();
    let second = split_script(SplitOptions {
        script_path: rebuilt_path,
        output_dir: second_dir.clone(),
    })
    .unwrap();

    assert_eq!(second, first);
    for entry in &first.execution_order {
        assert_eq!(
            fs::read_to_string(second_dir.join(&entry.segment_file)).unwrap(),
            fs::read_to_string(first_dir.join(&entry.segment_file)).unwrap()
        );
    }
}

#[test]
fn test_split_overwrites_previous_output() {
    let ctx = TestContext::new();
    let script_path = migration_script(&ctx);
    let split_dir = ctx.output_dir.join("split");
    fs::create_dir(&split_dir).unwrap();
    fs::write(split_dir.join(MANIFEST_FILE), "stale").unwrap();
    fs::write(split_dir.join("001_Script_control_set_options.sql"), "stale").unwrap();

    split_script(SplitOptions {
        script_path,
        output_dir: split_dir.clone(),
    })
    .unwrap();

    assert!(Manifest::read(&split_dir).is_ok());
    let first_segment =
        fs::read_to_string(split_dir.join("001_Script_control_set_options.sql")).unwrap();
    assert!(first_segment.starts_with("-- ====="));
    assert!(first_segment.contains("SET XACT_ABORT ON;\nGO\n"));
}

#[test]
fn test_split_into_missing_directory_fails() {
    let ctx = TestContext::new();
    let script_path = migration_script(&ctx);
    let result = split_script(SplitOptions {
        script_path,
        output_dir: ctx.output_dir.join("missing"),
    });
    assert!(result.is_err());
}

#[test]
fn test_reconstruct_without_manifest_fails() {
    let ctx = TestContext::new();
    assert!(reconstruct_script(&ctx.output_dir).is_err());
}
