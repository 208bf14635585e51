use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_sqlmigrate::source::{default_actor, SnapshotDiffSource};
use rust_sqlmigrate::{
    generate_migration, generate_migration_with, reconstruct_script, split_script,
    GenerateOptions, GeneratedMigration, SplitOptions,
};

#[derive(Parser)]
#[command(name = "rust-sqlmigrate")]
#[command(author, version, about = "Migration scripts from a git-versioned SQL Server schema tree")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a forward and rollback migration from schema changes
    Generate {
        /// Schema tree root
        #[arg(short, long)]
        schema: PathBuf,

        /// Directory the migration is written to (rollback goes to <dir>_reverse)
        #[arg(short, long)]
        output: PathBuf,

        /// Repository path (defaults to the current directory)
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Database name for script headers (defaults to the schema folder name)
        #[arg(short, long)]
        database: Option<String>,

        /// Author recorded in the migration name (defaults to git user.name)
        #[arg(short, long)]
        actor: Option<String>,

        /// Base git revision (defaults to HEAD)
        #[arg(long)]
        from: Option<String>,

        /// Target git revision (defaults to the working tree)
        #[arg(long)]
        to: Option<String>,

        /// Compare two snapshot directories instead of git revisions: OLD NEW
        #[arg(
            long,
            num_args = 2,
            value_names = ["OLD", "NEW"],
            conflicts_with_all = ["from", "to"]
        )]
        snapshots: Option<Vec<PathBuf>>,

        /// Change identifier or glob pattern to leave out (repeatable)
        #[arg(short, long = "exclude")]
        excludes: Vec<String>,

        /// Migration history table named in the rollback note
        #[arg(long)]
        history_table: Option<String>,
    },

    /// Split a migration script into per-object segments
    Split {
        /// Script to split
        #[arg(short, long)]
        script: PathBuf,

        /// Existing directory for the segments and manifest.json
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Reassemble a split directory into one script
    Reconstruct {
        /// Directory holding manifest.json and the segments
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            schema,
            output,
            repo,
            database,
            actor,
            from,
            to,
            snapshots,
            excludes,
            history_table,
        } => {
            let options = GenerateOptions {
                repo_path: repo,
                schema_path: schema,
                database,
                output_dir: output,
                actor,
                from_ref: from,
                to_ref: to,
                excludes,
                history_table,
            };

            let generated = match snapshots.as_deref() {
                Some([old, new]) => {
                    let source = SnapshotDiffSource::new(old, new);
                    let actor = options
                        .actor
                        .clone()
                        .unwrap_or_else(|| default_actor(&options.repo_path));
                    generate_migration_with(&source, &options, &actor, chrono::Utc::now())?
                }
                _ => generate_migration(options)?,
            };
            report_generated(generated.as_ref());
        }
        Commands::Split { script, output } => {
            let manifest = split_script(SplitOptions {
                script_path: script,
                output_dir: output.clone(),
            })?;
            println!(
                "Split into {} segment(s) in {}",
                manifest.total_segments,
                output.display()
            );
        }
        Commands::Reconstruct { input, output } => {
            let script = reconstruct_script(&input)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, script)?;
                    println!("Reconstructed script: {}", path.display());
                }
                None => print!("{script}"),
            }
        }
    }

    Ok(())
}

fn report_generated(generated: Option<&GeneratedMigration>) {
    match generated {
        Some(migration) => {
            println!("Migration: {}", migration.forward_path.display());
            println!("Rollback:  {}", migration.reverse_path.display());
            println!(
                "Changes: {} ({} tables, {} indexes, {} other)",
                migration.summary.total(),
                migration.summary.tables,
                migration.summary.indexes,
                migration.summary.other
            );
            if migration.excluded > 0 {
                println!("Excluded: {}", migration.excluded);
            }
        }
        None => println!("No schema changes found."),
    }
}
