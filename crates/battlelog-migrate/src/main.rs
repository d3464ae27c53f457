//! Battlelog Migrate - legacy migration and bulk import tool

use anyhow::{Context, Result};
use battlelog_common::logging::{init_logging, LogConfig, LogLevel};
use battlelog_common::types::RecordKind;
use battlelog_migrate::config::MigrateConfig;
use battlelog_migrate::db::{self, PgRecordStore, RecordStore};
use battlelog_migrate::import::{BatchImporter, ImportOptions, PayloadFormat, TimestampIdGenerator};
use battlelog_migrate::migration::{DataSource, LocalRecords, MigrationOptions, Migrator};
use battlelog_migrate::progress::TracingProgress;
use battlelog_migrate::rollback::{rollback, RollbackTarget};
use battlelog_migrate::storage::{DocumentClient, S3ObjectStore};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "battlelog-migrate")]
#[command(author, version, about = "Battle log migration and bulk import tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate the three legacy documents into the database
    Migrate {
        /// Read legacy documents from this directory instead of the object store
        #[arg(long)]
        from_dir: Option<PathBuf>,

        /// Validate and count without writing
        #[arg(long)]
        dry_run: bool,

        /// Owner for personal decks and battle logs
        #[arg(long)]
        user_id: Option<String>,

        /// Records per progress update
        #[arg(long)]
        batch_size: Option<usize>,

        /// Upload the report to the object store
        #[arg(long)]
        save_report: bool,
    },

    /// Import a JSON or CSV file of one record kind
    Import {
        /// deck-masters, my-decks or battle-logs
        #[arg(long)]
        kind: RecordKind,

        #[arg(long)]
        file: PathBuf,

        /// Payload format; inferred from the file extension when omitted
        #[arg(long)]
        format: Option<PayloadFormat>,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        user_id: Option<String>,
    },

    /// Delete every row of one or more tables
    Rollback {
        /// Roll back every table
        #[arg(long, conflicts_with = "tables")]
        all: bool,

        /// Table to roll back; repeatable
        #[arg(long = "table", value_name = "KIND", required_unless_present = "all")]
        tables: Vec<RecordKind>,
    },

    /// Upload legacy documents from a directory to the object store
    Seed {
        #[arg(long)]
        from_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig {
        level: log_level,
        log_file_prefix: "battlelog-migrate".to_string(),
        ..LogConfig::default()
    }
    .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = MigrateConfig::load()?;

    match cli.command {
        Command::Migrate {
            from_dir,
            dry_run,
            user_id,
            batch_size,
            save_report,
        } => {
            let options = MigrationOptions {
                dry_run,
                user_id,
                batch_size: batch_size.unwrap_or(config.engine.batch_size),
            };
            migrate(&config, from_dir.as_deref(), options, save_report).await?;
        },
        Command::Import {
            kind,
            file,
            format,
            dry_run,
            user_id,
        } => {
            let format = match format {
                Some(format) => format,
                None => PayloadFormat::from_path(&file)?,
            };
            import(&config, kind, &file, format, ImportOptions { dry_run, user_id }).await?;
        },
        Command::Rollback { all, tables } => {
            let target = if all {
                RollbackTarget::All
            } else {
                RollbackTarget::Tables(tables)
            };
            let store = connect(&config).await?;
            let result = rollback(store.as_ref(), target).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                anyhow::bail!(result.error.unwrap_or_else(|| "Rollback failed".to_string()));
            }
        },
        Command::Seed { from_dir } => seed(&config, &from_dir).await?,
    }

    Ok(())
}

async fn connect(config: &MigrateConfig) -> Result<Arc<dyn RecordStore>> {
    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    db::run_migrations(&pool).await?;
    Ok(Arc::new(PgRecordStore::new(pool)))
}

fn document_client(config: &MigrateConfig) -> DocumentClient {
    let store = S3ObjectStore::new(config.storage.clone());
    DocumentClient::new(Arc::new(store), config.engine.retry_policy())
}

fn importer(config: &MigrateConfig, store: Arc<dyn RecordStore>) -> BatchImporter {
    BatchImporter::new(store, Arc::new(TimestampIdGenerator::new()))
        .with_lookup_chunk_size(config.engine.lookup_chunk_size)
}

async fn migrate(
    config: &MigrateConfig,
    from_dir: Option<&Path>,
    options: MigrationOptions,
    save_report: bool,
) -> Result<()> {
    let client = document_client(config);
    let source = match from_dir {
        Some(dir) => DataSource::Local(LocalRecords::from_dir(dir, &config.documents).await?),
        None => DataSource::Remote {
            client: client.clone(),
            names: config.documents.clone(),
        },
    };

    let store = connect(config).await?;
    let migrator = Migrator::new(importer(config, store));
    let report = migrator.run(source, &options, &TracingProgress).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if save_report {
        let name = Migrator::save_report(&client, &report).await?;
        info!("Report saved as {}", name);
    }

    Ok(())
}

async fn import(
    config: &MigrateConfig,
    kind: RecordKind,
    file: &Path,
    format: PayloadFormat,
    options: ImportOptions,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let store = connect(config).await?;
    let result = importer(config, store)
        .import_payload(kind, &text, format, &options)
        .await?;

    println!("{}", serde_json::to_string_pretty(&result.summary())?);
    Ok(())
}

async fn seed(config: &MigrateConfig, dir: &Path) -> Result<()> {
    let client = document_client(config);

    for kind in RecordKind::MIGRATION_ORDER {
        let name = config.documents.name(kind);
        let path = dir.join(name);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document: Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        client.write_json(name, &document).await?;
        info!("Seeded {} from {}", name, path.display());
    }

    Ok(())
}
