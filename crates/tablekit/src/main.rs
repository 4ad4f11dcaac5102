use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tablekit::storage::DynamoDbStore;
use tablekit::{Config, Item, ModelFile, Repository, WhereClause};
use tablekit_core::keys::format_for_storage;

/// tablekit - Store several object types in one DynamoDB table
#[derive(Parser, Debug)]
#[command(name = "tablekit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Model file describing the table and the indexes of every type
    #[arg(long, short, global = true, default_value = "models.json", env = "TABLEKIT_MODELS")]
    models: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Target {
    /// Object type, as named in the model file
    #[arg(long, short = 't')]
    model: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored form of a record without touching the table
    Keys {
        #[command(flatten)]
        target: Target,
        /// Record as a JSON object
        record: String,
    },
    /// Get a record by its primary key fields
    Get {
        #[command(flatten)]
        target: Target,
        /// Primary key fields as a JSON object
        key: String,
    },
    /// Write a record
    Put {
        #[command(flatten)]
        target: Target,
        /// Record as a JSON object
        record: String,
    },
    /// Delete a record by its primary key fields
    Delete {
        #[command(flatten)]
        target: Target,
        /// Primary key fields as a JSON object
        key: String,
    },
    /// Query records by a partial set of fields
    Query {
        #[command(flatten)]
        target: Target,
        /// Supplied fields as a JSON object
        args: String,
        /// Query this index tag instead of resolving one
        #[arg(long)]
        index: Option<String>,
        /// Field the chosen index must sort by next
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        descending: bool,
        #[arg(long)]
        limit: Option<u32>,
        /// Cursor returned by a previous page
        #[arg(long)]
        cursor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablekit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let models = ModelFile::load(&cli.models)
        .with_context(|| format!("loading {}", cli.models.display()))?
        .with_table_name(&config.table_name);

    match cli.command {
        Command::Keys { target, record } => {
            let directory = models.directory(&target.model)?;
            print(&format_for_storage(&directory, &parse_object(&record)?)?)?;
        }
        Command::Get { target, key } => {
            let repository = connect(&models, &target.model, &config).await?;
            match repository.get(&parse_object(&key)?).await? {
                Some(record) => print(&record)?,
                None => bail!("{} not found", target.model),
            }
        }
        Command::Put { target, record } => {
            let repository = connect(&models, &target.model, &config).await?;
            repository.put(&parse_object(&record)?).await?;
            tracing::info!(model = %target.model, "Record written");
        }
        Command::Delete { target, key } => {
            let repository = connect(&models, &target.model, &config).await?;
            repository.delete(&parse_object(&key)?).await?;
            tracing::info!(model = %target.model, "Record deleted");
        }
        Command::Query {
            target,
            args,
            index,
            sort_by,
            descending,
            limit,
            cursor,
        } => {
            let repository = connect(&models, &target.model, &config).await?;
            let mut clause = WhereClause::new(parse_object(&args)?);
            clause.index = index;
            clause.sort_by = sort_by;
            clause.cursor = cursor;
            clause.limit = limit;
            if descending {
                clause = clause.descending();
            }

            let page = repository.query(&clause).await?;
            print(&serde_json::json!({ "items": page.items, "cursor": page.cursor }))?;
        }
    }

    Ok(())
}

/// Builds a DynamoDB-backed repository for one model.
async fn connect(models: &ModelFile, model: &str, config: &Config) -> Result<Repository<Item>> {
    let directory = models.directory(model)?;
    tracing::info!(
        table = %config.table_name,
        target = %config.target_display(),
        "Connecting"
    );
    let store = DynamoDbStore::from_config(config).await;
    Ok(Repository::new(Arc::new(store), directory).with_batch_config(config.batch_config()))
}

fn parse_object(raw: &str) -> Result<Item> {
    match serde_json::from_str::<Value>(raw).context("argument is not valid JSON")? {
        Value::Object(fields) => Ok(fields),
        _ => bail!("argument must be a JSON object"),
    }
}

fn print<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
