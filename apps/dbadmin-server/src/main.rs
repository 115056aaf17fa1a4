use admin_db::DbHandle;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use entity_admin::contract::{EntityAdminApi, Uploads, CREATE_FLAG};
use entity_admin::EntityAdmin;
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// DbAdmin Server - schema-driven admin over a relational store
#[derive(Parser)]
#[command(name = "dbadmin-server")]
#[command(about = "DbAdmin Server - schema-driven admin over a relational store")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database DSN (overrides config)
    #[arg(long)]
    dsn: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check configuration, schemas and the database connection
    Check,
    /// List schemas grouped by namespace, with row counts
    Schemas {
        /// Keep only schemas whose name contains this text
        #[arg(short, long)]
        query: Option<String>,
    },
    /// List records; params are URL query pairs such as `filter=age:gt:28`
    List { class: String, params: Vec<String> },
    /// Show one record by primary key
    Show { class: String, id: String },
    /// Create or edit a record from form pairs such as `name=Alice`
    Save {
        class: String,
        /// Submit the create form (an existing key is then rejected)
        #[arg(long)]
        create: bool,
        /// Binary field contents read from a file
        #[arg(long = "upload", value_name = "FIELD=PATH")]
        uploads: Vec<String>,
        fields: Vec<String>,
    },
    /// Delete one or more records by primary key
    Delete {
        class: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        dsn: cli.dsn.clone(),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("DbAdmin Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let registry = Arc::new(config.schema_registry()?);
    let db_config = config.resolved_database()?;
    let db = DbHandle::from_config(&db_config).await.with_context(|| {
        format!(
            "Failed to connect to {}",
            admin_db::config::redact_credentials(&db_config.dsn)
        )
    })?;
    tracing::info!(engine = ?db.engine(), dsn = %db.dsn(), "Connected to database");

    let admin = EntityAdmin::init(&config.admin, Arc::clone(&registry), &db);
    let client = admin.client();

    let result = run_command(
        cli.command.unwrap_or(Commands::Check),
        client.as_ref(),
        registry.len(),
    )
    .await;
    db.close().await;
    result
}

async fn run_command(command: Commands, client: &dyn EntityAdminApi, schemas: usize) -> Result<()> {
    match command {
        Commands::Check => {
            // Counting every table proves each declared schema maps onto the store.
            let groups = client.index(None).await?;
            let tables: usize = groups.iter().map(|g| g.entries.len()).sum();
            tracing::info!(schemas, tables, "Configuration is valid");
            println!("Configuration check passed ({schemas} schemas)");
            Ok(())
        }
        Commands::Schemas { query } => print_json(&client.index(query.as_deref()).await?),
        Commands::List { class, params } => {
            print_json(&client.list(&class, &parse_pairs(&params)).await?)
        }
        Commands::Show { class, id } => print_json(&client.get(&class, &id).await?),
        Commands::Save {
            class,
            create,
            uploads,
            fields,
        } => {
            let mut form = parse_pairs(&fields);
            form.push((CREATE_FLAG.to_string(), create.to_string()));
            let uploads = read_uploads(&uploads)?;
            print_json(&client.save(&class, &form, &uploads).await?)
        }
        Commands::Delete { class, ids } => {
            if let [id] = ids.as_slice() {
                let pk = client.delete(&class, id).await?;
                return print_json(&serde_json::json!({ "deleted": pk }));
            }
            let report = client.delete_many(&class, &ids).await?;
            print_json(&report)?;
            if report.failures.is_empty() {
                Ok(())
            } else {
                Err(anyhow!(
                    "{} of {} deletions failed",
                    report.failures.len(),
                    ids.len()
                ))
            }
        }
    }
}

/// Decode `key=value` arguments with URL query-string rules.
fn parse_pairs(args: &[String]) -> Vec<(String, String)> {
    let joined = args
        .iter()
        .map(|a| a.trim_start_matches('?'))
        .collect::<Vec<_>>()
        .join("&");
    url::form_urlencoded::parse(joined.as_bytes())
        .into_owned()
        .collect()
}

fn read_uploads(specs: &[String]) -> Result<Uploads> {
    specs
        .iter()
        .map(|spec| {
            let (field, path) = spec
                .split_once('=')
                .ok_or_else(|| anyhow!("--upload expects FIELD=PATH, got '{spec}'"))?;
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {path}"))?;
            Ok((field.to_string(), bytes))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
