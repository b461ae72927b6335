mod components;
mod config;
mod execute_cmd;
mod flow_cmd;
mod recover_cmd;
mod serve_cmd;
mod status_cmd;
#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use config::TccConfig;
use tcc_db::pool;

#[derive(Parser)]
#[command(name = "tcc", about = "TCC (Try-Confirm-Cancel) distributed transaction coordinator")]
struct Cli {
    /// Database URL (overrides TCC_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a tcc config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/tcc")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the tcc database (requires config file or env vars)
    DbInit,
    /// Flow definition management
    Flow {
        #[command(subcommand)]
        command: FlowCommands,
    },
    /// Run ExecuteTransaction for a flow to completion
    Execute {
        /// Flow id to execute
        flow_id: String,
        /// JSON parameters to pass into the flow's action templates
        #[arg(long)]
        params: Option<String>,
    },
    /// Show one transaction record, or list recent ones
    Status {
        /// Transaction id to show (omit to list recent transactions)
        tx_id: Option<String>,
    },
    /// List transactions left in a non-terminal phase
    Recover,
    /// Run the read-only admin HTTP API
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Component registry inspection
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    /// Store a flow definition (JSON or YAML) from a file
    Create {
        /// Path to the flow definition file
        file: String,
    },
    /// Show a flow's stored definition (or list all flow ids)
    Show {
        /// Flow id to show (omit to list all)
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ComponentCommands {
    /// List every registered component-type id
    List,
}

/// Execute the `tcc init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `tcc db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `tcc db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = TccConfig::resolve(cli_db_url)?;

    println!("Initializing tcc database...");

    pool::ensure_database_exists(&resolved.db_config).await?;

    let db_pool = pool::create_pool(&resolved.db_config).await?;

    let migrations_path = pool::default_migrations_path();
    pool::run_migrations(&db_pool, migrations_path).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("tcc db-init complete.");
    Ok(())
}

/// Execute the `tcc recover` command: list non-terminal transactions.
async fn cmd_recover(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = TccConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = recover_cmd::run_recover(&db_pool).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Flow { command } => {
            let resolved = TccConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = match command {
                FlowCommands::Create { file } => flow_cmd::run_create(&db_pool, &file).await,
                FlowCommands::Show { id } => flow_cmd::run_show(&db_pool, id.as_deref()).await,
            };
            db_pool.close().await;
            result?;
        }
        Commands::Execute { flow_id, params } => {
            let resolved = TccConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = execute_cmd::run_execute(&db_pool, &flow_id, params.as_deref()).await;
            db_pool.close().await;
            // A transaction that did not commit is not a process-level
            // failure -- only a command that could not even run (bad
            // flow, bad params, DB unreachable) is.
            result?;
        }
        Commands::Status { tx_id } => {
            let resolved = TccConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = status_cmd::run_status(&db_pool, tx_id.as_deref()).await;
            db_pool.close().await;
            result?;
        }
        Commands::Recover => {
            cmd_recover(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = TccConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            serve_cmd::run_serve(db_pool, &bind, port).await?;
        }
        Commands::Component { command } => match command {
            ComponentCommands::List => {
                let registry = components::build_registry(sqlx::PgPool::connect_lazy(
                    &TccConfig::resolve(cli.database_url.as_deref())?.db_config.database_url,
                )?);
                for id in registry.list_ids() {
                    println!("{id}");
                }
            }
        },
    }

    Ok(())
}
