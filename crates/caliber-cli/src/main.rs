mod catalog;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "caliber-cli")]
#[command(about = "Caliber watch catalog command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Create products from a JSON file holding an array of admin payloads
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// List published products
    List {
        /// Restrict to these brand ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        brand: Vec<i64>,
        /// `price_asc`, `price_desc` or `newest`
        #[arg(long)]
        sort: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
    /// Create every reference entity named in the taxonomy file
    SeedTaxonomy {
        /// Taxonomy YAML file; defaults to `CALIBER_TAXONOMY_PATH`
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("caliber-cli: run with --help to see available commands");
        return Ok(());
    };

    let config = caliber_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = caliber_db::PoolConfig::from_app_config(&config);
    let pool = caliber_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Migrate => {
                let applied = caliber_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
            DbCommands::Ping => {
                caliber_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::SeedTaxonomy { path } => {
                let path = path.unwrap_or_else(|| config.taxonomy_path.clone());
                let taxonomy = caliber_core::load_taxonomy(&path)?;
                let processed = caliber_db::seed_taxonomy(&pool, &taxonomy).await?;
                println!("seeded {processed} reference name(s) from {}", path.display());
            }
        },
        Commands::Import { file } => catalog::run_import(&pool, &file).await?,
        Commands::List { brand, sort } => catalog::run_list(&pool, brand, sort.as_deref()).await?,
    }

    Ok(())
}
