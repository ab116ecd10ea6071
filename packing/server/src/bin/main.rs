use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::info;
use pack_engine::{compute_plan, PackSize, DEFAULT_PACK_SIZES};
use pack_server::provider::{CatalogProvider, JsonFileCatalog};
use pack_server::service::{PackingService, ServiceConfig};
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "packer")]
#[command(about = "Plans orders using the fewest surplus items, then the fewest packs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the line protocol over TCP
    Serve(ServeArgs),
    /// Plan a single order and print it as JSON
    Compute {
        /// Pack sizes, comma separated
        #[arg(short = 's', long, value_delimiter = ',', default_values_t = DEFAULT_PACK_SIZES.to_vec())]
        sizes: Vec<u64>,
        /// Number of items ordered
        quantity: u64,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(short = 'a', long, env = "PACKER_ADDRESS", default_value = "127.0.0.1:9999")]
    address: String,

    /// JSON file holding the pack sizes, created with defaults if missing
    #[arg(short = 'c', long, env = "PACKER_CATALOG", default_value = "packsizes.json")]
    catalog: PathBuf,

    /// Largest order quantity accepted
    #[arg(long, env = "PACKER_MAX_QUANTITY", default_value_t = ServiceConfig::DEFAULT_MAX_QUANTITY)]
    max_quantity: u64,

    /// Number of computed plans to keep
    #[arg(long, env = "PACKER_CACHE_CAPACITY", default_value_t = ServiceConfig::DEFAULT_CACHE_CAPACITY)]
    cache_capacity: u64,
}

impl ServeArgs {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_quantity: self.max_quantity,
            cache_capacity: self.cache_capacity,
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let catalog = JsonFileCatalog::new(&args.catalog);
    if !catalog.exists().await? {
        info!("seeding {} with default pack sizes", catalog.path().display());
        catalog
            .save(DEFAULT_PACK_SIZES.into_iter().map(PackSize::new).collect())
            .await
            .context("could not seed the catalog")?;
    }

    let service = PackingService::new(catalog, args.service_config());
    let listener = TcpListener::bind(&args.address)
        .await
        .with_context(|| format!("could not bind {}", args.address))?;
    info!(
        "listening on {}, orders up to {} items",
        listener.local_addr()?,
        service.config().max_quantity
    );

    pack_server::server::run(listener, service, signal::ctrl_c()).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // install global collector configured based on RUST_LOG env var.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Compute { sizes, quantity } => {
            let plan = compute_plan(&sizes, quantity)?;
            println!("{}", serde_json::to_string(&plan)?);
            Ok(())
        }
    }
}
