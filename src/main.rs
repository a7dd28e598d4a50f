use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use gearset_tracker::config::TrackerConfig;
use gearset_tracker::db::Database;
use gearset_tracker::inventory::{MemoryCatalog, MemoryInventory};
use gearset_tracker::models::{GearsetDefinition, PlayerId};
use gearset_tracker::resolver::gearset_progress;
use gearset_tracker::{api, render, Tracker};

#[derive(Parser)]
#[command(name = "gstrack")]
#[command(about = "Track gearset prerequisites against live inventory")]
struct Cli {
    /// Database file (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API for the game-client bridge and UI
    Serve {
        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,

        /// Item and materia catalog (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Import a gearset definition file for a player
    Import {
        file: PathBuf,

        #[arg(long)]
        player: PlayerId,
    },
    /// List a player's gearsets with completion
    List {
        #[arg(long)]
        player: PlayerId,
    },
    /// Show the prerequisite trees of one gearset
    Show {
        id: Uuid,

        #[arg(long)]
        player: PlayerId,
    },
    /// Delete a stored gearset
    Remove {
        id: Uuid,

        #[arg(long)]
        player: PlayerId,
    },
    /// List known players, most recent login first
    Players,
}

/// Initialize tracing with output to stderr
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "gearset_tracker=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_db(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = TrackerConfig::load();
    let db = open_db(cli.db)?;

    match cli.command {
        Some(Commands::Serve { port, catalog }) => serve(config, db, port, catalog).await?,
        None => serve(config, db, None, None).await?,
        Some(Commands::Import { file, player }) => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let definition: GearsetDefinition =
                serde_json::from_str(&content).context("Failed to parse gearset definition")?;

            let tracker = Tracker::builder(config).database(db).start();
            tracker.login(player)?.wait().await?;
            let id = tracker.import_gearset(definition)?.wait().await?;
            tracker.shutdown().await;
            println!("{}", id);
        }
        Some(Commands::List { player }) => {
            for gearset in db.load_gearsets(player)? {
                let progress = gearset_progress(&gearset);
                println!(
                    "{}  {:<24} {:<4} {:>3}/{:<3} {:>3.0}% {}",
                    gearset.id,
                    gearset.name,
                    gearset.job,
                    progress.progress.collected,
                    progress.progress.total,
                    progress.progress.fraction() * 100.0,
                    if gearset.is_active { "" } else { "(inactive)" }
                );
            }
        }
        Some(Commands::Show { id, player }) => {
            let gearset = db
                .get_gearset(player, id)?
                .ok_or_else(|| anyhow::anyhow!("Gearset not found"))?;
            println!("{} ({})", gearset.name, gearset.job);
            for piece in &gearset.pieces {
                print!("{}", render::render_gearpiece(piece));
            }
        }
        Some(Commands::Remove { id, player }) => {
            if !db.delete_gearset(player, id)? {
                anyhow::bail!("Gearset not found");
            }
            println!("Removed {}", id);
        }
        Some(Commands::Players) => {
            for player in db.list_players()? {
                println!("{}", player);
            }
        }
    }

    Ok(())
}

async fn serve(
    config: TrackerConfig,
    db: Database,
    port: Option<u16>,
    catalog: Option<PathBuf>,
) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.port);
    let inventory = Arc::new(MemoryInventory::new());

    let mut builder = Tracker::builder(config.clone())
        .inventory(inventory.clone())
        .database(db);
    if let Some(path) = catalog.or_else(|| config.catalog_path.clone()) {
        builder = builder.catalog(Arc::new(MemoryCatalog::load(&path)?));
    }
    let tracker = builder.start();

    let app = api::create_router(tracker.clone(), inventory);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Gearset tracker listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracker.shutdown().await;
    Ok(())
}
