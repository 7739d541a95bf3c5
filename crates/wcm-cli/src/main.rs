//! WCM CLI: file-backed waste-collection store
//!
//! Commands: init, list, show, export, import, validate, stats, tour create, tour zone

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wcm_core::entity::DirectWrite;
use wcm_core::notification::Notification;
use wcm_core::point::CollectionPoint;
use wcm_core::report::Report;
use wcm_core::staff::StaffMember;
use wcm_core::tour::{Tour, TourRequest};
use wcm_core::vehicle::Vehicle;
use wcm_store::{infer_schema_name, Repository, Store, StoreConfig};

#[derive(Parser)]
#[command(name = "wcm")]
#[command(version)]
#[command(about = "File-backed store and tour scheduler for waste collection")]
struct Cli {
    /// Data directory holding one YAML document per collection
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to `wcm.toml` in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and install the default schemas
    Init,
    /// Print every entity of a collection as JSON
    #[command(alias = "ls")]
    List { collection: String },
    /// Print one entity as JSON
    Show { collection: String, id: u32 },
    /// Print a collection as a YAML document
    Export { collection: String },
    /// Merge a YAML document into a collection
    Import { collection: String, file: PathBuf },
    /// Check a stored collection against its schema
    Validate { collection: String },
    /// Collection point statistics
    Stats,
    /// Tour scheduling
    Tour {
        #[command(subcommand)]
        command: TourCommands,
    },
}

#[derive(Subcommand)]
enum TourCommands {
    /// Schedule a new tour
    Create {
        #[arg(long)]
        employee: u32,
        #[arg(long)]
        vehicle: u32,
        /// Comma-separated collection point ids, in visiting order
        #[arg(long, value_delimiter = ',', required = true)]
        points: Vec<u32>,
        /// Planned date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Start time, HH:mm
        #[arg(long)]
        start: Option<String>,
        /// End time, HH:mm
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
    },
    /// Collection days and start times for a zone
    Zone { zone: String },
}

/// Per-collection operations dispatched on the entity type.
enum Action {
    List,
    Show(u32),
    Export,
    Import(String),
}

enum Output {
    Json(serde_json::Value),
    Text(String),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => {
            let data_dir = cli.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"));
            StoreConfig::discover(&data_dir)?
        }
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");
    Ok(config)
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(value).context("failed to encode JSON output")
}

fn run_action<T: DirectWrite>(
    store: &Store,
    repo: &Repository<T>,
    action: Action,
) -> anyhow::Result<Output> {
    match action {
        Action::List => Ok(Output::Json(to_json(&repo.get_all()?)?)),
        Action::Show(id) => match repo.get_by_id(id)? {
            Some(entity) => Ok(Output::Json(to_json(&entity)?)),
            None => bail!("{} entry with id {id} not found", repo.collection()),
        },
        Action::Export => Ok(Output::Text(
            store.documents().export::<T>(repo.collection())?,
        )),
        Action::Import(text) => Ok(Output::Json(to_json(&repo.import_document(&text)?)?)),
    }
}

/// Tours are read and imported through the scheduler so imports pass the
/// scheduling rules.
fn run_tour_action(store: &Store, collection: &str, action: Action) -> anyhow::Result<Output> {
    let tours = store.tours_in(collection);
    match action {
        Action::List => Ok(Output::Json(to_json(&tours.get_all()?)?)),
        Action::Show(id) => match tours.get_by_id(id)? {
            Some(tour) => Ok(Output::Json(to_json(&tour)?)),
            None => bail!("{collection} entry with id {id} not found"),
        },
        Action::Export => Ok(Output::Text(store.documents().export::<Tour>(collection)?)),
        Action::Import(text) => Ok(Output::Json(to_json(&tours.import_document(&text)?)?)),
    }
}

fn for_collection(store: &Store, collection: &str, action: Action) -> anyhow::Result<Output> {
    let schema = infer_schema_name(collection)?;
    match schema {
        "vehicles" => run_action(store, &store.repository_in::<Vehicle>(collection), action),
        "tours" => run_tour_action(store, collection, action),
        "collection_points" => run_action(
            store,
            &store.repository_in::<CollectionPoint>(collection),
            action,
        ),
        "notifications" => run_action(
            store,
            &store.repository_in::<Notification>(collection),
            action,
        ),
        "reports" => run_action(store, &store.repository_in::<Report>(collection), action),
        "employees" | "admins" | "supervisors" | "technicians" | "users" => run_action(
            store,
            &store.repository_in::<StaffMember>(collection),
            action,
        ),
        other => Err(anyhow!("no entity type for schema '{other}'")),
    }
}

fn print(output: Output) -> anyhow::Result<()> {
    match output {
        Output::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Output::Text(text) => print!("{text}"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = Store::open(config);

    match cli.command {
        Commands::Init => {
            let written = store.init().context("failed to initialize data directory")?;
            println!(
                "Initialized WCM store at {} ({written} schema(s) installed)",
                store.config().data_dir.display()
            );
        }
        Commands::List { collection } => print(for_collection(&store, &collection, Action::List)?)?,
        Commands::Show { collection, id } => {
            print(for_collection(&store, &collection, Action::Show(id))?)?;
        }
        Commands::Export { collection } => {
            print(for_collection(&store, &collection, Action::Export)?)?;
        }
        Commands::Import { collection, file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            print(for_collection(&store, &collection, Action::Import(text))?)?;
        }
        Commands::Validate { collection } => {
            let count = store
                .documents()
                .validate_stored(&collection)
                .with_context(|| format!("{collection} is not valid"))?;
            print(Output::Json(serde_json::json!({
                "collection": collection,
                "entities": count,
                "valid": true,
            })))?;
        }
        Commands::Stats => print(Output::Json(to_json(&store.points().statistics()?)?))?,
        Commands::Tour {
            command:
                TourCommands::Create {
                    employee,
                    vehicle,
                    points,
                    date,
                    start,
                    end,
                    distance,
                },
        } => {
            let tour = store.tours().create(TourRequest {
                planned_date: date,
                status: None,
                employee_id: Some(employee),
                vehicle_id: Some(vehicle),
                point_ids: points,
                start_time: start,
                end_time: end,
                distance_km: distance,
            })?;
            print(Output::Json(to_json(&tour)?))?;
        }
        Commands::Tour {
            command: TourCommands::Zone { zone },
        } => print(Output::Json(to_json(&store.tours().schedules_by_zone(&zone)?)?))?,
    }
    Ok(())
}
