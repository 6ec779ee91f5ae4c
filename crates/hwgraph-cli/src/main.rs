use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Result, WrapErr};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use hwgraph_core::config::Backend;
use hwgraph_core::{
    AvailableFilter, Config, Detail, GraphStore, Inventory, MemoryStore, NoFilter, Predicate,
    RackLayout, Resource, SurrealStore, UnusedFilter,
};

#[derive(Parser)]
#[command(name = "hwgraph")]
#[command(about = "Composable hardware inventory kept as a property graph", long_about = None)]
struct Cli {
    /// Config file (defaults to ./hwgraph.toml, then ~/.config/hwgraph/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    None,
    Available,
    Unused,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema, the not-detected sentinel and the default group
    Init,
    /// Register a discovery batch (JSON or YAML array of device records)
    Register { file: PathBuf },
    /// List resources
    Resources {
        /// Only deviceID, type and status
        #[arg(long)]
        summary: bool,
        #[arg(long, value_enum, default_value = "none")]
        filter: FilterArg,
        /// Restrict available/unused filters to these groups
        #[arg(long = "group")]
        groups: Vec<String>,
    },
    /// Show one resource
    Resource {
        device_id: String,
        #[arg(long, value_enum, default_value = "none")]
        filter: FilterArg,
    },
    /// List nodes
    Nodes,
    /// Show one node
    Node { id: String },
    /// List CXL switches
    Switches,
    /// Show one CXL switch
    Switch { id: String },
    /// List resource groups
    Groups {
        #[arg(long)]
        with_resources: bool,
    },
    /// Show one resource group
    Group {
        id: String,
        #[arg(long)]
        with_resources: bool,
    },
    /// Create a resource group
    GroupCreate {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Rename or re-describe a resource group
    GroupUpdate {
        id: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete an empty resource group
    GroupDelete { id: String },
    /// Replace the groups a resource belongs to
    Assign {
        device_id: String,
        #[arg(required = true)]
        group_ids: Vec<String>,
    },
    /// Mark a resource available or unavailable
    Annotate {
        device_id: String,
        #[arg(long, action = clap::ArgAction::Set)]
        available: bool,
    },
    /// Show a rack
    Rack {
        id: String,
        #[arg(long)]
        summary: bool,
    },
    /// Register a rack layout (JSON or YAML)
    RackRegister { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().wrap_err("Failed to load config")?,
    };
    init_tracing(&config.logging.filter);

    let settings = config.inventory.settings();
    match config.store.backend {
        Backend::Surreal => {
            let path = config.store.db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
            }
            let store = SurrealStore::open(&path, &config.store.namespace, &config.store.database)
                .await
                .wrap_err_with(|| format!("Failed to open database at {}", path.display()))?;
            run(Inventory::new(store, settings), cli.command).await
        }
        Backend::Memory => {
            tracing::warn!("Using the in-memory store; nothing is kept after exit");
            let inventory = Inventory::new(MemoryStore::new(), settings);
            inventory.initialize().await?;
            run(inventory, cli.command).await
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run<S: GraphStore>(inventory: Inventory<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            inventory.initialize().await?;
            println!(
                "Initialized inventory (default group {})",
                inventory.settings().default_group.id
            );
        }
        Commands::Register { file } => {
            let batch: Vec<serde_json::Value> = read_document(&file)?;
            let registration = inventory.register_devices(batch).await?;
            print_json(&registration)?;
        }
        Commands::Resources {
            summary,
            filter,
            groups,
        } => {
            let detail = if summary { Detail::Summary } else { Detail::Full };
            let predicate = resource_filter(filter, groups);
            print_json(&inventory.list_resources(detail, predicate.as_ref()).await?)?;
        }
        Commands::Resource { device_id, filter } => {
            let predicate = resource_filter(filter, Vec::new());
            match inventory.find_resource(&device_id, predicate.as_ref()).await? {
                Some(resource) => print_json(&resource)?,
                None => bail!("Resource not found: {}", device_id),
            }
        }
        Commands::Nodes => print_json(&inventory.list_nodes().await?)?,
        Commands::Node { id } => match inventory.find_node(&id).await? {
            Some(node) => print_json(&node)?,
            None => bail!("Node not found: {}", id),
        },
        Commands::Switches => print_json(&inventory.list_switches().await?)?,
        Commands::Switch { id } => match inventory.find_switch(&id).await? {
            Some(switch) => print_json(&switch)?,
            None => bail!("CXL switch not found: {}", id),
        },
        Commands::Groups { with_resources } => {
            print_json(&inventory.list_groups(with_resources).await?)?
        }
        Commands::Group { id, with_resources } => {
            match inventory.find_group(&id, with_resources).await? {
                Some(group) => print_json(&group)?,
                None => bail!("Resource group not found: {}", id),
            }
        }
        Commands::GroupCreate { name, description } => {
            print_json(&inventory.create_group(&name, &description).await?)?
        }
        Commands::GroupUpdate {
            id,
            name,
            description,
        } => print_json(&inventory.update_group(&id, &name, &description).await?)?,
        Commands::GroupDelete { id } => {
            inventory.delete_group(&id).await?;
            println!("Deleted resource group {}", id);
        }
        Commands::Assign {
            device_id,
            group_ids,
        } => {
            let assigned = inventory.set_resource_groups(&device_id, &group_ids).await?;
            print_json(&serde_json::json!({ "resourceGroupIDs": assigned }))?;
        }
        Commands::Annotate {
            device_id,
            available,
        } => print_json(&inventory.set_annotation(&device_id, available).await?)?,
        Commands::Rack { id, summary } => {
            let detail = if summary { Detail::Summary } else { Detail::Full };
            match inventory.find_rack(&id, detail).await? {
                Some(rack) => print_json(&rack)?,
                None => bail!("Rack not found: {}", id),
            }
        }
        Commands::RackRegister { file } => {
            let layout: RackLayout = read_document(&file)?;
            print_json(&inventory.register_rack(layout).await?)?;
        }
    }
    Ok(())
}

fn resource_filter(filter: FilterArg, groups: Vec<String>) -> Box<dyn Predicate<Resource>> {
    match filter {
        FilterArg::None => Box::new(NoFilter),
        FilterArg::Available => Box::new(AvailableFilter::new(groups)),
        FilterArg::Unused => Box::new(UnusedFilter::new(groups)),
    }
}

/// Read a JSON or YAML document, chosen by file extension.
fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str(&content).wrap_err_with(|| format!("Invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content).wrap_err_with(|| format!("Invalid JSON in {}", path.display()))?
    };
    Ok(parsed)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
