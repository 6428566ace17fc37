use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ans_resolver::resolver::StrategyAttempt;
use ans_resolver::storage::{AgentStore, InMemoryAgentStore};
use ans_resolver::types::{AgentQuery, AgentRecord, AgentWithHealth};
use ans_resolver::{AgentNameService, Config, ResolutionError};

#[derive(Parser)]
#[command(name = "ans")]
#[command(about = "Resolve, discover and health-check agent:// names", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML or YAML configuration file; environment overrides still apply
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file of agent records used as the persistent store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single agent URI
    Resolve {
        uri: String,
        /// Serve from the resolution cache when possible
        #[arg(long)]
        cached: bool,
        /// Include the per-strategy trace
        #[arg(long)]
        trace: bool,
    },
    /// Resolve several URIs; output order matches input order
    Batch {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Query local, well-known and global sources
    Discover {
        #[arg(long = "capability")]
        capabilities: Vec<String>,
        #[arg(long)]
        organization: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        wellknown: bool,
        #[arg(long)]
        global: bool,
        /// Run health checks on the results
        #[arg(long)]
        health: bool,
        /// Zero means unbounded
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Resolve an agent and probe its endpoint
    Health { uri: String },
}

#[derive(Serialize)]
struct TracedResolution<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a AgentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ResolutionError>,
    attempts: &'a [StrategyAttempt],
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("ANS_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };
    let store: Arc<dyn AgentStore> = match &cli.store {
        Some(path) => Arc::new(InMemoryAgentStore::from_json_file(path)?),
        None => Arc::new(InMemoryAgentStore::new()),
    };
    let service = AgentNameService::new(config, store)?;

    match cli.command {
        Commands::Resolve { uri, cached, trace } => {
            if trace {
                let resolution = service.resolve_traced(&uri).await;
                print_json(&TracedResolution {
                    agent: resolution.result.as_ref().ok(),
                    error: resolution.result.as_ref().err(),
                    attempts: &resolution.attempts,
                })?;
            } else if cached {
                print_resolution(&service.resolve_cached(&uri).await)?;
            } else {
                print_resolution(&service.resolve(&uri).await)?;
            }
        }
        Commands::Batch { uris } => {
            let results: Vec<serde_json::Value> = service
                .resolve_batch(uris.as_slice())
                .await
                .iter()
                .map(resolution_value)
                .collect::<Result<_>>()?;
            print_json(&results)?;
        }
        Commands::Discover {
            capabilities,
            organization,
            search,
            wellknown,
            global,
            health,
            limit,
        } => {
            let query = AgentQuery {
                capabilities,
                organization,
                search,
                include_wellknown: wellknown,
                include_global: global,
                include_health: health.then_some(true),
                limit,
                ..AgentQuery::default()
            };
            print_json(&service.discover(&query).await)?;
        }
        Commands::Health { uri } => match service.resolve(&uri).await {
            Ok(agent) => {
                let health = service.check_agent_health(&agent).await;
                print_json(&AgentWithHealth { agent, health })?;
            }
            Err(e) => print_json(&e)?,
        },
    }

    Ok(())
}

fn resolution_value(result: &Result<AgentRecord, ResolutionError>) -> Result<serde_json::Value> {
    Ok(match result {
        Ok(record) => serde_json::to_value(record)?,
        Err(e) => serde_json::to_value(e)?,
    })
}

fn print_resolution(result: &Result<AgentRecord, ResolutionError>) -> Result<()> {
    print_json(&resolution_value(result)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
