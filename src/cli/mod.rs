pub mod commands;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::database;
use crate::models::{register_school_models, ModelRegistry};

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus API - multi-tenant school management backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve {
        #[arg(long, short, help = "Port to listen on (defaults to configuration)")]
        port: Option<u16>,
    },

    #[command(about = "Seed one or more customers from fixture files")]
    Seed {
        #[arg(long = "tenant", short, required = true, help = "Customer slug to seed (repeatable)")]
        tenants: Vec<String>,

        #[arg(long, short, default_value = "fixtures", help = "Directory of <model>.json or <model>.yaml fixture files")]
        fixtures: PathBuf,
    },

    #[command(about = "List registered models and their scoping")]
    Models,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config().clone();

    match cli.command {
        Commands::Serve { port } => commands::serve::handle(config, port, output_format).await,
        Commands::Seed { tenants, fixtures } => {
            commands::seed::handle(config, tenants, fixtures, output_format).await
        }
        Commands::Models => commands::models::handle(config, output_format).await,
    }
}

/// Connect the configured store and register the school models on it.
pub async fn build_registry(config: &AppConfig) -> anyhow::Result<ModelRegistry> {
    let store = database::connect(&config.database).await?;
    let registry = ModelRegistry::new(Arc::clone(&store), config.tenancy.warn_unbound);
    register_school_models(&registry)?;
    Ok(registry)
}
