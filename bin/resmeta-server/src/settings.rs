//! Layered configuration: optional TOML file, then `RESMETA__*` environment
//! variables, then command-line flags.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use resmeta_common::{Config, Environment, StoreBackend};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackendArg {
    Memory,
    Redb,
}

impl From<BackendArg> for StoreBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => Self::Memory,
            BackendArg::Redb => Self::Redb,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "resmeta-server")]
#[command(about = "Metadata service for datasets, layers and widgets")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Store backend
    #[arg(long, value_enum)]
    pub store_backend: Option<BackendArg>,

    /// Database file for the redb backend
    #[arg(long)]
    pub store_path: Option<PathBuf>,

    /// Hide internal error details from clients
    #[arg(long, default_value_t = false)]
    pub production: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.server.listen.clone_from(listen);
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if let Some(backend) = self.store_backend {
            config.store.backend = backend.into();
        }
        if let Some(path) = &self.store_path {
            config.store.path.clone_from(path);
        }
        if self.production {
            config.server.environment = Environment::Production;
        }
    }
}

pub fn load(args: &Args) -> Result<Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    let mut config: Config = builder
        .add_source(
            config::Environment::with_prefix("RESMETA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")?;

    args.apply(&mut config);
    Ok(config)
}
