//! Command-line interface wiring for dei-explorer.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod clean;
pub mod load;
pub mod run;
pub mod score;
pub mod serve;
pub mod top;
pub mod train;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Drug effectiveness index explorer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Load(args) => load::run(args, settings).await,
            Commands::Clean => clean::run(settings).await,
            Commands::Train(args) => train::run(args, settings).await,
            Commands::Score => score::run(settings).await,
            Commands::Run(args) => run::run(args, settings).await,
            Commands::Top(args) => top::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a raw review CSV, skipping malformed rows.
    Load(load::Args),
    /// Normalise review text.
    Clean,
    /// Build the vocabulary, fit the sentiment model and publish it.
    Train(train::Args),
    /// Score reviews and aggregate by drug and condition.
    Score,
    /// Run load, clean, train and score in order.
    Run(run::Args),
    /// Print the highest-ranked drug/condition pairs.
    Top(top::Args),
    /// Serve the JSON API over the scored tables.
    Serve(serve::Args),
}
