// src/cli.rs

//! CLI definitions for the deckhand agent
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(version)]
#[command(about = "On-host deployment agent", long_about = None)]
pub struct Cli {
    /// Path to the agent configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the agent and serve the controller-facing endpoints
    Serve,

    /// Register this node with a master server
    Register {
        /// The url to the master server
        url: String,

        /// The registration token of the master server to add new nodes
        token: String,

        /// The communication url of this node, as the master should use it
        #[arg(short = 'u', long = "node-url")]
        node_url: Option<String>,

        /// The name of this node as populated to the master
        #[arg(short = 'n', long)]
        name: Option<String>,
    },

    /// Forget the stored master registration
    Unregister,

    /// Print this node's identity and aggregated state
    Info,
}
