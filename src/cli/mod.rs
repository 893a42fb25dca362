//! CLI module for Jarvis
//!
//! Provides command-line interface parsing for the jarvis-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jarvis - retrieval-augmented question answering
#[derive(Parser, Debug)]
#[command(
    name = "jarvis-server",
    version,
    about = "Jarvis - answers questions from your documents",
    long_about = "A retrieval-augmented question answering server.\n\n\
                  Documents are chunked, embedded and stored in Pinecone; questions are\n\
                  answered by a local Ollama model using only the retrieved chunks.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  jarvis-server                          # Start the server\n    \
                  jarvis-server ingest --data-dir ./docs # Index a folder of .txt/.pdf files\n    \
                  jarvis-server ask \"How many leaves?\"   # Ask one question\n    \
                  jarvis-server config --validate        # Check the resolved configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = crate::utils::toml_config::DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Override the configured host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ingest every .txt and .pdf file in a folder
    ///
    /// When the folder holds no usable documents a small sample handbook is
    /// ingested instead.
    Ingest {
        /// Folder to scan (defaults to rag.data_dir, usually ./data)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Ask one question and print the answer with its sources
    Ask {
        /// The question
        question: String,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
