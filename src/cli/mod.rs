//! CLI module for LawDecoder.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// LawDecoder - grounded answers to legal questions
///
/// Retrieves the most relevant statute sections for a question and asks a
/// language model to explain them in plain, practical terms.
#[derive(Parser, Debug)]
#[command(name = "lawdecoder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Ask a legal question and get a grounded answer
    Ask {
        /// The question to ask
        question: String,

        /// Number of statute sections to use as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show the statute sections most similar to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Embed parsed statute sections into the corpus vector file
    Index {
        /// Directory of parsed act JSON files (one array of sections per file)
        input: String,

        /// Output vector file (defaults to the configured corpus path)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check configuration, credentials, corpus and embedding model
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["lawdecoder", "-v", "ask", "my phone was stolen", "-k", "3"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Ask { question, top_k } => {
                assert_eq!(question, "my phone was stolen");
                assert_eq!(top_k, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
