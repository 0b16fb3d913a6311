//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lexrag",
    version,
    about = "Retrieval-augmented legal Q&A with lawyer suggestion ranking",
    long_about = "Lexrag indexes a corpus of legal documents into a searchable vector index, \
                  answers questions by combining semantic retrieval with a hosted language \
                  model, and ranks matching lawyers for the detected practice area."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/lexrag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the vector index from the document corpus
    BuildIndex {
        /// Corpus directory (defaults to corpus.documents_dir from config)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Ask a legal question against the indexed corpus
    Ask {
        /// Question text
        question: String,

        /// Number of context chunks to retrieve (bounded by config)
        #[arg(short, long)]
        k: Option<usize>,

        /// JSON file of lawyer candidates to rank for the answer
        #[arg(long, value_name = "FILE")]
        professionals: Option<PathBuf>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index and configuration status
    Status,

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

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_parses_flags() {
        let cli = Cli::try_parse_from([
            "lexrag",
            "ask",
            "can my landlord evict me?",
            "--k",
            "5",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Ask {
                question, k, json, ..
            } => {
                assert_eq!(question, "can my landlord evict me?");
                assert_eq!(k, Some(5));
                assert!(json);
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }
}
