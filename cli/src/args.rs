use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ingest documents into a vector collection and search them.
#[derive(Parser, Debug)]
#[command(name = "docrag", version, about = "Document chunking and similarity search")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest files, or every supported file below a directory.
    Ingest {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Document id to use instead of the file name (single file only).
        #[arg(long)]
        doc_id: Option<String>,

        /// Replace documents that are already indexed.
        #[arg(long)]
        replace: bool,
    },
    /// Remove every chunk of a document.
    Remove {
        doc_id: String,
    },
    /// Search for chunks similar to a query.
    Search {
        query: String,

        /// Number of results (defaults to `search.default_results`).
        #[arg(short = 'n', long = "results")]
        n_results: Option<usize>,
    },
    /// Show per-document statistics.
    Stats,
    /// Delete every chunk and recreate the empty collection.
    Clear,
    /// Show collection information.
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["docrag", "search", "rust tokio", "-n", "3", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Search { query, n_results } => {
                assert_eq!(query, "rust tokio");
                assert_eq!(n_results, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "docrag",
            "--config",
            "custom.toml",
            "ingest",
            "a.txt",
            "docs/",
            "--replace",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Ingest {
                paths,
                doc_id,
                replace,
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("docs/")]);
                assert_eq!(doc_id, None);
                assert!(replace);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ingest_requires_paths() {
        assert!(Cli::try_parse_from(["docrag", "ingest"]).is_err());
    }
}
