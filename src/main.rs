//! # Paper Context CLI (`pctx`)
//!
//! ## Usage
//!
//! ```bash
//! pctx --config ./config/pctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pctx init` | Write a default configuration file |
//! | `pctx chunk <file>` | Show detected headings and segments for one paper |
//! | `pctx ask "<question>"` | Route a question and build its prompt |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect how a paper is segmented
//! pctx chunk papers/attention.pdf
//!
//! # Lexical scoring over explicit papers
//! pctx ask "How many attention heads?" --doc papers/attention.pdf
//!
//! # Precomputed vector hits, falling back to discovery in a corpus
//! pctx ask "How many attention heads?" --doc papers/attention.pdf \
//!     --similarities hits.json --corpus ./papers
//!
//! # Send the prompt to Ollama
//! pctx ask "Summarize the results" --doc papers/attention.pdf --generate
//! ```

use clap::{Parser, Subcommand};
use paper_context::ask::{self, AskOptions, ForceRoute};
use paper_context::config::{self, DEFAULT_CONFIG_PATH};
use paper_context::inspect;
use paper_context::logging::{self, LogFormat};
use std::path::PathBuf;

/// Paper Context: retrieval preparation for questions about academic papers.
#[derive(Parser)]
#[command(
    name = "pctx",
    about = "Paper Context: section-aware retrieval and RAG routing for academic papers",
    version,
    long_about = "Paper Context splits papers into section-aware segments, scores them \
    against a question, decides whether retrieved context is good enough to use, and \
    assembles a bounded context block and prompt."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// A missing file at the default location means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file to the `--config` path.
    ///
    /// Refuses to overwrite an existing file.
    Init,

    /// Show how a paper is split into segments.
    Chunk {
        /// Paper to chunk (.pdf, .docx, .txt, .md).
        file: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Route a question and build the prompt for it.
    ///
    /// Scores segments of the given papers against the question, decides
    /// between a RAG and a direct answer, and prints the context block and
    /// prompt.
    Ask {
        /// The question.
        query: String,

        /// Paper to search (repeatable).
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,

        /// Directory to discover more papers in when vector search comes up short.
        ///
        /// Defaults to `[corpus].root`.
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// JSON file of precomputed similarity hits.
        #[arg(long)]
        similarities: Option<PathBuf>,

        /// JSON file of previous conversation turns.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Override the routing decision.
        #[arg(long, value_enum)]
        force: Option<ForceRoute>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Send the prompt to the configured generator.
        #[arg(long)]
        generate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_format)?;

    // Commands that don't require config
    if let Commands::Init = cli.command {
        config::write_default_config(&cli.config)?;
        println!("Wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Chunk { file, json } => {
            inspect::run_chunk(&cfg, &file, json)?;
        }
        Commands::Ask {
            query,
            docs,
            corpus,
            similarities,
            history,
            force,
            json,
            generate,
        } => {
            let opts = AskOptions {
                query,
                docs,
                corpus,
                similarities,
                history,
                force,
            };
            ask::run_ask(&cfg, opts, json, generate).await?;
        }
    }

    Ok(())
}
