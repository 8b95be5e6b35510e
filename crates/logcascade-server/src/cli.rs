use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logcascade")]
#[command(author, version, about = "Classify application logs with a regex, embedding and LLM cascade")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP upload server
    Serve {
        /// Server settings file (TOML or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cascade configuration file
        #[arg(long)]
        cascade: Option<PathBuf>,

        /// Listen address
        #[arg(short, long)]
        listen: Option<String>,

        /// Listen port
        #[arg(short = 'P', long)]
        port: Option<u16>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Classify a CSV file locally
    Classify {
        /// Input CSV with source and log_message columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cascade configuration file
        #[arg(short, long, default_value = "cascade.yaml")]
        config: PathBuf,

        /// Add a decided_by column naming the strategy behind each label
        #[arg(long)]
        explain: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Send a CSV file to a running server
    Submit {
        /// Input CSV with source and log_message columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Server base URL
        #[arg(short, long, env = "LOGCASCADE_URL", default_value = "http://127.0.0.1:8000")]
        url: String,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}
