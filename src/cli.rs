use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the storage directory from the configuration
    #[arg(short, long, global = true)]
    pub storage: Option<PathBuf>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a directory tree
    Index {
        /// Root directory to index
        root_path: PathBuf,

        /// Purge existing records under the root before scanning
        #[arg(short, long)]
        force: bool,

        /// Return right after the run is accepted
        #[arg(long)]
        no_wait: bool,
    },
    /// Search indexed files
    Search(SearchArgs),
    /// Show the indexing status
    Status,
    /// Show index statistics
    Stats,
    /// List groups of files with identical content
    Duplicates,
    /// Print the stored text excerpt of a file
    Content {
        file_path: String,
    },
    /// Remove a file's record from the index (the file itself is untouched)
    Remove {
        file_path: String,
    },
    /// Show recent searches
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Write the default configuration file
    InitConfig {
        #[arg(default_value = "config.toml")]
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Extensions to include (repeatable or comma separated)
    #[arg(short, long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Minimum size, e.g. 100, 10kb, 1.5mb
    #[arg(long)]
    pub min_size: Option<String>,

    /// Maximum size (inclusive)
    #[arg(long)]
    pub max_size: Option<String>,

    /// Modified on or after (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub after: Option<String>,

    /// Modified on or before (YYYY-MM-DD covers the whole day)
    #[arg(long)]
    pub before: Option<String>,

    /// Name fragments (repeatable)
    #[arg(short, long = "name")]
    pub names: Vec<String>,

    /// Content terms (repeatable)
    #[arg(short, long = "term")]
    pub terms: Vec<String>,

    /// Require every name fragment / term to match instead of any
    #[arg(long)]
    pub all: bool,

    #[arg(long)]
    pub case_sensitive: bool,

    #[arg(long)]
    pub owner: Option<String>,

    /// Only files whose content occurs more than once in the result set
    #[arg(long)]
    pub duplicates: bool,

    #[arg(short, long)]
    pub limit: Option<i64>,
}
