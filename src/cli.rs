use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::ReviewsSort;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Catalog API base URL (overrides CATALOG_API_BASE_URL).
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a saved JSON payload without touching the network.
    Convert(ConvertArgs),
    /// Fetch and convert one work.
    Work(IdArgs),
    /// Fetch and convert one author.
    Author(IdArgs),
    /// Fetch and convert one edition.
    Edition(IdArgs),
    /// Fetch works similar to a given work.
    Analogs(IdArgs),
    /// Page through the reviews of a work.
    Reviews(ReviewsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayloadKind {
    Work,
    Author,
    Edition,
    Reviews,
    Previews,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Payload shape of the input file.
    #[arg(long, value_enum)]
    pub kind: PayloadKind,

    /// JSON file to read (`-` for stdin).
    #[arg(long)]
    pub input: String,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    #[arg(long)]
    pub id: u64,
}

#[derive(Debug, Args)]
pub struct ReviewsArgs {
    #[arg(long)]
    pub work_id: u64,

    /// Review ordering.
    #[arg(long, value_enum, default_value_t = ReviewsSort::Rating)]
    pub sort: ReviewsSort,

    /// Stop after this many pages even if more are available.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Retries per failed page before giving up.
    #[arg(long, default_value_t = 2)]
    pub retries: u32,
}
