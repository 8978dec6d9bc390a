//! DINA Command-Line Client
//!
//! Lists remote JSON:API collections through the same filter, paging and
//! sorting machinery as the list pages, and compiles filter files to RSQL.

mod commands;
mod formatter;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dina_client::ClientConfig;
use formatter::OutputFormat;

/// DINA Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "dina")]
#[command(version, about = "DINA Command-Line Client")]
pub struct Args {
    /// API base URL
    #[arg(long, default_value = dina_client::config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Output format
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    /// File that remembers list filters, page sizes and sorts
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one page of a list
    List(ListArgs),
    /// Compile a filter to RSQL without fetching anything
    Rsql(FilterArgs),
}

/// Options that build a filter.
#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    /// Condition `attr=value`; also `!=`, `>=` (from) and `<=` (until).
    /// An empty value matches blank fields.
    #[arg(long = "where", value_name = "COND")]
    pub conditions: Vec<String>,

    /// Match values exactly instead of partially
    #[arg(long)]
    pub exact: bool,

    /// Join conditions with OR instead of AND
    #[arg(long)]
    pub any: bool,

    /// Attributes whose values may be `low-high` ranges
    #[arg(long = "range", value_name = "ATTR")]
    pub range_attributes: Vec<String>,

    /// Attributes whose values may be comma-separated lists
    #[arg(long = "list", value_name = "ATTR")]
    pub list_attributes: Vec<String>,

    /// JSON filter model, optionally with attribute definitions
    #[arg(long, value_name = "FILE")]
    pub filter_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// API path of the list, e.g. agent-api/person
    pub path: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Sort parameter, e.g. `name,-createdOn`
    #[arg(long)]
    pub sort: Option<String>,

    /// One-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Relationships to include
    #[arg(long)]
    pub include: Option<String>,

    /// Key the list's state is remembered under
    #[arg(long)]
    pub list_id: Option<String>,
}

impl From<&Args> for ClientConfig {
    fn from(args: &Args) -> Self {
        ClientConfig::new(&args.base_url).with_timeout(Duration::from_secs(args.timeout))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dina_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    let output = match &args.command {
        Command::List(list) => {
            let config = ClientConfig::from(&args);
            commands::list(&config, list, args.state_file.as_deref(), &*formatter).await?
        }
        Command::Rsql(filter) => commands::rsql(filter, &*formatter)?,
    };

    println!("{}", output);
    Ok(())
}
