use crate::prelude::*;
use clap::Parser;

mod error;
mod gate;
mod prelude;
mod probe;
mod scan;
mod settings;
mod source;
mod toc;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Synthesize a navigable table of contents from rendered HTML documents"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Config file (default: ./tocsmith.toml when present)
    #[clap(long, env = "TOCSMITH_CONFIG", global = true)]
    config: Option<String>,

    /// Whether to display additional information.
    #[clap(long, env = "TOCSMITH_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Wait for a document to be ready and print its table of contents
    Toc(crate::toc::TocOptions),

    /// Print the classified candidate elements of a document
    Scan(crate::scan::ScanOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Toc(options) => crate::toc::run(options, app.global).await,
        SubCommands::Scan(options) => crate::scan::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
