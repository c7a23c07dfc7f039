use crate::ledger::{run_list, run_preview, run_submit, ItemSourceArgs, ListArgs, SubmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use cost_ledger::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Items Cost Ledger",
    about = "Run the items cost ledger service or talk to one from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Show the unsaved preview statistics for a set of items
    Preview(ItemSourceArgs),
    /// Save items to a running ledger and print batch and global statistics
    Submit(SubmitArgs),
    /// List the most recently saved items
    List(ListArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Preview(args) => run_preview(args),
        Command::Submit(args) => run_submit(args).await,
        Command::List(args) => run_list(args).await,
    }
}
