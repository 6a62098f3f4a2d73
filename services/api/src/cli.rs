use crate::commands::{
    run_adjust, run_exclusions, run_headcount, run_site, run_sites, AdjustArgs, ExclusionCommand,
    HeadcountArgs, RunArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sla_incentives::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "SLA Incentives",
    about = "Score warehouse SLAs and compute operator bonuses per site",
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
    /// Score an event snapshot for one site and print the aggregate record
    Run(RunArgs),
    /// Manage identifiers excluded from scoring
    Exclusions {
        #[command(subcommand)]
        command: ExclusionCommand,
    },
    /// Set the monthly percentage-point adjustments for a site
    Adjust(AdjustArgs),
    /// Record the operator headcount for one day
    Headcount(HeadcountArgs),
    /// List the configured sites
    Sites,
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
        Command::Run(args) => run_site(args),
        Command::Exclusions { command } => run_exclusions(command),
        Command::Adjust(args) => run_adjust(args),
        Command::Headcount(args) => run_headcount(args),
        Command::Sites => run_sites(),
    }
}
