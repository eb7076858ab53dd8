use crate::demo::{run_demo, run_password, run_validate, DemoArgs, PasswordArgs, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use snubo_onboarding::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Snubo Onboarding",
    about = "Run and demonstrate Snubo onboarding identity verification from the command line",
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
    /// Replay the verified and unverified onboarding scenarios against the simulated gateway
    Demo(DemoArgs),
    /// Score a password and list improvement suggestions
    Password(PasswordArgs),
    /// Run one of the form field validators
    Validate(ValidateArgs),
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
        Command::Demo(args) => run_demo(args).await,
        Command::Password(args) => run_password(args),
        Command::Validate(args) => run_validate(args),
    }
}
