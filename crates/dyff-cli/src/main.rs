//! sherpack-dyff - Preview Sherpack release upgrades as a structural diff

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::upgrade::UpgradeArgs;

#[derive(Parser)]
#[command(name = "sherpack-dyff")]
#[command(author = "Sherpack Contributors")]
#[command(version)]
#[command(about = "Preview Sherpack release upgrades as a structural manifest diff", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the changes an upgrade would apply to a release
    #[command(visible_alias = "u")]
    Upgrade(UpgradeArgs),
}

/// Log to stderr, `RUST_LOG` overrides the default level
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if cli.no_color {
        console::set_colors_enabled(false);
    }
    let color = console::colors_enabled();

    let result = match cli.command {
        Commands::Upgrade(args) => commands::upgrade::run(args, color).await,
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}
