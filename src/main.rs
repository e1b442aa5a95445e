mod common;
mod reel;
mod ui;

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::reel::cli::ReelCommands;
use crate::reel::error::ReelError;
use crate::ui::prelude::*;

/// Assemble narrated stock-footage videos from a script
#[derive(Parser, Debug)]
#[command(name = "scriptreel", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Output format for events
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    /// Disable colored text output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: ReelCommands,
}

/// Exit status for a terminal error
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ReelError>() {
        Some(
            ReelError::MissingRequiredInput { .. }
            | ReelError::InvalidInput { .. }
            | ReelError::OutputExists { .. },
        ) => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    ui::init(cli.output, color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) =
        reel::commands::handle_reel_command(cli.command, cli.config.as_deref(), cli.debug).await
    {
        emit(Level::Error, "reel.error", &format!("{err:#}"), None);
        std::process::exit(exit_code(&err));
    }
}
