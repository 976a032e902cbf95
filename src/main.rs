mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Explicit `--config` path
    pub config_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
    };

    match dispatch(&ctx, cli.command) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{:#}", e));
            if let Some(run_error) = e.downcast_ref::<assignment::Error>() {
                ui::dim(run_error.category().advice());
            } else if let Some(api_error) = e.downcast_ref::<billing::Error>() {
                ui::dim(api_error.category().advice());
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(ctx: &Context, command: Command) -> Result<ExitCode> {
    match command {
        Command::Assign(args) => return commands::assign::run(ctx, args),
        Command::Users(cmd) => commands::users::run(ctx, cmd)?,
        Command::Watermark(cmd) => commands::watermark::run(ctx, cmd)?,
        Command::Config(cmd) => commands::config::run(ctx, cmd)?,
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "ccsync", &mut io::stdout());
        }
    }
    Ok(ExitCode::SUCCESS)
}
