//! `dotfiles-sync` binary: parses arguments and dispatches to a command.
use anyhow::Result;
use clap::Parser;

use dotfiles_sync::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    if matches!(args.command, cli::Command::Version) {
        return commands::version::run();
    }

    logging::init_subscriber(args.verbose, args.command.name());
    let log = logging::Logger::new(args.command.name());

    match &args.command {
        cli::Command::List => commands::list::run(&args.global, &log),
        cli::Command::SyncIn(opts) => commands::sync_in::run(&args.global, opts, &log),
        cli::Command::SyncOut => commands::sync_out::run(&args.global, &log),
        cli::Command::Validate => commands::validate::run(&args.global, &log),
        cli::Command::AnalyzeTemplate(opts) => {
            commands::analyze_template::run(&args.global, opts, &log)
        }
        cli::Command::ProcessTemplate(opts) => {
            commands::process_template::run(&args.global, opts, &log)
        }
        cli::Command::EnvFiles => commands::env_files::run(&args.global, &log),
        cli::Command::Version => commands::version::run(),
    }
}
