//! Command-line parser: global options, subcommands and their flags.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::sync::planner::Strategy;

/// Top-level CLI entry point for the dotfiles sync engine.
#[derive(Parser, Debug)]
#[command(
    name = "dotfiles-sync",
    about = "Sync dotfiles between a repository and home, with overlays and templates",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path and settings options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Mapping file (default: <repo>/dotfiles.conf)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dotfiles repository directory
    #[arg(long, global = true, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Home directory destinations are relative to
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Directory holding user-local overlays
    #[arg(long, global = true, value_name = "DIR")]
    pub overlay_dir: Option<PathBuf>,

    /// Settings file (default: ~/.config/dotfiles-sync/settings.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}

impl GlobalOpts {
    /// Settings overrides taken from these options.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            home: self.home.clone(),
            repo: self.repo.clone(),
            config: self.config.clone(),
            overlay_dir: self.overlay_dir.clone(),
            backup_dir: None,
            settings_file: self.settings.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List managed files and their overlays
    List,
    /// Copy files from the repository into home
    SyncIn(SyncInOpts),
    /// Copy live files from home back into the repository
    SyncOut,
    /// Validate the mapping file
    Validate,
    /// Report which variables a template needs and where they come from
    AnalyzeTemplate(AnalyzeTemplateOpts),
    /// Substitute variables from INPUT into OUTPUT
    ProcessTemplate(ProcessTemplateOpts),
    /// Print env files in precedence order (lowest first)
    EnvFiles,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::SyncIn(_) => "sync-in",
            Self::SyncOut => "sync-out",
            Self::Validate => "validate",
            Self::AnalyzeTemplate(_) => "analyze-template",
            Self::ProcessTemplate(_) => "process-template",
            Self::EnvFiles => "env-files",
            Self::Version => "version",
        }
    }
}

/// Options for the `sync-in` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SyncInOpts {
    /// How to handle files that differ
    #[arg(long, value_enum, default_value_t = Strategy::Ask)]
    pub strategy: Strategy,

    /// Replace without preview or prompts
    #[arg(short, long)]
    pub force: bool,

    /// Do not show diffs or prompt
    #[arg(long)]
    pub no_preview: bool,

    /// Skip template substitution after syncing
    #[arg(long)]
    pub no_templates: bool,

    /// Where overwritten files are backed up
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,
}

/// Options for the `analyze-template` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeTemplateOpts {
    /// Template to analyze
    pub path: PathBuf,
}

/// Options for the `process-template` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ProcessTemplateOpts {
    /// Template to read
    pub input: PathBuf,
    /// Where to write the substituted result
    pub output: PathBuf,
}
