//! Dotfiles sync engine.
//!
//! Keeps a home directory in step with a dotfiles repository described by a
//! line-oriented mapping file. User-local overlays can stand in for any
//! versioned file, and `${NAME}` placeholders in synced files are filled
//! from env files that pass a safety check.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: mapping file, settings and pre-flight validation
//! - **[`sync`]**: overlay resolution, drift detection, planning and apply
//! - **[`template`]**: placeholder detection, env sources and substitution
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod sync;
pub mod template;
