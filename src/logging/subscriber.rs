//! Global subscriber: a console layer plus a per-command run log.
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::utils;
use crate::commands::version::version;

/// Tracing target used for stage headers.
pub(super) const STAGE_TARGET: &str = "dotfiles_sync::stage";

/// How an event is presented, on the console and in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    Error,
    Warn,
    Info,
    Detail,
}

impl Kind {
    fn of(event: &Event<'_>) -> Self {
        let meta = event.metadata();
        match *meta.level() {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if meta.target() == STAGE_TARGET => Self::Stage,
            Level::INFO => Self::Info,
            _ => Self::Detail,
        }
    }

    fn console(self, msg: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::Error => format!("\x1b[31mERROR\x1b[0m {msg}"),
            Self::Warn => format!("\x1b[33mWARN\x1b[0m  {msg}"),
            Self::Info => format!("  {msg}"),
            Self::Detail => format!("  \x1b[2m{msg}\x1b[0m"),
        }
    }

    const fn run_log_tag(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::Error => "    [error] ",
            Self::Warn => "    [warn] ",
            Self::Info => "    ",
            Self::Detail => "    [debug] ",
        }
    }
}

/// Collects the `message` field of an event.
struct Message(String);

impl Visit for Message {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

fn message(event: &Event<'_>) -> String {
    let mut visitor = Message(String::new());
    event.record(&mut visitor);
    visitor.0
}

/// Layer appending every event, ANSI-free and time-stamped, to a run log.
#[derive(Debug)]
pub(super) struct RunLog {
    file: Mutex<File>,
}

impl RunLog {
    /// Truncate `path` and start it with a header naming the command.
    pub(super) fn create(path: &Path, command: &str) -> Option<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()?;
        let rule = "=".repeat(48);
        writeln!(
            file,
            "{rule}\n{} {} {command} {}\n{rule}",
            env!("CARGO_PKG_NAME"),
            version(),
            utils::started_at()
        )
        .ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: Subscriber> Layer<S> for RunLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = format!(
            "[{}] {}{}",
            utils::clock(),
            Kind::of(event).run_log_tag(),
            utils::plain(&message(event))
        );
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console event format: coloured tags, bold stage headers, indented detail.
struct Console;

impl<S, N> FormatEvent<S, N> for Console
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        writeln!(writer, "{}", Kind::of(event).console(&message(event)))
    }
}

/// Install the global subscriber for one command run.
///
/// Warnings and errors go to stderr, the rest to stdout; debug lines reach
/// the console only when `verbose`. The run log under the cache directory
/// always receives debug and above. Call once, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));
    let console = tracing_subscriber::fmt::layer()
        .event_format(Console)
        .with_writer(writer)
        .with_filter(console_level);

    let run_log = utils::log_path(command)
        .and_then(|path| RunLog::create(&path, command))
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(run_log)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn console_styles_by_kind() {
        assert_eq!(Kind::Info.console("synced .bashrc"), "  synced .bashrc");
        assert!(Kind::Warn.console("x").starts_with("\x1b[33mWARN"));
        assert_eq!(utils::plain(&Kind::Stage.console("Summary")), "==> Summary");
    }

    #[test]
    fn run_log_header_names_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync-in.log");
        RunLog::create(&path, "sync-in").expect("run log");
        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.contains(&format!("dotfiles-sync {} sync-in", version())));
        assert_eq!(header.lines().count(), 3);
    }
}
