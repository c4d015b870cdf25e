// Shared helpers for integration tests.
//
// Provides a temporary home, repository and overlay directory plus a fluent
// builder so each integration test can set up an isolated environment
// without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use dotfiles_sync::cli::GlobalOpts;
use dotfiles_sync::config::{Mapping, Settings};
use dotfiles_sync::sync::planner::{Choice, Prompter};

/// An isolated home/repository pair backed by a [`tempfile::TempDir`].
///
/// Layout under the temp dir:
/// - `home/`                          destinations
/// - `repo/`                          versioned sources and `dotfiles.conf`
/// - `home/.config/dotfiles.custom/`  overlays
/// - `settings.toml`                  env files pointing into `home/`
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    /// Create the directory skeleton and a settings file.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fixture = Self { dir };
        std::fs::create_dir_all(fixture.home()).expect("create home");
        std::fs::create_dir_all(fixture.repo()).expect("create repo");
        std::fs::create_dir_all(fixture.overlay_dir()).expect("create overlay dir");
        fixture.write_settings("");
        fixture
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn repo(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    pub fn overlay_dir(&self) -> PathBuf {
        self.home().join(".config").join("dotfiles.custom")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.home().join(".config").join("dotfiles.bak")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.path().join("settings.toml")
    }

    /// Env files configured for every fixture, lowest precedence first.
    pub fn env_files(&self) -> [PathBuf; 2] {
        [
            self.home().join(".env"),
            self.home().join(".config").join("dotfiles").join(".env"),
        ]
    }

    /// Rewrite the settings file with the fixture env files and `extra`.
    pub fn write_settings(&self, extra: &str) {
        let [low, high] = self.env_files();
        let content = format!(
            "env_files = ['{}', '{}']\n{extra}",
            low.display(),
            high.display()
        );
        std::fs::write(self.settings_path(), content).expect("write settings");
    }

    /// Global options pointing every path at this fixture.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            config: None,
            repo: Some(self.repo()),
            home: Some(self.home()),
            overlay_dir: None,
            settings: Some(self.settings_path()),
        }
    }

    /// Settings equivalent to what the commands resolve for this fixture.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::for_home(&self.home(), &self.repo());
        settings.env_files = self.env_files().to_vec();
        settings
    }

    /// Parse the fixture's mapping file.
    pub fn mapping(&self) -> Mapping {
        Mapping::load(&self.repo().join("dotfiles.conf")).expect("load mapping")
    }

    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home().join(rel)).expect("read home file")
    }

    pub fn read_repo(&self, rel: &str) -> String {
        std::fs::read_to_string(self.repo().join(rel)).expect("read repo file")
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, content).expect("write file");
}

/// Fluent builder for [`Fixture`].
pub struct FixtureBuilder {
    fixture: Fixture,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            fixture: Fixture::new(),
        }
    }

    /// Write the mapping file.
    pub fn mapping(self, content: &str) -> Self {
        write(&self.fixture.repo().join("dotfiles.conf"), content);
        self
    }

    /// Write a versioned source.
    pub fn repo_file(self, rel: &str, content: &str) -> Self {
        write(&self.fixture.repo().join(rel), content);
        self
    }

    /// Write a live destination.
    pub fn home_file(self, rel: &str, content: &str) -> Self {
        write(&self.fixture.home().join(rel), content);
        self
    }

    /// Write an overlay.
    pub fn overlay(self, name: &str, content: &str) -> Self {
        write(&self.fixture.overlay_dir().join(name), content);
        self
    }

    /// Write the lowest-precedence env file.
    pub fn env(self, content: &str) -> Self {
        let [low, _] = self.fixture.env_files();
        write(&low, content);
        self
    }

    /// Write the highest-precedence env file.
    pub fn env_override(self, content: &str) -> Self {
        let [_, high] = self.fixture.env_files();
        write(&high, content);
        self
    }

    pub fn build(self) -> Fixture {
        self.fixture
    }
}

/// Prompter answering from a fixed script and recording what it was shown.
pub struct ScriptedPrompter {
    choices: RefCell<VecDeque<Choice>>,
    confirm: bool,
    pub shown: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(choices: &[Choice], confirm: bool) -> Self {
        Self {
            choices: RefCell::new(choices.iter().copied().collect()),
            confirm,
            shown: RefCell::new(Vec::new()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn show_diff(&self, dest: &str, diff: &str) {
        self.shown.borrow_mut().push(format!("{dest}\n{diff}"));
    }

    fn choose(&self, _dest: &str) -> anyhow::Result<Choice> {
        self.choices
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("prompt script exhausted"))
    }

    fn confirm(&self, _question: &str) -> anyhow::Result<bool> {
        Ok(self.confirm)
    }
}
