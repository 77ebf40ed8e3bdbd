pub mod config;
pub mod deploy;
pub mod deployed;
pub mod detect;
pub mod init;
pub mod library;
pub mod systems;
pub mod validate;

use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teamforge_core::config::Config;
use teamforge_core::{DeploymentService, LibraryCache, Team};

/// Global flags shared by every subcommand.
pub struct Context {
    pub root: PathBuf,
    /// `--library` directories, appended after the configured sources.
    pub library: Vec<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn config(&self) -> anyhow::Result<Config> {
        Config::load(&self.root).context("failed to load .teamforge/config.yaml")
    }

    pub fn service(&self, config: &Config) -> DeploymentService {
        let mut sources = config.library_sources(&self.root);
        sources.extend(self.library.iter().cloned());
        DeploymentService::new(Arc::new(LibraryCache::new(sources)))
    }

    /// `--target` values, or the configured deploy targets when none are given.
    pub fn targets(&self, flags: Vec<String>, config: &Config) -> Vec<String> {
        if flags.is_empty() {
            config.deploy.targets.clone()
        } else {
            flags
        }
    }
}

pub fn load_team(path: &Path) -> anyhow::Result<Team> {
    Team::load(path).with_context(|| format!("failed to load team from {}", path.display()))
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
