use crate::capability::CapabilityRegistry;
use crate::error::Result;
use crate::paths;
use crate::provider::Location;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Template sources in precedence order: a later source overrides an earlier
/// one (git cache first, local development directory last).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    #[serde(default)]
    pub clear_existing: bool,
    #[serde(default)]
    pub location: Location,
}

fn default_targets() -> Vec<String> {
    vec![crate::capability::CLAUDE_CODE.to_string()]
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            clear_existing: false,
            location: Location::Project,
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            library: LibraryConfig {
                sources: vec![PathBuf::from(".teamforge/library")],
            },
            deploy: DeployConfig::default(),
        }
    }

    /// Default config named after the root directory.
    pub fn default_for(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        Self::new(name)
    }

    pub fn exists(root: &Path) -> bool {
        paths::config_path(root).exists()
    }

    /// Load `.teamforge/config.yaml`, or the defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default_for(root));
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write_blocking(&path, data.as_bytes())
    }

    /// Library sources as absolute paths: `~/` expands to the home
    /// directory, relative paths resolve against `root`.
    pub fn library_sources(&self, root: &Path) -> Vec<PathBuf> {
        self.library
            .sources
            .iter()
            .map(|source| resolve_source(root, source))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, registry: &CapabilityRegistry, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.deploy.targets.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no deploy targets configured".to_string(),
            });
        }

        let mut seen: Vec<&str> = Vec::new();
        for target in &self.deploy.targets {
            if seen.contains(&target.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("deploy target '{target}' listed more than once"),
                });
                continue;
            }
            seen.push(target);

            if !registry.contains(target) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "unknown deploy target '{target}' (known: {})",
                        registry.all_systems().join(", ")
                    ),
                });
            }
        }

        for source in self.library_sources(root) {
            if !source.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("library source not found: {}", source.display()),
                });
            }
        }

        warnings
    }
}

fn resolve_source(root: &Path, source: &Path) -> PathBuf {
    if let Ok(rest) = source.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(rest);
        }
    }
    if source.is_absolute() {
        source.to_path_buf()
    } else {
        root.join(source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
