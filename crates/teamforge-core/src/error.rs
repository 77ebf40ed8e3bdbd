use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("unknown target system: {0}")]
    UnknownSystem(String),

    #[error("invalid team: {0}")]
    InvalidTeam(String),

    #[error("invalid project path: {0}")]
    InvalidProjectPath(PathBuf),

    #[error("invalid slug '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid frontmatter in {path}: {message}")]
    InvalidFrontmatter { path: PathBuf, message: String },

    #[error("invalid template {path}: {message}")]
    InvalidTemplate { path: PathBuf, message: String },

    #[error("refusing to rewrite {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("invalid location '{0}': expected project, global or both")]
    InvalidLocation(String),

    #[error("{system} has no {scope} scope")]
    UnsupportedScope { system: String, scope: String },

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for ForgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        ForgeError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
