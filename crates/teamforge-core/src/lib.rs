pub mod capability;
pub mod config;
pub mod detector;
pub mod error;
pub mod frontmatter;
pub mod io;
pub mod library;
pub mod paths;
pub mod provider;
pub mod service;
pub mod settings;
pub mod team;
pub mod validator;

#[cfg(test)]
mod testing;

pub use capability::{CapabilityDescriptor, CapabilityRegistry, Category};
pub use detector::{DeployedConfig, ScopeSnapshot};
pub use error::{ForgeError, Result};
pub use library::{LibraryCache, LibrarySnapshot, TemplateLibrary};
pub use provider::{DeployOptions, DeploymentResult, Location, Provider};
pub use service::{DeploymentService, MultiDeploymentResult};
pub use team::Team;
pub use validator::{DeploymentValidation, DeploymentValidator};
