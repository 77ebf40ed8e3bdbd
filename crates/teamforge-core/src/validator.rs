//! Pre-flight checks run before any file is touched.

use crate::capability::{CapabilityRegistry, Category};
use crate::team::Team;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub system: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentValidation {
    pub valid: bool,
    pub warnings: Vec<ValidationWarning>,
    pub errors: Vec<String>,
}

/// Checks a team against the capability table.
///
/// Errors block deployment; warnings name categories a target will skip.
pub struct DeploymentValidator<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> DeploymentValidator<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, team: &Team, targets: &[String], project: &Path) -> DeploymentValidation {
        let mut errors = team.structural_errors();
        let mut warnings = Vec::new();

        if targets.is_empty() {
            errors.push("no target systems selected".to_string());
        }

        if !project.exists() {
            errors.push(format!("project path does not exist: {}", project.display()));
        } else if !project.is_dir() {
            errors.push(format!("project path is not a directory: {}", project.display()));
        }

        let requested = requested_categories(team);
        let mut seen: Vec<&str> = Vec::new();
        for system in targets {
            if seen.contains(&system.as_str()) {
                continue;
            }
            seen.push(system);

            let Some(caps) = self.registry.get(system) else {
                errors.push(format!("unknown target system: {system}"));
                continue;
            };
            for &category in &requested {
                if !caps.supports(category) {
                    warnings.push(ValidationWarning {
                        system: system.clone(),
                        message: format!("{category} not supported by {system}, will be skipped"),
                    });
                }
            }
        }

        DeploymentValidation {
            valid: errors.is_empty(),
            warnings,
            errors,
        }
    }
}

/// Categories the team actually uses, in report order.
pub fn requested_categories(team: &Team) -> Vec<Category> {
    let mut categories = Vec::new();
    if !team.agents.is_empty() {
        categories.push(Category::Agents);
    }
    if !team.skills.is_empty() {
        categories.push(Category::Skills);
    }
    if !team.hooks.is_empty() {
        categories.push(Category::Hooks);
    }
    if !team.mcp_servers.is_empty() {
        categories.push(Category::McpServers);
    }
    if team.has_security() {
        categories.push(Category::Security);
    }
    if team.constitution_text().is_some() {
        categories.push(Category::Constitution);
    }
    categories
}
