//! Orchestration: validation, single- and multi-target deploys, detection.

use crate::capability::{CapabilityDescriptor, CapabilityRegistry};
use crate::detector::{self, DeployedConfig};
use crate::error::{ForgeError, Result};
use crate::library::LibraryCache;
use crate::provider::{
    ClaudeCodeProvider, ClineProvider, DeployOptions, DeploymentResult, GeminiCliProvider,
    OpenCodeProvider, Provider, Scope,
};
use crate::team::Team;
use crate::validator::{DeploymentValidation, DeploymentValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetError {
    pub system: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDeploymentResult {
    /// True iff every target succeeded.
    pub success: bool,
    pub results: BTreeMap<String, DeploymentResult>,
    pub validation: DeploymentValidation,
    pub errors: Vec<TargetError>,
}

impl MultiDeploymentResult {
    pub fn deployed_count(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    /// "N of M systems deployed".
    pub fn summary(&self) -> String {
        format!(
            "{} of {} systems deployed",
            self.deployed_count(),
            self.results.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemCapabilities {
    pub system: String,
    #[serde(flatten)]
    pub capabilities: CapabilityDescriptor,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct DeploymentServiceBuilder {
    library: Arc<LibraryCache>,
    home: Option<PathBuf>,
    builtins: bool,
    providers: Vec<Arc<dyn Provider>>,
}

impl DeploymentServiceBuilder {
    /// Home directory for the built-in providers' global scope.
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn builtin_providers(mut self) -> Self {
        self.builtins = true;
        self
    }

    /// Register a provider. A later provider for the same system replaces
    /// the earlier one, built-ins included.
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> DeploymentService {
        let mut all: Vec<Arc<dyn Provider>> = Vec::new();
        if self.builtins {
            all.push(match &self.home {
                Some(h) => Arc::new(ClaudeCodeProvider::with_home(h)),
                None => Arc::new(ClaudeCodeProvider::new()),
            });
            all.push(match &self.home {
                Some(h) => Arc::new(GeminiCliProvider::with_home(h)),
                None => Arc::new(GeminiCliProvider::new()),
            });
            all.push(match &self.home {
                Some(h) => Arc::new(OpenCodeProvider::with_home(h)),
                None => Arc::new(OpenCodeProvider::new()),
            });
            all.push(Arc::new(ClineProvider::new()));
        }

        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        for provider in all.into_iter().chain(self.providers) {
            match providers.iter().position(|p| p.system() == provider.system()) {
                Some(i) => providers[i] = provider,
                None => providers.push(provider),
            }
        }

        // the registry is derived from the providers so both agree
        let mut registry = CapabilityRegistry::default();
        for provider in &providers {
            registry.insert(provider.system(), provider.capabilities());
        }

        DeploymentService {
            providers,
            registry,
            library: self.library,
        }
    }
}

// ---------------------------------------------------------------------------
// DeploymentService
// ---------------------------------------------------------------------------

pub struct DeploymentService {
    providers: Vec<Arc<dyn Provider>>,
    registry: CapabilityRegistry,
    library: Arc<LibraryCache>,
}

impl DeploymentService {
    /// Service with the four built-in targets.
    pub fn new(library: Arc<LibraryCache>) -> Self {
        Self::builder(library).builtin_providers().build()
    }

    pub fn builder(library: Arc<LibraryCache>) -> DeploymentServiceBuilder {
        DeploymentServiceBuilder {
            library,
            home: None,
            builtins: false,
            providers: Vec::new(),
        }
    }

    pub fn library(&self) -> &LibraryCache {
        &self.library
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    fn provider(&self, system: &str) -> Result<&Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.system() == system)
            .ok_or_else(|| ForgeError::UnknownSystem(system.to_string()))
    }

    pub fn get_available_systems(&self) -> Vec<String> {
        self.registry.all_systems()
    }

    /// Capabilities do not depend on project state; `_project` is accepted
    /// so callers need not change if that ever becomes true.
    pub fn get_system_capabilities(
        &self,
        system: &str,
        _project: &Path,
    ) -> Result<CapabilityDescriptor> {
        self.registry.capabilities(system)
    }

    pub fn get_all_system_capabilities(&self, _project: &Path) -> Vec<SystemCapabilities> {
        self.registry
            .all_systems()
            .into_iter()
            .filter_map(|system| {
                let capabilities = self.registry.get(&system)?;
                Some(SystemCapabilities {
                    system,
                    capabilities,
                })
            })
            .collect()
    }

    pub fn validate_deployment(
        &self,
        team: &Team,
        targets: &[String],
        project: &Path,
    ) -> DeploymentValidation {
        DeploymentValidator::new(&self.registry).validate(team, targets, project)
    }

    /// Deploy to one target. Validation errors and provider failures come
    /// back as a failed result; `Err` means the template library could not
    /// be loaded.
    pub async fn deploy(
        &self,
        team: &Team,
        system: &str,
        project: &Path,
        options: &DeployOptions,
    ) -> Result<DeploymentResult> {
        let validation = self.validate_deployment(team, &[system.to_string()], project);
        if !validation.valid {
            return Ok(DeploymentResult::failed(
                system,
                blocked_reason(&validation),
            ));
        }
        let provider = self.provider(system)?;
        let snapshot = self.library.snapshot().await?;
        Ok(provider
            .deploy(team, snapshot.as_ref(), project, options)
            .await)
    }

    /// Validate once, then deploy every distinct target concurrently.
    ///
    /// A failing or panicking target never stops the others; every
    /// requested target gets an entry in `results`.
    pub async fn deploy_to_multiple(
        &self,
        team: &Team,
        targets: &[String],
        project: &Path,
        options: &DeployOptions,
    ) -> Result<MultiDeploymentResult> {
        let validation = self.validate_deployment(team, targets, project);
        let mut systems: Vec<String> = Vec::new();
        for target in targets {
            if !systems.contains(target) {
                systems.push(target.clone());
            }
        }

        let mut results = BTreeMap::new();
        let mut errors = Vec::new();

        if !validation.valid {
            let reason = blocked_reason(&validation);
            for system in systems {
                errors.push(TargetError {
                    system: system.clone(),
                    error: reason.clone(),
                });
                results.insert(system.clone(), DeploymentResult::failed(system, reason.clone()));
            }
            return Ok(MultiDeploymentResult {
                success: false,
                results,
                validation,
                errors,
            });
        }

        let snapshot = self.library.snapshot().await?;
        let team = Arc::new(team.clone());
        let project = project.to_path_buf();
        let options = *options;

        let mut handles = Vec::with_capacity(systems.len());
        for system in &systems {
            let provider = Arc::clone(self.provider(system)?);
            let team = Arc::clone(&team);
            let snapshot = Arc::clone(&snapshot);
            let project = project.clone();
            handles.push(tokio::spawn(async move {
                provider
                    .deploy(&team, snapshot.as_ref(), &project, &options)
                    .await
            }));
        }

        let joined = futures::future::join_all(handles).await;
        for (system, outcome) in systems.into_iter().zip(joined) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(system = %system, error = %e, "deploy task aborted");
                    DeploymentResult::failed(&system, format!("deploy task failed: {e}"))
                }
            };
            if let Some(error) = &result.error {
                errors.push(TargetError {
                    system: system.clone(),
                    error: error.clone(),
                });
            }
            results.insert(system, result);
        }

        let success = results.values().all(|r| r.success);
        tracing::info!(
            deployed = results.values().filter(|r| r.success).count(),
            requested = results.len(),
            "multi-target deploy finished"
        );
        Ok(MultiDeploymentResult {
            success,
            results,
            validation,
            errors,
        })
    }

    pub async fn detect_system_config(&self, system: &str, project: &Path) -> Result<DeployedConfig> {
        let provider = self.provider(system)?;
        Ok(detector::detect(provider.as_ref(), project).await)
    }

    pub async fn detect_all_system_configs(&self, project: &Path) -> Vec<DeployedConfig> {
        let mut configs = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            configs.push(detector::detect(provider.as_ref(), project).await);
        }
        configs
    }

    /// The candidate whose rendered content matches what `system` has in
    /// `project`, compared by per-file SHA-256 over the target's content
    /// directories. Renders each candidate into a scratch directory, so the
    /// cost grows with candidates times their rendered size.
    pub async fn find_deployed_team<'t>(
        &self,
        teams: &'t [Team],
        system: &str,
        project: &Path,
    ) -> Result<Option<&'t Team>> {
        let provider = self.provider(system)?;
        if !project.is_dir() {
            return Err(ForgeError::InvalidProjectPath(project.to_path_buf()));
        }
        for team in teams {
            team.ensure_valid()?;
        }
        let layout = provider.layout(project, Scope::Project)?;
        if layout.content_dirs().is_empty() {
            return Ok(None);
        }
        let on_disk = detector::content_digest(&layout, project).await?;
        if on_disk.is_empty() {
            return Ok(None);
        }

        let snapshot = self.library.snapshot().await?;
        let options = DeployOptions::default();
        for team in teams {
            let scratch = tempfile::TempDir::new()?;
            let result = provider
                .deploy(team, snapshot.as_ref(), scratch.path(), &options)
                .await;
            if !result.success {
                tracing::debug!(team = %team.name, error = ?result.error, "candidate failed to render");
                continue;
            }
            let rendered_layout = provider.layout(scratch.path(), Scope::Project)?;
            let rendered = detector::content_digest(&rendered_layout, scratch.path()).await?;
            if rendered == on_disk {
                return Ok(Some(team));
            }
        }
        Ok(None)
    }
}

fn blocked_reason(validation: &DeploymentValidation) -> String {
    format!("validation failed: {}", validation.errors.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CLAUDE_CODE, CLINE, GEMINI_CLI, OPENCODE};
    use crate::library::LibrarySnapshot;
    use crate::testing;
    use tempfile::TempDir;

    fn service(home: &Path) -> DeploymentService {
        DeploymentService::builder(Arc::new(LibraryCache::preloaded(testing::library())))
            .home(home)
            .builtin_providers()
            .build()
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn registry_mirrors_providers() {
        let dir = TempDir::new().unwrap();
        let svc = service(dir.path());
        assert_eq!(
            svc.get_available_systems(),
            [CLAUDE_CODE, GEMINI_CLI, OPENCODE, CLINE]
        );
        let all = svc.get_all_system_capabilities(dir.path());
        assert_eq!(all[3].capabilities, CapabilityDescriptor::CLINE);
        assert!(svc.get_system_capabilities("nope", dir.path()).is_err());
    }

    #[tokio::test]
    async fn deploys_to_all_builtins() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let svc = service(&dir.path().join("home"));

        let result = svc
            .deploy_to_multiple(
                &testing::full_team(),
                &targets(&[CLAUDE_CODE, GEMINI_CLI, OPENCODE, CLINE, CLAUDE_CODE]),
                &project,
                &DeployOptions::default(),
            )
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.results.len(), 4);
        assert_eq!(result.summary(), "4 of 4 systems deployed");
        assert!(!result.validation.warnings.is_empty());
        assert!(project.join(".claude/agents/code-reviewer.md").exists());
        assert!(project.join(".gemini/settings.json").exists());
        assert!(project.join(".opencode/agent/code-reviewer.md").exists());
        assert!(project.join("memory-bank/progress.md").exists());
    }

    #[tokio::test]
    async fn invalid_request_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir.path().join("home"));
        let result = svc
            .deploy_to_multiple(
                &testing::full_team(),
                &targets(&[CLAUDE_CODE, "vscode"]),
                dir.path(),
                &DeployOptions::default(),
            )
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.errors.len(), 2);
        assert!(result.results["vscode"].error.as_deref().unwrap().contains("vscode"));
        assert!(!dir.path().join(".claude").exists());

        let single = svc
            .deploy(&testing::full_team(), "vscode", dir.path(), &DeployOptions::default())
            .await
            .unwrap();
        assert!(!single.success);
    }

    #[tokio::test]
    async fn detects_all_systems() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir.path().join("home"));
        svc.deploy(&testing::full_team(), OPENCODE, dir.path(), &DeployOptions::default())
            .await
            .unwrap();

        let configs = svc.detect_all_system_configs(dir.path()).await;
        assert_eq!(configs.len(), 4);
        let opencode = svc.detect_system_config(OPENCODE, dir.path()).await.unwrap();
        assert_eq!(opencode.project.agents, 2);
        assert!(!configs[0].project.exists);
        assert!(svc.detect_system_config("vscode", dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn finds_the_deployed_team_by_content() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir.path().join("home"));
        let full = testing::full_team();
        let mut reviewers = Team::new("Reviewers");
        reviewers.agents = full.agents[1..].to_vec();

        svc.deploy(&reviewers, CLAUDE_CODE, dir.path(), &DeployOptions::default())
            .await
            .unwrap();

        let candidates = vec![full, reviewers];
        let found = svc
            .find_deployed_team(&candidates, CLAUDE_CODE, dir.path())
            .await
            .unwrap();
        assert_eq!(found.map(|t| t.name.as_str()), Some("Reviewers"));

        // cline has no content directories to compare
        let none = svc
            .find_deployed_team(&candidates, CLINE, dir.path())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn nothing_deployed_matches_nothing() {
        let dir = TempDir::new().unwrap();
        let svc = DeploymentService::builder(Arc::new(LibraryCache::preloaded(
            LibrarySnapshot::default(),
        )))
        .builtin_providers()
        .build();
        let teams = [Team::new("empty")];
        let found = svc
            .find_deployed_team(&teams, CLAUDE_CODE, dir.path())
            .await
            .unwrap();
        assert!(found.is_none());

        let err = svc
            .find_deployed_team(&[Team::new("empty")], CLAUDE_CODE, &dir.path().join("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidProjectPath(_)));
    }

    #[tokio::test]
    async fn candidate_without_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let svc = service(dir.path());
        let mut nameless = Team::new("Reviewers");
        nameless.id = String::new();

        let err = svc
            .find_deployed_team(&[testing::full_team(), nameless], CLAUDE_CODE, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidTeam(msg) if msg.contains("'id'")));
    }
}
