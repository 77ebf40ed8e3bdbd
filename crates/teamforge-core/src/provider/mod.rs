//! Target-system providers.
//!
//! A [`Provider`] knows one assistant's on-disk layout. The layout is
//! described by [`ScopeLayout`] so the same paths drive writing, clearing
//! and read-only detection. Each provider implements
//! [`Provider::write_scope`]; the provided [`Provider::deploy`] handles scope
//! selection, clearing, capability filtering and result reporting.

pub mod claude_code;
pub mod cline;
pub mod gemini_cli;
pub mod opencode;

pub use claude_code::ClaudeCodeProvider;
pub use cline::ClineProvider;
pub use gemini_cli::GeminiCliProvider;
pub use opencode::OpenCodeProvider;

use crate::capability::CapabilityDescriptor;
use crate::error::{ForgeError, Result};
use crate::io;
use crate::library::{
    AgentTemplate, HookTemplate, McpTemplate, McpTransport, SkillTemplate, TemplateLibrary,
};
use crate::paths;
use crate::settings::{self, HookEntry};
use crate::team::Team;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// One installation root of a target system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Project,
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project => f.write_str("project"),
            Scope::Global => f.write_str("global"),
        }
    }
}

/// Which scopes a deploy writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Project,
    Global,
    Both,
}

impl Location {
    pub fn scopes(self) -> &'static [Scope] {
        match self {
            Location::Project => &[Scope::Project],
            Location::Global => &[Scope::Global],
            Location::Both => &[Scope::Project, Scope::Global],
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Project => f.write_str("project"),
            Location::Global => f.write_str("global"),
            Location::Both => f.write_str("both"),
        }
    }
}

impl FromStr for Location {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "project" => Ok(Location::Project),
            "global" => Ok(Location::Global),
            "both" => Ok(Location::Both),
            other => Err(ForgeError::InvalidLocation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOptions {
    /// Remove the target's prior configuration before writing.
    #[serde(default)]
    pub clear_existing: bool,
    #[serde(default)]
    pub location: Location,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub system: String,
    pub success: bool,
    pub files_written: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentResult {
    /// A result for a target that was never attempted or could not run.
    pub fn failed(system: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            success: false,
            files_written: Vec::new(),
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Running record of one deploy. Survives an error so the result can still
/// say which files were written before it.
#[derive(Debug, Default)]
pub struct DeployLog {
    files: Vec<PathBuf>,
    warnings: Vec<String>,
}

impl DeployLog {
    pub fn wrote(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!(path = %path.display(), "wrote");
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn finish(self, system: &str, outcome: Result<()>) -> DeploymentResult {
        let error = outcome.err().map(|e| e.to_string());
        DeploymentResult {
            system: system.to_string(),
            success: error.is_none(),
            files_written: self.files,
            warnings: self.warnings,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Absolute paths of every artifact one scope of a target can hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeLayout {
    /// The target's configuration root for this scope.
    pub root: PathBuf,
    pub agents_dir: Option<PathBuf>,
    pub skills_dir: Option<PathBuf>,
    /// Settings document holding hooks and permissions.
    pub settings_file: Option<PathBuf>,
    /// Aggregate MCP document and the key servers live under.
    pub mcp_file: Option<(PathBuf, &'static str)>,
    pub constitution_file: Option<PathBuf>,
    pub memory_dir: Option<PathBuf>,
    /// Removed wholesale by `clear_existing`.
    pub clear_paths: Vec<PathBuf>,
    /// JSON documents whose key is dropped by `clear_existing`; the rest of
    /// the document belongs to the user.
    pub clear_keys: Vec<(PathBuf, &'static str)>,
}

impl ScopeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Artifact directories whose content identifies a deployed team.
    pub fn content_dirs(&self) -> Vec<&Path> {
        [&self.agents_dir, &self.skills_dir]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Everything one scope write needs. `team` is already restricted to the
/// provider's capabilities.
pub struct DeployContext<'a> {
    pub team: &'a Team,
    pub library: &'a dyn TemplateLibrary,
    pub project: &'a Path,
    pub scope: Scope,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Target system id, e.g. `claude-code`.
    fn system(&self) -> &str;

    fn capabilities(&self) -> CapabilityDescriptor;

    fn scopes(&self) -> &'static [Scope] {
        &[Scope::Project, Scope::Global]
    }

    /// Resolve the layout of `scope` for `project`.
    fn layout(&self, project: &Path, scope: Scope) -> Result<ScopeLayout>;

    /// Write the team's artifacts into one scope.
    async fn write_scope(
        &self,
        ctx: &DeployContext<'_>,
        layout: &ScopeLayout,
        log: &mut DeployLog,
    ) -> Result<()>;

    /// Deploy `team` and report what happened. Never returns an error: any
    /// failure lands in [`DeploymentResult::error`] next to the files
    /// written before it.
    async fn deploy(
        &self,
        team: &Team,
        library: &dyn TemplateLibrary,
        project: &Path,
        options: &DeployOptions,
    ) -> DeploymentResult {
        let system = self.system().to_string();
        tracing::info!(system = %system, project = %project.display(), "deploying");

        let team = team.restricted_to(&self.capabilities());
        let mut log = DeployLog::default();
        let mut outcome = Ok(());
        for scope in select_scopes(self, options.location, &mut log) {
            let ctx = DeployContext {
                team: &team,
                library,
                project,
                scope,
            };
            outcome = deploy_scope(self, &ctx, options, &mut log).await;
            if outcome.is_err() {
                break;
            }
        }

        let result = log.finish(&system, outcome);
        match &result.error {
            None => tracing::info!(
                system = %system,
                files = result.files_written.len(),
                warnings = result.warnings.len(),
                "deployed"
            ),
            Some(e) => tracing::warn!(system = %system, error = %e, "deploy failed"),
        }
        result
    }
}

/// Requested scopes the provider supports. Unsupported ones are reported;
/// if nothing remains the project scope is used.
fn select_scopes<P: Provider + ?Sized>(
    provider: &P,
    location: Location,
    log: &mut DeployLog,
) -> Vec<Scope> {
    let supported = provider.scopes();
    let mut scopes = Vec::new();
    for &scope in location.scopes() {
        if supported.contains(&scope) {
            scopes.push(scope);
        } else {
            log.warn(
                ForgeError::UnsupportedScope {
                    system: provider.system().to_string(),
                    scope: scope.to_string(),
                }
                .to_string(),
            );
        }
    }
    if scopes.is_empty() {
        log.warn(format!(
            "{}: deploying to project scope instead",
            provider.system()
        ));
        scopes.push(Scope::Project);
    }
    scopes
}

async fn deploy_scope<P: Provider + ?Sized>(
    provider: &P,
    ctx: &DeployContext<'_>,
    options: &DeployOptions,
    log: &mut DeployLog,
) -> Result<()> {
    let layout = provider.layout(ctx.project, ctx.scope)?;
    if options.clear_existing {
        clear_layout(&layout).await?;
    }
    provider.write_scope(ctx, &layout, log).await
}

/// Remove everything `clear_existing` owns in `layout`.
pub async fn clear_layout(layout: &ScopeLayout) -> Result<()> {
    for path in &layout.clear_paths {
        if io::remove_path(path).await? {
            tracing::debug!(path = %path.display(), "cleared");
        }
    }
    if let Some(path) = &layout.constitution_file {
        if io::remove_managed_section(path, paths::SECTION_START, paths::SECTION_END).await? {
            tracing::debug!(path = %path.display(), "cleared managed section");
        }
    }
    for (path, key) in &layout.clear_keys {
        if !tokio::fs::try_exists(path).await? {
            continue;
        }
        let mut doc = settings::load_document(path).await?;
        if doc.remove(*key).is_some() {
            settings::save_document(path, &doc).await?;
            tracing::debug!(path = %path.display(), key = *key, "cleared key");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Home directory override, falling back to the real one.
pub(crate) fn home_or_default(home: Option<&Path>) -> Result<PathBuf> {
    match home {
        Some(h) => Ok(h.to_path_buf()),
        None => paths::home_dir(),
    }
}

/// Atomically write `content` and record it in `log`.
pub async fn write_file(path: &Path, content: &str, log: &mut DeployLog) -> Result<()> {
    io::atomic_write(path, content.as_bytes()).await?;
    log.wrote(path);
    Ok(())
}

pub(crate) fn resolve_agents<'a>(ctx: &DeployContext<'a>, log: &mut DeployLog) -> Vec<&'a AgentTemplate> {
    let library = ctx.library;
    ctx.team
        .ordered_agents()
        .into_iter()
        .filter_map(|a| {
            let found = library.agent(&a.agent_id);
            if found.is_none() {
                log.warn(format!("agent '{}' not found in library, skipped", a.agent_id));
            }
            found
        })
        .collect()
}

pub(crate) fn resolve_skills<'a>(ctx: &DeployContext<'a>, log: &mut DeployLog) -> Vec<&'a SkillTemplate> {
    let library = ctx.library;
    ctx.team
        .ordered_skills()
        .into_iter()
        .filter_map(|s| {
            let found = library.skill(&s.skill_id);
            if found.is_none() {
                log.warn(format!("skill '{}' not found in library, skipped", s.skill_id));
            }
            found
        })
        .collect()
}

pub(crate) fn resolve_hooks<'a>(ctx: &DeployContext<'a>, log: &mut DeployLog) -> Vec<&'a HookTemplate> {
    let library = ctx.library;
    ctx.team
        .ordered_hooks()
        .into_iter()
        .filter_map(|h| {
            let found = library.hook(&h.hook_id);
            if found.is_none() {
                log.warn(format!("hook '{}' not found in library, skipped", h.hook_id));
            }
            found
        })
        .collect()
}

pub(crate) fn resolve_mcp<'a>(ctx: &DeployContext<'a>, log: &mut DeployLog) -> Vec<&'a McpTemplate> {
    let library = ctx.library;
    ctx.team
        .mcp_servers
        .iter()
        .filter_map(|m| {
            let found = library.mcp(&m.mcp_id);
            if found.is_none() {
                log.warn(format!("MCP server '{}' not found in library, skipped", m.mcp_id));
            }
            found
        })
        .collect()
}

pub(crate) fn hook_entry(hook: &HookTemplate) -> HookEntry {
    HookEntry {
        event: hook.event.clone(),
        matcher: hook.matcher.clone(),
        hook_type: hook.hook_type.clone(),
        command: hook.command.clone(),
        timeout: hook.timeout,
    }
}

/// Slug used for an MCP server's key in aggregate documents.
pub(crate) fn mcp_slug(mcp: &McpTemplate) -> String {
    paths::slugify(mcp.display_name(), &mcp.id)
}

/// Output names already taken within one directory or server map. The
/// first template to claim a name keeps it.
#[derive(Debug, Default)]
pub(crate) struct Claimed {
    names: Vec<(String, String)>,
}

impl Claimed {
    /// Claim `name` for template `id`. A name already held by another
    /// template is refused with a warning.
    pub(crate) fn claim(&mut self, kind: &str, id: &str, name: &str, log: &mut DeployLog) -> bool {
        if let Some((_, owner)) = self.names.iter().find(|(n, _)| n == name) {
            log.warn(format!(
                "{kind} '{id}' skipped: '{name}' is already used by '{owner}'"
            ));
            return false;
        }
        self.names.push((name.to_string(), id.to_string()));
        true
    }
}

/// The team's MCP servers keyed by slug, rendered with `entry`.
pub(crate) fn mcp_entries(
    ctx: &DeployContext<'_>,
    log: &mut DeployLog,
    entry: fn(&McpTransport) -> Value,
) -> BTreeMap<String, Value> {
    let mut claimed = Claimed::default();
    let mut servers = BTreeMap::new();
    for mcp in resolve_mcp(ctx, log) {
        let slug = mcp_slug(mcp);
        if claimed.claim("MCP server", &mcp.id, &slug, log) {
            servers.insert(slug, entry(&mcp.transport));
        }
    }
    servers
}

/// Write the team's constitution into the managed section of `path`.
/// Teams without constitution text leave the file alone.
pub(crate) async fn write_constitution(
    path: &Path,
    team: &Team,
    log: &mut DeployLog,
) -> Result<()> {
    let Some(text) = team.constitution_text() else {
        return Ok(());
    };
    let body = format!("# {}\n\n{text}", team.name.trim());
    io::upsert_managed_section(path, paths::SECTION_START, paths::SECTION_END, &body).await?;
    log.wrote(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibrarySnapshot;
    use tempfile::TempDir;

    /// Writes one marker file per scope; refuses the global scope.
    struct ProjectOnly;

    #[async_trait]
    impl Provider for ProjectOnly {
        fn system(&self) -> &str {
            "project-only"
        }

        fn capabilities(&self) -> CapabilityDescriptor {
            CapabilityDescriptor::NONE
        }

        fn scopes(&self) -> &'static [Scope] {
            &[Scope::Project]
        }

        fn layout(&self, project: &Path, _scope: Scope) -> Result<ScopeLayout> {
            let mut layout = ScopeLayout::new(project.join(".po"));
            layout.clear_paths.push(project.join(".po"));
            Ok(layout)
        }

        async fn write_scope(
            &self,
            ctx: &DeployContext<'_>,
            layout: &ScopeLayout,
            log: &mut DeployLog,
        ) -> Result<()> {
            write_file(&layout.root.join("marker"), &ctx.scope.to_string(), log).await
        }
    }

    #[test]
    fn location_round_trips_through_str() {
        for loc in [Location::Project, Location::Global, Location::Both] {
            assert_eq!(loc.to_string().parse::<Location>().unwrap(), loc);
        }
        assert!(matches!(
            "everywhere".parse::<Location>(),
            Err(ForgeError::InvalidLocation(_))
        ));
    }

    #[tokio::test]
    async fn unsupported_global_falls_back_to_project() {
        let dir = TempDir::new().unwrap();
        let options = DeployOptions {
            clear_existing: false,
            location: Location::Global,
        };
        let result = ProjectOnly
            .deploy(&Team::new("t"), &LibrarySnapshot::default(), dir.path(), &options)
            .await;

        assert!(result.success);
        assert_eq!(result.files_written, [dir.path().join(".po/marker")]);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("has no global scope"));
    }

    #[tokio::test]
    async fn clear_removes_paths_and_keys_only() {
        let dir = TempDir::new().unwrap();
        let owned = dir.path().join(".owned");
        std::fs::create_dir_all(owned.join("agents")).unwrap();
        let doc = dir.path().join("settings.json");
        std::fs::write(&doc, r#"{"mcpServers": {"a": {}}, "theme": "dark"}"#).unwrap();

        let mut layout = ScopeLayout::new(&owned);
        layout.clear_paths.push(owned.clone());
        layout.clear_keys.push((doc.clone(), "mcpServers"));
        layout.clear_keys.push((dir.path().join("absent.json"), "mcp"));
        clear_layout(&layout).await.unwrap();

        assert!(!owned.exists());
        let after: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&doc).unwrap()).unwrap();
        assert_eq!(after, serde_json::json!({"theme": "dark"}));
        assert!(!dir.path().join("absent.json").exists());
    }

    #[tokio::test]
    async fn constitution_skipped_without_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AGENTS.md");
        let mut log = DeployLog::default();
        write_constitution(&path, &Team::new("t"), &mut log).await.unwrap();
        assert!(!path.exists());
        assert!(log.files().is_empty());
    }
}
