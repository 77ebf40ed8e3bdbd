//! Template lookup: resolves the short ids a [`Team`](crate::team::Team)
//! references into full template content.
//!
//! On-disk source layout (one or more sources, later ones win):
//!
//! ```text
//! <source>/agents/<id>.md          frontmatter + body
//! <source>/skills/<id>/SKILL.md    frontmatter + body
//! <source>/hooks/<id>.json         HookTemplate
//! <source>/mcp/<id>.json           McpTemplate
//! ```

use crate::error::{ForgeError, Result};
use crate::frontmatter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub suggested_for: Vec<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Lifecycle event, e.g. `PreToolUse`.
    pub event: String,
    /// Tool-name pattern; `None` matches every tool.
    #[serde(default)]
    pub matcher: Option<String>,
    #[serde(default = "default_hook_type", rename = "type")]
    pub hook_type: String,
    pub command: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_hook_type() -> String {
    "command".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpTransport {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    Http {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    Sse {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub transport: McpTransport,
}

impl McpTemplate {
    /// Display name used to derive the server's slug.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Browsing
// ---------------------------------------------------------------------------

/// Filter over agent templates. Unset fields match everything; set fields
/// must all match.
#[derive(Debug, Clone, Default)]
pub struct AgentQuery {
    /// Exact category, ignoring case.
    pub category: Option<String>,
    /// Substring of the name, description or any tag, ignoring case.
    pub keyword: Option<String>,
    /// Technologies the project uses; an agent matches when one of its
    /// `suggested_for` entries contains or is contained in one of them.
    pub technologies: Vec<String>,
}

impl AgentQuery {
    pub fn matches(&self, agent: &AgentTemplate) -> bool {
        if let Some(category) = &self.category {
            let same = agent
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }

        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            let hit = agent.name.to_lowercase().contains(&keyword)
                || agent.description.to_lowercase().contains(&keyword)
                || agent.tags.iter().any(|t| t.to_lowercase().contains(&keyword));
            if !hit {
                return false;
            }
        }

        if !self.technologies.is_empty() {
            let suggested = agent.suggested_for.iter().any(|tech| {
                let tech = tech.to_lowercase();
                self.technologies.iter().any(|t| {
                    let t = t.to_lowercase();
                    t.contains(&tech) || tech.contains(&t)
                })
            });
            if !suggested {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// TemplateLibrary
// ---------------------------------------------------------------------------

/// Resolves template ids. A missing id is an ordinary `None`.
pub trait TemplateLibrary: Send + Sync {
    fn agent(&self, id: &str) -> Option<&AgentTemplate>;
    fn skill(&self, id: &str) -> Option<&SkillTemplate>;
    fn hook(&self, id: &str) -> Option<&HookTemplate>;
    fn mcp(&self, id: &str) -> Option<&McpTemplate>;
}

/// An immutable, fully loaded set of templates.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    agents: HashMap<String, AgentTemplate>,
    skills: HashMap<String, SkillTemplate>,
    hooks: HashMap<String, HookTemplate>,
    mcp: HashMap<String, McpTemplate>,
}

impl TemplateLibrary for LibrarySnapshot {
    fn agent(&self, id: &str) -> Option<&AgentTemplate> {
        self.agents.get(id)
    }

    fn skill(&self, id: &str) -> Option<&SkillTemplate> {
        self.skills.get(id)
    }

    fn hook(&self, id: &str) -> Option<&HookTemplate> {
        self.hooks.get(id)
    }

    fn mcp(&self, id: &str) -> Option<&McpTemplate> {
        self.mcp.get(id)
    }
}

impl LibrarySnapshot {
    pub fn with_agent(mut self, agent: AgentTemplate) -> Self {
        self.agents.insert(agent.id.clone(), agent);
        self
    }

    pub fn with_skill(mut self, skill: SkillTemplate) -> Self {
        self.skills.insert(skill.id.clone(), skill);
        self
    }

    pub fn with_hook(mut self, hook: HookTemplate) -> Self {
        self.hooks.insert(hook.id.clone(), hook);
        self
    }

    pub fn with_mcp(mut self, mcp: McpTemplate) -> Self {
        self.mcp.insert(mcp.id.clone(), mcp);
        self
    }

    pub fn len(&self) -> usize {
        self.agents.len() + self.skills.len() + self.hooks.len() + self.mcp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every agent template, by id.
    pub fn agents(&self) -> Vec<&AgentTemplate> {
        let mut agents: Vec<_> = self.agents.values().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    pub fn find_agents(&self, query: &AgentQuery) -> Vec<&AgentTemplate> {
        self.agents()
            .into_iter()
            .filter(|agent| query.matches(agent))
            .collect()
    }

    /// Load every source in order; an id found in a later source replaces
    /// the earlier entry. Missing source directories are skipped.
    pub fn load(sources: &[PathBuf]) -> Result<Self> {
        let mut snapshot = Self::default();
        for source in sources {
            if !source.is_dir() {
                tracing::warn!(source = %source.display(), "library source missing, skipped");
                continue;
            }
            snapshot.load_source(source)?;
        }
        tracing::debug!(templates = snapshot.len(), "template library loaded");
        Ok(snapshot)
    }

    fn load_source(&mut self, source: &Path) -> Result<()> {
        for path in files_with_ext(&source.join("agents"), "md")? {
            match load_agent(&path) {
                Ok(agent) => {
                    self.agents.insert(agent.id.clone(), agent);
                }
                Err(e) => tracing::warn!(error = %e, "skipping agent template"),
            }
        }

        let skills_dir = source.join("skills");
        if skills_dir.is_dir() {
            for entry in std::fs::read_dir(&skills_dir)? {
                let dir = entry?.path();
                let file = dir.join(crate::paths::SKILL_FILE);
                if !file.is_file() {
                    continue;
                }
                match load_skill(&dir, &file) {
                    Ok(skill) => {
                        self.skills.insert(skill.id.clone(), skill);
                    }
                    Err(e) => tracing::warn!(error = %e, "skipping skill template"),
                }
            }
        }

        for path in files_with_ext(&source.join("hooks"), "json")? {
            match load_json::<HookTemplate>(&path) {
                Ok(hook) => {
                    self.hooks.insert(hook.id.clone(), hook);
                }
                Err(e) => tracing::warn!(error = %e, "skipping hook template"),
            }
        }

        for path in files_with_ext(&source.join("mcp"), "json")? {
            match load_json::<McpTemplate>(&path) {
                Ok(mcp) => {
                    self.mcp.insert(mcp.id.clone(), mcp);
                }
                Err(e) => tracing::warn!(error = %e, "skipping MCP template"),
            }
        }
        Ok(())
    }
}

fn files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_agent(path: &Path) -> Result<AgentTemplate> {
    let content = std::fs::read_to_string(path)?;
    let doc = frontmatter::parse(path, &content)?;
    let id = file_stem(path);
    let fm = doc.header;
    let mut extra = fm.extra;
    keep_list(&mut extra, "allowed-tools", fm.allowed_tools);
    Ok(AgentTemplate {
        name: fm.name.unwrap_or_else(|| id.clone()),
        id,
        description: fm.description.unwrap_or_default(),
        tags: fm.tags,
        tools: fm.tools,
        model: fm.model,
        category: fm.category,
        suggested_for: fm.suggested_for,
        body: doc.body,
        extra,
    })
}

fn load_skill(dir: &Path, file: &Path) -> Result<SkillTemplate> {
    let content = std::fs::read_to_string(file)?;
    let doc = frontmatter::parse(file, &content)?;
    let id = file_stem(dir);
    let fm = doc.header;
    let mut extra = fm.extra;
    // Claude-style skills use `allowed-tools`, agent-style ones `tools`.
    let allowed_tools = if fm.allowed_tools.is_empty() {
        fm.tools
    } else {
        keep_list(&mut extra, "tools", fm.tools);
        fm.allowed_tools
    };
    keep_list(&mut extra, "tags", fm.tags);
    keep_text(&mut extra, "model", fm.model);
    keep_text(&mut extra, "category", fm.category);
    keep_list(&mut extra, "suggested-for", fm.suggested_for);
    Ok(SkillTemplate {
        name: fm.name.unwrap_or_else(|| id.clone()),
        id,
        description: fm.description.unwrap_or_default(),
        allowed_tools,
        body: doc.body,
        extra,
    })
}

/// Carry a header list the template type has no field for.
fn keep_list(extra: &mut BTreeMap<String, serde_yaml::Value>, key: &str, items: Vec<String>) {
    if !items.is_empty() {
        let items = items.into_iter().map(serde_yaml::Value::String).collect();
        extra.insert(key.to_string(), serde_yaml::Value::Sequence(items));
    }
}

fn keep_text(extra: &mut BTreeMap<String, serde_yaml::Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        extra.insert(key.to_string(), serde_yaml::Value::String(value));
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| ForgeError::InvalidTemplate {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// LibraryCache
// ---------------------------------------------------------------------------

/// Read-through cache over the template sources, owned by the caller.
///
/// The first [`snapshot`](Self::snapshot) loads from disk; later calls share
/// the same `Arc` until [`invalidate`](Self::invalidate) or
/// [`reload`](Self::reload).
pub struct LibraryCache {
    origin: Origin,
    loaded: RwLock<Option<Arc<LibrarySnapshot>>>,
}

enum Origin {
    Sources(Vec<PathBuf>),
    Fixed(Arc<LibrarySnapshot>),
}

impl LibraryCache {
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self {
            origin: Origin::Sources(sources),
            loaded: RwLock::new(None),
        }
    }

    /// A cache that never touches disk.
    pub fn preloaded(snapshot: LibrarySnapshot) -> Self {
        Self {
            origin: Origin::Fixed(Arc::new(snapshot)),
            loaded: RwLock::new(None),
        }
    }

    pub fn sources(&self) -> &[PathBuf] {
        match &self.origin {
            Origin::Sources(sources) => sources,
            Origin::Fixed(_) => &[],
        }
    }

    pub async fn snapshot(&self) -> Result<Arc<LibrarySnapshot>> {
        if let Some(snapshot) = self.loaded.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let mut guard = self.loaded.write().await;
        if let Some(snapshot) = guard.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = self.load().await?;
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        *self.loaded.write().await = None;
    }

    pub async fn reload(&self) -> Result<Arc<LibrarySnapshot>> {
        let snapshot = self.load().await?;
        *self.loaded.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn load(&self) -> Result<Arc<LibrarySnapshot>> {
        match &self.origin {
            Origin::Fixed(snapshot) => Ok(Arc::clone(snapshot)),
            Origin::Sources(sources) => {
                let sources = sources.clone();
                let snapshot =
                    tokio::task::spawn_blocking(move || LibrarySnapshot::load(&sources)).await??;
                Ok(Arc::new(snapshot))
            }
        }
    }
}
