//! Claude Code: agents, skills, hooks, security, MCP servers, CLAUDE.md.
//!
//! ```text
//! <project>/.claude/agents/<slug>.md
//! <project>/.claude/skills/<slug>/SKILL.md
//! <project>/.claude/settings.json      hooks, permissions, env
//! <project>/.mcp.json                  mcpServers
//! <project>/CLAUDE.md                  managed section
//! ```
//!
//! The global scope mirrors this under `~/.claude/`, except MCP servers,
//! which live in `~/.claude.json`.

use super::{
    hook_entry, home_or_default, mcp_entries, resolve_agents, resolve_hooks, resolve_skills,
    write_constitution, write_file, Claimed, DeployContext, DeployLog, Provider, Scope,
    ScopeLayout,
};
use crate::capability::{self, CapabilityDescriptor};
use crate::error::Result;
use crate::frontmatter;
use crate::library::{AgentTemplate, McpTransport, SkillTemplate};
use crate::paths;
use crate::settings;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ClaudeCodeProvider {
    home: Option<PathBuf>,
}

impl ClaudeCodeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `home` instead of the user's home directory for the global scope.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }
}

#[derive(Serialize)]
struct AgentHeader<'a> {
    name: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_yaml::Value>,
}

#[derive(Serialize)]
struct SkillHeader<'a> {
    name: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(rename = "allowed-tools", skip_serializing_if = "Option::is_none")]
    allowed_tools: Option<String>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_yaml::Value>,
}

fn comma_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}

pub(crate) fn agent_slug(agent: &AgentTemplate) -> String {
    paths::slugify(&agent.id, &agent.name)
}

fn render_agent(agent: &AgentTemplate) -> Result<String> {
    let header = AgentHeader {
        name: agent_slug(agent),
        description: &agent.description,
        tags: &agent.tags,
        tools: comma_list(&agent.tools),
        model: agent.model.as_deref(),
        extra: &agent.extra,
    };
    frontmatter::render(&header, &agent.body)
}

fn render_skill(skill: &SkillTemplate) -> Result<String> {
    let header = SkillHeader {
        name: paths::slugify(&skill.id, &skill.name),
        description: &skill.description,
        allowed_tools: comma_list(&skill.allowed_tools),
        extra: &skill.extra,
    };
    frontmatter::render(&header, &skill.body)
}

fn server_entry(transport: &McpTransport) -> Value {
    match transport {
        McpTransport::Stdio { command, args, env } => {
            let mut entry = json!({ "type": "stdio", "command": command, "args": args });
            if !env.is_empty() {
                entry["env"] = json!(env);
            }
            entry
        }
        McpTransport::Http { url, headers } | McpTransport::Sse { url, headers } => {
            let kind = if matches!(transport, McpTransport::Http { .. }) {
                "http"
            } else {
                "sse"
            };
            let mut entry = json!({ "type": kind, "url": url });
            if !headers.is_empty() {
                entry["headers"] = json!(headers);
            }
            entry
        }
    }
}

impl ClaudeCodeProvider {
    async fn write_settings(
        &self,
        ctx: &DeployContext<'_>,
        path: &Path,
        log: &mut DeployLog,
    ) -> Result<()> {
        let hooks: Vec<_> = resolve_hooks(ctx, log).into_iter().map(hook_entry).collect();
        if hooks.is_empty() && !ctx.team.has_security() {
            return Ok(());
        }

        let mut doc = settings::load_document(path).await?;
        settings::merge_hooks(&mut doc, &hooks);

        let (mut allow, mut deny) = match &ctx.team.security {
            Some(s) => (s.permissions.allow.clone(), s.permissions.deny.clone()),
            None => (Vec::new(), Vec::new()),
        };
        let (element_allow, element_deny) = ctx.team.element_permissions();
        allow.extend(element_allow);
        deny.extend(element_deny);
        let ask = ctx
            .team
            .security
            .as_ref()
            .map(|s| s.permissions.ask.clone())
            .unwrap_or_default();
        settings::merge_permissions(&mut doc, &allow, &deny, &ask);
        if let Some(security) = &ctx.team.security {
            settings::merge_env(&mut doc, &security.env);
        }

        settings::save_document(path, &doc).await?;
        log.wrote(path);
        Ok(())
    }

    async fn write_mcp(
        &self,
        ctx: &DeployContext<'_>,
        path: &Path,
        key: &str,
        log: &mut DeployLog,
    ) -> Result<()> {
        let servers = mcp_entries(ctx, log, server_entry);
        if servers.is_empty() {
            return Ok(());
        }
        let mut doc = settings::load_document(path).await?;
        settings::merge_servers(&mut doc, key, &servers);
        settings::save_document(path, &doc).await?;
        log.wrote(path);
        Ok(())
    }
}

#[async_trait]
impl Provider for ClaudeCodeProvider {
    fn system(&self) -> &str {
        capability::CLAUDE_CODE
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::CLAUDE_CODE
    }

    fn layout(&self, project: &Path, scope: Scope) -> Result<ScopeLayout> {
        let (base, mcp_file) = match scope {
            Scope::Project => (project.to_path_buf(), project.join(paths::CLAUDE_MCP_FILE)),
            Scope::Global => {
                let home = home_or_default(self.home.as_deref())?;
                let mcp = home.join(paths::CLAUDE_GLOBAL_MCP_FILE);
                (home, mcp)
            }
        };
        let root = base.join(paths::CLAUDE_DIR);
        let mut layout = ScopeLayout::new(&root);
        layout.agents_dir = Some(root.join(paths::CLAUDE_AGENTS_DIR));
        layout.skills_dir = Some(root.join(paths::CLAUDE_SKILLS_DIR));
        layout.settings_file = Some(root.join(paths::CLAUDE_SETTINGS_FILE));
        layout.mcp_file = Some((mcp_file.clone(), "mcpServers"));
        match scope {
            Scope::Project => {
                layout.constitution_file = Some(base.join(paths::CLAUDE_MD));
                layout.clear_paths = vec![root.clone(), mcp_file];
            }
            // ~/.claude also holds credentials and history
            Scope::Global => {
                layout.constitution_file = Some(root.join(paths::CLAUDE_MD));
                layout.clear_paths = vec![
                    root.join(paths::CLAUDE_AGENTS_DIR),
                    root.join(paths::CLAUDE_SKILLS_DIR),
                ];
            }
        }
        Ok(layout)
    }

    async fn write_scope(
        &self,
        ctx: &DeployContext<'_>,
        layout: &ScopeLayout,
        log: &mut DeployLog,
    ) -> Result<()> {
        if let Some(dir) = &layout.agents_dir {
            let mut claimed = Claimed::default();
            for agent in resolve_agents(ctx, log) {
                let slug = agent_slug(agent);
                if !claimed.claim("agent", &agent.id, &slug, log) {
                    continue;
                }
                write_file(&dir.join(format!("{slug}.md")), &render_agent(agent)?, log).await?;
            }
        }

        if let Some(dir) = &layout.skills_dir {
            let mut claimed = Claimed::default();
            for skill in resolve_skills(ctx, log) {
                let slug = paths::slugify(&skill.id, &skill.name);
                if !claimed.claim("skill", &skill.id, &slug, log) {
                    continue;
                }
                let path = dir.join(slug).join(paths::SKILL_FILE);
                write_file(&path, &render_skill(skill)?, log).await?;
            }
        }

        if let Some(path) = &layout.settings_file {
            self.write_settings(ctx, path, log).await?;
        }

        if let Some((path, key)) = &layout.mcp_file {
            self.write_mcp(ctx, path, key, log).await?;
        }

        if let Some(path) = &layout.constitution_file {
            write_constitution(path, ctx.team, log).await?;
        }
        Ok(())
    }
}
