//! OpenCode: subagents under `.opencode/agent/`, MCP servers in
//! `opencode.json`, guidance in `AGENTS.md`.

use super::{
    home_or_default, mcp_entries, resolve_agents, write_constitution, write_file, Claimed,
    DeployContext, DeployLog, Provider, Scope, ScopeLayout,
};
use crate::capability::{self, CapabilityDescriptor};
use crate::error::Result;
use crate::frontmatter;
use crate::library::{AgentTemplate, McpTransport};
use crate::paths;
use crate::settings;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct OpenCodeProvider {
    home: Option<PathBuf>,
}

impl OpenCodeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }
}

#[derive(Serialize)]
struct AgentHeader<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    /// Tool name (lowercased) to enabled flag.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tools: BTreeMap<String, bool>,
}

fn render_agent(agent: &AgentTemplate) -> Result<String> {
    let header = AgentHeader {
        description: &agent.description,
        mode: "subagent",
        model: agent.model.as_deref(),
        tools: agent
            .tools
            .iter()
            .map(|t| (t.to_lowercase(), true))
            .collect(),
    };
    frontmatter::render(&header, &agent.body)
}

fn server_entry(transport: &McpTransport) -> Value {
    match transport {
        McpTransport::Stdio { command, args, env } => {
            let mut cmd = vec![command.clone()];
            cmd.extend(args.iter().cloned());
            let mut entry = json!({ "type": "local", "command": cmd, "enabled": true });
            if !env.is_empty() {
                entry["environment"] = json!(env);
            }
            entry
        }
        McpTransport::Http { url, headers } | McpTransport::Sse { url, headers } => {
            let mut entry = json!({ "type": "remote", "url": url, "enabled": true });
            if !headers.is_empty() {
                entry["headers"] = json!(headers);
            }
            entry
        }
    }
}

#[async_trait]
impl Provider for OpenCodeProvider {
    fn system(&self) -> &str {
        capability::OPENCODE
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::OPENCODE
    }

    fn layout(&self, project: &Path, scope: Scope) -> Result<ScopeLayout> {
        // project config sits beside the hidden dir; global config inside it
        let (root, base) = match scope {
            Scope::Project => (project.join(paths::OPENCODE_DIR), project.to_path_buf()),
            Scope::Global => {
                let root = home_or_default(self.home.as_deref())?.join(paths::OPENCODE_GLOBAL_DIR);
                (root.clone(), root)
            }
        };
        let agents_dir = root.join(paths::OPENCODE_AGENT_DIR);
        let config_file = base.join(paths::OPENCODE_CONFIG_FILE);

        let mut layout = ScopeLayout::new(&root);
        layout.agents_dir = Some(agents_dir.clone());
        layout.mcp_file = Some((config_file.clone(), "mcp"));
        layout.constitution_file = Some(base.join(paths::AGENTS_MD));
        layout.clear_paths = match scope {
            Scope::Project => vec![root],
            Scope::Global => vec![agents_dir],
        };
        layout.clear_keys = vec![(config_file, "mcp")];
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
                let slug = paths::slugify(&agent.id, &agent.name);
                if !claimed.claim("agent", &agent.id, &slug, log) {
                    continue;
                }
                write_file(&dir.join(format!("{slug}.md")), &render_agent(agent)?, log).await?;
            }
        }

        if let Some((path, key)) = &layout.mcp_file {
            let servers = mcp_entries(ctx, log, server_entry);
            if !servers.is_empty() {
                let mut doc = settings::load_document(path).await?;
                if !doc.contains_key("$schema") {
                    doc.insert(
                        "$schema".to_string(),
                        json!("https://opencode.ai/config.json"),
                    );
                }
                settings::merge_servers(&mut doc, key, &servers);
                settings::save_document(path, &doc).await?;
                log.wrote(path);
            }
        }

        if let Some(path) = &layout.constitution_file {
            write_constitution(path, ctx.team, log).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DeployOptions, Location};
    use crate::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn renders_subagents_and_local_servers() {
        let dir = TempDir::new().unwrap();
        let result = OpenCodeProvider::new()
            .deploy(
                &testing::full_team(),
                &testing::library(),
                dir.path(),
                &DeployOptions::default(),
            )
            .await;
        assert!(result.success, "{:?}", result.error);

        let agent =
            std::fs::read_to_string(dir.path().join(".opencode/agent/code-reviewer.md")).unwrap();
        assert!(agent.contains("mode: subagent\n"));
        assert!(agent.contains("tools:\n  grep: true\n  read: true\n"));
        assert!(!agent.contains("name:"));

        let config = testing::read_json(&dir.path().join("opencode.json"));
        assert_eq!(
            config["mcp"]["filesystem"]["command"],
            json!(["npx", "-y", "@mcp/filesystem"])
        );
        assert_eq!(config["mcp"]["github"]["type"], "remote");
        assert!(dir.path().join("AGENTS.md").exists());
        // no skills or hooks for this target
        assert!(!dir.path().join(".opencode/skills").exists());
        assert_eq!(result.files_written.len(), 4);
    }

    #[tokio::test]
    async fn project_clear_keeps_user_config_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".opencode/agent")).unwrap();
        std::fs::write(dir.path().join(".opencode/agent/stale.md"), "x").unwrap();
        std::fs::write(
            dir.path().join("opencode.json"),
            r#"{"model": "anthropic/claude", "mcp": {"old": {"type": "local"}}}"#,
        )
        .unwrap();

        let options = DeployOptions {
            clear_existing: true,
            location: Location::Project,
        };
        let result = OpenCodeProvider::new()
            .deploy(&testing::full_team(), &testing::library(), dir.path(), &options)
            .await;

        assert!(result.success);
        assert!(!dir.path().join(".opencode/agent/stale.md").exists());
        let config = testing::read_json(&dir.path().join("opencode.json"));
        assert_eq!(config["model"], "anthropic/claude");
        assert!(config["mcp"].get("old").is_none());
        assert!(config["mcp"].get("github").is_some());
    }

    #[tokio::test]
    async fn global_scope_under_config_dir() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let options = DeployOptions {
            clear_existing: false,
            location: Location::Both,
        };
        let result = OpenCodeProvider::with_home(&home)
            .deploy(&testing::full_team(), &testing::library(), dir.path(), &options)
            .await;

        assert!(result.success);
        assert!(home.join(".config/opencode/agent/test-writer.md").exists());
        assert!(home.join(".config/opencode/opencode.json").exists());
        assert!(dir.path().join(".opencode/agent/test-writer.md").exists());
    }
}
