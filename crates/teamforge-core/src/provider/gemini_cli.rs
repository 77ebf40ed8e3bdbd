//! Gemini CLI: MCP servers in `.gemini/settings.json`, guidance in `GEMINI.md`.

use super::{
    home_or_default, mcp_entries, write_constitution, DeployContext, DeployLog, Provider, Scope,
    ScopeLayout,
};
use crate::capability::{self, CapabilityDescriptor};
use crate::error::Result;
use crate::library::McpTransport;
use crate::paths;
use crate::settings;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct GeminiCliProvider {
    home: Option<PathBuf>,
}

impl GeminiCliProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }
}

fn server_entry(transport: &McpTransport) -> Value {
    let (mut entry, headers) = match transport {
        McpTransport::Stdio { command, args, env } => {
            let mut entry = json!({ "command": command, "args": args });
            if !env.is_empty() {
                entry["env"] = json!(env);
            }
            return entry;
        }
        McpTransport::Http { url, headers } => (json!({ "httpUrl": url }), headers),
        McpTransport::Sse { url, headers } => (json!({ "url": url }), headers),
    };
    if !headers.is_empty() {
        entry["headers"] = json!(headers);
    }
    entry
}

#[async_trait]
impl Provider for GeminiCliProvider {
    fn system(&self) -> &str {
        capability::GEMINI_CLI
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::GEMINI_CLI
    }

    fn layout(&self, project: &Path, scope: Scope) -> Result<ScopeLayout> {
        let base = match scope {
            Scope::Project => project.to_path_buf(),
            Scope::Global => home_or_default(self.home.as_deref())?,
        };
        let root = base.join(paths::GEMINI_DIR);
        let settings_file = root.join(paths::GEMINI_SETTINGS_FILE);
        let mut layout = ScopeLayout::new(&root);
        layout.mcp_file = Some((settings_file.clone(), "mcpServers"));
        match scope {
            Scope::Project => {
                layout.constitution_file = Some(base.join(paths::GEMINI_MD));
                layout.clear_paths = vec![root];
            }
            Scope::Global => {
                layout.constitution_file = Some(root.join(paths::GEMINI_MD));
                layout.clear_keys = vec![(settings_file, "mcpServers")];
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
        if let Some((path, key)) = &layout.mcp_file {
            let servers = mcp_entries(ctx, log, server_entry);
            if !servers.is_empty() {
                let mut doc = settings::load_document(path).await?;
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
    async fn writes_mcp_and_constitution_only() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join(".gemini/settings.json");
        std::fs::create_dir_all(settings.parent().unwrap()).unwrap();
        std::fs::write(&settings, r#"{"theme": "GitHub", "mcpServers": {"github": {"url": "stale"}}}"#)
            .unwrap();

        let result = GeminiCliProvider::new()
            .deploy(
                &testing::full_team(),
                &testing::library(),
                dir.path(),
                &DeployOptions::default(),
            )
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(
            result.files_written,
            [settings.clone(), dir.path().join("GEMINI.md")]
        );
        let doc = testing::read_json(&settings);
        assert_eq!(doc["theme"], "GitHub");
        assert_eq!(
            doc["mcpServers"]["github"],
            json!({"httpUrl": "https://api.example.com/mcp", "headers": {"Authorization": "Bearer ${GITHUB_TOKEN}"}})
        );
        assert_eq!(doc["mcpServers"]["filesystem"]["command"], "npx");
        assert!(!dir.path().join(".claude").exists());
        assert!(!dir.path().join(".gemini/agents").exists());
    }

    #[tokio::test]
    async fn global_clear_drops_only_mcp_servers() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let settings = home.join(".gemini/settings.json");
        std::fs::create_dir_all(settings.parent().unwrap()).unwrap();
        std::fs::write(
            &settings,
            r#"{"selectedAuthType": "oauth", "mcpServers": {"old": {"command": "x"}}}"#,
        )
        .unwrap();

        let options = DeployOptions {
            clear_existing: true,
            location: Location::Global,
        };
        let result = GeminiCliProvider::with_home(&home)
            .deploy(&testing::full_team(), &testing::library(), dir.path(), &options)
            .await;

        assert!(result.success, "{:?}", result.error);
        let doc = testing::read_json(&settings);
        assert_eq!(doc["selectedAuthType"], "oauth");
        assert!(doc["mcpServers"].get("old").is_none());
        assert!(doc["mcpServers"].get("github").is_some());
        assert!(home.join(".gemini/GEMINI.md").exists());
    }
}
