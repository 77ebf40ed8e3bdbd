//! Cline: a `.clinerules` file plus a `memory-bank/` of context documents.
//! Project scope only.

use super::{write_constitution, DeployContext, DeployLog, Provider, Scope, ScopeLayout};
use crate::capability::{self, CapabilityDescriptor};
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::team::Team;
use async_trait::async_trait;
use std::path::Path;

/// Memory bank documents, in the order Cline reads them.
const MEMORY_FILES: &[(&str, &str)] = &[
    ("projectbrief.md", "Project Brief"),
    ("productContext.md", "Product Context"),
    ("activeContext.md", "Active Context"),
    ("systemPatterns.md", "System Patterns"),
    ("techContext.md", "Tech Context"),
    ("progress.md", "Progress"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ClineProvider;

impl ClineProvider {
    pub fn new() -> Self {
        Self
    }
}

fn memory_seed(file: &str, title: &str, team: &Team) -> String {
    let mut out = format!("# {title}\n\n");
    match file {
        "projectbrief.md" => {
            out.push_str(&format!("Team: {}\n", team.name.trim()));
            if !team.description.trim().is_empty() {
                out.push_str(&format!("\n{}\n", team.description.trim()));
            }
        }
        "progress.md" => out.push_str("## Done\n\n## Next\n"),
        _ => out.push_str("_Not yet documented._\n"),
    }
    out
}

#[async_trait]
impl Provider for ClineProvider {
    fn system(&self) -> &str {
        capability::CLINE
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::CLINE
    }

    fn scopes(&self) -> &'static [Scope] {
        &[Scope::Project]
    }

    fn layout(&self, project: &Path, _scope: Scope) -> Result<ScopeLayout> {
        let rules = project.join(paths::CLINE_RULES_FILE);
        let memory = project.join(paths::CLINE_MEMORY_BANK_DIR);
        let mut layout = ScopeLayout::new(&memory);
        layout.constitution_file = Some(rules.clone());
        layout.memory_dir = Some(memory.clone());
        layout.clear_paths = vec![memory, rules];
        Ok(layout)
    }

    async fn write_scope(
        &self,
        ctx: &DeployContext<'_>,
        layout: &ScopeLayout,
        log: &mut DeployLog,
    ) -> Result<()> {
        if let Some(path) = &layout.constitution_file {
            write_constitution(path, ctx.team, log).await?;
        }

        if let Some(dir) = &layout.memory_dir {
            io::ensure_dir(dir).await?;
            for (file, title) in MEMORY_FILES {
                let path = dir.join(file);
                // seed only; Cline owns these files afterwards
                if io::write_if_missing(&path, memory_seed(file, title, ctx.team).as_bytes()).await? {
                    log.wrote(&path);
                }
            }
        }
        Ok(())
    }
}
