use super::{runtime, Context};
use crate::output::{flag, print_json, print_table};
use teamforge_core::{DeployedConfig, ScopeSnapshot};

pub fn run(ctx: &Context, system: Option<&str>) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let service = ctx.service(&config);
    let rt = runtime()?;

    let configs = match system {
        Some(system) => {
            let one = rt.block_on(service.detect_system_config(system, &ctx.root))?;
            if ctx.json {
                return print_json(&one);
            }
            vec![one]
        }
        None => rt.block_on(service.detect_all_system_configs(&ctx.root)),
    };

    if ctx.json {
        return print_json(&configs);
    }

    let mut rows = Vec::new();
    for c in &configs {
        rows.push(row(c, "project", &c.project));
        if let Some(global) = &c.global {
            rows.push(row(c, "global", global));
        }
    }
    print_table(
        &[
            "SYSTEM", "SCOPE", "AGENTS", "SKILLS", "HOOKS", "MCP", "CONSTITUTION", "MEMORY",
            "MODIFIED",
        ],
        rows,
    );
    Ok(())
}

fn row(config: &DeployedConfig, scope: &str, s: &ScopeSnapshot) -> Vec<String> {
    if !s.exists {
        return vec![config.system.clone(), scope.to_string(), "(none)".to_string()];
    }
    vec![
        config.system.clone(),
        scope.to_string(),
        s.agents.to_string(),
        s.skills.to_string(),
        s.hooks.to_string(),
        s.mcp_servers.to_string(),
        flag(s.constitution),
        s.memory.to_string(),
        s.last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}
