use super::Context;
use crate::output::{flag, print_json, print_table};
use teamforge_core::service::SystemCapabilities;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let systems = ctx.service(&config).get_available_systems();
    if ctx.json {
        return print_json(&systems);
    }
    for system in systems {
        println!("{system}");
    }
    Ok(())
}

pub fn capabilities(ctx: &Context, system: Option<&str>) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let service = ctx.service(&config);

    let rows = match system {
        Some(system) => {
            let one = SystemCapabilities {
                system: system.to_string(),
                capabilities: service.get_system_capabilities(system, &ctx.root)?,
            };
            if ctx.json {
                return print_json(&one);
            }
            vec![one]
        }
        None => service.get_all_system_capabilities(&ctx.root),
    };

    if ctx.json {
        return print_json(&rows);
    }

    print_table(
        &["SYSTEM", "AGENTS", "SKILLS", "HOOKS", "MCP", "CONSTITUTION", "MEMORY"],
        rows.iter()
            .map(|r| {
                let c = &r.capabilities;
                vec![
                    r.system.clone(),
                    flag(c.agents),
                    flag(c.skills),
                    flag(c.hooks),
                    flag(c.mcp_servers),
                    flag(c.constitution),
                    flag(c.memory),
                ]
            })
            .collect(),
    );
    Ok(())
}
