use super::{runtime, Context};
use crate::output::{print_json, print_table};
use anyhow::Context as _;
use teamforge_core::library::AgentQuery;

pub fn run(ctx: &Context, query: AgentQuery) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let service = ctx.service(&config);
    let snapshot = runtime()?
        .block_on(service.library().snapshot())
        .context("failed to load template library")?;
    let agents = snapshot.find_agents(&query);

    if ctx.json {
        return print_json(&agents);
    }
    if agents.is_empty() {
        println!("No matching agents.");
        return Ok(());
    }

    let rows = agents
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.name.clone(),
                a.category.clone().unwrap_or_else(|| "-".to_string()),
                a.description.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "CATEGORY", "DESCRIPTION"], rows);
    Ok(())
}
