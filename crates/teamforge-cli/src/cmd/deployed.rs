use super::{load_team, runtime, Context};
use crate::output::print_json;
use anyhow::Context as _;
use std::path::PathBuf;

pub fn run(ctx: &Context, system: &str, team_files: &[PathBuf]) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let teams = team_files
        .iter()
        .map(|p| load_team(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let service = ctx.service(&config);

    let found = runtime()?
        .block_on(service.find_deployed_team(&teams, system, &ctx.root))
        .with_context(|| format!("failed to inspect {system} deployment"))?;

    if ctx.json {
        let value = serde_json::json!({
            "system": system,
            "team": found.map(|t| serde_json::json!({ "id": t.id, "name": t.name })),
        });
        return print_json(&value);
    }

    match found {
        Some(team) => println!("{system}: {} ({})", team.name, team.id),
        None => println!("{system}: no matching team deployed"),
    }
    Ok(())
}
