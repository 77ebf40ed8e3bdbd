use super::validate::print_validation;
use super::{load_team, runtime, Context};
use crate::output::print_json;
use anyhow::Context as _;
use std::path::Path;
use teamforge_core::{DeployOptions, DeploymentResult, Location};

pub fn run(
    ctx: &Context,
    team: &Path,
    targets: Vec<String>,
    clear: bool,
    location: Option<&str>,
) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let team = load_team(team)?;
    let targets = ctx.targets(targets, &config);
    let location = match location {
        Some(l) => l.parse::<Location>().context("invalid --location")?,
        None => config.deploy.location,
    };
    let options = DeployOptions {
        clear_existing: clear || config.deploy.clear_existing,
        location,
    };
    let service = ctx.service(&config);

    tracing::info!(team = %team.name, targets = ?targets, %location, "deploying");
    let rt = runtime()?;

    if !ctx.json {
        // capability warnings go out before anything is written
        print_validation(&service.validate_deployment(&team, &targets, &ctx.root));
    }

    if let [system] = targets.as_slice() {
        let result = rt
            .block_on(service.deploy(&team, system, &ctx.root, &options))
            .context("deploy failed")?;
        if ctx.json {
            print_json(&result)?;
        } else {
            print_result(&result);
            println!("{} of 1 systems deployed", usize::from(result.success));
        }
        if !result.success {
            anyhow::bail!("deploy to {system} failed");
        }
        return Ok(());
    }

    let multi = rt
        .block_on(service.deploy_to_multiple(&team, &targets, &ctx.root, &options))
        .context("deploy failed")?;
    if ctx.json {
        print_json(&multi)?;
    } else {
        // report in the order the targets were requested
        let mut printed: Vec<&str> = Vec::new();
        for system in &targets {
            if printed.contains(&system.as_str()) {
                continue;
            }
            printed.push(system);
            if let Some(result) = multi.results.get(system) {
                print_result(result);
            }
        }
        println!("{}", multi.summary());
    }
    if !multi.success {
        anyhow::bail!("{} of {} targets failed", multi.errors.len(), multi.results.len());
    }
    Ok(())
}

fn print_result(result: &DeploymentResult) {
    let status = if result.success { "ok" } else { "FAILED" };
    println!(
        "{}: {status} ({} files)",
        result.system,
        result.files_written.len()
    );
    for path in &result.files_written {
        println!("  wrote: {}", path.display());
    }
    for w in &result.warnings {
        println!("  warning: {w}");
    }
    if let Some(e) = &result.error {
        println!("  error: {e}");
    }
}
