use super::{load_team, Context};
use crate::output::print_json;
use std::path::Path;
use teamforge_core::DeploymentValidation;

pub fn run(ctx: &Context, team: &Path, targets: Vec<String>) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let team = load_team(team)?;
    let targets = ctx.targets(targets, &config);
    let validation = ctx
        .service(&config)
        .validate_deployment(&team, &targets, &ctx.root);

    if ctx.json {
        print_json(&validation)?;
    } else {
        print_validation(&validation);
        if validation.valid {
            println!("Team '{}' can be deployed to {}.", team.name, targets.join(", "));
        }
    }

    if !validation.valid {
        anyhow::bail!("validation failed with {} error(s)", validation.errors.len());
    }
    Ok(())
}

pub fn print_validation(validation: &DeploymentValidation) {
    for e in &validation.errors {
        println!("[error] {e}");
    }
    for w in &validation.warnings {
        println!("[warning] {}: {}", w.system, w.message);
    }
}
