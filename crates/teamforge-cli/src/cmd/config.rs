use super::Context;
use crate::output::print_json;
use clap::Subcommand;
use teamforge_core::config::WarnLevel;
use teamforge_core::CapabilityRegistry;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective config (defaults filled in)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config()?;
    if ctx.json {
        return print_json(&config);
    }
    println!("project:  {}", config.project.name);
    println!("targets:  {}", config.deploy.targets.join(", "));
    println!("location: {}", config.deploy.location);
    println!("clear:    {}", config.deploy.clear_existing);
    println!("library:");
    for source in config.library_sources(&ctx.root) {
        println!("  {}", source.display());
    }
    Ok(())
}

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let warnings = config.validate(&CapabilityRegistry::builtin(), &ctx.root);

    if ctx.json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
