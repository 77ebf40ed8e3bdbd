use super::Context;
use anyhow::Context as _;
use teamforge_core::config::Config;
use teamforge_core::paths;

/// Template kinds a library source may hold, one directory each.
const LIBRARY_DIRS: [&str; 4] = ["agents", "skills", "hooks", "mcp"];

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let root = &ctx.root;
    println!("Initializing teamforge in: {}", root.display());

    let dir = paths::teamforge_dir(root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let config = if Config::exists(root) {
        println!("  exists:  {}", paths::CONFIG_FILE);
        ctx.config()?
    } else {
        let config = Config::default_for(root);
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        config
    };

    // Only sources inside the project are scaffolded; a shared library
    // elsewhere is left alone.
    for source in config.library_sources(root) {
        if !source.starts_with(root) || source.is_dir() {
            continue;
        }
        for sub in LIBRARY_DIRS {
            let p = source.join(sub);
            std::fs::create_dir_all(&p)
                .with_context(|| format!("failed to create {}", p.display()))?;
        }
        println!("  created: {}", source.display());
    }

    Ok(())
}
