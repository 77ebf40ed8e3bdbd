mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;
use teamforge_core::library::AgentQuery;

#[derive(Parser)]
#[command(
    name = "teamforge",
    about = "Deploy agent teams to AI coding assistants",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .teamforge/ or .git/)
    #[arg(long, global = true, env = "TEAMFORGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Extra template library directory, searched after the configured sources
    #[arg(long, global = true)]
    library: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write .teamforge/config.yaml if it is missing
    Init,

    /// List the target systems teamforge can deploy to
    Systems,

    /// Show what each target system supports
    Capabilities {
        /// Only this system (omit for all)
        system: Option<String>,
    },

    /// Check a team against one or more targets without writing anything
    Validate {
        /// Team file (.json, .yaml or .yml)
        #[arg(long)]
        team: PathBuf,
        /// Target system (repeatable; default: deploy.targets from config)
        #[arg(long = "target")]
        targets: Vec<String>,
    },

    /// Deploy a team to one or more targets
    Deploy {
        /// Team file (.json, .yaml or .yml)
        #[arg(long)]
        team: PathBuf,
        /// Target system (repeatable; default: deploy.targets from config)
        #[arg(long = "target")]
        targets: Vec<String>,
        /// Remove previously deployed content first
        #[arg(long)]
        clear: bool,
        /// project, global or both
        #[arg(long)]
        location: Option<String>,
    },

    /// Show what is already deployed for one or all targets
    Detect {
        /// Only this system (omit for all)
        system: Option<String>,
    },

    /// Find which of the given teams is deployed for a target
    Deployed {
        #[arg(long)]
        system: String,
        /// Candidate team file (repeatable)
        #[arg(long = "team", required = true)]
        teams: Vec<PathBuf>,
    },

    /// Browse agent templates in the library
    Library {
        /// Only agents in this category
        #[arg(long)]
        category: Option<String>,
        /// Keyword matched against name, description and tags
        #[arg(long)]
        search: Option<String>,
        /// Technology the project uses (repeatable)
        #[arg(long = "for")]
        technologies: Vec<String>,
    },

    /// Inspect the project config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Deploy { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let ctx = cmd::Context {
        root,
        library: cli.library,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&ctx),
        Commands::Systems => cmd::systems::run(&ctx),
        Commands::Capabilities { system } => cmd::systems::capabilities(&ctx, system.as_deref()),
        Commands::Validate { team, targets } => cmd::validate::run(&ctx, &team, targets),
        Commands::Deploy {
            team,
            targets,
            clear,
            location,
        } => cmd::deploy::run(&ctx, &team, targets, clear, location.as_deref()),
        Commands::Detect { system } => cmd::detect::run(&ctx, system.as_deref()),
        Commands::Deployed { system, teams } => cmd::deployed::run(&ctx, &system, &teams),
        Commands::Library {
            category,
            search,
            technologies,
        } => cmd::library::run(
            &ctx,
            AgentQuery {
                category,
                keyword: search,
                technologies,
            },
        ),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
