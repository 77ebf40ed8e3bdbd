use crate::error::{ForgeError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// teamforge's own files
// ---------------------------------------------------------------------------

pub const TEAMFORGE_DIR: &str = ".teamforge";
pub const CONFIG_FILE: &str = ".teamforge/config.yaml";

/// Markers delimiting the managed section in constitution files.
pub const SECTION_START: &str = "<!-- teamforge:start -->";
pub const SECTION_END: &str = "<!-- teamforge:end -->";

// ---------------------------------------------------------------------------
// Claude Code
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const CLAUDE_AGENTS_DIR: &str = "agents";
pub const CLAUDE_SKILLS_DIR: &str = "skills";
pub const CLAUDE_SETTINGS_FILE: &str = "settings.json";
pub const CLAUDE_MCP_FILE: &str = ".mcp.json";
pub const CLAUDE_GLOBAL_MCP_FILE: &str = ".claude.json";
pub const CLAUDE_MD: &str = "CLAUDE.md";
pub const SKILL_FILE: &str = "SKILL.md";

// ---------------------------------------------------------------------------
// Gemini CLI
// ---------------------------------------------------------------------------

pub const GEMINI_DIR: &str = ".gemini";
pub const GEMINI_SETTINGS_FILE: &str = "settings.json";
pub const GEMINI_MD: &str = "GEMINI.md";

// ---------------------------------------------------------------------------
// OpenCode
// ---------------------------------------------------------------------------

pub const OPENCODE_DIR: &str = ".opencode";
pub const OPENCODE_GLOBAL_DIR: &str = ".config/opencode";
pub const OPENCODE_AGENT_DIR: &str = "agent";
pub const OPENCODE_CONFIG_FILE: &str = "opencode.json";
pub const AGENTS_MD: &str = "AGENTS.md";

// ---------------------------------------------------------------------------
// Cline
// ---------------------------------------------------------------------------

pub const CLINE_RULES_FILE: &str = ".clinerules";
pub const CLINE_MEMORY_BANK_DIR: &str = "memory-bank";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn teamforge_dir(root: &Path) -> PathBuf {
    root.join(TEAMFORGE_DIR)
}

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(ForgeError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();
static NON_SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").expect("static slug regex")
    })
}

fn non_slug_re() -> &'static Regex {
    NON_SLUG_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static slug regex"))
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(ForgeError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Lowercase, collapse every non-alphanumeric run into `-`, trim dashes.
/// Falls back to `fallback` when nothing usable remains.
pub fn slugify(name: &str, fallback: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = non_slug_re().replace_all(&lowered, "-");
    let mut slug = slug.trim_matches('-').to_string();
    slug.truncate(64);
    let slug = slug.trim_end_matches('-').to_string();
    if validate_slug(&slug).is_ok() {
        slug
    } else if fallback.is_empty() {
        "unnamed".to_string()
    } else {
        slugify(fallback, "")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
