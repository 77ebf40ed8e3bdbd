use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Built-in target systems
// ---------------------------------------------------------------------------

pub const CLAUDE_CODE: &str = "claude-code";
pub const GEMINI_CLI: &str = "gemini-cli";
pub const OPENCODE: &str = "opencode";
pub const CLINE: &str = "cline";

// ---------------------------------------------------------------------------
// CapabilityDescriptor
// ---------------------------------------------------------------------------

/// Which feature categories a target system can represent on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub agents: bool,
    pub skills: bool,
    pub hooks: bool,
    pub mcp_servers: bool,
    pub constitution: bool,
    pub memory: bool,
}

impl CapabilityDescriptor {
    pub const NONE: CapabilityDescriptor = CapabilityDescriptor {
        agents: false,
        skills: false,
        hooks: false,
        mcp_servers: false,
        constitution: false,
        memory: false,
    };

    pub const CLAUDE_CODE: CapabilityDescriptor = CapabilityDescriptor {
        agents: true,
        skills: true,
        hooks: true,
        mcp_servers: true,
        constitution: true,
        memory: false,
    };

    pub const GEMINI_CLI: CapabilityDescriptor = CapabilityDescriptor {
        mcp_servers: true,
        constitution: true,
        ..CapabilityDescriptor::NONE
    };

    pub const OPENCODE: CapabilityDescriptor = CapabilityDescriptor {
        agents: true,
        mcp_servers: true,
        constitution: true,
        ..CapabilityDescriptor::NONE
    };

    pub const CLINE: CapabilityDescriptor = CapabilityDescriptor {
        constitution: true,
        memory: true,
        ..CapabilityDescriptor::NONE
    };

    pub fn supports(&self, category: Category) -> bool {
        match category {
            Category::Agents => self.agents,
            Category::Skills => self.skills,
            // security rules live in the same settings document as hooks
            Category::Hooks | Category::Security => self.hooks,
            Category::McpServers => self.mcp_servers,
            Category::Constitution => self.constitution,
            Category::Memory => self.memory,
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Agents,
    Skills,
    Hooks,
    McpServers,
    Security,
    Constitution,
    Memory,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Agents => "agents",
            Category::Skills => "skills",
            Category::Hooks => "hooks",
            Category::McpServers => "MCP servers",
            Category::Security => "security rules",
            Category::Constitution => "constitution",
            Category::Memory => "memory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CapabilityRegistry
// ---------------------------------------------------------------------------

/// Static table of target systems and what each supports.
///
/// Entries keep registration order; that order is what
/// [`CapabilityRegistry::all_systems`] reports.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: Vec<(String, CapabilityDescriptor)>,
}

impl CapabilityRegistry {
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                (CLAUDE_CODE.to_string(), CapabilityDescriptor::CLAUDE_CODE),
                (GEMINI_CLI.to_string(), CapabilityDescriptor::GEMINI_CLI),
                (OPENCODE.to_string(), CapabilityDescriptor::OPENCODE),
                (CLINE.to_string(), CapabilityDescriptor::CLINE),
            ],
        }
    }

    /// Register (or replace) a system's descriptor.
    pub fn insert(&mut self, system: impl Into<String>, caps: CapabilityDescriptor) {
        let system = system.into();
        match self.entries.iter_mut().find(|(s, _)| *s == system) {
            Some(entry) => entry.1 = caps,
            None => self.entries.push((system, caps)),
        }
    }

    pub fn get(&self, system: &str) -> Option<CapabilityDescriptor> {
        self.entries
            .iter()
            .find(|(s, _)| s == system)
            .map(|(_, caps)| *caps)
    }

    pub fn capabilities(&self, system: &str) -> Result<CapabilityDescriptor> {
        self.get(system)
            .ok_or_else(|| ForgeError::UnknownSystem(system.to_string()))
    }

    pub fn all_systems(&self) -> Vec<String> {
        self.entries.iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn contains(&self, system: &str) -> bool {
        self.get(system).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_systems_in_registration_order() {
        let reg = CapabilityRegistry::builtin();
        assert_eq!(reg.all_systems(), [CLAUDE_CODE, GEMINI_CLI, OPENCODE, CLINE]);
    }

    #[test]
    fn unknown_system_is_error() {
        let reg = CapabilityRegistry::builtin();
        assert!(matches!(
            reg.capabilities("vscode"),
            Err(ForgeError::UnknownSystem(s)) if s == "vscode"
        ));
    }

    #[test]
    fn security_follows_hooks() {
        assert!(CapabilityDescriptor::CLAUDE_CODE.supports(Category::Security));
        assert!(!CapabilityDescriptor::GEMINI_CLI.supports(Category::Security));
        assert!(CapabilityDescriptor::CLINE.supports(Category::Memory));
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut reg = CapabilityRegistry::builtin();
        reg.insert(CLINE, CapabilityDescriptor::NONE);
        reg.insert("sys-a", CapabilityDescriptor::CLAUDE_CODE);
        assert_eq!(reg.get(CLINE), Some(CapabilityDescriptor::NONE));
        assert_eq!(reg.all_systems().len(), 5);
    }

    #[test]
    fn descriptor_serializes_camel_case() {
        let json = serde_json::to_string(&CapabilityDescriptor::GEMINI_CLI).unwrap();
        assert!(json.contains("\"mcpServers\":true"));
    }
}
