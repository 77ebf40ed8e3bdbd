//! The deployable unit: a team of agents, skills, hooks, MCP servers and
//! security rules, referencing templates by id.

use crate::capability::CapabilityDescriptor;
use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub ask: Vec<String>,
}

impl Permissions {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty() && self.ask.is_empty()
    }
}

/// Team-wide security rules. `ask` and `env` only exist at this level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSecurity {
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub configured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementPermissions {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSecurity {
    #[serde(default)]
    pub permissions: ElementPermissions,
    #[serde(default)]
    pub configured: bool,
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAgent {
    pub agent_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<ElementSecurity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSkill {
    pub skill_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<ElementSecurity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamHook {
    pub hook_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<ElementSecurity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMcpServer {
    pub mcp_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<ElementSecurity>,
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<TeamAgent>,
    #[serde(default)]
    pub skills: Vec<TeamSkill>,
    #[serde(default)]
    pub hooks: Vec<TeamHook>,
    #[serde(default)]
    pub mcp_servers: Vec<TeamMcpServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<GlobalSecurity>,
    /// Free-text guidance rendered into constitution files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constitution: Option<String>,
}

impl Team {
    /// A fresh, empty team with a newly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            agents: Vec::new(),
            skills: Vec::new(),
            hooks: Vec::new(),
            mcp_servers: Vec::new(),
            security: None,
            constitution: None,
        }
    }

    /// Load a team from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let team = if is_yaml {
            serde_yaml::from_str(&data)?
        } else {
            serde_json::from_str(&data)?
        };
        Ok(team)
    }

    /// Structural problems that make the team undeployable.
    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.trim().is_empty() {
            errors.push("team is missing required field 'id'".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("team is missing required field 'name'".to_string());
        }
        errors
    }

    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.structural_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ForgeError::InvalidTeam(errors.join("; ")))
        }
    }

    pub fn ordered_agents(&self) -> Vec<&TeamAgent> {
        let mut agents: Vec<_> = self.agents.iter().collect();
        // stable: equal orders keep insertion order
        agents.sort_by_key(|a| a.order);
        agents
    }

    pub fn ordered_skills(&self) -> Vec<&TeamSkill> {
        let mut skills: Vec<_> = self.skills.iter().collect();
        skills.sort_by_key(|s| s.order);
        skills
    }

    pub fn ordered_hooks(&self) -> Vec<&TeamHook> {
        let mut hooks: Vec<_> = self.hooks.iter().collect();
        hooks.sort_by_key(|h| h.order);
        hooks
    }

    pub fn constitution_text(&self) -> Option<&str> {
        self.constitution
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn has_security(&self) -> bool {
        let global = self
            .security
            .as_ref()
            .is_some_and(|s| s.configured || !s.permissions.is_empty() || !s.env.is_empty());
        let element = |s: &Option<ElementSecurity>| s.as_ref().is_some_and(|s| s.configured);
        global
            || self.agents.iter().any(|a| element(&a.security))
            || self.skills.iter().any(|s| element(&s.security))
            || self.hooks.iter().any(|h| element(&h.security))
            || self.mcp_servers.iter().any(|m| element(&m.security))
    }

    /// Every element-level permission, in deployment order, as (allow, deny).
    pub fn element_permissions(&self) -> (Vec<String>, Vec<String>) {
        let mut allow = Vec::new();
        let mut deny = Vec::new();
        let mut push = |s: &Option<ElementSecurity>| {
            if let Some(sec) = s.as_ref().filter(|s| s.configured) {
                allow.extend(sec.permissions.allow.iter().cloned());
                deny.extend(sec.permissions.deny.iter().cloned());
            }
        };
        for a in self.ordered_agents() {
            push(&a.security);
        }
        for s in self.ordered_skills() {
            push(&s.security);
        }
        for h in self.ordered_hooks() {
            push(&h.security);
        }
        for m in &self.mcp_servers {
            push(&m.security);
        }
        (allow, deny)
    }

    /// Copy of the team with every category `caps` cannot represent removed.
    ///
    /// Security travels with `hooks`: both land in the same settings document.
    pub fn restricted_to(&self, caps: &CapabilityDescriptor) -> Team {
        let mut team = self.clone();
        if !caps.agents {
            team.agents.clear();
        }
        if !caps.skills {
            team.skills.clear();
        }
        if !caps.hooks {
            team.hooks.clear();
            team.security = None;
            for a in &mut team.agents {
                a.security = None;
            }
            for s in &mut team.skills {
                s.security = None;
            }
            for m in &mut team.mcp_servers {
                m.security = None;
            }
        }
        if !caps.mcp_servers {
            team.mcp_servers.clear();
        }
        if !caps.constitution {
            team.constitution = None;
        }
        team
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, order: i64) -> TeamAgent {
        TeamAgent {
            agent_id: id.to_string(),
            order,
            security: None,
        }
    }

    #[test]
    fn new_team_gets_unique_ids() {
        let a = Team::new("a");
        let b = Team::new("a");
        assert_ne!(a.id, b.id);
        assert!(a.structural_errors().is_empty());
    }

    #[test]
    fn ordering_is_stable_on_ties() {
        let mut team = Team::new("t");
        team.agents = vec![agent("c", 5), agent("a", 1), agent("b", 5), agent("d", -2)];
        let ids: Vec<_> = team
            .ordered_agents()
            .iter()
            .map(|a| a.agent_id.as_str())
            .collect();
        assert_eq!(ids, ["d", "a", "c", "b"]);
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "id": "t1",
            "name": "Reviewers",
            "agents": [{"agentId": "code-reviewer", "order": 1}],
            "skills": [],
            "hooks": [{"hookId": "pre-commit-lint", "order": 1,
                       "security": {"permissions": {"allow": ["Bash(npm run lint)"], "deny": []}, "configured": true}}],
            "mcpServers": [{"mcpId": "github"}],
            "security": {"permissions": {"allow": [], "deny": ["Read(.env)"], "ask": []}, "env": {"CI": "1"}, "configured": true}
        }"#;
        let team: Team = serde_json::from_str(json).unwrap();
        assert_eq!(team.agents[0].agent_id, "code-reviewer");
        assert_eq!(team.mcp_servers[0].mcp_id, "github");
        assert!(team.has_security());
        let (allow, deny) = team.element_permissions();
        assert_eq!(allow, ["Bash(npm run lint)"]);
        assert!(deny.is_empty());
    }

    #[test]
    fn missing_name_is_structural_error() {
        let mut team = Team::new("");
        team.id = String::new();
        let errors = team.structural_errors();
        assert_eq!(errors.len(), 2);
        assert!(team.ensure_valid().is_err());
    }

    #[test]
    fn restricted_to_drops_unsupported_categories() {
        let mut team = Team::new("t");
        team.agents.push(agent("a", 0));
        team.hooks.push(TeamHook {
            hook_id: "h".into(),
            order: 0,
            security: None,
        });
        team.security = Some(GlobalSecurity {
            configured: true,
            ..Default::default()
        });
        team.constitution = Some("be nice".into());

        let caps = CapabilityDescriptor {
            agents: true,
            constitution: true,
            ..CapabilityDescriptor::NONE
        };
        let restricted = team.restricted_to(&caps);
        assert_eq!(restricted.agents.len(), 1);
        assert!(restricted.hooks.is_empty());
        assert!(restricted.security.is_none());
        assert_eq!(restricted.constitution_text(), Some("be nice"));
    }
}
