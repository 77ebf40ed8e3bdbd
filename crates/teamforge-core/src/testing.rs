//! Shared fixtures for unit tests.

use crate::library::{
    AgentTemplate, HookTemplate, LibrarySnapshot, McpTemplate, McpTransport, SkillTemplate,
};
use crate::team::{GlobalSecurity, Permissions, Team, TeamAgent, TeamHook, TeamMcpServer, TeamSkill};
use std::collections::BTreeMap;

pub fn agent(id: &str, name: &str) -> AgentTemplate {
    AgentTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{name} agent"),
        tags: vec!["quality".to_string()],
        tools: vec!["Read".to_string(), "Grep".to_string()],
        model: Some("sonnet".to_string()),
        category: None,
        suggested_for: Vec::new(),
        body: format!("You are the {name}."),
        extra: BTreeMap::new(),
    }
}

pub fn library() -> LibrarySnapshot {
    LibrarySnapshot::default()
        .with_agent(agent("code-reviewer", "Code Reviewer"))
        .with_agent(agent("test-writer", "Test Writer"))
        .with_skill(SkillTemplate {
            id: "pdf".to_string(),
            name: "PDF".to_string(),
            description: "Work with PDF files".to_string(),
            allowed_tools: vec!["Bash".to_string(), "Read".to_string()],
            body: "Use pdftotext.".to_string(),
            extra: BTreeMap::new(),
        })
        .with_hook(HookTemplate {
            id: "lint".to_string(),
            name: "Lint".to_string(),
            description: String::new(),
            event: "PostToolUse".to_string(),
            matcher: Some("Edit".to_string()),
            hook_type: "command".to_string(),
            command: "npm run lint".to_string(),
            timeout: Some(60),
        })
        .with_mcp(McpTemplate {
            id: "github".to_string(),
            name: "GitHub".to_string(),
            description: String::new(),
            transport: McpTransport::Http {
                url: "https://api.example.com/mcp".to_string(),
                headers: BTreeMap::from([(
                    "Authorization".to_string(),
                    "Bearer ${GITHUB_TOKEN}".to_string(),
                )]),
            },
        })
        .with_mcp(McpTemplate {
            id: "fs".to_string(),
            name: "Filesystem".to_string(),
            description: String::new(),
            transport: McpTransport::Stdio {
                command: "npx".to_string(),
                args: vec!["-y".to_string(), "@mcp/filesystem".to_string()],
                env: BTreeMap::new(),
            },
        })
}

/// A team touching every category.
pub fn full_team() -> Team {
    let mut team = Team::new("Full Stack");
    team.id = "t-full".to_string();
    team.agents = vec![
        TeamAgent {
            agent_id: "test-writer".to_string(),
            order: 2,
            security: None,
        },
        TeamAgent {
            agent_id: "code-reviewer".to_string(),
            order: 1,
            security: None,
        },
    ];
    team.skills = vec![TeamSkill {
        skill_id: "pdf".to_string(),
        order: 0,
        security: None,
    }];
    team.hooks = vec![TeamHook {
        hook_id: "lint".to_string(),
        order: 0,
        security: None,
    }];
    team.mcp_servers = vec![
        TeamMcpServer {
            mcp_id: "github".to_string(),
            security: None,
        },
        TeamMcpServer {
            mcp_id: "fs".to_string(),
            security: None,
        },
    ];
    team.security = Some(GlobalSecurity {
        permissions: Permissions {
            allow: vec!["Read".to_string()],
            deny: vec!["Read(.env)".to_string()],
            ask: vec!["Bash(git push:*)".to_string()],
        },
        env: BTreeMap::from([("CI".to_string(), "1".to_string())]),
        configured: true,
    });
    team.constitution = Some("Write tests first.".to_string());
    team
}

pub fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
