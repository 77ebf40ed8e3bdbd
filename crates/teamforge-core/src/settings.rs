//! Merge operations on JSON settings documents owned partly by the user.
//!
//! Only the keys a merge is about are touched; everything else in the
//! document survives byte-for-byte in value.

use crate::error::{ForgeError, Result};
use crate::io;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Load a JSON object from `path`; a missing or empty file is an empty object.
///
/// A file that exists but is not a JSON object is an error: it is never
/// replaced wholesale.
pub async fn load_document(path: &Path) -> Result<Map<String, Value>> {
    let Some(data) = io::read_optional(path).await? else {
        return Ok(Map::new());
    };
    if data.trim().is_empty() {
        return Ok(Map::new());
    }
    let invalid = |message: String| ForgeError::InvalidSettings {
        path: path.to_path_buf(),
        message,
    };
    match serde_json::from_str::<Value>(&data).map_err(|e| invalid(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(invalid("expected a JSON object".to_string())),
    }
}

pub async fn save_document(path: &Path, doc: &Map<String, Value>) -> Result<()> {
    let mut data = serde_json::to_string_pretty(doc)?;
    data.push('\n');
    io::atomic_write(path, data.as_bytes()).await
}

/// Take `doc[key]` out as an object; any non-object value is dropped.
/// Callers put the merged map back with [`put_object`].
fn take_object(doc: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match doc.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn put_object(doc: &mut Map<String, Value>, key: &str, map: Map<String, Value>) {
    doc.insert(key.to_string(), Value::Object(map));
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// One hook to merge, already resolved from its template.
#[derive(Debug, Clone, PartialEq)]
pub struct HookEntry {
    pub event: String,
    pub matcher: Option<String>,
    pub hook_type: String,
    pub command: String,
    pub timeout: Option<u64>,
}

impl HookEntry {
    fn to_value(&self) -> Value {
        let mut v = json!({ "type": self.hook_type, "command": self.command });
        if let Some(t) = self.timeout {
            v["timeout"] = json!(t);
        }
        v
    }
}

/// Merge hooks into `doc["hooks"]`, grouped event → matcher → commands.
///
/// An entry whose (event, matcher, command) triple already exists replaces
/// the existing one in place (most recent wins, including its `type`).
/// A missing matcher is stored as `""`. Returns the number of entries added
/// or replaced.
pub fn merge_hooks(doc: &mut Map<String, Value>, entries: &[HookEntry]) -> usize {
    let mut hooks = take_object(doc, "hooks");
    let mut changed = 0;

    for entry in entries {
        let matcher = entry.matcher.clone().unwrap_or_default();
        let groups = hooks
            .entry(entry.event.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !groups.is_array() {
            *groups = Value::Array(Vec::new());
        }
        let Value::Array(groups) = groups else {
            continue;
        };

        let group_idx = groups
            .iter()
            .position(|g| g.get("matcher").and_then(Value::as_str).unwrap_or("") == matcher);
        let group_idx = match group_idx {
            Some(i) => i,
            None => {
                groups.push(json!({ "matcher": matcher, "hooks": [] }));
                groups.len() - 1
            }
        };

        let group = &mut groups[group_idx];
        if !group.get("hooks").is_some_and(Value::is_array) {
            group["hooks"] = Value::Array(Vec::new());
        }
        let Some(commands) = group.get_mut("hooks").and_then(Value::as_array_mut) else {
            continue;
        };

        let value = entry.to_value();
        match commands
            .iter()
            .position(|c| c.get("command").and_then(Value::as_str) == Some(entry.command.as_str()))
        {
            Some(i) => commands[i] = value,
            None => commands.push(value),
        }
        changed += 1;
    }
    put_object(doc, "hooks", hooks);
    changed
}

// ---------------------------------------------------------------------------
// Permissions / env
// ---------------------------------------------------------------------------

fn union_into(list: &mut Vec<Value>, items: &[String]) {
    for item in items {
        if !list.iter().any(|v| v.as_str() == Some(item.as_str())) {
            list.push(Value::String(item.clone()));
        }
    }
}

/// Order-preserving union into `doc["permissions"]["allow"|"deny"|"ask"]`.
/// Lists that would stay empty are not created.
pub fn merge_permissions(
    doc: &mut Map<String, Value>,
    allow: &[String],
    deny: &[String],
    ask: &[String],
) {
    if allow.is_empty() && deny.is_empty() && ask.is_empty() {
        return;
    }
    let mut permissions = take_object(doc, "permissions");
    for (key, items) in [("allow", allow), ("deny", deny), ("ask", ask)] {
        if items.is_empty() {
            continue;
        }
        let slot = permissions
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(list) = slot {
            union_into(list, items);
        }
    }
    put_object(doc, "permissions", permissions);
}

/// Incoming keys overwrite existing ones in `doc["env"]`.
pub fn merge_env(doc: &mut Map<String, Value>, env: &BTreeMap<String, String>) {
    if env.is_empty() {
        return;
    }
    let mut target = take_object(doc, "env");
    for (k, v) in env {
        target.insert(k.clone(), Value::String(v.clone()));
    }
    put_object(doc, "env", target);
}

// ---------------------------------------------------------------------------
// Server maps
// ---------------------------------------------------------------------------

/// Insert `servers` under `doc[key]`, replacing same-named entries and
/// keeping the rest.
pub fn merge_servers(doc: &mut Map<String, Value>, key: &str, servers: &BTreeMap<String, Value>) {
    if servers.is_empty() {
        return;
    }
    let mut target = take_object(doc, key);
    for (slug, entry) in servers {
        target.insert(slug.clone(), entry.clone());
    }
    put_object(doc, key, target);
}
