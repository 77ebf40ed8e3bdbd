//! Read-only inspection of what is already on disk for a target.
//!
//! Nothing here writes, and a missing path is an ordinary answer, not an
//! error: counts come back as zero and `exists` as false.

use crate::error::Result;
use crate::provider::{Provider, Scope, ScopeLayout};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSnapshot {
    pub root: PathBuf,
    pub exists: bool,
    pub agents: usize,
    pub skills: usize,
    pub hooks: usize,
    pub mcp_servers: usize,
    pub constitution: bool,
    pub memory: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ScopeSnapshot {
    fn absent(root: PathBuf) -> Self {
        Self {
            root,
            exists: false,
            agents: 0,
            skills: 0,
            hooks: 0,
            mcp_servers: 0,
            constitution: false,
            memory: 0,
            last_modified: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedConfig {
    pub system: String,
    pub project: ScopeSnapshot,
    /// `None` when the target has no global scope or it cannot be resolved.
    pub global: Option<ScopeSnapshot>,
}

/// Snapshot both scopes of `provider` for `project`.
pub async fn detect(provider: &dyn Provider, project: &Path) -> DeployedConfig {
    let project_scope = match provider.layout(project, Scope::Project) {
        Ok(layout) => snapshot(&layout).await,
        Err(e) => {
            tracing::debug!(system = provider.system(), error = %e, "no project layout");
            ScopeSnapshot::absent(project.to_path_buf())
        }
    };

    let global = if provider.scopes().contains(&Scope::Global) {
        match provider.layout(project, Scope::Global) {
            Ok(layout) => Some(snapshot(&layout).await),
            Err(e) => {
                tracing::debug!(system = provider.system(), error = %e, "no global layout");
                None
            }
        }
    } else {
        None
    };

    DeployedConfig {
        system: provider.system().to_string(),
        project: project_scope,
        global,
    }
}

/// Count what `layout` currently holds.
pub async fn snapshot(layout: &ScopeLayout) -> ScopeSnapshot {
    let mut snap = ScopeSnapshot::absent(layout.root.clone());
    let mut newest = Newest::default();

    newest.observe(&layout.root).await;
    if let Some(dir) = &layout.agents_dir {
        snap.agents = count_files(dir, "md").await;
        newest.observe(dir).await;
    }
    if let Some(dir) = &layout.skills_dir {
        snap.skills = count_skills(dir).await;
        newest.observe(dir).await;
    }
    if let Some(path) = &layout.settings_file {
        snap.hooks = read_json(path).await.map_or(0, |doc| count_hooks(&doc));
        newest.observe(path).await;
    }
    if let Some((path, key)) = &layout.mcp_file {
        snap.mcp_servers = read_json(path)
            .await
            .and_then(|doc| doc.get(*key).and_then(|v| v.as_object()).map(|m| m.len()))
            .unwrap_or(0);
        newest.observe(path).await;
    }
    if let Some(path) = &layout.constitution_file {
        snap.constitution = is_file(path).await;
        newest.observe(path).await;
    }
    if let Some(dir) = &layout.memory_dir {
        snap.memory = count_files(dir, "md").await;
        newest.observe(dir).await;
    }

    snap.exists = newest.seen;
    snap.last_modified = newest.time.map(DateTime::<Utc>::from);
    snap
}

#[derive(Default)]
struct Newest {
    seen: bool,
    time: Option<SystemTime>,
}

impl Newest {
    async fn observe(&mut self, path: &Path) {
        let Ok(meta) = tokio::fs::metadata(path).await else {
            return;
        };
        self.seen = true;
        if let Ok(modified) = meta.modified() {
            self.time = Some(self.time.map_or(modified, |t| t.max(modified)));
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn count_files(dir: &Path, ext: &str) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) && is_file(&path).await {
            count += 1;
        }
    }
    count
}

async fn count_skills(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if is_file(&entry.path().join(crate::paths::SKILL_FILE)).await {
            count += 1;
        }
    }
    count
}

async fn read_json(path: &Path) -> Option<serde_json::Value> {
    let data = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&data) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable settings");
            None
        }
    }
}

/// Number of hook commands across every event and matcher group.
fn count_hooks(doc: &serde_json::Value) -> usize {
    let Some(events) = doc.get("hooks").and_then(|h| h.as_object()) else {
        return 0;
    };
    events
        .values()
        .filter_map(|groups| groups.as_array())
        .flatten()
        .filter_map(|group| group.get("hooks").and_then(|h| h.as_array()))
        .map(Vec::len)
        .sum()
}

// ---------------------------------------------------------------------------
// Content digests
// ---------------------------------------------------------------------------

/// Relative path (with `/` separators) to SHA-256 hex of every file under
/// `root`. A missing root is an empty map.
///
/// Reads every byte under `root` once: cost is O(total bytes).
pub async fn tree_digest(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut digests = BTreeMap::new();
    if !tokio::fs::try_exists(root).await? {
        return Ok(digests);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let bytes = tokio::fs::read(&path).await?;
                digests.insert(relative_key(root, &path), format!("{:x}", Sha256::digest(&bytes)));
            }
        }
    }
    Ok(digests)
}

/// Digest of every content directory in `layout`, keyed relative to `base`.
pub async fn content_digest(layout: &ScopeLayout, base: &Path) -> Result<BTreeMap<String, String>> {
    let mut all = BTreeMap::new();
    for dir in layout.content_dirs() {
        let prefix = relative_key(base, dir);
        for (path, digest) in tree_digest(dir).await? {
            all.insert(format!("{prefix}/{path}"), digest);
        }
    }
    Ok(all)
}

fn relative_key(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        ClaudeCodeProvider, ClineProvider, DeployOptions, GeminiCliProvider, Location,
    };
    use crate::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn empty_project_reports_absence() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let config = detect(&ClaudeCodeProvider::with_home(&home), dir.path()).await;

        assert_eq!(config.system, "claude-code");
        assert!(!config.project.exists);
        assert_eq!(config.project.agents, 0);
        assert!(config.project.last_modified.is_none());
        let global = config.global.unwrap();
        assert_eq!(global.root, home.join(".claude"));
        assert!(!global.exists);
    }

    #[tokio::test]
    async fn counts_deployed_artifacts() {
        let dir = TempDir::new().unwrap();
        let provider = ClaudeCodeProvider::with_home(dir.path().join("home"));
        provider
            .deploy(
                &testing::full_team(),
                &testing::library(),
                dir.path(),
                &DeployOptions::default(),
            )
            .await;

        let snap = detect(&provider, dir.path()).await.project;
        assert!(snap.exists);
        assert_eq!(snap.agents, 2);
        assert_eq!(snap.skills, 1);
        assert_eq!(snap.hooks, 1);
        assert_eq!(snap.mcp_servers, 2);
        assert!(snap.constitution);
        assert!(snap.last_modified.is_some());
    }

    #[tokio::test]
    async fn project_only_target_has_no_global() {
        let dir = TempDir::new().unwrap();
        ClineProvider
            .deploy(
                &testing::full_team(),
                &testing::library(),
                dir.path(),
                &DeployOptions::default(),
            )
            .await;
        let config = detect(&ClineProvider, dir.path()).await;
        assert!(config.global.is_none());
        assert_eq!(config.project.memory, 6);
        assert!(config.project.constitution);
    }

    #[tokio::test]
    async fn gemini_global_reads_home_settings() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let provider = GeminiCliProvider::with_home(&home);
        let options = DeployOptions {
            clear_existing: false,
            location: Location::Global,
        };
        provider
            .deploy(&testing::full_team(), &testing::library(), dir.path(), &options)
            .await;

        let config = detect(&provider, dir.path()).await;
        assert!(!config.project.exists);
        assert_eq!(config.global.unwrap().mcp_servers, 2);
    }

    #[tokio::test]
    async fn digest_tracks_content_not_mtime() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tree");
        std::fs::create_dir_all(root.join("nested")).unwrap();
        std::fs::write(root.join("a.md"), "alpha").unwrap();
        std::fs::write(root.join("nested/b.md"), "beta").unwrap();

        let first = tree_digest(&root).await.unwrap();
        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            ["a.md", "nested/b.md"]
        );
        std::fs::write(root.join("a.md"), "alpha").unwrap();
        assert_eq!(tree_digest(&root).await.unwrap(), first);

        std::fs::write(root.join("nested/b.md"), "changed").unwrap();
        assert_ne!(tree_digest(&root).await.unwrap(), first);
        assert!(tree_digest(&dir.path().join("missing")).await.unwrap().is_empty());
    }
}
