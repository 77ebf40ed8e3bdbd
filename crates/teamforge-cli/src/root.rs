use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `TEAMFORGE_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of `cwd` holding `.teamforge/`
/// 3. Nearest ancestor of `cwd` holding `.git/`
/// 4. `cwd` itself
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_marked_ancestor(&cwd, teamforge_core::paths::TEAMFORGE_DIR)
        .or_else(|| find_marked_ancestor(&cwd, ".git"))
        .unwrap_or(cwd)
}

fn find_marked_ancestor(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn teamforge_marker_beats_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let project = dir.path().join("apps/web");
        std::fs::create_dir_all(project.join(".teamforge")).unwrap();
        let deep = project.join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();

        assert_eq!(
            find_marked_ancestor(&deep, ".teamforge").as_deref(),
            Some(project.as_path())
        );
        assert_eq!(
            find_marked_ancestor(&deep, ".git").as_deref(),
            Some(dir.path())
        );
    }

    #[test]
    fn no_marker_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(find_marked_ancestor(dir.path(), "no-such-marker-dir").is_none());
    }
}
