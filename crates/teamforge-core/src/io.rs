use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting target config files.
pub fn atomic_write_blocking(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Async wrapper around [`atomic_write_blocking`]; the tempfile dance runs on
/// the blocking pool.
pub async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || atomic_write_blocking(&path, &data)).await?
}

/// Create a directory and all parents, idempotent.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub async fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if tokio::fs::try_exists(path).await? {
        return Ok(false);
    }
    atomic_write(path, data).await?;
    Ok(true)
}

/// Remove a file or a directory tree. Missing paths are not an error.
/// Returns true if something was removed.
pub async fn remove_path(path: &Path) -> Result<bool> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(true)
}

/// Read a file as UTF-8, mapping "not found" to `None`.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replace content between `start_marker` and `end_marker` (inclusive) in `existing`.
///
/// Returns `None` when either marker is missing.
pub fn replace_between_markers(
    existing: &str,
    start_marker: &str,
    end_marker: &str,
    replacement: &str,
) -> Option<String> {
    let start_pos = existing.find(start_marker)?;
    let search_from = start_pos + start_marker.len();
    let end_offset = existing[search_from..].find(end_marker)?;
    let end_pos = search_from + end_offset + end_marker.len();

    let mut updated = String::with_capacity(existing.len());
    updated.push_str(&existing[..start_pos]);
    updated.push_str(replacement);
    updated.push_str(&existing[end_pos..]);
    Some(updated)
}

/// Write `body` into the marker-delimited managed section of `path`.
///
/// Content outside the markers is preserved. A file without markers gets the
/// section appended after a blank line; a missing file is created.
pub async fn upsert_managed_section(
    path: &Path,
    start_marker: &str,
    end_marker: &str,
    body: &str,
) -> Result<()> {
    let section = format!("{start_marker}\n{}\n{end_marker}", body.trim_end());
    let updated = match read_optional(path).await? {
        None => format!("{section}\n"),
        Some(existing) => {
            match replace_between_markers(&existing, start_marker, end_marker, &section) {
                Some(replaced) => replaced,
                None if existing.trim().is_empty() => format!("{section}\n"),
                None => format!("{}\n\n{section}\n", existing.trim_end()),
            }
        }
    };
    atomic_write(path, updated.as_bytes()).await
}

/// Drop the managed section from `path`, keeping the text around it. A file
/// left with nothing but whitespace is removed. Returns true if a section
/// was found.
pub async fn remove_managed_section(path: &Path, start_marker: &str, end_marker: &str) -> Result<bool> {
    let Some(existing) = read_optional(path).await? else {
        return Ok(false);
    };
    let Some(stripped) = replace_between_markers(&existing, start_marker, end_marker, "") else {
        return Ok(false);
    };
    let rest = stripped.trim_start_matches(['\r', '\n']).trim_end();
    if rest.is_empty() {
        remove_path(path).await?;
    } else {
        atomic_write(path, format!("{rest}\n").as_bytes()).await?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const START: &str = "<!-- teamforge:start -->";
    const END: &str = "<!-- teamforge:end -->";

    #[tokio::test]
    async fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/settings.json");
        atomic_write(&path, b"{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.md");
        std::fs::write(&path, b"original").unwrap();
        let written = write_if_missing(&path, b"new").await.unwrap();
        assert!(!written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[tokio::test]
    async fn remove_path_handles_files_dirs_and_missing() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("root/agents");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("a.md"), "x").unwrap();
        let file = dir.path().join("file.json");
        std::fs::write(&file, "{}").unwrap();

        assert!(remove_path(&dir.path().join("root")).await.unwrap());
        assert!(remove_path(&file).await.unwrap());
        assert!(!remove_path(&dir.path().join("missing")).await.unwrap());
        assert!(!dir.path().join("root").exists());
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn managed_section_appends_to_user_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CLAUDE.md");
        std::fs::write(&path, "# My notes\n").unwrap();

        upsert_managed_section(&path, START, END, "team body").await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# My notes\n\n<!-- teamforge:start -->"));
        assert!(content.contains("team body"));
    }

    #[tokio::test]
    async fn managed_section_replaced_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("GEMINI.md");
        upsert_managed_section(&path, START, END, "first").await.unwrap();
        std::fs::write(
            &path,
            format!("{}\ntrailing user text\n", std::fs::read_to_string(&path).unwrap()),
        )
        .unwrap();

        upsert_managed_section(&path, START, END, "second").await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("first"));
        assert!(content.contains("second"));
        assert!(content.contains("trailing user text"));
        assert_eq!(content.matches(START).count(), 1);
    }

    #[tokio::test]
    async fn removing_section_keeps_user_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CLAUDE.md");
        std::fs::write(&path, "# My notes\n").unwrap();
        upsert_managed_section(&path, START, END, "old guidance").await.unwrap();

        assert!(remove_managed_section(&path, START, END).await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# My notes\n");
        assert!(!remove_managed_section(&path, START, END).await.unwrap());
    }

    #[tokio::test]
    async fn removing_only_section_deletes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AGENTS.md");
        upsert_managed_section(&path, START, END, "guidance").await.unwrap();

        assert!(remove_managed_section(&path, START, END).await.unwrap());
        assert!(!path.exists());
        assert!(!remove_managed_section(&dir.path().join("missing.md"), START, END)
            .await
            .unwrap());
    }

    #[test]
    fn replace_between_markers_requires_both() {
        assert!(replace_between_markers("no markers", START, END, "x").is_none());
        let only_start = format!("{START} dangling");
        assert!(replace_between_markers(&only_start, START, END, "x").is_none());
    }
}
