//! Metadata headers for markdown templates.
//!
//! A document is an optional `---`-delimited YAML header followed by free
//! text. Known keys get typed fields; every other key is carried through
//! verbatim in [`Frontmatter::extra`] and re-emitted on render.

use crate::error::{ForgeError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    #[serde(
        default,
        deserialize_with = "string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        rename = "allowed-tools",
        deserialize_with = "string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed_tools: Vec<String>,
    #[serde(
        default,
        rename = "suggested-for",
        deserialize_with = "string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub suggested_for: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A parsed markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub header: Frontmatter,
    pub body: String,
}

/// Accept either a YAML sequence or a comma-separated string.
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    let items = match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::List(items)) => items,
        Some(Raw::Text(text)) => text.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Split `content` into (header yaml, body). `None` when there is no header.
pub fn split(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = if let Some(r) = rest.strip_prefix('\n') {
        r
    } else if let Some(r) = rest.strip_prefix("\r\n") {
        r
    } else {
        return None;
    };
    let (header, after) = if rest.starts_with("---") {
        ("", &rest[3..])
    } else {
        let end = rest.find("\n---")?;
        (&rest[..end], &rest[end + 4..])
    };
    // drop the remainder of the closing delimiter line
    let body = match after.find('\n') {
        Some(i) => &after[i + 1..],
        None => "",
    };
    Some((header.trim_end_matches('\r'), body))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a document; `path` is only used for error messages.
pub fn parse(path: &Path, content: &str) -> Result<Document> {
    let Some((header, body)) = split(content) else {
        return Ok(Document {
            header: Frontmatter::default(),
            body: content.trim().to_string(),
        });
    };

    let header = parse_header(header).map_err(|message| ForgeError::InvalidFrontmatter {
        path: path.to_path_buf(),
        message,
    })?;

    Ok(Document {
        header,
        body: body.trim().to_string(),
    })
}

fn parse_header(yaml: &str) -> std::result::Result<Frontmatter, String> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    match serde_yaml::from_str::<Frontmatter>(yaml) {
        Ok(fm) => Ok(fm),
        Err(strict) => {
            // Hand-written headers often carry unquoted colons in descriptions
            // ("description: Use when: reviewing"). Recover only when every
            // line is a plain `key: value` pair.
            let mapping = plain_scalars(yaml).ok_or_else(|| strict.to_string())?;
            serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
                .map_err(|_| strict.to_string())
        }
    }
}

fn plain_scalars(yaml: &str) -> Option<serde_yaml::Mapping> {
    let mut mapping = serde_yaml::Mapping::new();
    for line in yaml.lines().filter(|l| !l.trim().is_empty()) {
        if line.starts_with(char::is_whitespace) || line.trim_start().starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once(':')?;
        let key_ok = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !key_ok {
            return None;
        }
        let value = value.trim();
        let value = if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            serde_yaml::Value::Sequence(
                inner
                    .split(',')
                    .map(|s| s.trim().trim_matches('"').trim_matches('\''))
                    .filter(|s| !s.is_empty())
                    .map(|s| serde_yaml::Value::String(s.to_string()))
                    .collect(),
            )
        } else {
            serde_yaml::Value::String(value.to_string())
        };
        mapping.insert(serde_yaml::Value::String(key.to_string()), value);
    }
    Some(mapping)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render `header` as a YAML frontmatter block followed by `body`.
pub fn render<T: Serialize>(header: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(header)?;
    let body = body.trim();
    if body.is_empty() {
        Ok(format!("---\n{yaml}---\n"))
    } else {
        Ok(format!("---\n{yaml}---\n\n{body}\n"))
    }
}
