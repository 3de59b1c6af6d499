//! Artifact output
//!
//! Writes generated artifacts under the project root and normalizes
//! generator output (fence unwrapping, filename sanitization).

use std::fs;
use std::path::PathBuf;

use eyre::{Context, Result};
use tracing::debug;

/// Writes artifacts at project-relative paths
#[derive(Debug, Clone)]
pub struct OutputWriter {
    base: PathBuf,
}

impl OutputWriter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Write `content` at `path` relative to the project root, creating
    /// parent directories; returns the absolute path written
    pub fn write_relative(&self, path: &str, content: &str) -> Result<PathBuf> {
        let target = self.base.join(path);
        debug!(path = %target.display(), bytes = content.len(), "OutputWriter::write_relative");
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target, content).with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(target)
    }

    pub fn base(&self) -> &PathBuf {
        &self.base
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`, making a
/// task id usable as a file name
pub fn safe_file_name(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// If the whole document is wrapped in a ```markdown fence, strip the
/// outer fence; otherwise return the input unchanged
pub fn unwrap_markdown_fence(md: &str) -> String {
    let text = md.trim_matches(['\u{feff}', ' ', '\n', '\r', '\t']);
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() >= 2 && lines[0].trim() == "```markdown" && lines[lines.len() - 1].trim() == "```"
    {
        return lines[1..lines.len() - 1].join("\n").trim_end().to_string();
    }
    md.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_relative_creates_parents() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        let path = writer.write_relative("docs/com.example/Svc.md", "# Doc").unwrap();
        assert!(path.is_absolute() || path.starts_with(dir.path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Doc");
    }

    #[test]
    fn test_write_relative_overwrites() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        writer.write_relative("a.txt", "one").unwrap();
        let path = writer.write_relative("a.txt", "two").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "two");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(
            safe_file_name("com.example.Svc#get(java.lang.String)#0192-a"),
            "com.example.Svc_get_java.lang.String__0192-a"
        );
        assert_eq!(safe_file_name("already_safe-1.2"), "already_safe-1.2");
    }

    #[test]
    fn test_unwrap_markdown_fence() {
        let fenced = "```markdown\n# Title\n\nBody\n```";
        assert_eq!(unwrap_markdown_fence(fenced), "# Title\n\nBody");

        let plain = "# Title\n\nBody";
        assert_eq!(unwrap_markdown_fence(plain), plain);

        // Inner fences are left alone
        let inner = "# Title\n```java\ncode\n```";
        assert_eq!(unwrap_markdown_fence(inner), inner);
    }
}
