//! Context assembly
//!
//! Bundles everything the generator needs to see about one entry point:
//! an entry header, the analysis summary and line-numbered source slices,
//! capped at a configured size. The bundle is persisted next to the other
//! artifacts so a generated document can be audited later.

use std::collections::HashSet;
use std::fs;

use eyre::Result;
use tracing::{debug, warn};

use crate::analysis::AnalysisResult;
use crate::config::ContextConfig;
use crate::domain::EntryPoint;
use crate::output::OutputWriter;

/// Assembled context text plus where it was persisted
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub text: String,
    pub path: String,
}

/// Builds and persists context bundles
pub struct ContextPackager {
    writer: OutputWriter,
    max_chars: usize,
}

impl ContextPackager {
    pub fn new(writer: OutputWriter, config: &ContextConfig) -> Self {
        Self {
            writer,
            max_chars: config.max_chars,
        }
    }

    /// Bundle for a method-scoped task: header, summary and the analysis
    /// anchors as line-numbered slices
    pub fn build(
        &self,
        entry: &EntryPoint,
        analysis: &AnalysisResult,
        out_path: &str,
    ) -> Result<ContextBundle> {
        debug!(class_fqn = %entry.class_fqn, method = %entry.method, "ContextPackager::build: called");
        let mut text = String::new();
        text.push_str("# Entry Method\n");
        text.push_str(&format!("{}#{}\n\n", entry.class_fqn, entry.method));
        text.push_str("# Callgraph Summary\n");
        text.push_str(&analysis.summary);
        text.push_str("\n\n# Slices\n");

        let mut seen = HashSet::new();
        for anchor in &analysis.anchors {
            let Ok(content) = fs::read_to_string(&anchor.file) else {
                warn!(file = %anchor.file, "ContextPackager::build: skipping unreadable slice file");
                continue;
            };
            let lines: Vec<&str> = content.lines().collect();
            if lines.is_empty() {
                continue;
            }
            let start = (anchor.start_line.max(1) - 1) as usize;
            let end = ((anchor.end_line as usize).min(lines.len())).saturating_sub(1);
            if start > end {
                continue;
            }
            if !seen.insert(format!("{}:{}-{}", anchor.file, start, end)) {
                continue;
            }
            text.push_str(&format!(
                "## File: {} [{}-{}]\n",
                anchor.file,
                start + 1,
                end + 1
            ));
            for (offset, line) in lines[start..=end].iter().enumerate() {
                text.push_str(&format!("{:6} | {}\n", start + offset + 1, line));
            }
            text.push('\n');
        }

        self.finish(text, out_path)
    }

    /// Bundle for a class-scoped task: the whole declaring source file
    pub fn build_for_class(
        &self,
        entry: &EntryPoint,
        analysis: &AnalysisResult,
        out_path: &str,
    ) -> Result<ContextBundle> {
        debug!(class_fqn = %entry.class_fqn, "ContextPackager::build_for_class: called");
        let mut text = String::new();
        text.push_str("# Entry Class\n");
        text.push_str(&format!("{}\n\n", entry.class_fqn));
        text.push_str("# Callgraph Summary\n");
        text.push_str(&analysis.summary);
        text.push_str("\n\n# Source\n");

        match fs::read_to_string(&entry.file) {
            Ok(content) => {
                text.push_str(&format!("## File: {}\n", entry.file));
                for (i, line) in content.lines().enumerate() {
                    text.push_str(&format!("{:6} | {}\n", i + 1, line));
                }
            }
            Err(_) => {
                warn!(file = %entry.file, "ContextPackager::build_for_class: source file unreadable");
            }
        }

        self.finish(text, out_path)
    }

    fn finish(&self, text: String, out_path: &str) -> Result<ContextBundle> {
        let text = truncate_chars(text, self.max_chars);
        let path = self.writer.write_relative(out_path, &text)?;
        Ok(ContextBundle {
            text,
            path: path.to_string_lossy().into_owned(),
        })
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    text.chars().take(max).collect()
}
