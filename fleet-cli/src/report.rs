//! Node directory report
//!
//! Prints the directory in the line format registration scripts consume
//! (`<tcp multiaddr> <ws multiaddr> <peer id>`) and exports it as JSON.

use anyhow::{Context, Result};
use fleet_c0re_lib::{Node, NodeDirectory};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Directory plus run metadata, as written by `--output`
#[derive(Debug, Serialize)]
pub struct DirectoryReport<'a> {
    pub generated_at: String,
    pub environment: &'a str,
    pub tag: &'a str,
    #[serde(flatten)]
    pub directory: &'a NodeDirectory,
}

impl<'a> DirectoryReport<'a> {
    pub fn new(environment: &'a str, tag: &'a str, directory: &'a NodeDirectory) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            environment,
            tag,
            directory,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize node directory")
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write(&self, output_path: &Path) -> Result<()> {
        let expanded = shellexpand::tilde(&output_path.to_string_lossy()).into_owned();
        let final_path = Path::new(&expanded);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
        }

        fs::write(final_path, self.to_json()?)
            .with_context(|| format!("Failed to write report to {}", final_path.display()))?;

        Ok(())
    }
}

fn render_nodes(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        out.push_str(&node.to_string());
        out.push('\n');
    }
}

/// Render the directory as plain text, grouped by role
pub fn render_directory(directory: &NodeDirectory) -> String {
    let mut out = String::new();

    out.push_str("Addresses:\n");
    render_nodes(&mut out, &directory.fleet);

    out.push_str("Bootstrap:\n");
    render_nodes(&mut out, std::slice::from_ref(&directory.bootstrap));

    out.push_str("Special ones:\n");
    render_nodes(&mut out, &directory.special);

    if !directory.failures.is_empty() {
        out.push_str("Failed hosts:\n");
        for failure in &directory.failures {
            out.push_str(&format!("{} {}\n", failure.host, failure.cause));
        }
    }

    out
}
