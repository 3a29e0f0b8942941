use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

#[async_trait]
/// Computes a content fingerprint for a changed file in the local checkout.
pub trait FileFingerprinter: Send + Sync {
    async fn fingerprint(&self, path: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
/// Git blob id of the working-tree file, as printed by `git hash-object`.
pub struct GitHashObject {
    workspace_dir: PathBuf,
}

impl GitHashObject {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
        }
    }
}

#[async_trait]
impl FileFingerprinter for GitHashObject {
    async fn fingerprint(&self, path: &str) -> Result<String> {
        let relative = validate_relative_path(path)?;
        let output = tokio::process::Command::new("git")
            .arg("hash-object")
            .arg("--")
            .arg(relative)
            .current_dir(&self.workspace_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to spawn git hash-object for {path}"))?;
        if !output.status.success() {
            bail!(
                "git hash-object failed for {path}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let sha = String::from_utf8(output.stdout)
            .context("git hash-object produced non-utf8 output")?
            .trim()
            .to_string();
        if sha.is_empty() {
            bail!("git hash-object produced no output for {path}");
        }
        Ok(sha)
    }
}

/// Rejects absolute paths and parent traversal so only checkout files are hashed.
pub fn validate_relative_path(raw: &str) -> Result<&Path> {
    let path = Path::new(raw);
    if raw.trim().is_empty() {
        bail!("changed file path is empty");
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("changed file path '{raw}' escapes the workspace");
            }
        }
    }
    Ok(path)
}
