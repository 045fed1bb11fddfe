//! Repository bootstrap - CI workflow, credential script, .gitignore
//!
//! Existing files are left alone unless forced. The .gitignore section is
//! appended once and never duplicated.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const WORKFLOW_PATH: &str = ".github/workflows/kaggle-push.yml";
pub const CREDENTIALS_SCRIPT_PATH: &str = "scripts/setup-credentials.sh";
pub const GITIGNORE_PATH: &str = ".gitignore";
pub const GITIGNORE_MARKER: &str = "# === Kaggle Deploy ===";

pub const WORKFLOW_TEMPLATE: &str = r#"name: Push Notebook to Kaggle

on:
  workflow_dispatch:
    inputs:
      notebook_dir:
        description: "Directory containing kernel-metadata.json"
        required: true
        type: string

jobs:
  push:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4

      - uses: actions/setup-python@v5
        with:
          python-version: "3.12"

      - name: Install Kaggle CLI
        run: pip install kaggle

      - name: Push notebook to Kaggle
        env:
          KAGGLE_USERNAME: ${{ secrets.KAGGLE_USERNAME }}
          KAGGLE_KEY: ${{ secrets.KAGGLE_KEY }}
        run: kaggle kernels push -p ${{ inputs.notebook_dir }}
"#;

pub const GITIGNORE_ADDITIONS: &str = "\
# === Kaggle Deploy ===
# Data files
*.csv
*.parquet
*.h5
*.hdf5
*.pkl
*.pickle
*.feather
*.arrow

# Model files
*.joblib
*.bin
*.onnx
*.pt
*.pth
*.safetensors

# Archive files
*.zip
*.tar.gz
*.7z

# Jupyter checkpoints
.ipynb_checkpoints/

# Submissions
submission*.csv

# Credentials (NEVER commit these)
.kaggle/
kaggle.json

# Virtual environments
.venv/
venv/
";

pub const CREDENTIALS_SCRIPT: &str = r#"#!/bin/bash
# Set up Kaggle API credentials.
# Run this on a new machine or CI environment.

set -e

if [ -n "$KAGGLE_USERNAME" ] && [ -n "$KAGGLE_KEY" ]; then
    mkdir -p ~/.kaggle
    cat > ~/.kaggle/kaggle.json << EOF
{"username": "$KAGGLE_USERNAME", "key": "$KAGGLE_KEY"}
EOF
    chmod 600 ~/.kaggle/kaggle.json
    echo "Kaggle credentials configured."
elif [ -f ~/.kaggle/kaggle.json ]; then
    echo "Kaggle credentials already exist."
else
    echo "Warning: KAGGLE_USERNAME and KAGGLE_KEY not set. Skipping Kaggle setup."
fi
"#;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Created,
    Appended,
    /// Already present; `force` would overwrite.
    SkippedExisting,
    /// .gitignore already carries the section.
    SkippedSection,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub action: FileAction,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoInitReport {
    pub files: Vec<FileOutcome>,
}

impl RepoInitReport {
    /// Files created or appended to.
    pub fn changed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.action, FileAction::Created | FileAction::Appended))
            .count()
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> RepoError + '_ {
    move |source| RepoError::Io { path: path.display().to_string(), source }
}

fn write_with_parents(path: &Path, content: &str) -> Result<(), RepoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(path, content).map_err(io_err(path))
}

fn write_unless_exists(
    root: &Path,
    rel: &str,
    content: &str,
    force: bool,
) -> Result<FileOutcome, RepoError> {
    let path = root.join(rel);
    if path.exists() && !force {
        tracing::debug!(path = %path.display(), "exists, skipping");
        return Ok(FileOutcome { path, action: FileAction::SkippedExisting });
    }
    write_with_parents(&path, content)?;
    tracing::info!(path = %path.display(), "wrote file");
    Ok(FileOutcome { path, action: FileAction::Created })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), RepoError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(io_err(path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), RepoError> {
    Ok(())
}

fn update_gitignore(root: &Path) -> Result<FileOutcome, RepoError> {
    let path = root.join(GITIGNORE_PATH);
    if !path.exists() {
        fs::write(&path, GITIGNORE_ADDITIONS).map_err(io_err(&path))?;
        return Ok(FileOutcome { path, action: FileAction::Created });
    }

    let existing = fs::read_to_string(&path).map_err(io_err(&path))?;
    if existing.contains(GITIGNORE_MARKER) {
        return Ok(FileOutcome { path, action: FileAction::SkippedSection });
    }

    let mut updated = existing;
    updated.push('\n');
    updated.push_str(GITIGNORE_ADDITIONS);
    fs::write(&path, updated).map_err(io_err(&path))?;
    tracing::info!(path = %path.display(), "appended deploy section");
    Ok(FileOutcome { path, action: FileAction::Appended })
}

/// Set up CI workflow, credential script and .gitignore under `root`.
pub fn init_repo(root: &Path, force: bool) -> Result<RepoInitReport, RepoError> {
    let workflow = write_unless_exists(root, WORKFLOW_PATH, WORKFLOW_TEMPLATE, force)?;

    let script = write_unless_exists(root, CREDENTIALS_SCRIPT_PATH, CREDENTIALS_SCRIPT, force)?;
    if script.action == FileAction::Created {
        make_executable(&script.path)?;
    }

    let gitignore = update_gitignore(root)?;

    Ok(RepoInitReport { files: vec![workflow, script, gitignore] })
}
