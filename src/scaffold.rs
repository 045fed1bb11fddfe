//! Scaffold Generator - new competition directories
//!
//! `<slug>/kernel-metadata.json` plus a starter notebook. The directory is
//! never overwritten: if it exists, nothing is written.

use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metadata::{bool_str, KernelMetadata, KernelType, Language, METADATA_FILE};

/// Used when no owner can be found anywhere.
pub const PLACEHOLDER_OWNER: &str = "your-username";
pub const USERNAME_ENV: &str = "KAGGLE_USERNAME";
pub const CONFIG_DIR_ENV: &str = "KAGGLE_CONFIG_DIR";
pub const CREDENTIALS_FILE: &str = "kaggle.json";

const DERIVED_SUFFIX: &str = "-baseline";
const TITLE_SUFFIX: &str = "Baseline";
const NOTEBOOK_EXTENSION: &str = "ipynb";

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("directory '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid competition slug '{0}'")]
    InvalidSlug(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ScaffoldParams {
    pub slug: String,
    pub owner: Option<String>,
    pub title: Option<String>,
    pub gpu: bool,
    pub internet: bool,
    pub public: bool,
}

/// What a successful generation produced.
#[derive(Debug, Clone)]
pub struct Scaffold {
    pub dir: PathBuf,
    pub metadata_path: PathBuf,
    pub notebook_path: PathBuf,
    pub metadata: KernelMetadata,
}

/// Pick the kernel owner: explicit value, then the credential file, then
/// the environment, then [`PLACEHOLDER_OWNER`].
///
/// `read_credentials` returns the credential file's contents, or `None` when
/// there is no such file. Once the file exists it decides the outcome, even
/// if it lacks a username.
pub fn resolve_owner<C, E>(explicit: Option<&str>, read_credentials: C, env: E) -> String
where
    C: FnOnce() -> Option<String>,
    E: Fn(&str) -> Option<String>,
{
    if let Some(owner) = explicit {
        return owner.to_string();
    }

    if let Some(content) = read_credentials() {
        let username = serde_json::from_str::<Value>(&content)
            .ok()
            .and_then(|v| v.get("username").and_then(Value::as_str).map(str::to_string));
        return match username {
            Some(name) => {
                tracing::debug!("owner taken from credential file");
                name
            }
            None => {
                tracing::warn!("credential file has no usable username, using placeholder");
                PLACEHOLDER_OWNER.to_string()
            }
        };
    }

    match env(USERNAME_ENV) {
        Some(name) => {
            tracing::debug!("owner taken from {}", USERNAME_ENV);
            name
        }
        None => {
            tracing::debug!("no owner configured, using placeholder");
            PLACEHOLDER_OWNER.to_string()
        }
    }
}

/// Directory holding `kaggle.json`: `$KAGGLE_CONFIG_DIR`, else `~/.kaggle`.
pub fn credentials_dir<E>(env: E) -> Option<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    if let Some(dir) = non_empty(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir.trim()));
    }
    non_empty("HOME")
        .or_else(|| non_empty("USERPROFILE"))
        .map(|home| PathBuf::from(home.trim()).join(".kaggle"))
}

/// [`resolve_owner`] wired to the real filesystem and process environment.
pub fn system_owner(explicit: Option<&str>) -> String {
    let env = |key: &str| std::env::var(key).ok();
    let read_credentials = || {
        let path = credentials_dir(env)?.join(CREDENTIALS_FILE);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read credential file");
                Some(String::new())
            }
        }
    };
    resolve_owner(explicit, read_credentials, env)
}

/// `my-comp` becomes `My Comp Baseline`.
pub fn default_title(slug: &str) -> String {
    format!("{} {}", title_case(&slug.replace('-', " ")), TITLE_SUFFIX)
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

pub fn derived_slug(slug: &str) -> String {
    format!("{}{}", slug, DERIVED_SUFFIX)
}

pub fn build_metadata(params: &ScaffoldParams, owner: &str, title: &str) -> KernelMetadata {
    let derived = derived_slug(&params.slug);
    KernelMetadata {
        id: format!("{}/{}", owner, derived),
        title: title.to_string(),
        code_file: format!("{}.{}", derived, NOTEBOOK_EXTENSION),
        language: Language::Python,
        kernel_type: KernelType::Notebook,
        is_private: bool_str(!params.public),
        enable_gpu: bool_str(params.gpu),
        enable_tpu: bool_str(false),
        enable_internet: bool_str(params.internet),
        dataset_sources: vec![],
        competition_sources: vec![params.slug.clone()],
        kernel_sources: vec![],
        model_sources: vec![],
    }
}

/// Starter notebook: a heading cell and a placeholder code cell.
pub fn notebook_template(title: &str, competition: &str) -> Value {
    json!({
        "cells": [
            {
                "cell_type": "markdown",
                "metadata": {},
                "source": [
                    format!("# {}\n", title),
                    "\n",
                    format!("Competition: {}", competition)
                ]
            },
            {
                "cell_type": "code",
                "execution_count": null,
                "metadata": {},
                "outputs": [],
                "source": [
                    "import pandas as pd\n",
                    "import numpy as np\n",
                    "\n",
                    "# Load data\n",
                    "# Competition data: /kaggle/input/competitions/<slug>/\n",
                    "# Datasets: /kaggle/input/<slug>/"
                ]
            }
        ],
        "metadata": {
            "kernelspec": {
                "display_name": "Python 3",
                "language": "python",
                "name": "python3"
            },
            "language_info": {
                "name": "python",
                "version": "3.10.0"
            }
        },
        "nbformat": 4,
        "nbformat_minor": 4
    })
}

/// Notebook JSON with Jupyter's single-space indentation.
fn to_notebook_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_file(path: &Path, content: &str) -> Result<(), ScaffoldError> {
    fs::write(path, content).map_err(|source| ScaffoldError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), "wrote file");
    Ok(())
}

/// Create `<base_dir>/<slug>/` with metadata and notebook.
///
/// `resolve` turns the optional explicit owner into the final one; the CLI
/// passes [`system_owner`].
pub fn generate<R>(
    base_dir: &Path,
    params: &ScaffoldParams,
    resolve: R,
) -> Result<Scaffold, ScaffoldError>
where
    R: FnOnce(Option<&str>) -> String,
{
    let slug = params.slug.as_str();
    if slug.is_empty() || slug.contains(['/', '\\']) || slug == "." || slug == ".." {
        return Err(ScaffoldError::InvalidSlug(slug.to_string()));
    }

    let dir = base_dir.join(slug);
    if dir.exists() {
        return Err(ScaffoldError::AlreadyExists(slug.to_string()));
    }

    let owner = resolve(params.owner.as_deref());
    let title = params
        .title
        .clone()
        .unwrap_or_else(|| default_title(slug));
    let metadata = build_metadata(params, &owner, &title);
    let metadata_json = metadata.to_pretty_json()?;
    let notebook_json = to_notebook_json(&notebook_template(&title, slug))?;

    fs::create_dir(&dir).map_err(|source| match source.kind() {
        io::ErrorKind::AlreadyExists => ScaffoldError::AlreadyExists(slug.to_string()),
        _ => ScaffoldError::Io { path: dir.display().to_string(), source },
    })?;
    tracing::info!(dir = %dir.display(), "created scaffold directory");

    let metadata_path = dir.join(METADATA_FILE);
    let notebook_path = dir.join(&metadata.code_file);
    let written = write_file(&metadata_path, &metadata_json)
        .and_then(|()| write_file(&notebook_path, &notebook_json));

    // A half-written scaffold would fail validation and block a retry.
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %cleanup, "failed to remove partial scaffold");
        }
        return Err(e);
    }

    Ok(Scaffold { dir, metadata_path, notebook_path, metadata })
}
