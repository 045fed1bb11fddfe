//! Kernel Metadata - the `kernel-metadata.json` descriptor
//!
//! One document per notebook directory. Written by the scaffold generator,
//! read by the validator and by the uploader.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;

/// Fixed filename of the metadata document inside a notebook directory.
pub const METADATA_FILE: &str = "kernel-metadata.json";

pub const REQUIRED_FIELDS: [&str; 9] = [
    "id",
    "title",
    "code_file",
    "language",
    "kernel_type",
    "is_private",
    "enable_gpu",
    "enable_tpu",
    "enable_internet",
];

pub const BOOL_FIELDS: [&str; 4] = ["is_private", "enable_gpu", "enable_tpu", "enable_internet"];

pub const VALID_LANGUAGES: [&str; 3] = ["python", "r", "rmarkdown"];
pub const VALID_KERNEL_TYPES: [&str; 2] = ["script", "notebook"];
pub const VALID_BOOL_STRINGS: [&str; 2] = ["true", "false"];

/// Separator between owner and slug in a kernel id.
pub const ID_SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    R,
    Rmarkdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KernelType {
    Script,
    Notebook,
}

/// Typed view of a metadata document.
///
/// Field order here is the on-disk key order. Flags stay strings because
/// the platform expects `"true"`/`"false"`, not JSON booleans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KernelMetadata {
    pub id: String,
    pub title: String,
    pub code_file: String,
    pub language: Language,
    pub kernel_type: KernelType,
    pub is_private: String,
    pub enable_gpu: String,
    pub enable_tpu: String,
    pub enable_internet: String,
    #[serde(default)]
    pub dataset_sources: Vec<String>,
    #[serde(default)]
    pub competition_sources: Vec<String>,
    #[serde(default)]
    pub kernel_sources: Vec<String>,
    #[serde(default)]
    pub model_sources: Vec<String>,
}

impl KernelMetadata {
    /// Pretty JSON with two-space indent and a trailing newline.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// Owner and slug halves of a kernel id, if it has exactly one separator.
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    if id.matches(ID_SEPARATOR).count() != 1 {
        return None;
    }
    id.split_once(ID_SEPARATOR)
}

pub fn bool_str(value: bool) -> String {
    let s = if value { "true" } else { "false" };
    s.to_string()
}

/// Raw metadata document: a JSON object, key order as on disk.
pub type Document = Map<String, Value>;

/// Read `kernel-metadata.json` from `dir` without interpreting its fields.
///
/// Missing file and malformed JSON are distinct failures; neither is a
/// field-level validation error.
pub fn load_document(dir: &Path) -> Result<Document, DocumentError> {
    let path = dir.join(METADATA_FILE);
    if !path.is_file() {
        return Err(DocumentError::NotFound(path.display().to_string()));
    }
    let content = fs::read(&path).map_err(|source| DocumentError::Io {
        path: path.display().to_string(),
        source,
    })?;
    match serde_json::from_slice::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotAnObject(path.display().to_string())),
    }
}

/// Text of a field for messages: strings bare, anything else as JSON.
pub fn field_text(doc: &Document, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("JSON parse error: {0} must contain a JSON object")]
    NotAnObject(String),
}
