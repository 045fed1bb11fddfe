//! Contract Invariant Tests
//!
//! Guarantees the generator and validator make to each other.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use notebook_deploy::{
    generate, resolve_owner, validate_dir,
    metadata::{split_id, KernelMetadata, REQUIRED_FIELDS},
    DocumentError, Outcome, ScaffoldError, ScaffoldParams, Status, Validator,
};

fn explicit_only(explicit: Option<&str>) -> String {
    resolve_owner(explicit, || None, |_| None)
}

fn valid_metadata() -> Value {
    json!({
        "id": "testuser/test-comp-baseline",
        "title": "Test Comp Baseline",
        "code_file": "test-comp-baseline.ipynb",
        "language": "python",
        "kernel_type": "notebook",
        "is_private": "true",
        "enable_gpu": "false",
        "enable_tpu": "false",
        "enable_internet": "false",
        "competition_sources": ["test-comp"]
    })
}

fn write_dir(root: &Path, metadata: &Value) -> std::path::PathBuf {
    let dir = root.join("test-comp");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("kernel-metadata.json"), metadata.to_string()).unwrap();
    fs::write(dir.join("test-comp-baseline.ipynb"), "{}").unwrap();
    dir
}

#[test]
fn invariant_generated_scaffold_validates_clean() {
    let root = tempfile::tempdir().unwrap();
    let params = ScaffoldParams {
        slug: "titanic".to_string(),
        owner: Some("testuser".to_string()),
        ..Default::default()
    };
    let scaffold = generate(root.path(), &params, explicit_only).unwrap();

    let report = validate_dir(&scaffold.dir).unwrap();
    assert_eq!(report.status(), Status::Clean);

    let written: KernelMetadata =
        serde_json::from_str(&fs::read_to_string(&scaffold.metadata_path).unwrap()).unwrap();
    assert_eq!(written, scaffold.metadata);
    assert_eq!(split_id(&written.id), Some(("testuser", "titanic-baseline")));
}

#[test]
fn invariant_generation_is_exactly_one_dir_two_files() {
    let root = tempfile::tempdir().unwrap();
    let params = ScaffoldParams { slug: "titanic".to_string(), ..Default::default() };
    generate(root.path(), &params, explicit_only).unwrap();

    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
    let mut names: Vec<String> = fs::read_dir(root.path().join("titanic"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["kernel-metadata.json", "titanic-baseline.ipynb"]);
}

#[test]
fn invariant_existing_dir_is_never_touched() {
    let root = tempfile::tempdir().unwrap();
    let existing = root.path().join("titanic");
    fs::create_dir(&existing).unwrap();
    fs::write(existing.join("keep.txt"), "mine").unwrap();

    let params = ScaffoldParams { slug: "titanic".to_string(), ..Default::default() };
    let err = generate(root.path(), &params, explicit_only).unwrap_err();
    assert!(matches!(err, ScaffoldError::AlreadyExists(_)));
    assert!(err.to_string().contains("already exists"));

    assert_eq!(fs::read_dir(&existing).unwrap().count(), 1);
    assert_eq!(fs::read_to_string(existing.join("keep.txt")).unwrap(), "mine");
}

#[test]
fn invariant_missing_fields_short_circuit_for_every_field() {
    let root = tempfile::tempdir().unwrap();
    for field in REQUIRED_FIELDS {
        let mut metadata = valid_metadata();
        metadata.as_object_mut().unwrap().remove(field);
        // Would trigger the internet warning if rules ran.
        if field != "enable_internet" {
            metadata["enable_internet"] = json!("true");
        }
        let dir = write_dir(root.path(), &metadata);

        let outcome = Validator::new().check_dir(&dir).unwrap();
        assert_eq!(outcome, Outcome::MissingFields(vec![field.to_string()]));

        let report = validate_dir(&dir).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.is_empty());
    }
}

#[test]
fn invariant_all_fields_missing_reports_nine_errors() {
    let root = tempfile::tempdir().unwrap();
    let dir = write_dir(root.path(), &json!({}));
    let report = validate_dir(&dir).unwrap();
    assert_eq!(report.errors.len(), 9);
    assert!(report.warnings.is_empty());
}

#[test]
fn invariant_id_format_error_is_single() {
    let root = tempfile::tempdir().unwrap();
    for (id, expected) in [
        ("no-slash-here", "'username/slug' form"),
        ("a/b/c", "too many"),
        ("a//b", "too many"),
        ("a/b/c/d", "too many"),
    ] {
        let mut metadata = valid_metadata();
        metadata["id"] = json!(id);
        let dir = write_dir(root.path(), &metadata);

        let report = validate_dir(&dir).unwrap();
        assert_eq!(report.errors.len(), 1, "id {}", id);
        assert!(report.errors[0].contains(expected), "id {}: {}", id, report.errors[0]);
    }
}

#[test]
fn invariant_validation_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let mut metadata = valid_metadata();
    metadata["language"] = json!("julia");
    metadata["enable_internet"] = json!("true");
    let dir = write_dir(root.path(), &metadata);
    let before = fs::read(dir.join("kernel-metadata.json")).unwrap();

    let first = validate_dir(&dir).unwrap();
    let second = validate_dir(&dir).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(dir.join("kernel-metadata.json")).unwrap(), before);
}

#[test]
fn invariant_missing_code_file_single_error() {
    let root = tempfile::tempdir().unwrap();
    let mut metadata = valid_metadata();
    metadata["code_file"] = json!("nonexistent.ipynb");
    let dir = write_dir(root.path(), &metadata);

    let report = validate_dir(&dir).unwrap();
    assert_eq!(report.status(), Status::Failed);
    assert_eq!(report.errors, vec!["code_file 'nonexistent.ipynb' not found in directory"]);
}

#[test]
fn invariant_internet_with_competition_is_warning_only() {
    let root = tempfile::tempdir().unwrap();
    let mut metadata = valid_metadata();
    metadata["enable_internet"] = json!("true");
    let dir = write_dir(root.path(), &metadata);

    let report = validate_dir(&dir).unwrap();
    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("enable_internet=true"));
}

#[test]
fn invariant_document_failures_are_not_validation_errors() {
    let root = tempfile::tempdir().unwrap();
    assert!(matches!(validate_dir(root.path()), Err(DocumentError::NotFound(_))));

    fs::write(root.path().join("kernel-metadata.json"), "{\"id\": ").unwrap();
    let err = validate_dir(root.path()).unwrap_err();
    assert!(matches!(err, DocumentError::Parse(_)));
    assert!(err.to_string().starts_with("JSON parse error"));
}
