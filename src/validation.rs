//! Validation System - Rules over kernel-metadata.json
//!
//! Two phases. The required-field phase short-circuits: if any field is
//! missing, nothing else runs. Otherwise every rule runs independently and
//! produces structured violations, sorted into errors and warnings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::metadata::{
    field_text, load_document, split_id, Document, DocumentError, BOOL_FIELDS, ID_SEPARATOR,
    METADATA_FILE, REQUIRED_FIELDS, VALID_BOOL_STRINGS, VALID_KERNEL_TYPES, VALID_LANGUAGES,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
}

impl ValidationViolation {
    fn error(rule: &str, message: String) -> Self {
        Self { rule: rule.to_string(), severity: ViolationSeverity::Error, message }
    }

    fn warning(rule: &str, message: String) -> Self {
        Self { rule: rule.to_string(), severity: ViolationSeverity::Warning, message }
    }
}

/// Result of running the validator over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Names of required fields absent from the document. No other check ran.
    MissingFields(Vec<String>),
    /// All required fields present; every rule ran.
    Checked {
        errors: Vec<String>,
        warnings: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Clean,
    WithWarnings,
    Failed,
}

/// Flattened view of an [`Outcome`]: errors first, then warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<Outcome> for ValidationReport {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::MissingFields(fields) => Self {
                errors: fields
                    .iter()
                    .map(|f| format!("required field '{}' is missing", f))
                    .collect(),
                warnings: vec![],
            },
            Outcome::Checked { errors, warnings } => Self { errors, warnings },
        }
    }
}

impl ValidationReport {
    pub fn status(&self) -> Status {
        if !self.errors.is_empty() {
            Status::Failed
        } else if !self.warnings.is_empty() {
            Status::WithWarnings
        } else {
            Status::Clean
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable listing, one line per entry.
    pub fn render(&self) -> String {
        let mut lines = vec![];
        if !self.errors.is_empty() {
            lines.push(format!("Errors ({}):", self.errors.len()));
            lines.extend(self.errors.iter().map(|e| format!("  x {}", e)));
        }
        if !self.warnings.is_empty() {
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            lines.extend(self.warnings.iter().map(|w| format!("  ! {}", w)));
        }
        match self.status() {
            Status::Clean => lines.push(format!("OK: {} is valid.", METADATA_FILE)),
            Status::WithWarnings => {
                lines.push(String::new());
                lines.push(format!("OK (with warnings): {} is valid.", METADATA_FILE));
            }
            Status::Failed => {}
        }
        lines.join("\n")
    }
}

/// What a rule sees: the parsed document and the directory holding it.
pub struct RuleInput<'a> {
    pub doc: &'a Document,
    pub dir: &'a Path,
}

impl RuleInput<'_> {
    fn text(&self, field: &str) -> String {
        field_text(self.doc, field)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.doc.get(field).and_then(Value::as_str)
    }
}

/// Validation rule trait - produces violations.
///
/// Rules run only after every required field is known to be present.
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct IdFormatRule;

impl ValidationRule for IdFormatRule {
    fn name(&self) -> &'static str { "id_format" }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        let raw = input.str_field("id");
        if raw.and_then(split_id).is_some() {
            return vec![];
        }

        let id = input.text("id");
        let message = if raw.is_some_and(|s| s.contains(ID_SEPARATOR)) {
            format!("id '{}' has too many '{}' separators", id, ID_SEPARATOR)
        } else {
            format!("id '{}' must be in 'username/slug' form", id)
        };
        vec![ValidationViolation::error(self.name(), message)]
    }
}

pub struct CodeFileRule;

impl ValidationRule for CodeFileRule {
    fn name(&self) -> &'static str { "code_file_exists" }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        let exists = input
            .str_field("code_file")
            .is_some_and(|name| input.dir.join(name).is_file());

        if exists {
            vec![]
        } else {
            vec![ValidationViolation::error(
                self.name(),
                format!("code_file '{}' not found in directory", input.text("code_file")),
            )]
        }
    }
}

/// Membership check for a string field against a fixed set of values.
pub struct EnumRule {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
}

impl ValidationRule for EnumRule {
    fn name(&self) -> &'static str { self.field }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        let ok = input
            .str_field(self.field)
            .is_some_and(|v| self.allowed.contains(&v));

        if ok {
            vec![]
        } else {
            vec![ValidationViolation::error(
                self.name(),
                format!(
                    "{} '{}' is invalid. Valid values: {}",
                    self.field,
                    input.text(self.field),
                    self.allowed.join(", ")
                ),
            )]
        }
    }
}

pub struct BoolStringRule;

impl ValidationRule for BoolStringRule {
    fn name(&self) -> &'static str { "bool_string" }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        BOOL_FIELDS
            .iter()
            .filter(|field| {
                !input
                    .str_field(field)
                    .is_some_and(|v| VALID_BOOL_STRINGS.contains(&v))
            })
            .map(|field| {
                ValidationViolation::error(
                    self.name(),
                    format!(
                        "{} '{}' is invalid. Use 'true' or 'false'",
                        field,
                        input.text(field)
                    ),
                )
            })
            .collect()
    }
}

/// Warns when the code file's extension disagrees with `kernel_type`.
pub struct KernelTypeConsistencyRule;

impl ValidationRule for KernelTypeConsistencyRule {
    fn name(&self) -> &'static str { "kernel_type_consistency" }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        let extension = input
            .str_field("code_file")
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str());
        let kernel_type = input.text("kernel_type");

        let expected = match extension {
            Some("ipynb") => "notebook",
            Some("py") => "script",
            _ => return vec![],
        };

        if kernel_type == expected {
            vec![]
        } else {
            vec![ValidationViolation::warning(
                self.name(),
                format!(
                    "code_file is .{} but kernel_type is '{}'",
                    extension.unwrap_or_default(),
                    kernel_type
                ),
            )]
        }
    }
}

/// Competition submissions reject kernels with internet access.
pub struct CompetitionInternetRule;

impl ValidationRule for CompetitionInternetRule {
    fn name(&self) -> &'static str { "competition_internet" }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        let has_competition = input.doc.get("competition_sources").is_some_and(is_truthy);
        if has_competition && input.str_field("enable_internet") == Some("true") {
            vec![ValidationViolation::warning(self.name(), internet_warning())]
        } else {
            vec![]
        }
    }
}

/// Compares the id's slug with one derived from the title.
///
/// The platform derives slugs from titles itself, so a mismatch is not
/// reported. Kept as a rule so the comparison has one home if that changes.
pub struct TitleSlugRule;

impl ValidationRule for TitleSlugRule {
    fn name(&self) -> &'static str { "title_slug" }

    fn validate(&self, input: &RuleInput<'_>) -> Vec<ValidationViolation> {
        let Some((_, slug)) = input.str_field("id").and_then(split_id)
        else {
            return vec![];
        };
        let expected = expected_slug(&input.text("title"));
        if slug != expected {
            tracing::trace!(slug, expected = %expected, "title does not match id slug");
        }
        vec![]
    }
}

pub fn expected_slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

pub fn internet_warning() -> String {
    "enable_internet=true is rejected by competition submission pipelines. \
     Set it to false for submission notebooks"
        .to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Names of required fields absent from `doc`, in declaration order.
pub fn missing_fields(doc: &Document) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|f| !doc.contains_key(**f))
        .map(|f| f.to_string())
        .collect()
}

/// Validator orchestrates the two phases.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(IdFormatRule),
                Box::new(CodeFileRule),
                Box::new(EnumRule { field: "language", allowed: &VALID_LANGUAGES }),
                Box::new(EnumRule { field: "kernel_type", allowed: &VALID_KERNEL_TYPES }),
                Box::new(BoolStringRule),
                Box::new(KernelTypeConsistencyRule),
                Box::new(CompetitionInternetRule),
                Box::new(TitleSlugRule),
            ],
        }
    }

    pub fn check(&self, doc: &Document, dir: &Path) -> Outcome {
        let missing = missing_fields(doc);
        if !missing.is_empty() {
            tracing::debug!(?missing, "required fields missing, skipping rules");
            return Outcome::MissingFields(missing);
        }

        let input = RuleInput { doc, dir };
        let mut errors = vec![];
        let mut warnings = vec![];

        for rule in &self.rules {
            for violation in rule.validate(&input) {
                tracing::debug!(rule = %violation.rule, severity = ?violation.severity, "violation");
                match violation.severity {
                    ViolationSeverity::Error => errors.push(violation.message),
                    ViolationSeverity::Warning => warnings.push(violation.message),
                }
            }
        }

        Outcome::Checked { errors, warnings }
    }

    /// Load `kernel-metadata.json` from `dir` and check it.
    pub fn check_dir(&self, dir: &Path) -> Result<Outcome, DocumentError> {
        let doc = load_document(dir)?;
        Ok(self.check(&doc, dir))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate the metadata document in `dir` with the default rule set.
pub fn validate_dir(dir: &Path) -> Result<ValidationReport, DocumentError> {
    Validator::new().check_dir(dir).map(ValidationReport::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn valid_doc() -> Value {
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

    fn check(value: Value) -> Outcome {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test-comp-baseline.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("script.py"), "").unwrap();
        Validator::new().check(&doc(value), dir.path())
    }

    fn with(field: &str, value: Value) -> Value {
        let mut v = valid_doc();
        v[field] = value;
        v
    }

    #[test]
    fn test_valid_document_is_clean() {
        let outcome = check(valid_doc());
        assert_eq!(outcome, Outcome::Checked { errors: vec![], warnings: vec![] });
        assert_eq!(ValidationReport::from(outcome).status(), Status::Clean);
    }

    #[test]
    fn test_missing_fields_short_circuit() {
        // Bad id and bad language would error if the rules ran.
        let mut v = with("id", json!("no-separator"));
        v["language"] = json!("julia");
        v.as_object_mut().unwrap().remove("title");
        v.as_object_mut().unwrap().remove("enable_tpu");

        let outcome = check(v);
        assert_eq!(
            outcome,
            Outcome::MissingFields(vec!["title".to_string(), "enable_tpu".to_string()])
        );
        let report = ValidationReport::from(outcome);
        assert_eq!(report.errors.len(), 2);
        assert!(report.warnings.is_empty());
        assert!(report.errors[0].contains("'title'"));
    }

    #[test]
    fn test_id_separator_counts() {
        let Outcome::Checked { errors, .. } = check(with("id", json!("plain"))) else {
            panic!("expected checked outcome");
        };
        assert_eq!(errors, vec!["id 'plain' must be in 'username/slug' form".to_string()]);

        let Outcome::Checked { errors, .. } = check(with("id", json!("a/b/c"))) else {
            panic!("expected checked outcome");
        };
        assert_eq!(errors, vec!["id 'a/b/c' has too many '/' separators".to_string()]);
    }

    #[test]
    fn test_enum_and_bool_errors_accumulate() {
        let mut v = with("language", json!("julia"));
        v["kernel_type"] = json!("app");
        v["enable_gpu"] = json!("yes");
        v["is_private"] = json!(true);

        let report = ValidationReport::from(check(v));
        assert_eq!(report.errors.len(), 4);
        assert_eq!(
            report.errors[0],
            "language 'julia' is invalid. Valid values: python, r, rmarkdown"
        );
        assert!(report.errors[1].starts_with("kernel_type 'app' is invalid"));
        assert_eq!(report.errors[2], "is_private 'true' is invalid. Use 'true' or 'false'");
        assert_eq!(report.errors[3], "enable_gpu 'yes' is invalid. Use 'true' or 'false'");
    }

    #[test]
    fn test_extension_kernel_type_warnings() {
        let report = ValidationReport::from(check(with("kernel_type", json!("script"))));
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings, vec!["code_file is .ipynb but kernel_type is 'script'"]);

        let report = ValidationReport::from(check(with("code_file", json!("script.py"))));
        assert_eq!(report.warnings, vec!["code_file is .py but kernel_type is 'notebook'"]);
    }

    #[test]
    fn test_competition_internet_warning() {
        let report = ValidationReport::from(check(with("enable_internet", json!("true"))));
        assert!(report.is_valid());
        assert_eq!(report.status(), Status::WithWarnings);
        assert_eq!(report.warnings, vec![internet_warning()]);

        let mut v = with("enable_internet", json!("true"));
        v["competition_sources"] = json!([]);
        assert_eq!(ValidationReport::from(check(v)).status(), Status::Clean);
    }

    #[test]
    fn test_title_slug_mismatch_is_silent() {
        let report = ValidationReport::from(check(with("title", json!("Something Else"))));
        assert_eq!(report.status(), Status::Clean);
        assert_eq!(expected_slug("Test Comp Baseline"), "test-comp-baseline");
    }

    #[test]
    fn test_render_orders_errors_before_warnings() {
        let report = ValidationReport {
            errors: vec!["bad".to_string()],
            warnings: vec!["careful".to_string()],
        };
        assert_eq!(report.render(), "Errors (1):\n  x bad\nWarnings (1):\n  ! careful");

        let clean = ValidationReport::default();
        assert_eq!(clean.render(), "OK: kernel-metadata.json is valid.");

        let warned = ValidationReport { errors: vec![], warnings: vec!["w".to_string()] };
        assert!(warned.render().ends_with("\n\nOK (with warnings): kernel-metadata.json is valid."));
    }
}
