//! Publisher - hands a validated directory to the Kaggle CLI
//!
//! Runs `<uploader> kernels push -p <dir>`. The uploader's output and exit
//! code are passed through untouched.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::metadata::{field_text, load_document, DocumentError};
use crate::validation::{ValidationReport, Validator};

pub const DEFAULT_UPLOADER: &str = "kaggle";
pub const UPLOADER_ENV: &str = "KAGGLE_DEPLOY_UPLOADER";
pub const INSTALL_HINT: &str = "pip install kaggle";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("validation failed with {} error(s)", .0.errors.len())]
    ValidationFailed(ValidationReport),

    #[error("{0} command not found. Install it with `pip install kaggle`")]
    ToolNotFound(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub skip_validate: bool,
    pub uploader: String,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self { skip_validate: false, uploader: DEFAULT_UPLOADER.to_string() }
    }
}

/// Fields shown before pushing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PushSummary {
    pub kernel_id: String,
    pub code_file: String,
    pub enable_gpu: String,
    pub is_private: String,
}

/// Everything needed to run the upload, decided before anything is spawned.
#[derive(Debug, Clone)]
pub struct PushPlan {
    pub dir: PathBuf,
    /// `None` when validation was skipped.
    pub validation: Option<ValidationReport>,
    pub summary: PushSummary,
    pub program: String,
    pub args: Vec<String>,
}

impl PushPlan {
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Code to exit with: the uploader's own, or 1 if it had none.
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(1)
    }
}

/// Seam for running the uploader; tests substitute a fake.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// Runs the real process, blocking until it exits.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Validate (unless skipped) and build the push command for `dir`.
pub fn plan(dir: &Path, options: &PushOptions) -> Result<PushPlan, PublishError> {
    let doc = load_document(dir)?;

    let validation = if options.skip_validate {
        tracing::debug!("validation skipped");
        None
    } else {
        let report = ValidationReport::from(Validator::new().check(&doc, dir));
        if !report.is_valid() {
            return Err(PublishError::ValidationFailed(report));
        }
        Some(report)
    };

    let summary = PushSummary {
        kernel_id: field_text(&doc, "id"),
        code_file: field_text(&doc, "code_file"),
        enable_gpu: field_text(&doc, "enable_gpu"),
        is_private: field_text(&doc, "is_private"),
    };

    Ok(PushPlan {
        dir: dir.to_path_buf(),
        validation,
        summary,
        program: options.uploader.clone(),
        args: vec![
            "kernels".to_string(),
            "push".to_string(),
            "-p".to_string(),
            dir.display().to_string(),
        ],
    })
}

/// Run the planned upload. A non-zero exit is returned as output, not error.
pub fn execute(plan: &PushPlan, runner: &dyn CommandRunner) -> Result<CommandOutput, PublishError> {
    tracing::info!(command = %plan.command_line(), "running uploader");
    let output = runner.run(&plan.program, &plan.args).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            PublishError::ToolNotFound(plan.program.clone())
        } else {
            PublishError::Spawn { program: plan.program.clone(), source }
        }
    })?;
    tracing::info!(code = ?output.code, "uploader finished");
    Ok(output)
}
