//! Kaggle Notebook Deploy - git push your notebooks
//!
//! # Flow
//! 1. `init` scaffolds a competition directory
//! 2. `validate` checks kernel-metadata.json (read-only, repeatable)
//! 3. `push` hands the directory to the Kaggle CLI
//!
//! `init-repo` sets up the CI workflow that runs step 3 remotely.

pub mod metadata;
pub mod validation;
pub mod scaffold;
pub mod publish;
pub mod repo;
pub mod paths;

pub use metadata::{KernelMetadata, KernelType, Language, Document, DocumentError, METADATA_FILE};
pub use validation::{validate_dir, Outcome, Status, ValidationReport, Validator};
pub use scaffold::{generate, resolve_owner, system_owner, Scaffold, ScaffoldError, ScaffoldParams};
pub use publish::{CommandOutput, CommandRunner, PublishError, PushOptions, PushPlan, SystemRunner};
pub use repo::{init_repo, FileAction, RepoError, RepoInitReport};
pub use paths::normalize_path;
