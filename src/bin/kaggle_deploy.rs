//! kaggle-deploy CLI
//!
//! Commands: init, init-repo, validate, push
//! Exit 0 on success, 1 on any detected error, and the uploader's own code
//! when it runs and fails.

use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use notebook_deploy::{
    generate, init_repo,
    paths::normalize_dir,
    publish::{self, DEFAULT_UPLOADER, UPLOADER_ENV},
    scaffold::system_owner,
    validate_dir, validation::internet_warning,
    FileAction, PublishError, PushOptions, ScaffoldError, ScaffoldParams, SystemRunner,
};

#[derive(Parser)]
#[command(name = "kaggle-deploy", version, about)]
/// Deploy Kaggle notebooks with git push
///
/// Keeps notebook code in GitHub and pushes it to Kaggle through
/// GitHub Actions or directly from the command line.
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a competition directory from the template
    Init {
        /// Competition slug (the last part of the competition URL)
        competition_slug: String,

        /// Kaggle username (default: from ~/.kaggle/kaggle.json)
        #[arg(short, long)]
        username: Option<String>,

        /// Notebook title (default: derived from the slug)
        #[arg(short, long)]
        title: Option<String>,

        /// Enable GPU
        #[arg(long)]
        gpu: bool,

        /// Enable internet (not allowed for code competition submissions)
        #[arg(long)]
        internet: bool,

        /// Make the notebook public (private by default)
        #[arg(long)]
        public: bool,
    },

    /// Set up the GitHub Actions workflow and related files
    InitRepo {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Validate kernel-metadata.json
    Validate {
        /// Directory containing kernel-metadata.json
        #[arg(default_value = ".")]
        directory: String,
    },

    /// Push a notebook to Kaggle
    Push {
        /// Directory containing kernel-metadata.json
        #[arg(default_value = ".")]
        directory: String,

        /// Skip validation
        #[arg(long)]
        skip_validate: bool,

        /// Print the command instead of running it
        #[arg(long)]
        dry_run: bool,

        /// Uploader executable
        #[arg(long, env = UPLOADER_ENV, default_value = DEFAULT_UPLOADER)]
        uploader: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { competition_slug, username, title, gpu, internet, public } => {
            let params = ScaffoldParams {
                slug: competition_slug,
                owner: username,
                title,
                gpu,
                internet,
                public,
            };
            cmd_init(&params)
        }
        Commands::InitRepo { force } => cmd_init_repo(force),
        Commands::Validate { directory } => Ok(cmd_validate(&directory)),
        Commands::Push { directory, skip_validate, dry_run, uploader } => {
            let options = PushOptions { skip_validate, uploader };
            Ok(cmd_push(&directory, &options, dry_run))
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_init(params: &ScaffoldParams) -> anyhow::Result<ExitCode> {
    let scaffold = match generate(Path::new("."), params, system_owner) {
        Ok(s) => s,
        Err(ScaffoldError::AlreadyExists(slug)) => {
            eprintln!("Error: directory '{}' already exists.", slug);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let slug = &params.slug;
    let notebook = scaffold.notebook_path.strip_prefix(".").unwrap_or(&scaffold.notebook_path);
    let metadata = scaffold.metadata_path.strip_prefix(".").unwrap_or(&scaffold.metadata_path);

    println!("  {}", metadata.display());
    println!("  {}", notebook.display());
    println!();
    println!("Created '{}/'.", slug);
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", notebook.display());
    println!("  2. git add {}/ && git commit && git push", slug);
    println!("  3. gh workflow run kaggle-push.yml -f notebook_dir={}", slug);

    if params.internet {
        println!();
        println!("Warning: {}", internet_warning());
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_init_repo(force: bool) -> anyhow::Result<ExitCode> {
    let root = Path::new(".");
    let report = init_repo(root, force)?;

    for file in &report.files {
        let path = file.path.strip_prefix(root).unwrap_or(&file.path).display();
        match file.action {
            FileAction::Created => println!("  {}", path),
            FileAction::Appended => println!("  {} (appended)", path),
            FileAction::SkippedExisting => {
                println!("  Skip: {} (already exists, use --force to overwrite)", path)
            }
            FileAction::SkippedSection => {
                println!("  Skip: {} (Kaggle Deploy section already present)", path)
            }
        }
    }

    println!();
    match report.changed() {
        0 => println!("All files already exist."),
        n => println!("Set up {} file(s).", n),
    }

    println!();
    println!("Next steps:");
    println!("  1. Set GitHub secrets:");
    println!("     gh secret set KAGGLE_USERNAME");
    println!("     gh secret set KAGGLE_KEY");
    println!("  2. Create a competition directory:");
    println!("     kaggle-deploy init <competition-slug>");

    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(directory: &str) -> ExitCode {
    match validate_dir(&normalize_dir(directory)) {
        Ok(report) => {
            println!("{}", report.render());
            if report.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_push(directory: &str, options: &PushOptions, dry_run: bool) -> ExitCode {
    let dir = normalize_dir(directory);

    let plan = match publish::plan(&dir, options) {
        Ok(p) => p,
        Err(PublishError::ValidationFailed(report)) => {
            println!("{}", report.render());
            eprintln!();
            eprintln!("Validation failed. Use --skip-validate to ignore.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(report) = &plan.validation {
        println!("{}", report.render());
    }

    println!();
    println!("Push target:");
    println!("  Kernel:  {}", plan.summary.kernel_id);
    println!("  File:    {}", plan.summary.code_file);
    println!("  GPU:     {}", plan.summary.enable_gpu);
    println!("  Private: {}", plan.summary.is_private);

    if dry_run {
        println!();
        println!("Dry run: {}", plan.command_line());
        return ExitCode::SUCCESS;
    }

    println!();
    println!("Pushing to Kaggle...");

    let output = match publish::execute(&plan, &SystemRunner) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !output.stdout.is_empty() {
        println!("{}", output.stdout.trim_end());
    }
    if !output.stderr.is_empty() {
        eprintln!("{}", output.stderr.trim_end());
    }

    if !output.success() {
        return ExitCode::from(u8::try_from(output.exit_code()).unwrap_or(1));
    }

    println!();
    println!("Next steps:");
    println!("  Open the notebook on Kaggle and click \"Submit to Competition\"");
    println!("  kaggle kernels status {}", plan.summary.kernel_id);

    ExitCode::SUCCESS
}
