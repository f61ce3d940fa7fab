use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use libris_app::modules::books::{
    candidate::Candidate,
    models::{Book, BookId},
    store::InMemoryBookStore,
    validation::{
        policy::Policies, Clock, EngineError, FixedClock, SystemClock, Target, ValidationEngine,
    },
};
use libris_kernel::settings::Settings;

/// Libris book catalog
#[derive(Debug, Parser)]
#[command(name = "libris", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Print every validation policy and its rules as JSON
    Policies,
    /// Validate one candidate book without storing it
    Validate {
        /// JSON object with the candidate fields
        #[arg(long)]
        file: PathBuf,
        /// Policy to apply instead of the configured default
        #[arg(long)]
        policy: Option<String>,
        /// JSON array of stored books (with ids) to check uniqueness against
        #[arg(long)]
        existing: Option<PathBuf>,
        /// Validate as a full update of this stored book
        #[arg(long, requires = "existing")]
        update: Option<BookId>,
        /// Evaluation date for date rules, YYYY-MM-DD
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load Libris settings")?;
    libris_telemetry::init(&settings.telemetry).context("failed to initialize telemetry")?;

    match cli.command {
        Command::Serve => {
            libris_app::run(settings).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Policies => {
            let policies = Policies::from_settings(&settings.catalog)?;
            println!("{}", serde_json::to_string_pretty(&policies.summaries())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            file,
            policy,
            existing,
            update,
            today,
        } => {
            validate(
                &settings,
                ValidateArgs {
                    file,
                    policy,
                    existing,
                    update,
                    today,
                },
            )
            .await
        }
    }
}

struct ValidateArgs {
    file: PathBuf,
    policy: Option<String>,
    existing: Option<PathBuf>,
    update: Option<BookId>,
    today: Option<NaiveDate>,
}

async fn validate(settings: &Settings, args: ValidateArgs) -> anyhow::Result<ExitCode> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;
    let candidate = Candidate::from_value(value)?;

    let books: Vec<Book> = match &args.existing {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of books", path.display()))?
        }
        None => Vec::new(),
    };
    let target_book = match args.update {
        Some(id) => match books.iter().find(|book| book.id == id) {
            Some(book) => Some(book.clone()),
            None => bail!("book {id} is not among the existing books"),
        },
        None => None,
    };

    let store = Arc::new(InMemoryBookStore::new());
    store
        .seed(books)
        .await
        .context("existing books conflict with each other")?;

    let policies = Policies::from_settings(&settings.catalog)?;
    let policy = match &args.policy {
        Some(name) => policies.lookup(name)?,
        None => policies.default_policy(),
    };
    let clock: Arc<dyn Clock> = match args.today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(SystemClock),
    };

    let engine = ValidationEngine::new(store, clock);
    let target = match &target_book {
        Some(book) => Target::Replace(book),
        None => Target::Create,
    };

    match engine.validate(&policy, &candidate, target).await {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(EngineError::Rejected(report)) => {
            tracing::info!(policy = %policy.name, issues = report.len(), "candidate rejected");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::FAILURE)
        }
        Err(EngineError::Store(err)) => Err(err.into()),
    }
}
