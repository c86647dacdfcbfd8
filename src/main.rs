use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pinpoint::catalog::SignatureStore;
use pinpoint::config::{Config, config_path, db_path, log_path};
use pinpoint::extract::{ExtractionSummary, create_default_builder};
use pinpoint::logging::init_logging;
use pinpoint::resolve::{
    ResolutionReport, ResolutionStatus, Resolver, render_requirements, requirement_line,
};
use pinpoint::usage::{LibraryTable, PythonUsageExtractor};

#[derive(Parser)]
#[command(name = "pinpoint")]
#[command(version, about = "Pin Python dependencies to versions that accept the calls your code makes")]
struct Cli {
    /// Config file (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Signature database (defaults to signatures.db in the data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a file or directory and write a requirements file
    Analyze {
        path: PathBuf,
        #[arg(short, long, default_value = "requirements.txt")]
        output: PathBuf,
        /// Extract signatures for libraries missing from the database
        #[arg(long)]
        auto_add: bool,
    },
    /// Analyze a code snippet (from --code or stdin) and print requirements
    Check {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        auto_add: bool,
    },
    /// Extract signatures for a library
    Add {
        library: String,
        /// Number of most recent versions to index
        #[arg(short = 'v', long = "versions")]
        versions: Option<usize>,
    },
    /// Extract signatures for several libraries
    BatchAdd {
        #[arg(required = true)]
        libraries: Vec<String>,
    },
    /// Re-extract every recent version of a library
    Update { library: String },
    /// List indexed libraries
    List,
    /// Show database statistics
    Stats,
    /// Remove a library and all its versions
    Delete { library: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&log_path())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config.unwrap_or_else(config_path))?;
    let store = open_store(&cli.db.unwrap_or_else(db_path))?;

    match cli.command {
        Command::Analyze {
            path,
            output,
            auto_add,
        } => {
            let report = resolver(&store, &config)
                .resolve_path(&path, auto_add)
                .await?;
            std::fs::write(&output, render_requirements(&report))
                .with_context(|| format!("failed to write {}", output.display()))?;
            print_report(&report);
            println!("Wrote {}", output.display());
        }
        Command::Check { code, auto_add } => {
            let code = match code {
                Some(code) => code,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed to read code from stdin")?;
                    buffer
                }
            };
            let report = resolver(&store, &config)
                .resolve_text(&code, auto_add)
                .await?;
            print_report(&report);
        }
        Command::Add { library, versions } => {
            let summary = create_default_builder(store, &config)
                .extract(&library, versions)
                .await?;
            print_summary(&summary);
        }
        Command::BatchAdd { libraries } => {
            let builder = create_default_builder(store, &config);
            let results = builder.batch_extract(&libraries).await;
            let succeeded = results.iter().filter(|(_, r)| r.is_ok()).count();
            for (library, result) in results {
                match result {
                    Ok(summary) => print_summary(&summary),
                    Err(e) => println!("{}: failed: {}", library, e),
                }
            }
            println!("{}/{} libraries added", succeeded, libraries.len());
        }
        Command::Update { library } => {
            let summary = create_default_builder(store, &config)
                .update(&library)
                .await?;
            print_summary(&summary);
        }
        Command::List => {
            let summaries = store.summaries()?;
            if summaries.is_empty() {
                println!("No libraries indexed");
            }
            for summary in summaries {
                let extracted = summary
                    .last_extracted
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {} versions (newest {})  extracted {}",
                    summary.library,
                    summary.version_count,
                    summary.newest_version.as_deref().unwrap_or("-"),
                    extracted
                );
            }
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("Libraries: {}", stats.total_libraries);
            println!("Versions:  {}", stats.total_versions);
            println!("Symbols:   {}", stats.total_symbols);
        }
        Command::Delete { library } => {
            if store.remove(&library)? {
                println!("Deleted {}", library);
            } else {
                println!("{} is not indexed", library);
            }
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> anyhow::Result<Arc<SignatureStore>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(Arc::new(SignatureStore::open(path)?))
}

fn resolver(store: &Arc<SignatureStore>, config: &Config) -> Resolver<SignatureStore> {
    let libraries = LibraryTable::new().with_overrides(&config.libraries);
    Resolver::new(
        store.clone(),
        Arc::new(PythonUsageExtractor::new(libraries)),
    )
    .with_builder(Arc::new(create_default_builder(store.clone(), config)))
}

fn print_report(report: &ResolutionReport) {
    for failure in &report.failures {
        eprintln!("warning: {}", failure);
    }
    if report.is_empty() {
        println!("No third-party libraries found");
        return;
    }
    for result in report.results.values() {
        println!("{}", requirement_line(result));
        for warning in &result.warnings {
            eprintln!("  warning: {}", warning);
        }
    }
    eprintln!(
        "{} matched, {} unverified, {} need extraction, {} failed",
        report.count(ResolutionStatus::Matched),
        report.count(ResolutionStatus::Fallback),
        report.count(ResolutionStatus::NeedsExtraction),
        report.count(ResolutionStatus::Failed)
    );
}

fn print_summary(summary: &ExtractionSummary) {
    println!(
        "{}: {} captured, {} already indexed, {} failed",
        summary.library,
        summary.captured.len(),
        summary.already_indexed.len(),
        summary.failures.len()
    );
    for failure in &summary.failures {
        eprintln!("  skipped {}", failure);
    }
}
