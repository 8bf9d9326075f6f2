//! Command-line entry point for rubric grading.
//!
//! # Responsibility
//! - Open the grading database and dispatch one command against it.
//! - Read grading sheets from CSV files; the core only sees data rows.
//!
//! # Invariants
//! - Failures print one line on stderr and exit non-zero.

use clap::{Parser, Subcommand};
use log::info;
use rubrics_core::{
    default_log_level, init_logging, open_db, seed_demo_data, student_performance,
    GradeSheetService, ImportPath, PerformanceQuery, SqliteLedgerRepository,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "rubrics")]
#[command(about = "Import grading sheets and inspect rubric marks per revision")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, default_value = "rubrics.sqlite3", global = true)]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when absent
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a grading sheet CSV for one attempt and revision
    ImportGradeSheet {
        /// CSV file with a header row
        grading_sheet: PathBuf,

        /// Attempt id the marks belong to
        #[arg(long)]
        attempt: i64,

        /// Grading revision id
        #[arg(long)]
        revision: i64,
    },

    /// Seed a demo rubric tree, student, attempt and revisions
    SeedDb,

    /// Print the rubric graph a student earned on a question as JSON
    StudentPerformance {
        student_id: i64,

        /// Question id
        #[arg(long)]
        question: Option<String>,

        /// Grading revision id
        #[arg(long)]
        revision: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let mut conn = open_db(&cli.db)?;
    match cli.command {
        Commands::ImportGradeSheet {
            grading_sheet,
            attempt,
            revision,
        } => {
            let rows = read_grade_sheet(&grading_sheet)?;
            let service = GradeSheetService::new(SqliteLedgerRepository::try_new(&conn)?);
            let summary = service.import_grade_sheet(attempt, revision, rows)?;
            let verb = match summary.path {
                ImportPath::Created => "created",
                ImportPath::Updated => "updated",
            };
            println!(
                "{verb} {} entries from {} rows ({} skipped)",
                summary.entries_written, summary.rows_read, summary.rows_skipped
            );
        }
        Commands::SeedDb => {
            let summary = seed_demo_data(&mut conn)?;
            println!(
                "seeded tree={} question={} student={} attempt={}",
                summary.tree_id, summary.question_id, summary.student_id, summary.attempt_id
            );
            for revision in &summary.revisions {
                println!("revision {} = {}", revision.id, revision.name);
            }
        }
        Commands::StudentPerformance {
            student_id,
            question,
            revision,
        } => {
            let pairs = [("question", question), ("revision", revision)]
                .into_iter()
                .filter_map(|(key, value)| value.map(|value| (key, value)));
            let query = PerformanceQuery::from_pairs(pairs)?;
            let graph = student_performance(&conn, student_id, query)?;
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
    }
    Ok(())
}

fn read_grade_sheet(path: &Path) -> CliResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    info!(
        "event=grade_sheet_read module=cli status=ok rows={}",
        rows.len()
    );
    Ok(rows)
}
