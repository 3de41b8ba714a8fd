//! examkit CLI - headless drivers for the annotation and review libraries.
//!
//! Each subcommand exercises one workflow end to end: consensus analysis
//! over a collected answer file, checkpoint inspection and CSV export,
//! counter recovery from an output directory, region-image export from a
//! saved annotation progress file, and exam-paper source listing/fetching.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;

use examkit_core::checkpoint::Checkpoint;
use examkit_core::consensus::{self, AnswerSet, Confidence};
use examkit_core::export::write_evaluations_csv;
use examkit_annotate::counters_from_filenames;
use examkit_annotate::download::{self, PaperSource};

#[derive(Parser)]
#[command(
    name = "examkit",
    version,
    about = "Build and verify multilingual exam-question datasets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze collected answers for one question and print the consensus
    Consensus {
        /// JSON file: either {"answers": {source: answer}} or a bare map
        input: PathBuf,
    },
    /// Inspect or export a review checkpoint
    #[command(subcommand)]
    Checkpoint(CheckpointCommands),
    /// Recover per-type sequence counters from an export directory
    Counters {
        /// Directory containing exported question images
        dir: PathBuf,
    },
    /// Export question-crop images from a saved annotation progress file
    #[cfg(feature = "pdf")]
    Export {
        /// Annotation progress JSON written by the annotator
        progress: PathBuf,
        /// Source PDF the annotations were drawn over
        #[arg(long)]
        pdf: PathBuf,
        /// Base output directory for the subject tree
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List or fetch exam paper PDFs
    #[command(subcommand)]
    Sources(SourceCommands),
}

#[derive(Subcommand)]
enum CheckpointCommands {
    /// Print progress and error-category summary
    Stats { checkpoint: PathBuf },
    /// Flatten all evaluations to a CSV file
    ExportCsv {
        checkpoint: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum SourceCommands {
    /// List known paper URLs
    List {
        #[arg(long)]
        year: Option<u16>,
        #[arg(long)]
        paper: Option<u8>,
        #[arg(long)]
        language: Option<String>,
    },
    /// Download papers into a directory (existing files are skipped)
    Fetch {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        year: Option<u16>,
        #[arg(long)]
        paper: Option<u8>,
        #[arg(long)]
        language: Option<String>,
    },
}

/// Answer files come in two shapes: the answer tool's progress entries
/// carry an `answers` object, while hand-written files may be a bare map.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersInput {
    Wrapped { answers: IndexMap<String, String> },
    Bare(IndexMap<String, String>),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Consensus { input } => cmd_consensus(&input),
        Commands::Checkpoint(command) => match command {
            CheckpointCommands::Stats { checkpoint } => cmd_checkpoint_stats(&checkpoint),
            CheckpointCommands::ExportCsv { checkpoint, output } => {
                cmd_checkpoint_export(&checkpoint, &output)
            }
        },
        Commands::Counters { dir } => cmd_counters(&dir),
        #[cfg(feature = "pdf")]
        Commands::Export {
            progress,
            pdf,
            output,
        } => cmd_export(&progress, &pdf, &output),
        Commands::Sources(command) => match command {
            SourceCommands::List {
                year,
                paper,
                language,
            } => cmd_sources_list(year, paper, language.as_deref()),
            SourceCommands::Fetch {
                output,
                year,
                paper,
                language,
            } => cmd_sources_fetch(&output, year, paper, language.as_deref()),
        },
    }
}

fn cmd_consensus(input: &std::path::Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read answers file: {}", input.display()))?;
    let parsed: AnswersInput =
        serde_json::from_str(&content).context("answers file is not a JSON answer map")?;
    let entries = match parsed {
        AnswersInput::Wrapped { answers } | AnswersInput::Bare(answers) => answers,
    };

    let mut answers = AnswerSet::new();
    for (source, answer) in &entries {
        answers.insert(source, answer);
    }

    let Some(report) = consensus::analyze(&answers) else {
        println!("{}", "No answers provided yet.".yellow());
        return Ok(());
    };

    println!("Total sources: {}", report.total_sources);
    println!("\nAnswer frequency:");
    for tally in &report.tallies {
        println!(
            "  '{}': {} sources ({:.1}%)",
            tally.answer,
            tally.count,
            tally.percentage(report.total_sources)
        );
    }

    match report.result.confidence {
        Confidence::High => println!(
            "\n{} all sources agree on '{}'",
            "CONSENSUS:".green().bold(),
            report.result.final_answer.as_deref().unwrap_or_default()
        ),
        Confidence::Medium => println!(
            "\n{} '{}' ({}/{} sources) — flagged for explicit accept",
            "MAJORITY:".yellow().bold(),
            report.result.final_answer.as_deref().unwrap_or_default(),
            report.tallies[0].count,
            report.total_sources
        ),
        Confidence::Low => println!(
            "\n{} no clear majority — flag for manual review",
            "NO CONSENSUS:".red().bold()
        ),
        // analyze never returns MANUAL; that confidence only comes from an
        // operator override.
        Confidence::Manual => {}
    }
    Ok(())
}

fn cmd_checkpoint_stats(path: &std::path::Path) -> Result<()> {
    let checkpoint = Checkpoint::load(path)
        .with_context(|| format!("failed to load checkpoint: {}", path.display()))?;
    let info = &checkpoint.checkpoint_info;
    let summary = &checkpoint.evaluation_summary;

    println!("{}", "Checkpoint".bold());
    println!(
        "  dataset:    {}",
        info.original_questions_file.display()
    );
    println!(
        "  progress:   {}/{} ({}%)",
        info.evaluated_questions, info.total_questions, info.completion_percentage
    );
    println!("  position:   question {}", info.current_question_index + 1);
    println!("  updated:    {}", info.last_updated.to_rfc3339());
    println!();
    println!("{}", "Error summary".bold());
    println!("  any error:            {}", summary.total_errors);
    println!("  conceptual:           {}", summary.conceptual_errors);
    println!("  grounding:            {}", summary.grounding_errors);
    println!("  computation:          {}", summary.computation_errors);
    println!("  instruction:          {}", summary.instruction_errors);
    println!("  with notes:           {}", summary.questions_with_notes);
    Ok(())
}

fn cmd_checkpoint_export(path: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let checkpoint = Checkpoint::load(path)
        .with_context(|| format!("failed to load checkpoint: {}", path.display()))?;
    let rows = write_evaluations_csv(output, &checkpoint.evaluations)
        .with_context(|| format!("failed to write CSV: {}", output.display()))?;
    println!(
        "{} {rows} evaluations -> {}",
        "Exported".green().bold(),
        output.display()
    );
    Ok(())
}

fn cmd_counters(dir: &std::path::Path) -> Result<()> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    let counters = counters_from_filenames(names.iter().map(String::as_str));

    println!("{}", "Recovered sequence counters".bold());
    for question_type in examkit_core::QuestionType::ALL {
        let count = counters.get(&question_type).copied().unwrap_or(0);
        println!("  {:<14} {count}", question_type.label());
    }
    Ok(())
}

#[cfg(feature = "pdf")]
fn cmd_export(
    progress: &std::path::Path,
    pdf: &std::path::Path,
    output: &std::path::Path,
) -> Result<()> {
    use examkit_annotate::export::load_progress;
    use examkit_annotate::{export_annotations, PdfiumRasterizer};

    let (_, mut store) = load_progress(progress)
        .with_context(|| format!("failed to load progress file: {}", progress.display()))?;
    if store.annotations().is_empty() {
        bail!("progress file contains no annotations");
    }
    let rasterizer = PdfiumRasterizer::open(pdf)
        .with_context(|| format!("failed to open PDF: {}", pdf.display()))?;

    let manifest = export_annotations(&mut store, &rasterizer, output)?;
    println!(
        "{} {} annotations -> {}",
        "Exported".green().bold(),
        manifest.annotations.len(),
        output.display()
    );
    for file in &manifest.files {
        println!("  {}", file.display());
    }
    Ok(())
}

fn filter_sources(
    year: Option<u16>,
    paper: Option<u8>,
    language: Option<&str>,
) -> Vec<PaperSource> {
    download::generate_sources()
        .into_iter()
        .filter(|s| year.map_or(true, |y| s.year == y))
        .filter(|s| paper.map_or(true, |p| s.paper == p))
        .filter(|s| language.map_or(true, |l| s.language.eq_ignore_ascii_case(l)))
        .collect()
}

fn cmd_sources_list(year: Option<u16>, paper: Option<u8>, language: Option<&str>) -> Result<()> {
    let sources = filter_sources(year, paper, language);
    if sources.is_empty() {
        bail!("no known sources match the given filters");
    }
    for source in &sources {
        println!("{:<24} {}", source.filename, source.url);
    }
    Ok(())
}

fn cmd_sources_fetch(
    output: &std::path::Path,
    year: Option<u16>,
    paper: Option<u8>,
    language: Option<&str>,
) -> Result<()> {
    let sources = filter_sources(year, paper, language);
    if sources.is_empty() {
        bail!("no known sources match the given filters");
    }
    let mut fetched = 0usize;
    let mut failed = 0usize;
    for source in &sources {
        match download::download(source, output) {
            Ok(path) => {
                fetched += 1;
                println!("{} {}", "ok".green(), path.display());
            }
            Err(e) => {
                failed += 1;
                println!("{} {}: {e}", "failed".red(), source.filename);
            }
        }
    }
    println!(
        "\n{} {fetched} fetched, {failed} failed",
        "Done:".bold()
    );
    Ok(())
}
