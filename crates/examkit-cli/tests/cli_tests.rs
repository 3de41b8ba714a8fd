//! Integration tests for the examkit CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a CLI command
fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_examkit"))
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_consensus_unanimous() {
    let dir = TempDir::new().unwrap();
    let input = write(
        dir.path(),
        "answers.json",
        r#"{"FIITJEE": "B", "Aakash": "B", "Resonance": "B"}"#,
    );

    cli()
        .arg("consensus")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total sources: 3"))
        .stdout(predicate::str::contains("CONSENSUS:"))
        .stdout(predicate::str::contains("'B': 3 sources (100.0%)"));
}

#[test]
fn test_consensus_majority_is_flagged() {
    let dir = TempDir::new().unwrap();
    let input = write(
        dir.path(),
        "answers.json",
        r#"{"answers": {"A": "x", "B": "x", "C": "y"}}"#,
    );

    cli()
        .arg("consensus")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("MAJORITY:"))
        .stdout(predicate::str::contains("2/3 sources"))
        .stdout(predicate::str::contains("flagged"));
}

#[test]
fn test_consensus_no_majority() {
    let dir = TempDir::new().unwrap();
    let input = write(
        dir.path(),
        "answers.json",
        r#"{"A": "x", "B": "y", "C": "z"}"#,
    );

    cli()
        .arg("consensus")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("NO CONSENSUS:"));
}

#[test]
fn test_consensus_missing_file_fails() {
    cli()
        .arg("consensus")
        .arg("/nonexistent/answers.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read answers file"));
}

#[test]
fn test_counters_recovered_from_directory() {
    let dir = TempDir::new().unwrap();
    for name in [
        "2023_P1_English_Physics_MCQ-Single_q1_MCQ-Single_page1.png",
        "2023_P1_English_Physics_MCQ-Single_q4_MCQ-Single_page2.png",
        "2023_P1_English_Physics_Numerical_q2_Numerical_page5.png",
        "export_summary.txt",
    ] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    cli()
        .arg("counters")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("MCQ-Single"))
        .stdout(predicate::str::contains("4"))
        .stdout(predicate::str::contains("Numerical"));
}

#[test]
fn test_checkpoint_stats_and_csv_export() {
    let dir = TempDir::new().unwrap();
    let checkpoint = write(
        dir.path(),
        "manual_evaluations_20250101_000000.json",
        r#"{
            "checkpoint_info": {
                "original_questions_file": "/data/selected_questions.json",
                "total_questions": 2,
                "evaluated_questions": 1,
                "completion_percentage": 50.0,
                "last_updated": "2025-01-01T00:00:00Z",
                "current_question_index": 1
            },
            "evaluation_summary": {
                "total_errors": 1,
                "conceptual_errors": 1,
                "grounding_errors": 0,
                "computation_errors": 0,
                "instruction_errors": 0,
                "questions_with_notes": 1
            },
            "evaluations": {
                "q1_Physics_English_2023_1": {
                    "unique_question_id": "q1_Physics_English_2023_1",
                    "original_question_id": "q1",
                    "model_name": "",
                    "conceptual_errors": true,
                    "grounding_errors": false,
                    "computation_errors": false,
                    "instruction_errors": false,
                    "notes": "confused units",
                    "evaluation_timestamp": "2025-01-01T00:00:00Z",
                    "question_metadata": {
                        "subject": "Physics",
                        "language": "English",
                        "question_type": "MCQ-Single",
                        "is_correct": false,
                        "image_filename": "",
                        "year": "2023",
                        "paper": "1",
                        "correct_answer": "B",
                        "predicted_answer": "C"
                    }
                }
            }
        }"#,
    );

    cli()
        .arg("checkpoint")
        .arg("stats")
        .arg(&checkpoint)
        .assert()
        .success()
        .stdout(predicate::str::contains("1/2 (50%)"))
        .stdout(predicate::str::contains("conceptual:           1"));

    let csv_path = dir.path().join("out.csv");
    cli()
        .arg("checkpoint")
        .arg("export-csv")
        .arg(&checkpoint)
        .arg("-o")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 evaluations"));

    let content = std::fs::read_to_string(&csv_path).unwrap();
    assert!(content.contains("confused units"));
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn test_sources_list_filters() {
    cli()
        .args(["sources", "list", "--year", "2023", "--language", "English"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023_1_English.pdf"))
        .stdout(predicate::str::contains("2023_2_English.pdf"))
        .stdout(predicate::str::contains("Hindi").not());
}

#[test]
fn test_sources_list_no_match_fails() {
    cli()
        .args(["sources", "list", "--year", "1999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no known sources"));
}
