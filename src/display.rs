//! Colored CLI display utilities for boss/intern output.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::delegation::{BossSummary, Termination};
use crate::suite::SuiteReport;
use crate::transcript::{EventKind, ResolutionSummary, TranscriptEvent};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Collapse newlines so multi-line answers fit on one display line.
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Print the start of a resolution.
pub fn print_question_start(question: &str, summary: &BossSummary, raw_mode: bool) {
    println!(
        "{} {} {} boss={}, intern={}, max_iterations={}",
        timestamp().dimmed(),
        "[QUESTION]".blue().bold(),
        truncate(&one_line(question), DEFAULT_MAX_LEN, raw_mode),
        summary.boss_model.cyan(),
        summary.intern_model.cyan(),
        summary.max_iterations
    );
    let _ = io::stdout().flush();
}

/// Print one boss to intern consultation.
pub fn print_exchange(index: usize, question: &str, answer: &str, raw_mode: bool) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        format!("[BOSS #{index}]").magenta().bold(),
        truncate(&one_line(question), 150, raw_mode)
    );
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        format!("[INTERN #{index}]").cyan().bold(),
        truncate(&one_line(answer), 150, raw_mode).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print the final answer of a resolution.
pub fn print_final(answer: &str, terminated_by: Option<Termination>, iterations: usize) {
    let how = terminated_by.map_or("UNKNOWN", |t| t.as_str());
    let label = match terminated_by {
        Some(Termination::Satisfied) => "[ANSWER]".green().bold().to_string(),
        _ => "[ANSWER]".yellow().bold().to_string(),
    };
    println!(
        "{} {} {} {}",
        timestamp().dimmed(),
        label,
        answer,
        format!("({how}, {iterations} consultation(s))").dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print a failed resolution.
pub fn print_failure(message: &str, evidence_len: usize, raw_mode: bool) {
    println!(
        "{} {} {} {}",
        timestamp().dimmed(),
        "[ERROR]".red().bold(),
        truncate(message, 200, raw_mode).red(),
        format!("({evidence_len} consultation(s) gathered)").dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print a suite report.
pub fn print_suite_report(report: &SuiteReport, raw_mode: bool) {
    for suite in &report.suites {
        println!("{} {}", "[SUITE]".blue().bold(), suite.name.bold());
        for result in &suite.results {
            let status = match (result.matched, &result.error) {
                (_, Some(_)) => "[FAIL]".red().bold().to_string(),
                (Some(true), None) => "[PASS]".green().bold().to_string(),
                (Some(false), None) => "[MISS]".yellow().bold().to_string(),
                (None, None) => "[DONE]".cyan().bold().to_string(),
            };
            let detail = result
                .error
                .as_deref()
                .or(result.answer.as_deref())
                .unwrap_or_default();
            println!(
                "  {} {} {}",
                status,
                result.id,
                truncate(&one_line(detail), DEFAULT_MAX_LEN, raw_mode).dimmed()
            );
        }
    }
    println!(
        "{} {} total, {} answered, {} matched, {} failed",
        "[REPORT]".magenta().bold(),
        report.total,
        report.answered,
        report.matched,
        report.failed
    );
    let _ = io::stdout().flush();
}

/// Print stored resolutions, newest first.
pub fn print_resolutions(summaries: &[ResolutionSummary], raw_mode: bool) {
    if summaries.is_empty() {
        println!("{}", "No resolutions recorded.".dimmed());
    }
    for summary in summaries {
        let how = summary.terminated_by.map_or("INCOMPLETE", |t| t.as_str());
        println!(
            "{} {} {} {}",
            summary.started_at.format("%Y-%m-%dT%H:%M:%SZ").to_string().dimmed(),
            summary.resolution_id.to_string().cyan(),
            format!("[{how}, {}]", summary.exchanges).bold(),
            truncate(
                &one_line(summary.question.as_deref().unwrap_or_default()),
                60,
                raw_mode
            )
        );
    }
    let _ = io::stdout().flush();
}

/// Print the stored events of one resolution.
pub fn print_events(events: &[TranscriptEvent], raw_mode: bool) {
    if events.is_empty() {
        println!("{}", "No events for this resolution.".dimmed());
    }
    for event in events {
        match event.kind {
            EventKind::Exchange => print_exchange(
                event.iteration.unwrap_or_default(),
                event.question.as_deref().unwrap_or_default(),
                event.answer.as_deref().unwrap_or_default(),
                raw_mode,
            ),
            EventKind::Final => print_final(
                event.answer.as_deref().unwrap_or_default(),
                event.terminated_by,
                event.iteration.unwrap_or_default(),
            ),
            EventKind::Error => print_failure(
                event.message.as_deref().unwrap_or_default(),
                event.iteration.unwrap_or_default(),
                raw_mode,
            ),
        }
    }
}
