//! Terminal output formatting with ANSI colors.

use colored::Colorize;
use std::process::Command;

use crate::api::projects::Project;
use crate::deploy::phase::{DeployOp, DeployPhase};
use crate::deploy::tracker::StageStatus;
use crate::logs::filters;
use crate::stream::{GeneratedFile, LogEntry};

/// Format an agent log line: `08:15:42  [ORCHESTRATOR] message`.
pub fn format_agent_line(entry: &LogEntry) -> String {
    let time = entry.received_at.format("%H:%M:%S");
    let agent = entry
        .agent
        .as_deref()
        .unwrap_or("workflow")
        .to_uppercase();
    format!("{}  [{}] {}", time, agent, entry.message)
}

/// Print one streamed deployment log line, applying the presentation filter.
pub fn print_deploy_line(entry: &LogEntry) {
    if !filters::should_show(&entry.message) {
        return;
    }
    let message = filters::clean_message(&entry.message);
    if message.trim_start().starts_with('$') {
        println!("{}", message.cyan());
    } else {
        println!("{}", message);
    }
}

/// Print one workflow log line with its agent tag.
pub fn print_workflow_line(entry: &LogEntry) {
    let time = entry.received_at.format("%H:%M:%S").to_string();
    let agent = entry
        .agent
        .as_deref()
        .unwrap_or("workflow")
        .to_uppercase();
    let line = match entry.level.as_deref() {
        Some("error") => entry.message.red().to_string(),
        Some("warning") | Some("warn") => entry.message.yellow().to_string(),
        _ => entry.message.clone(),
    };
    println!("{}  {} {}", time.dimmed(), format!("[{}]", agent).cyan(), line);
}

/// Print one agent-activity ("thinking") line, dimmed.
pub fn print_agent_line(entry: &LogEntry) {
    println!("{}", format_agent_line(entry).dimmed());
}

pub fn print_stage_header(op: DeployOp) {
    println!();
    println!("{}", format!("── {} ──", op.title()).bold());
}

pub fn print_stage_result(op: DeployOp, status: StageStatus, duration_secs: Option<u64>) {
    let duration = duration_secs
        .map(|s| format!(" ({s}s)"))
        .unwrap_or_default();
    match status {
        StageStatus::Success => {
            println!("{}", format!("✓ {} succeeded{}", op, duration).green());
        }
        StageStatus::Error => {
            println!("{}", format!("✗ {} failed{}", op, duration).red());
        }
        StageStatus::Running => {
            println!("{}", format!("… {} running", op).dimmed());
        }
        StageStatus::Idle => {}
    }
}

pub fn print_phase(phase: DeployPhase) {
    println!("Phase: {}", phase.to_string().bold());
}

pub fn print_generation_status(message: &str, progress: u8) {
    println!("{} {}", format!("[{progress:>3}%]").dimmed(), message);
}

pub fn print_generated_files(files: &[GeneratedFile]) {
    if files.is_empty() {
        return;
    }
    println!();
    println!("{}", "Generated files:".bold());
    for file in files {
        println!("  {} {}", "+".green(), file.filename);
    }
}

pub fn print_project_summary(project: &Project) {
    println!(
        "{}  {}  {}",
        project.slug.bold(),
        project.status.dimmed(),
        project
            .deployment_status
            .as_deref()
            .unwrap_or("-")
            .dimmed()
    );
    if let Some(url) = &project.application_url {
        println!("  {} {}", "url:".dimmed(), url);
    }
}

pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

/// Print iteration separator.
pub fn print_separator() {
    let width = terminal_width();
    println!("{}", "-".repeat(width).dimmed());
}

/// Print a clickable file hyperlink.
pub fn hyperlink(path: &str) {
    println!("\x1b]8;;file://{}\x1b\\{}\x1b]8;;\x1b\\", path, path);
}

fn terminal_width() -> usize {
    Command::new("tput")
        .arg("cols")
        .output()
        .ok()
        .and_then(|out| {
            if out.status.success() {
                String::from_utf8_lossy(&out.stdout).trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(80)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn agent_line_format() {
        let entry = LogEntry {
            message: "Analyzing repository structure".to_string(),
            agent: Some("github_analyzer".to_string()),
            stage: Some("analyzing".to_string()),
            level: None,
            received_at: chrono::Utc.with_ymd_and_hms(2025, 6, 1, 8, 15, 42).unwrap(),
        };
        assert_eq!(
            format_agent_line(&entry),
            "08:15:42  [GITHUB_ANALYZER] Analyzing repository structure"
        );
    }

    #[test]
    fn agent_line_defaults_tag_when_agent_missing() {
        let entry = LogEntry::plain("hello");
        assert!(format_agent_line(&entry).contains("[WORKFLOW]"));
    }
}
