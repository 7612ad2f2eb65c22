//! Human-readable report rendering for terminal output.
//!
//! Produces a colored end-of-session summary: overall statistics, the most
//! shared cracked passwords and the most shared passwords still standing.
use colored::*;

use crate::{
    registry::TargetRegistry,
    stats::{SessionSummary, top_passwords},
};

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn guess_or_none(g: Option<u64>) -> String {
    g.map_or_else(|| "(none)".to_string(), |g| g.to_string())
}

pub fn render_summary(summary: &SessionSummary, registry: &TargetRegistry, top_n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        "checkpass: Cracking Session Results".bold().cyan()
    ));

    let mut stats_lines: Vec<String> = Vec::new();
    stats_lines.push(format!(
        "Finished: {}",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    ));
    stats_lines.push(format!("Stopped: {}", summary.stop_reason));
    stats_lines.push(format!("Guesses: {}", summary.guesses));
    stats_lines.push(format!("Undecodable Guesses: {}", summary.decode_errors));
    stats_lines.push(format!("Total Passwords: {}", summary.total_count));
    stats_lines.push(format!("Cracked: {}", summary.cracked_count));
    stats_lines.push(format!(
        "Cracked Percentage: {}",
        summary.cracked_percentage
    ));
    stats_lines.push(format!("Unique: {}", summary.unique_count));
    stats_lines.push(format!("Cracked Unique: {}", summary.unique_cracked_count));
    stats_lines.push(format!(
        "Cracked Unique Percentage: {}",
        summary.unique_cracked_percentage
    ));
    stats_lines.push(format!(
        "First Crack At Guess: {}",
        guess_or_none(summary.first_crack_at)
    ));
    stats_lines.push(format!(
        "Last Crack At Guess: {}",
        guess_or_none(summary.last_crack_at)
    ));
    if summary.decode_errors > 0 {
        stats_lines.push(
            "Some guesses could not be decoded; results may be unreliable"
                .red()
                .to_string(),
        );
    }
    out.push_str(&section_header(
        &"Session Statistics".bold().yellow().to_string(),
    ));
    for line in stats_lines {
        out.push_str(&line);
        out.push('\n');
    }

    let mut cracked_lines: Vec<String> = Vec::new();
    let cracked = top_passwords(registry, top_n, true);
    if cracked.is_empty() {
        cracked_lines.push("(No cracked passwords)".to_string());
    } else {
        for (pw, count, at) in cracked {
            cracked_lines.push(format!(
                "  {}: {} {}",
                pw.green(),
                count,
                format!("(guess {})", guess_or_none(at)).dimmed()
            ));
        }
    }
    out.push_str(&section_header(
        &"Top Cracked Passwords".bold().magenta().to_string(),
    ));
    for line in cracked_lines {
        out.push_str(&line);
        out.push('\n');
    }

    let mut uncracked_lines: Vec<String> = Vec::new();
    let uncracked = top_passwords(registry, top_n, false);
    if uncracked.is_empty() {
        uncracked_lines.push("(No uncracked passwords)".to_string());
    } else {
        for (pw, count, _) in uncracked {
            uncracked_lines.push(format!("  {}: {}", pw.red(), count));
        }
    }
    out.push_str(&section_header(
        &"Top Uncracked Passwords".bold().magenta().to_string(),
    ));
    for line in uncracked_lines {
        out.push_str(&line);
        out.push('\n');
    }

    out
}
