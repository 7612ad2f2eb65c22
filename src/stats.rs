//! Statistical summaries of a finished cracking session.
//!
//! `SessionSummary` collects counts and percentages over the registry and the
//! engine's counters; `top_passwords` ranks cracked or uncracked plaintexts by
//! how many target accounts share them.
use chrono::{DateTime, Local};

use crate::engine::{MatchEngine, SessionOutcome, StopReason};
use crate::registry::TargetRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub total_count: u64,
    pub cracked_count: u64,
    pub cracked_percentage: String,
    pub unique_count: usize,
    pub unique_cracked_count: usize,
    pub unique_cracked_percentage: String,
    pub guesses: u64,
    pub decode_errors: u64,
    pub first_crack_at: Option<u64>,
    pub last_crack_at: Option<u64>,
    pub stop_reason: StopReason,
    pub finished_at: DateTime<Local>,
}

fn pct(n: u64, d: u64) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

pub fn summarize(engine: &MatchEngine, outcome: &SessionOutcome) -> SessionSummary {
    summarize_at(engine.registry(), outcome, Local::now())
}

/// Build a summary with an explicit finishing time.
pub fn summarize_at(
    registry: &TargetRegistry,
    outcome: &SessionOutcome,
    finished_at: DateTime<Local>,
) -> SessionSummary {
    let mut unique_cracked = 0usize;
    let mut first: Option<u64> = None;
    let mut last: Option<u64> = None;
    for (_, entry) in registry.cracked() {
        unique_cracked += 1;
        if let Some(at) = entry.cracked_at() {
            first = Some(first.map_or(at, |f| f.min(at)));
            last = Some(last.map_or(at, |l| l.max(at)));
        }
    }
    let unique = registry.unique_count();
    SessionSummary {
        total_count: outcome.total_count,
        cracked_count: outcome.counters.cracked_count,
        cracked_percentage: pct(outcome.counters.cracked_count, outcome.total_count),
        unique_count: unique,
        unique_cracked_count: unique_cracked,
        unique_cracked_percentage: pct(unique_cracked as u64, unique as u64),
        guesses: outcome.counters.guess_index,
        decode_errors: outcome.counters.decode_error_count,
        first_crack_at: first,
        last_crack_at: last,
        stop_reason: outcome.stop_reason,
        finished_at,
    }
}

/// Return the top-N plaintexts by multiplicity among cracked (`cracked =
/// true`) or uncracked entries, as (plaintext, multiplicity, cracked_at).
/// Sorted descending by multiplicity, then ascending by plaintext to keep the
/// ordering stable.
pub fn top_passwords(
    registry: &TargetRegistry,
    top_n: usize,
    cracked: bool,
) -> Vec<(String, u64, Option<u64>)> {
    use std::cmp::Reverse;
    let mut items: Vec<(String, u64, Option<u64>)> = registry
        .entries()
        .filter(|(_, e)| e.is_cracked() == cracked)
        .map(|(pw, e)| (pw.to_string(), e.multiplicity(), e.cracked_at()))
        .collect();
    items.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
    if items.len() > top_n {
        items.truncate(top_n);
    }
    items
}
