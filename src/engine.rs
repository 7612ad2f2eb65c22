//! Engine: streams guesses against the target registry, records the first
//! guess that cracks each plaintext, and reports progress checkpoints.
//!
//! The engine owns the registry and the session counters for the whole run;
//! nothing else mutates them. Typical usage:
//!
//! ```no_run
//! use checkpass::checkpoint::TsvCheckpointWriter;
//! use checkpass::decode::LineDecoder;
//! use checkpass::engine::{MatchEngine, SessionConfig};
//! use checkpass::registry::TargetRegistry;
//! use checkpass::source::LineGuessSource;
//! # fn main() -> anyhow::Result<()> {
//! let registry = TargetRegistry::from_lines(["abc123", "abc123", "qwerty"]);
//! let mut engine = MatchEngine::new(registry, SessionConfig::default());
//! let mut guesses = LineGuessSource::new(std::io::stdin().lock(), LineDecoder::default());
//! let mut out = TsvCheckpointWriter::new(std::io::stdout());
//! let outcome = engine.run(&mut guesses, &mut out)?;
//! println!("stopped: {}", outcome.stop_reason);
//! # Ok(())
//! # }
//! ```
use std::fmt;

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointSink};
use crate::decode::DecodeError;
use crate::registry::TargetRegistry;
use crate::sampler::CheckpointSampler;
use crate::source::{GuessItem, GuessSource};

/// Undecodable guesses tolerated before the operator is warned that the
/// guess encoding is probably wrong.
pub const DECODE_WARNING_THRESHOLD: u64 = 10_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Stop once this many guesses have been made (counting the start offset).
    pub max_guesses: Option<u64>,
    /// Guesses already made in an earlier session.
    pub start_guess_index: u64,
    /// Passwords already cracked in an earlier session and absent from this
    /// registry.
    pub start_cracked_count: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounters {
    pub guess_index: u64,
    pub cracked_count: u64,
    pub decode_error_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    InputExhausted,
    AllCracked,
    GuessBudgetExhausted,
    ReadError,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::InputExhausted => "guess input exhausted",
            StopReason::AllCracked => "all passwords cracked",
            StopReason::GuessBudgetExhausted => "maximum guesses reached",
            StopReason::ReadError => "error reading guess input",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub counters: SessionCounters,
    pub total_count: u64,
    pub stop_reason: StopReason,
}

#[derive(Debug)]
pub struct MatchEngine {
    registry: TargetRegistry,
    config: SessionConfig,
    counters: SessionCounters,
    sampler: CheckpointSampler,
}

impl MatchEngine {
    /// Take ownership of a loaded registry and seed the counters from the
    /// resumption offsets in `config`.
    pub fn new(mut registry: TargetRegistry, config: SessionConfig) -> Self {
        registry.apply_resumption_offset(config.start_cracked_count);
        let sampler = CheckpointSampler::new(registry.total_count());
        Self {
            registry,
            config,
            counters: SessionCounters {
                guess_index: config.start_guess_index,
                cracked_count: config.start_cracked_count,
                decode_error_count: 0,
            },
            sampler,
        }
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> TargetRegistry {
        self.registry
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Effective denominator: loaded targets plus `start_cracked_count`.
    pub fn total_count(&self) -> u64 {
        self.registry.total_count()
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.counters.guess_index, self.counters.cracked_count)
    }

    /// Consume `source` until it ends, every target is cracked, or the guess
    /// budget runs out. Emits the initial and final checkpoints
    /// unconditionally and sampled ones in between. Intended to be called
    /// once per engine.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<SessionOutcome>
    where
        S: GuessSource + ?Sized,
        K: CheckpointSink + ?Sized,
    {
        info!(
            "processing guesses against {} passwords ({} unique)",
            self.total_count(),
            self.registry.unique_count()
        );
        sink.emit(self.checkpoint())?;

        let stop_reason = loop {
            let item = match source.next_item() {
                Ok(item) => item,
                Err(e) => {
                    error!("halting: failed to read guess input: {}", e);
                    break StopReason::ReadError;
                }
            };
            match item {
                GuessItem::EndOfStream => break StopReason::InputExhausted,
                GuessItem::DecodeFailure(e) => self.record_decode_failure(&e),
                GuessItem::Guess(guess) => {
                    if let Some(reason) = self.process_guess(&guess, sink)? {
                        break reason;
                    }
                }
            }
        };

        sink.emit(self.checkpoint())?;
        sink.finish()?;
        info!(
            "session stopped ({}): {} guesses, {}/{} cracked",
            stop_reason,
            self.counters.guess_index,
            self.counters.cracked_count,
            self.total_count()
        );
        Ok(SessionOutcome {
            counters: self.counters,
            total_count: self.total_count(),
            stop_reason,
        })
    }

    fn record_decode_failure(&mut self, err: &DecodeError) {
        self.counters.decode_error_count = self.counters.decode_error_count.saturating_add(1);
        debug!(
            "error decoding input guess ({}); total decode errors = {}",
            err, self.counters.decode_error_count
        );
        if self.counters.decode_error_count == DECODE_WARNING_THRESHOLD {
            warn!(
                "{} guesses could not be decoded; results may be unreliable, try a different --guess-encoding",
                DECODE_WARNING_THRESHOLD
            );
        }
    }

    fn process_guess<K>(&mut self, guess: &str, sink: &mut K) -> Result<Option<StopReason>>
    where
        K: CheckpointSink + ?Sized,
    {
        // Counters saturate: resumption offsets come straight from the CLI.
        self.counters.guess_index = self.counters.guess_index.saturating_add(1);
        let guess_index = self.counters.guess_index;

        let newly_cracked = self
            .registry
            .lookup_mut(guess)
            .and_then(|entry| entry.crack(guess_index));
        if let Some(multiplicity) = newly_cracked {
            self.counters.cracked_count = self.counters.cracked_count.saturating_add(multiplicity);
            if self.sampler.observe(self.counters.cracked_count) {
                sink.emit(self.checkpoint())?;
            }
            if self.counters.cracked_count >= self.total_count() {
                return Ok(Some(StopReason::AllCracked));
            }
        }

        if self.config.max_guesses.is_some_and(|max| guess_index >= max) {
            return Ok(Some(StopReason::GuessBudgetExhausted));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryGuessSource;

    fn scenario_registry() -> TargetRegistry {
        TargetRegistry::from_lines(["abc123", "abc123", "qwerty"])
    }

    fn cp(g: u64, c: u64) -> Checkpoint {
        Checkpoint::new(g, c)
    }

    #[test]
    fn all_cracked_terminates_session() {
        let mut e = MatchEngine::new(scenario_registry(), SessionConfig::default());
        let mut src = MemoryGuessSource::from_guesses(["hunter2", "abc123", "qwerty", "never"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::AllCracked);
        assert_eq!(outcome.counters.guess_index, 3);
        assert_eq!(outcome.counters.cracked_count, 3);
        assert_eq!(out, vec![cp(0, 0), cp(2, 2), cp(3, 3), cp(3, 3)]);
        assert_eq!(e.registry().lookup("abc123").unwrap().cracked_at(), Some(2));
        assert_eq!(e.registry().lookup("qwerty").unwrap().cracked_at(), Some(3));
    }

    #[test]
    fn guess_budget_stops_after_match_effects() {
        let config = SessionConfig {
            max_guesses: Some(1),
            ..SessionConfig::default()
        };
        let mut e = MatchEngine::new(scenario_registry(), config);
        let mut src = MemoryGuessSource::from_guesses(["abc123", "qwerty"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::GuessBudgetExhausted);
        assert_eq!(out.last(), Some(&cp(1, 2)));
        assert!(!e.registry().lookup("qwerty").unwrap().is_cracked());
    }

    #[test]
    fn resumption_offsets_seed_counters_and_total() {
        let registry = TargetRegistry::from_lines((0..10).map(|i| format!("pw{i}")));
        let config = SessionConfig {
            start_guess_index: 100,
            start_cracked_count: 5,
            ..SessionConfig::default()
        };
        let mut e = MatchEngine::new(registry, config);
        assert_eq!(e.total_count(), 15);
        let mut src = MemoryGuessSource::from_guesses(Vec::<String>::new());
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::InputExhausted);
        assert_eq!(out, vec![cp(100, 5), cp(100, 5)]);
    }

    #[test]
    fn decode_failures_do_not_cost_guesses() {
        let items = vec![
            GuessItem::DecodeFailure(DecodeError::Malformed {
                encoding: "UTF-8",
                len: 2,
            }),
            GuessItem::Guess("qwerty".to_string()),
        ];
        let mut e = MatchEngine::new(scenario_registry(), SessionConfig::default());
        let mut src = MemoryGuessSource::new(items);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.counters.decode_error_count, 1);
        assert_eq!(outcome.counters.guess_index, 1);
        assert_eq!(outcome.counters.cracked_count, 1);
        assert_eq!(e.registry().lookup("qwerty").unwrap().cracked_at(), Some(1));
    }

    #[test]
    fn repeated_guess_counts_once() {
        let mut e = MatchEngine::new(scenario_registry(), SessionConfig::default());
        let mut src = MemoryGuessSource::from_guesses(["abc123", "abc123", "abc123"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::InputExhausted);
        assert_eq!(outcome.counters.guess_index, 3);
        assert_eq!(outcome.counters.cracked_count, 2);
        assert_eq!(out, vec![cp(0, 0), cp(1, 2), cp(3, 2)]);
    }

    #[test]
    fn large_crack_emits_single_checkpoint() {
        // 3000 targets -> step 3; one plaintext covers 10 of them.
        let mut lines: Vec<String> = (0..2990).map(|i| format!("u{i}")).collect();
        lines.extend(std::iter::repeat_n("shared".to_string(), 10));
        let mut e = MatchEngine::new(TargetRegistry::from_lines(lines), SessionConfig::default());
        let mut src = MemoryGuessSource::from_guesses(["shared", "u0", "u1", "u2"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        e.run(&mut src, &mut out).unwrap();

        // 10 >= 3 emits and the threshold only moves to 6, so each of the
        // next cracks (11, 12, 13) also emits until it catches up past 13.
        assert_eq!(
            out,
            vec![cp(0, 0), cp(1, 10), cp(2, 11), cp(3, 12), cp(4, 13), cp(4, 13)]
        );
    }

    #[test]
    fn cracked_count_is_monotonic_and_bounded() {
        let registry = TargetRegistry::from_lines(["a", "b", "b", "c", "c", "c"]);
        let mut e = MatchEngine::new(registry, SessionConfig::default());
        let mut src = MemoryGuessSource::from_guesses(["x", "c", "c", "a", "y", "b", "a"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::AllCracked);
        assert!(out.windows(2).all(|w| w[0].cracked_count <= w[1].cracked_count));
        assert!(out.iter().all(|c| c.cracked_count <= e.total_count()));
        assert_eq!(outcome.counters.guess_index, 6);
    }

    #[test]
    fn decode_failures_up_to_warning_threshold_are_only_counted() {
        let mut items: Vec<GuessItem> = (0..DECODE_WARNING_THRESHOLD)
            .map(|_| {
                GuessItem::DecodeFailure(DecodeError::Malformed {
                    encoding: "UTF-8",
                    len: 1,
                })
            })
            .collect();
        items.push(GuessItem::Guess("hunter2".to_string()));
        let mut e = MatchEngine::new(scenario_registry(), SessionConfig::default());
        let mut src = MemoryGuessSource::new(items);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::InputExhausted);
        assert_eq!(
            outcome.counters.decode_error_count,
            DECODE_WARNING_THRESHOLD
        );
        assert_eq!(outcome.counters.guess_index, 1);
        assert_eq!(outcome.counters.cracked_count, 0);
        assert_eq!(out, vec![cp(0, 0), cp(1, 0)]);
    }

    #[test]
    fn huge_resumption_offsets_saturate() {
        let registry = TargetRegistry::from_lines(["abc123"]);
        let config = SessionConfig {
            max_guesses: None,
            start_guess_index: u64::MAX,
            start_cracked_count: u64::MAX,
        };
        let mut e = MatchEngine::new(registry, config);
        assert_eq!(e.total_count(), u64::MAX);
        let mut src = MemoryGuessSource::from_guesses(["abc123", "never"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut src, &mut out).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::AllCracked);
        assert_eq!(outcome.counters.guess_index, u64::MAX);
        assert_eq!(outcome.counters.cracked_count, u64::MAX);
        assert_eq!(out.last(), Some(&cp(u64::MAX, u64::MAX)));
    }

    struct FailingSource(usize);

    impl GuessSource for FailingSource {
        fn next_item(&mut self) -> std::io::Result<GuessItem> {
            if self.0 == 0 {
                return Err(std::io::Error::other("broken pipe"));
            }
            self.0 -= 1;
            Ok(GuessItem::Guess("qwerty".to_string()))
        }
    }

    #[test]
    fn read_error_still_emits_final_checkpoint() {
        let mut e = MatchEngine::new(scenario_registry(), SessionConfig::default());
        let mut out: Vec<Checkpoint> = Vec::new();
        let outcome = e.run(&mut FailingSource(1), &mut out).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::ReadError);
        assert_eq!(out.last(), Some(&cp(1, 1)));
    }
}
