//! Target registry: the multiset of known plaintext passwords and their crack
//! state. Built once by the load phase, then handed to the match engine which
//! only ever flips entries from uncracked to cracked.
use std::collections::HashMap;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::decode::LineDecoder;
use crate::entry::PasswordEntry;
use crate::io::iter_lines_auto;

/// Counters from loading target lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub accepted: u64,
    pub blank: u64,
    pub decode_errors: u64,
}

impl LoadStats {
    fn absorb(&mut self, other: LoadStats) {
        self.accepted = self.accepted.saturating_add(other.accepted);
        self.blank = self.blank.saturating_add(other.blank);
        self.decode_errors = self.decode_errors.saturating_add(other.decode_errors);
    }
}

#[derive(Debug, Default, Clone)]
pub struct TargetRegistry {
    entries: HashMap<String, PasswordEntry>,
    loaded: u64,
    resumption_offset: u64,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from decoded lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        registry.load(lines);
        registry
    }

    /// Insert decoded lines. The line terminator is stripped and blank lines
    /// are skipped; everything else is kept byte-for-byte. Returns the number
    /// of lines accepted.
    pub fn load<I, S>(&mut self, lines: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepted = 0;
        for line in lines {
            if self.insert_line(line.as_ref()) {
                accepted += 1;
            }
        }
        accepted
    }

    fn insert_line(&mut self, line: &str) -> bool {
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        self.insert_plaintext(line)
    }

    /// Count one occurrence of `plaintext` as is. Empty strings are refused.
    fn insert_plaintext(&mut self, plaintext: &str) -> bool {
        if plaintext.is_empty() {
            return false;
        }
        self.loaded = self.loaded.saturating_add(1);
        match self.entries.get_mut(plaintext) {
            Some(entry) => entry.add_occurrences(1),
            None => {
                self.entries.insert(plaintext.to_string(), PasswordEntry::new());
            }
        }
        true
    }

    /// Load byte lines, terminators already removed (see [`crate::io`]),
    /// through `decoder`. A UTF-8 byte order mark on the first line is
    /// dropped. Lines that fail to decode are counted and skipped so they do
    /// not skew the totals.
    pub fn load_lines<I>(&mut self, lines: I, decoder: &LineDecoder) -> io::Result<LoadStats>
    where
        I: IntoIterator<Item = io::Result<Vec<u8>>>,
    {
        let mut stats = LoadStats::default();
        let mut first = true;
        for line in lines {
            let line = line?;
            let raw = if first {
                first = false;
                decoder.strip_bom(&line)
            } else {
                &line[..]
            };
            if raw.is_empty() {
                stats.blank += 1;
                continue;
            }
            match decoder.decode(raw) {
                Ok(text) => {
                    if self.insert_plaintext(&text) {
                        stats.accepted += 1;
                    } else {
                        stats.blank += 1;
                    }
                }
                Err(e) => {
                    log::debug!("skipping target line: {}", e);
                    stats.decode_errors += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Load every file in `paths`, one after the other.
    pub fn load_from_file_paths_with_threshold<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        decoder: &LineDecoder,
        mmap_threshold_bytes: u64,
    ) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        for p in paths {
            let iter = iter_lines_auto(p, mmap_threshold_bytes)?;
            let file_stats = self
                .load_lines(iter, decoder)
                .with_context(|| format!("read {}", p.as_ref().display()))?;
            log::info!(
                "loaded {}: {} passwords, {} blank, {} undecodable",
                p.as_ref().display(),
                file_stats.accepted,
                file_stats.blank,
                file_stats.decode_errors
            );
            stats.absorb(file_stats);
        }
        Ok(stats)
    }

    /// Same as [`Self::load_from_file_paths_with_threshold`] but decodes each
    /// file on its own rayon worker and merges the partial registries.
    pub fn load_from_file_paths_parallel_with_threshold<P: AsRef<Path> + Sync>(
        &mut self,
        paths: &[P],
        decoder: &LineDecoder,
        mmap_threshold_bytes: u64,
    ) -> Result<LoadStats> {
        let partials: Vec<(TargetRegistry, LoadStats)> = paths
            .par_iter()
            .map(|p| -> Result<(TargetRegistry, LoadStats)> {
                let mut partial = TargetRegistry::new();
                let stats = partial.load_from_file_paths_with_threshold(
                    std::slice::from_ref(p),
                    decoder,
                    mmap_threshold_bytes,
                )?;
                Ok((partial, stats))
            })
            .collect::<Result<_>>()?;
        let mut stats = LoadStats::default();
        for (partial, partial_stats) in partials {
            self.merge(partial);
            stats.absorb(partial_stats);
        }
        Ok(stats)
    }

    /// Fold another, not yet cracked, registry into this one.
    pub fn merge(&mut self, other: TargetRegistry) {
        self.loaded = self.loaded.saturating_add(other.loaded);
        for (plaintext, entry) in other.entries {
            match self.entries.get_mut(&plaintext) {
                Some(existing) => existing.add_occurrences(entry.multiplicity()),
                None => {
                    self.entries.insert(plaintext, entry);
                }
            }
        }
    }

    /// Count passwords cracked in an earlier session into the total. Applying
    /// it again replaces the previous offset.
    pub fn apply_resumption_offset(&mut self, already_cracked: u64) {
        self.resumption_offset = already_cracked;
    }

    /// Target passwords including duplicates and any resumption offset.
    pub fn total_count(&self) -> u64 {
        self.loaded.saturating_add(self.resumption_offset)
    }

    pub fn resumption_offset(&self) -> u64 {
        self.resumption_offset
    }

    /// Distinct plaintexts.
    pub fn unique_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, candidate: &str) -> Option<&PasswordEntry> {
        self.entries.get(candidate)
    }

    pub(crate) fn lookup_mut(&mut self, candidate: &str) -> Option<&mut PasswordEntry> {
        self.entries.get_mut(candidate)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &PasswordEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn cracked(&self) -> impl Iterator<Item = (&str, &PasswordEntry)> {
        self.entries().filter(|(_, e)| e.is_cracked())
    }

    pub fn uncracked(&self) -> impl Iterator<Item = (&str, &PasswordEntry)> {
        self.entries().filter(|(_, e)| !e.is_cracked())
    }
}
