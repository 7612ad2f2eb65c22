//! Password entry data model: how many times a plaintext occurs in the target
//! corpus and whether (and when) a guess has cracked it.
//!
//! The plaintext itself is the registry key; see [`crate::registry`]. Use
//! [`PasswordEntry::crack`] to record the first matching guess.

/// Per-plaintext state held by the target registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordEntry {
    multiplicity: u64,
    cracked_at: Option<u64>,
}

impl Default for PasswordEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEntry {
    /// A freshly seen plaintext: one occurrence, not cracked.
    pub fn new() -> Self {
        Self {
            multiplicity: 1,
            cracked_at: None,
        }
    }

    /// Number of target passwords sharing this plaintext.
    pub fn multiplicity(&self) -> u64 {
        self.multiplicity
    }

    pub fn is_cracked(&self) -> bool {
        self.cracked_at.is_some()
    }

    /// Guess index of the first matching guess, if any.
    pub fn cracked_at(&self) -> Option<u64> {
        self.cracked_at
    }

    pub(crate) fn add_occurrences(&mut self, n: u64) {
        self.multiplicity = self.multiplicity.saturating_add(n);
    }

    /// Mark the entry cracked at `guess_index` and return the multiplicity that
    /// became cracked. Returns `None` if the entry was already cracked; the
    /// original crack index is kept.
    pub fn crack(&mut self, guess_index: u64) -> Option<u64> {
        if self.cracked_at.is_some() {
            return None;
        }
        self.cracked_at = Some(guess_index);
        Some(self.multiplicity)
    }
}
