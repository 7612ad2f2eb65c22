/// Thins progress output to roughly a thousand samples per session so the
/// curve stays easy to plot on large target sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointSampler {
    step: u64,
    next_threshold: u64,
}

impl CheckpointSampler {
    pub fn new(total_count: u64) -> Self {
        let step = (total_count / 1000).max(1);
        Self {
            step,
            next_threshold: step,
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn next_threshold(&self) -> u64 {
        self.next_threshold
    }

    /// Called after each crack. Returns true when a checkpoint is due. The
    /// threshold moves forward by a single step even if the crack jumped over
    /// several of them.
    pub fn observe(&mut self, cracked_count: u64) -> bool {
        if cracked_count >= self.next_threshold {
            self.next_threshold = self.next_threshold.saturating_add(self.step);
            true
        } else {
            false
        }
    }
}
