pub mod checkpoint;
pub mod decode;
pub mod engine;
pub mod entry;
pub mod export;
pub mod io;
pub mod registry;
pub mod report;
pub mod sampler;
pub mod source;
pub mod stats;

pub mod prelude {
    pub use crate::checkpoint::{Checkpoint, CheckpointSink, TsvCheckpointWriter};
    pub use crate::engine::{MatchEngine, SessionConfig, SessionOutcome, StopReason};
    pub use crate::registry::TargetRegistry;
    pub use crate::source::{GuessItem, GuessSource, LineGuessSource};
}
