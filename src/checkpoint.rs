//! Progress checkpoints and where they go.
//!
//! The match engine reports `(guess_index, cracked_count)` samples to a
//! [`CheckpointSink`]. [`TsvCheckpointWriter`] renders them as
//! `guess_index<TAB>cracked_count` lines, one per checkpoint, flushed as they
//! are produced so a long session can be plotted while it runs.
use std::io::Write;

use anyhow::Result;
use csv::{Terminator, WriterBuilder};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub guess_index: u64,
    pub cracked_count: u64,
}

impl Checkpoint {
    pub fn new(guess_index: u64, cracked_count: u64) -> Self {
        Self {
            guess_index,
            cracked_count,
        }
    }
}

pub trait CheckpointSink {
    fn emit(&mut self, checkpoint: Checkpoint) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl CheckpointSink for Vec<Checkpoint> {
    fn emit(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.push(checkpoint);
        Ok(())
    }
}

pub struct TsvCheckpointWriter<W: Write> {
    wtr: csv::Writer<W>,
}

impl<W: Write> TsvCheckpointWriter<W> {
    pub fn new(inner: W) -> Self {
        let wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        Self { wtr }
    }
}

impl<W: Write> CheckpointSink for TsvCheckpointWriter<W> {
    fn emit(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.wtr.serialize(checkpoint)?;
        self.wtr.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_tab_separated_lines() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut w = TsvCheckpointWriter::new(&mut buf);
            w.emit(Checkpoint::new(0, 0)).unwrap();
            w.emit(Checkpoint::new(1, 2)).unwrap();
            w.finish().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "0\t0\n1\t2\n");
    }
}
