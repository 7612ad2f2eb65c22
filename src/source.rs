//! Guess sources: ordered, possibly unbounded streams of decoded guesses.
//!
//! Every source ends with an explicit [`GuessItem::EndOfStream`] and keeps
//! returning it afterwards. Reaching EOF never shows up as an endless run of
//! empty guesses.
use std::io::{self, BufRead};

use crate::decode::{DecodeError, LineDecoder, strip_line_terminator};

#[derive(Debug)]
pub enum GuessItem {
    Guess(String),
    DecodeFailure(DecodeError),
    EndOfStream,
}

pub trait GuessSource {
    /// Pull the next item. I/O errors from the underlying stream are returned
    /// as `Err`; decode problems are items, not errors.
    fn next_item(&mut self) -> io::Result<GuessItem>;
}

/// Newline-delimited guesses read incrementally from any `BufRead`.
pub struct LineGuessSource<R> {
    reader: R,
    decoder: LineDecoder,
    buf: Vec<u8>,
    first: bool,
    done: bool,
}

impl<R: BufRead> LineGuessSource<R> {
    pub fn new(reader: R, decoder: LineDecoder) -> Self {
        Self {
            reader,
            decoder,
            buf: Vec::with_capacity(256),
            first: true,
            done: false,
        }
    }
}

impl<R: BufRead> GuessSource for LineGuessSource<R> {
    fn next_item(&mut self) -> io::Result<GuessItem> {
        if self.done {
            return Ok(GuessItem::EndOfStream);
        }
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            self.done = true;
            return Ok(GuessItem::EndOfStream);
        }
        let mut raw = strip_line_terminator(&self.buf);
        if self.first {
            self.first = false;
            raw = self.decoder.strip_bom(raw);
        }
        Ok(match self.decoder.decode(raw) {
            Ok(guess) => GuessItem::Guess(guess),
            Err(e) => GuessItem::DecodeFailure(e),
        })
    }
}

/// Adapts an in-memory iterator of items into a source.
pub struct MemoryGuessSource<I> {
    items: I,
}

impl<I: Iterator<Item = GuessItem>> MemoryGuessSource<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(items: T) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl MemoryGuessSource<std::vec::IntoIter<GuessItem>> {
    /// Every string becomes a successfully decoded guess.
    pub fn from_guesses<S: Into<String>>(guesses: impl IntoIterator<Item = S>) -> Self {
        let items: Vec<GuessItem> = guesses
            .into_iter()
            .map(|g| GuessItem::Guess(g.into()))
            .collect();
        Self::new(items)
    }
}

impl<I: Iterator<Item = GuessItem>> GuessSource for MemoryGuessSource<I> {
    fn next_item(&mut self) -> io::Result<GuessItem> {
        Ok(self.items.next().unwrap_or(GuessItem::EndOfStream))
    }
}
