use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

use crate::decode::strip_line_terminator;

/// Threshold in bytes above which we attempt to use mmap for reading.
/// Callers can override via API; this is a reasonable default.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Lines sampled from the target file for encoding detection.
pub const DETECTION_SAMPLE_LINES: usize = 10_000;

/// Raw lines with the terminator removed. Decoding happens later so that
/// malformed lines can be counted rather than silently lossy-converted.
pub type LineIter = Box<dyn Iterator<Item = io::Result<Vec<u8>>> + Send + 'static>;

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Iterate lines from a file path using buffered reader (non-mmap).
pub fn iter_lines_bufread<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let lines = reader
        .split(b'\n')
        .map(|line| line.map(|l| strip_line_terminator(&l).to_vec()));
    Ok(Box::new(lines))
}

/// Iterate lines from a file path using mmap. Avoids read syscalls for large
/// target files; each returned line is still copied out.
pub fn iter_lines_mmap<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.as_ref().display()))?;
    let iter = MmapLines { mmap, pos: 0 };
    Ok(Box::new(iter))
}

struct MmapLines {
    mmap: Mmap,
    pos: usize,
}

impl Iterator for MmapLines {
    type Item = io::Result<Vec<u8>>;
    fn next(&mut self) -> Option<Self::Item> {
        let data: &[u8] = &self.mmap;
        if self.pos >= data.len() {
            return None;
        }
        let start = self.pos;
        if let Some(off) = memchr::memchr(b'\n', &data[self.pos..]) {
            let end = self.pos + off;
            self.pos = end + 1;
            Some(Ok(strip_line_terminator(&data[start..end]).to_vec()))
        } else {
            // Last line without trailing newline
            self.pos = data.len();
            Some(Ok(strip_line_terminator(&data[start..]).to_vec()))
        }
    }
}

/// Choose mmap or bufread and return an iterator over lines.
pub fn iter_lines_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<LineIter> {
    let meta =
        std::fs::metadata(&path).with_context(|| format!("stat {}", path.as_ref().display()))?;
    if meta.is_file() && should_use_mmap(meta.len(), threshold_bytes) {
        iter_lines_mmap(path)
    } else {
        iter_lines_bufread(path)
    }
}

/// Read up to `max_lines` complete lines from the start of `path`, raw, for
/// encoding detection. Cutting at line boundaries keeps multibyte sequences
/// intact.
pub fn sample_lines<P: AsRef<Path>>(path: P, max_lines: usize) -> Result<Vec<u8>> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mut reader = BufReader::new(file);
    let mut sample = Vec::new();
    for _ in 0..max_lines {
        let n = reader
            .read_until(b'\n', &mut sample)
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        if n == 0 {
            break;
        }
    }
    Ok(sample)
}

/// Guess stream reader: the given file, or stdin when `path` is `None`.
pub fn open_guess_reader(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("open {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Progress sink: a freshly created file, or stdout when `path` is `None`.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("create {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bufread_and_mmap_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, b"abc123\r\n\nqwerty\nlast").unwrap();
        let a: Vec<Vec<u8>> = iter_lines_bufread(&path).unwrap().flatten().collect();
        let b: Vec<Vec<u8>> = iter_lines_mmap(&path).unwrap().flatten().collect();
        assert_eq!(a, b);
        assert_eq!(
            a,
            vec![
                b"abc123".to_vec(),
                Vec::new(),
                b"qwerty".to_vec(),
                b"last".to_vec()
            ]
        );
    }

    #[test]
    fn sample_stops_at_line_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, b"a\nb\nc\n").unwrap();
        assert_eq!(sample_lines(&path, 2).unwrap(), b"a\nb\n");
        assert_eq!(sample_lines(&path, 10).unwrap(), b"a\nb\nc\n");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = match iter_lines_auto("/nonexistent/targets.txt", 0) {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(err.to_string().contains("/nonexistent/targets.txt"));
    }
}
