//! Export helpers for handing the uncracked remainder to a follow-up session.
//!
//! - `export_uncracked` writes each uncracked plaintext once per occurrence, so
//!   reloading the file reproduces the original duplicate counts.
//! - `save_uncracked` does the same into a file, re-encoded with the session's
//!   target encoding.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};

use crate::registry::TargetRegistry;

/// Write every uncracked plaintext as UTF-8, repeated per multiplicity.
/// Returns the number of lines written.
pub fn export_uncracked<W: Write>(registry: &TargetRegistry, out: &mut W) -> io::Result<u64> {
    export_uncracked_encoded(registry, out, UTF_8)
}

/// Like [`export_uncracked`] but encodes each line with `encoding`.
pub fn export_uncracked_encoded<W: Write>(
    registry: &TargetRegistry,
    out: &mut W,
    encoding: &'static Encoding,
) -> io::Result<u64> {
    let mut written = 0;
    for (plaintext, entry) in registry.uncracked() {
        let (bytes, _, had_errors) = encoding.encode(plaintext);
        if had_errors {
            log::warn!(
                "uncracked password not representable in {}; written with numeric escapes",
                encoding.name()
            );
        }
        for _ in 0..entry.multiplicity() {
            out.write_all(&bytes)?;
            out.write_all(b"\n")?;
        }
        written += entry.multiplicity();
    }
    Ok(written)
}

pub fn save_uncracked<P: AsRef<Path>>(
    registry: &TargetRegistry,
    path: P,
    encoding: &'static Encoding,
) -> Result<u64> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    let written = export_uncracked_encoded(registry, &mut w, encoding)
        .with_context(|| format!("write {}", path.display()))?;
    w.flush()
        .with_context(|| format!("write {}", path.display()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Checkpoint;
    use crate::decode::LineDecoder;
    use crate::engine::{MatchEngine, SessionConfig};
    use crate::io::iter_lines_bufread;
    use crate::source::MemoryGuessSource;
    use tempfile::tempdir;

    fn cracked_qwerty_registry() -> TargetRegistry {
        let registry = TargetRegistry::from_lines(["abc123", "abc123", "qwerty", "dragon"]);
        let mut e = MatchEngine::new(registry, SessionConfig::default());
        let mut src = MemoryGuessSource::from_guesses(["qwerty"]);
        let mut out: Vec<Checkpoint> = Vec::new();
        e.run(&mut src, &mut out).unwrap();
        e.into_registry()
    }

    #[test]
    fn expands_duplicates_and_skips_cracked() {
        let registry = cracked_qwerty_registry();
        let mut buf: Vec<u8> = Vec::new();
        let n = export_uncracked(&registry, &mut buf).unwrap();
        assert_eq!(n, 3);
        let mut lines: Vec<&str> = std::str::from_utf8(&buf).unwrap().lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["abc123", "abc123", "dragon"]);
    }

    #[test]
    fn reload_reproduces_uncracked_subset() {
        let registry = cracked_qwerty_registry();
        let dir = tempdir().unwrap();
        let path = dir.path().join("uncracked.txt");
        save_uncracked(&registry, &path, UTF_8).unwrap();

        let mut reloaded = TargetRegistry::new();
        reloaded
            .load_lines(iter_lines_bufread(&path).unwrap(), &LineDecoder::default())
            .unwrap();
        assert_eq!(reloaded.unique_count(), registry.uncracked().count());
        for (pw, e) in registry.uncracked() {
            assert_eq!(
                reloaded.lookup(pw).map(|r| r.multiplicity()),
                Some(e.multiplicity())
            );
        }
        assert!(reloaded.lookup("qwerty").is_none());
    }

    #[test]
    fn writes_in_target_encoding() {
        let registry = TargetRegistry::from_lines(["pässword"]);
        let latin1 = LineDecoder::for_label("latin1").unwrap();
        let mut buf: Vec<u8> = Vec::new();
        export_uncracked_encoded(&registry, &mut buf, latin1.encoding()).unwrap();
        assert_eq!(buf, b"p\xe4ssword\n");
    }
}
