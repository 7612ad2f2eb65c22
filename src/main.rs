//! CLI entrypoint for `checkpass`.
//!
//! Parses command-line arguments, resolves the text encoding (explicit or
//! detected from the target file), loads the target passwords, streams guesses
//! from stdin or a file through the match engine, writes progress checkpoints,
//! and optionally saves the uncracked remainder for a follow-up session.
use std::path::PathBuf;
use std::process;

use anyhow::{Result, bail};
use checkpass::{
    checkpoint::TsvCheckpointWriter,
    decode::{LineDecoder, detect_encoding},
    engine::{MatchEngine, SessionConfig, StopReason},
    export::save_uncracked,
    io::{
        DEFAULT_MMAP_THRESHOLD_BYTES, DETECTION_SAMPLE_LINES, open_guess_reader, open_output,
        sample_lines,
    },
    registry::TargetRegistry,
    report::render_summary,
    source::LineGuessSource,
    stats::summarize,
};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "checkpass",
    version,
    about = "Test the effectiveness of a password cracking session against a known set of plaintext passwords"
)]
struct Args {
    /// The set of passwords to use as a target (repeatable)
    #[arg(short = 't', long = "target", required = true)]
    targets: Vec<PathBuf>,

    /// Read guesses from this file instead of stdin
    #[arg(short = 'g', long = "guesses")]
    guesses: Option<PathBuf>,

    /// File to save the progress results to. Default is stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Stop after this many guesses
    #[arg(short = 'm', long = "max-guesses")]
    max_guesses: Option<u64>,

    /// Continue a previous session: start with this many guesses already made
    #[arg(short = 's', long = "start-count", default_value_t = 0)]
    start_count: u64,

    /// Continue a previous session: start with this many passwords already cracked
    #[arg(short = 'c', long = "start-cracked", default_value_t = 0)]
    start_cracked: u64,

    /// Save all uncracked passwords to this file at the end of the session
    #[arg(short = 'u', long = "uncracked-file")]
    uncracked_file: Option<PathBuf>,

    /// Encoding of the target file. Detected automatically when omitted
    #[arg(short = 'e', long = "encoding")]
    encoding: Option<String>,

    /// Encoding of the guess stream. Defaults to the target encoding
    #[arg(long = "guess-encoding")]
    guess_encoding: Option<String>,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Load multiple target files in parallel
    #[arg(long = "parallel")]
    parallel: bool,

    /// Limit number of entries in the top cracked/uncracked sections
    #[arg(long = "top", default_value_t = 10)]
    top_limit: usize,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress the end-of-session summary
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn verify_inputs(args: &Args) -> Result<()> {
    if args.targets.is_empty() {
        bail!("no target files provided (-t/--target)");
    }
    // Pipes and /dev/stdin are fine, so only existence is checked here.
    for p in &args.targets {
        if !p.exists() {
            bail!("target file not found: {}", p.display());
        }
    }
    if let Some(p) = &args.guesses {
        if !p.exists() {
            bail!("guess file not found: {}", p.display());
        }
    }
    Ok(())
}

/// Target decoder from `--encoding`, or sniffed from the first target file.
fn resolve_target_decoder(args: &Args) -> Result<LineDecoder> {
    if let Some(label) = &args.encoding {
        return Ok(LineDecoder::for_label(label)?);
    }
    info!("identifying character encoding of {}", args.targets[0].display());
    let sample = sample_lines(&args.targets[0], DETECTION_SAMPLE_LINES)?;
    let detection = detect_encoding(&sample)?;
    info!(
        "file encoding detected: {} (confident: {}); pass --encoding if another encoding was used",
        detection.encoding.name(),
        detection.confident
    );
    Ok(LineDecoder::new(detection.encoding)?)
}

fn resolve_guess_decoder(args: &Args, target: LineDecoder) -> Result<LineDecoder> {
    match &args.guess_encoding {
        Some(label) => Ok(LineDecoder::for_label(label)?),
        None => Ok(target),
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    if let Err(e) = verify_inputs(&args) {
        error!("{}", e);
        process::exit(2);
    }
    let decoders = resolve_target_decoder(&args)
        .and_then(|target| Ok((target, resolve_guess_decoder(&args, target)?)));
    let (target_decoder, guess_decoder) = match decoders {
        Ok(d) => d,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let mut registry = TargetRegistry::new();
    let load_res = if args.parallel {
        registry.load_from_file_paths_parallel_with_threshold(
            &args.targets,
            &target_decoder,
            threshold,
        )
    } else {
        registry.load_from_file_paths_with_threshold(&args.targets, &target_decoder, threshold)
    };
    let load_stats = match load_res {
        Ok(s) => s,
        Err(e) => {
            error!("failed to load target passwords: {:#}", e);
            process::exit(3);
        }
    };
    if load_stats.decode_errors > 0 {
        warn!(
            "{} target passwords did not decode as {} and were ignored; \
             if there are many, re-run with a different --encoding",
            load_stats.decode_errors,
            target_decoder.name()
        );
    }
    info!(
        "done parsing target files; passwords to crack = {}",
        registry.total_count()
    );

    let output = match open_output(args.output.as_deref()) {
        Ok(w) => w,
        Err(e) => {
            error!("failed to open progress output: {:#}", e);
            process::exit(4);
        }
    };
    let reader = match open_guess_reader(args.guesses.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            error!("failed to open guess input: {:#}", e);
            process::exit(2);
        }
    };

    let config = SessionConfig {
        max_guesses: args.max_guesses,
        start_guess_index: args.start_count,
        start_cracked_count: args.start_cracked,
    };
    let mut engine = MatchEngine::new(registry, config);
    let mut source = LineGuessSource::new(reader, guess_decoder);
    let mut sink = TsvCheckpointWriter::new(output);
    let outcome = match engine.run(&mut source, &mut sink) {
        Ok(o) => o,
        Err(e) => {
            error!("failed to write progress output: {:#}", e);
            process::exit(4);
        }
    };
    if outcome.counters.decode_error_count > 0 {
        warn!(
            "{} guesses could not be decoded as {} and were skipped",
            outcome.counters.decode_error_count,
            guess_decoder.name()
        );
    }

    if let Some(path) = &args.uncracked_file {
        match save_uncracked(engine.registry(), path, target_decoder.encoding()) {
            Ok(n) => info!("saved {} uncracked passwords to {}", n, path.display()),
            Err(e) => {
                error!("failed to save uncracked passwords: {:#}", e);
                process::exit(5);
            }
        }
    }

    if !args.quiet {
        let summary = summarize(&engine, &outcome);
        eprintln!(
            "{}",
            render_summary(&summary, engine.registry(), args.top_limit)
        );
    }

    if outcome.stop_reason == StopReason::ReadError {
        process::exit(6);
    }
}
