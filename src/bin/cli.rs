//! gbextract CLI: recover MIDI files from a GarageBand project.
//!
//! Usage:
//!   gb-cli path/to/Song.band
//!   gb-cli path/to/projectData -o out/ --unique-tracks
//!   gb-cli decoded.bin --raw --dump-on-error

use anyhow::{Context, Result};
use clap::Parser;
use gb_formats::DecoderConfig;
use gb_master::{analyze, hexdump, ExtractError, Extractor, SmfSink};
use std::fs;
use std::path::PathBuf;

/// Bytes shown on each side of a failure offset by `--dump-on-error`.
const DUMP_RADIUS: u64 = 64;

#[derive(Parser, Debug)]
#[command(name = "gb-cli")]
#[command(about = "Extract MIDI regions from GarageBand projects", long_about = None)]
struct Args {
    /// A `.band` bundle, its `projectData` file, or a decoded payload with `--raw`
    input: PathBuf,

    /// Directory the `.mid` files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Input is the already decoded payload, not a property list
    #[arg(long)]
    raw: bool,

    /// JSON file with decoder settings; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Put every distinct note number on its own track
    #[arg(long)]
    unique_tracks: bool,

    /// Number of output tracks (1-128)
    #[arg(long)]
    track_limit: Option<u8>,

    /// Name split tracks by note number instead of drum names
    #[arg(long)]
    no_rename_tracks: bool,

    /// Scale pitch bends for instruments matching the filter
    #[arg(long)]
    pitch_bend_override: bool,

    #[arg(long)]
    pitch_bend_multiplier: Option<i32>,

    /// Tick subtracted from every event, or `none` to start at the first event
    #[arg(long, value_parser = parse_base_time)]
    base_time: Option<BaseTime>,

    /// Only decode notes; read controller, pressure and bend commands without
    /// emitting them
    #[arg(long)]
    simple_controllers: bool,

    /// Trace every record and command
    #[arg(long)]
    debug: bool,

    /// Hex dump the bytes around a decode failure
    #[arg(long)]
    dump_on_error: bool,

    /// Hex dump the whole decoded payload before decoding
    #[arg(long)]
    dump_payload: bool,

    /// Decode and report without writing files
    #[arg(long)]
    dry_run: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Print debug messages
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug)]
struct BaseTime(Option<u32>);

fn parse_base_time(s: &str) -> Result<BaseTime, String> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(BaseTime(None));
    }
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed
        .map(|t| BaseTime(Some(t)))
        .map_err(|e| format!("expected a tick count or `none`: {}", e))
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(args: &Args) {
    let level = if args.debug {
        log::LevelFilter::Trace
    } else if args.verbose {
        log::LevelFilter::Debug
    } else if args.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn build_config(args: &Args) -> Result<DecoderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => DecoderConfig::default(),
    };

    if args.unique_tracks {
        config.unique_tracks = true;
    }
    if let Some(limit) = args.track_limit {
        config.track_limit = Some(limit);
    }
    if args.no_rename_tracks {
        config.rename_tracks = false;
    }
    if args.pitch_bend_override {
        config.pitch_bend_override = true;
    }
    if let Some(multiplier) = args.pitch_bend_multiplier {
        config.pitch_bend_multiplier = multiplier;
    }
    if let Some(BaseTime(base)) = args.base_time {
        config.base_time = base;
    }
    if args.simple_controllers {
        config.extended_controllers = false;
    }
    if args.debug {
        config.debug_trace = true;
    }
    config.validate()?;
    Ok(config)
}

fn report_failure(err: &ExtractError, payload: &[u8], dump: bool) {
    let Some(decode) = err.decode_error() else {
        return;
    };
    if let Some(context) = decode.context() {
        eprintln!("Bytes before the unrecognised command:");
        eprint!("{}", context.dump());
    } else if dump {
        let start = decode.offset().saturating_sub(DUMP_RADIUS);
        let end = (decode.offset() + DUMP_RADIUS).min(payload.len() as u64);
        if start < end {
            eprintln!("Bytes around offset {:#x}:", decode.offset());
            eprint!("{}", hexdump(&payload[start as usize..end as usize], start));
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = build_config(&args)?;
    let extractor = Extractor::new(config);
    let payload = extractor
        .load(&args.input, args.raw)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    if args.dump_payload {
        print!("{}", hexdump(&payload, 0));
    }

    let mut sink = SmfSink::new(&args.output_dir);
    let result = if args.dry_run {
        extractor.decode(&payload).map(|project| (project, 0))
    } else {
        fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
        extractor
            .extract(&payload, &mut sink)
            .map(|extraction| (extraction.project, extraction.written.len()))
    };
    let (project, written) = match result {
        Ok(ok) => ok,
        Err(err) => {
            report_failure(&err, &payload, args.dump_on_error);
            return Err(err).context("Extraction failed");
        }
    };

    if !args.quiet {
        println!(
            "Tempo:    {} BPM, {}/{}",
            project.tempo.bpm,
            project.time_signature.numerator,
            project.time_signature.denominator()
        );
        println!("Sections: {}", project.sections.len());
        println!("Decoded:  {}", project.stats);
        println!();
        for output in project.outputs().iter().filter(|o| o.has_events) {
            println!("{}", output.stem());
            print!("{}", analyze(output));
            println!();
        }
        if !args.dry_run {
            println!("Wrote {} files to {}", written, args.output_dir.display());
        }
    }

    Ok(())
}
