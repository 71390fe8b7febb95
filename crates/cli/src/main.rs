//! Binary entry point for checking, fixing and extracting SubRip subtitles.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use subrev_core::video::{extract_subtitles, ExtractOptions};
use subrev_core::{Subtitle, Timestamp};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line options for the binary.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose debug and trace logs.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate an SRT file, printing every cue with problems.
    Check {
        input: PathBuf,

        /// Print findings as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Sort cues by time, renumber them and write the result.
    Fix {
        input: PathBuf,

        /// Defaults to `<stem>_fixed.srt` next to the input.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Move every cue by a number of milliseconds (negative moves earlier).
    Shift {
        input: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        offset_ms: i64,

        /// Defaults to `<stem>_shifted.srt` next to the input.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Extract SubRip streams from a video file with ffprobe and ffmpeg.
    Extract {
        /// Video file containing the subtitles. Files are written next to it.
        input: PathBuf,

        /// Comma separated stream indexes to extract; all streams when omitted.
        #[arg(long)]
        streams: Option<String>,

        /// Log level passed to ffmpeg and ffprobe.
        #[arg(long, value_enum, default_value_t = FfmpegLogLevel::Warning)]
        ffmpeg_loglevel: FfmpegLogLevel,

        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: String,

        #[arg(long, default_value = "ffprobe")]
        ffprobe: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FfmpegLogLevel {
    Debug,
    Verbose,
    Info,
    Warning,
}

impl FfmpegLogLevel {
    fn as_str(self) -> &'static str {
        match self {
            FfmpegLogLevel::Debug => "debug",
            FfmpegLogLevel::Verbose => "verbose",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Warning => "warning",
        }
    }
}

/// Application entry point which parses CLI args and performs actions.
/// This function should initialize logging and delegate to the core library.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("subrev=trace".parse()?)
            .add_directive("subrev_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("subrev=info".parse()?)
            .add_directive("subrev_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Check { input, json } => check(&input, json),
        Command::Fix { input, output } => {
            let output = output.unwrap_or_else(|| sibling(&input, "fixed"));
            fix(&input, &output)
        }
        Command::Shift {
            input,
            offset_ms,
            output,
        } => {
            let output = output.unwrap_or_else(|| sibling(&input, "shifted"));
            shift(&input, offset_ms, &output)
        }
        Command::Extract {
            input,
            streams,
            ffmpeg_loglevel,
            ffmpeg,
            ffprobe,
        } => {
            let options = ExtractOptions {
                ffmpeg,
                ffprobe,
                log_level: ffmpeg_loglevel.as_str().to_string(),
                selection: streams,
            };
            let written = extract_subtitles(&input, &options)?;
            info!("extracted {} subtitle files", written.len());
            Ok(())
        }
    }
}

/// `<dir>/<stem>_<suffix>.srt` next to `input`.
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    input.with_file_name(format!(
        "{}_{}.srt",
        input.file_stem().unwrap_or_default().to_string_lossy(),
        suffix
    ))
}

fn load(input: &Path) -> Result<Subtitle> {
    let mut subtitle = Subtitle::new(input);
    subtitle
        .parse()
        .with_context(|| format!("cannot load {}", input.display()))?;
    Ok(subtitle)
}

fn check(input: &Path, json: bool) -> Result<()> {
    let mut subtitle = load(input)?;
    let reports = subtitle.validate(false);
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!(
                "{} ({} --> {}): {}",
                report.id,
                report.start,
                report.end,
                report.tags().join(", ")
            );
        }
    }
    if !reports.is_empty() {
        bail!("{} of {} cues have problems", reports.len(), subtitle.len());
    }
    info!("{} cues, no problems found", subtitle.len());
    Ok(())
}

fn fix(input: &Path, output: &Path) -> Result<()> {
    let mut subtitle = load(input)?;
    let before = subtitle.history_len();
    let reports = subtitle.validate(true);
    info!("renumbered {} cues", subtitle.history_len() - before);
    let remaining = subtitle.validate(false);
    for report in &remaining {
        info!("cue {} still has: {}", report.id, report.tags().join(", "));
    }
    subtitle.save(output)?;
    info!(
        "{} cues had problems, {} remain",
        reports.len(),
        remaining.len()
    );
    Ok(())
}

fn shift(input: &Path, offset_ms: i64, output: &Path) -> Result<()> {
    let subtitle = load(input)?;
    // Work out every new range first so a failure leaves nothing half shifted.
    let mut ranges: Vec<(Timestamp, Timestamp)> = Vec::with_capacity(subtitle.len());
    for cue in subtitle.iter() {
        let (mut start, mut end) = (cue.start(), cue.end());
        start
            .add_milliseconds(offset_ms)
            .with_context(|| format!("cannot shift start of cue {}", cue.id()))?;
        end.add_milliseconds(offset_ms)
            .with_context(|| format!("cannot shift end of cue {}", cue.id()))?;
        ranges.push((start, end));
    }
    for (cue, (start, end)) in subtitle.iter().zip(ranges) {
        cue.set_start(start);
        cue.set_end(end);
    }
    subtitle.save(output)?;
    info!("shifted {} cues by {} ms", subtitle.len(), offset_ms);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const UNORDERED: &str = "1\n00:00:05,000 --> 00:00:06,000\nlate\n\n2\n00:00:01,000 --> 00:00:02,000\nearly\n";

    #[test]
    fn derives_sibling_paths() {
        assert_eq!(
            sibling(Path::new("dir/movie.en.srt"), "fixed"),
            PathBuf::from("dir/movie.en_fixed.srt")
        );
    }

    #[test]
    fn accepts_negative_offsets() {
        let cli =
            Cli::try_parse_from(["subrev", "shift", "a.srt", "--offset-ms", "-1500"]).unwrap();
        match cli.command {
            Command::Shift { offset_ms, .. } => assert_eq!(offset_ms, -1500),
            _ => panic!("expected shift"),
        }
    }

    /// Fixing sorts by time and renumbers the cues.
    #[test]
    fn fix_writes_sorted_renumbered_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.srt");
        let output = dir.path().join("out.srt");
        fs::write(&input, UNORDERED).unwrap();
        fix(&input, &output).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "1\n00:00:01,000 --> 00:00:02,000\nearly\n\n2\n00:00:05,000 --> 00:00:06,000\nlate\n\n"
        );
    }

    #[test]
    fn check_fails_on_findings() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.srt");
        fs::write(&input, UNORDERED).unwrap();
        assert!(check(&input, false).is_err());
    }

    #[test]
    fn shift_moves_every_cue() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.srt");
        let output = dir.path().join("out.srt");
        fs::write(&input, "1\n00:00:01,000 --> 00:00:02,000\nhi\n").unwrap();
        shift(&input, -999, &output).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "1\n00:00:00,001 --> 00:00:01,001\nhi\n\n"
        );
    }

    /// Shifting before zero fails and writes nothing.
    #[test]
    fn shift_refuses_negative_times() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.srt");
        let output = dir.path().join("out.srt");
        fs::write(&input, "1\n00:00:01,000 --> 00:00:02,000\nhi\n").unwrap();
        assert!(shift(&input, -1001, &output).is_err());
        assert!(!output.exists());
    }
}
