//! Video helpers for pulling SubRip streams out of containers.
//! Streams are listed with ffprobe and copied out with ffmpeg. Nothing here
//! touches the in-memory subtitle model; it only produces `.srt` files.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, trace, warn};

const SUBRIP_CODEC: &str = "subrip";

/// Top level of `ffprobe -print_format json -show_streams`.
#[derive(Debug, Deserialize)]
struct Probe {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    tags: Tags,
}

/// ffprobe may omit either tag.
#[derive(Debug, Default, Deserialize)]
struct Tags {
    language: Option<String>,
    title: Option<String>,
}

/// A SubRip stream inside a container, addressed by its container index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStream {
    pub index: usize,
    pub language: Option<String>,
    pub title: Option<String>,
}

impl SubtitleStream {
    /// Name of the `.srt` file this stream is written to, next to the video.
    /// Language and title are used when present, otherwise the zero padded index.
    pub fn file_name(&self, stem: &str) -> String {
        match (&self.language, &self.title) {
            (Some(lang), Some(title)) => format!("{stem}.{lang}.{title}.srt"),
            (Some(lang), None) => format!("{stem}.{lang}.srt"),
            (None, Some(title)) => format!("{stem}.{title}.srt"),
            (None, None) => format!("{stem}.{:03}.srt", self.index),
        }
    }
}

impl fmt::Display for SubtitleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stream {}: language: {}, title: {}",
            self.index,
            self.language.as_deref().unwrap_or("none"),
            self.title.as_deref().unwrap_or("none")
        )
    }
}

/// Keep the SubRip streams of an ffprobe JSON report.
pub fn parse_probe_output(json: &[u8]) -> Result<Vec<SubtitleStream>> {
    let probe: Probe = serde_json::from_slice(json).context("unreadable ffprobe output")?;
    Ok(probe
        .streams
        .into_iter()
        .filter(|s| s.codec_name.as_deref() == Some(SUBRIP_CODEC))
        .map(|s| SubtitleStream {
            index: s.index,
            language: s.tags.language,
            title: s.tags.title,
        })
        .collect())
}

/// List the SubRip streams of `video` by running ffprobe.
pub fn probe_streams(
    ffprobe: &str,
    video: &Path,
    log_level: &str,
) -> Result<Vec<SubtitleStream>> {
    trace!(
        "probe_streams(video={}): listing subtitle streams",
        video.display()
    );
    let output = Command::new(ffprobe)
        .args([
            "-loglevel",
            log_level,
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "s",
        ])
        .arg(video)
        .output()
        .with_context(|| format!("failed to run {ffprobe}"))?;
    if !output.status.success() {
        return Err(anyhow!("ffprobe did not exit cleanly"));
    }
    parse_probe_output(&output.stdout)
}

/// Interpret a comma separated list of stream indexes.
/// An empty input selects every valid index. Anything that is not digits,
/// commas and whitespace, or names an unknown index, yields `None`.
pub fn parse_stream_selection(valid: &[usize], input: &str) -> Option<Vec<usize>> {
    if input.is_empty() {
        return Some(valid.to_vec());
    }
    if !input
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c.is_whitespace())
    {
        return None;
    }
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut chosen = Vec::new();
    for part in compact.split(',') {
        let index: usize = part.parse().ok()?;
        if !valid.contains(&index) {
            return None;
        }
        chosen.push(index);
    }
    Some(chosen)
}

/// Build the ffmpeg arguments copying stream `index` of `video` to `out`.
pub fn ffmpeg_extract_args(
    log_level: &str,
    video: &Path,
    index: usize,
    out: &Path,
) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        log_level.to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-map".to_string(),
        format!("0:{index}"),
        out.display().to_string(),
    ]
}

/// Copy one stream out with ffmpeg. A non-zero exit status is an error.
pub fn extract_stream(
    ffmpeg: &str,
    video: &Path,
    index: usize,
    out: &Path,
    log_level: &str,
) -> Result<()> {
    trace!(
        "extract_stream(video={}, index={}): invoking ffmpeg",
        video.display(),
        index
    );
    let args = ffmpeg_extract_args(log_level, video, index, out);
    let status = Command::new(ffmpeg)
        .args(&args)
        .status()
        .with_context(|| format!("failed to run {ffmpeg}"))?;
    if !status.success() {
        return Err(anyhow!(
            "ffmpeg did not exit cleanly, stream {index} might not have been extracted"
        ));
    }
    info!("extracted stream {} to {}", index, out.display());
    Ok(())
}

/// Tools and options used by [`extract_subtitles`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub log_level: String,
    /// Stream selection as accepted by [`parse_stream_selection`]; `None` takes all.
    pub selection: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            log_level: "warning".to_string(),
            selection: None,
        }
    }
}

/// Extract the selected SubRip streams of `video` next to it.
/// Streams that ffmpeg fails on are logged and skipped; the written paths are returned.
pub fn extract_subtitles(video: &Path, options: &ExtractOptions) -> Result<Vec<PathBuf>> {
    if !video.is_file() {
        bail!("specified file does not exist: {}", video.display());
    }
    let video = video
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", video.display()))?;
    let folder = video.parent().unwrap_or_else(|| Path::new("."));
    let stem = video
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let streams = probe_streams(&options.ffprobe, &video, &options.log_level)?;
    if streams.is_empty() {
        info!("no subrip subtitles found in {}", video.display());
        return Ok(Vec::new());
    }
    info!("found {} subtitles in {}", streams.len(), video.display());
    for stream in &streams {
        info!("\t{}", stream);
    }

    let valid: Vec<usize> = streams.iter().map(|s| s.index).collect();
    let chosen = match options.selection.as_deref() {
        None => valid.clone(),
        Some(input) => parse_stream_selection(&valid, input)
            .ok_or_else(|| anyhow!("invalid stream selection \"{input}\", valid: {valid:?}"))?,
    };

    let mut written = Vec::new();
    for stream in streams.iter().filter(|s| chosen.contains(&s.index)) {
        let out = folder.join(stream.file_name(&stem));
        match extract_stream(&options.ffmpeg, &video, stream.index, &out, &options.log_level) {
            Ok(()) => written.push(out),
            Err(err) => warn!("{err:#}"),
        }
    }
    Ok(written)
}
