//! Batch re-encoding of frontend videos with ffmpeg.
//!
//! Each video is encoded to a temporary sibling file. Only a successful encode replaces
//! the original; a failed one leaves the original untouched and removes the temp file.

use crate::error::{Error, Result};
use crate::jobs::{BatchObserver, Job, JobStatus, default_status};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Suffix added to the file stem while encoding
pub const TEMP_SUFFIX: &str = "_converting";

/// Extensions picked up by [`scan_videos`]
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "m4v"];

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=(\d+:\d+:\d+(?:\.\d+)?)").unwrap());

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration:\s*(\d+:\d+:\d+(?:\.\d+)?)").unwrap());

/// Parse `HH:MM:SS` or `HH:MM:SS.ff` into seconds
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let mut parts = text.trim().splitn(3, ':');
    let hours = parts.next()?.parse::<u64>().ok()?;
    let minutes = parts.next()?.parse::<u64>().ok()?;
    let seconds = parts.next()?;
    if !seconds.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let seconds = seconds.parse::<f64>().ok()?;
    Some((hours * 3600 + minutes * 60) as f64 + seconds)
}

/// Turns encoder output into a per-file percentage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressTracker {
    /// Total duration in seconds, if known
    pub duration: Option<f64>,
}

impl ProgressTracker {
    pub fn new(duration: Option<f64>) -> Self {
        Self { duration }
    }

    /// Percentage for the last `time=` stamp in `chunk`, clamped to 0..=100.
    ///
    /// Returns `None` without a positive duration or without a stamp in the chunk.
    pub fn observe(&self, chunk: &str) -> Option<u8> {
        let duration = self.duration.filter(|d| *d > 0.0)?;
        let stamp = TIME_RE.captures_iter(chunk).last()?.get(1)?.as_str();
        let elapsed = parse_timestamp(stamp)?;
        Some(((elapsed / duration) * 100.0).clamp(0.0, 100.0) as u8)
    }
}

/// Executable named `name` next to `ffmpeg`, if present
fn sibling_tool(ffmpeg: &Path, name: &str) -> Option<PathBuf> {
    let dir = ffmpeg.parent()?;
    [format!("{name}.exe"), name.to_string()]
        .into_iter()
        .map(|file| dir.join(file))
        .find(|path| path.is_file())
}

/// Media duration in seconds.
///
/// Uses `ffprobe` next to `ffmpeg` (or on `PATH`), then falls back to scanning the
/// `Duration:` line printed by `ffmpeg -i`.
pub fn media_duration(ffmpeg: &Path, input: &Path) -> Option<f64> {
    let ffprobe = sibling_tool(ffmpeg, "ffprobe").or_else(|| which::which("ffprobe").ok());

    if let Some(ffprobe) = ffprobe {
        let output = Command::new(&ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .output();
        match output {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout);
                if let Ok(seconds) = text.trim().parse::<f64>() {
                    return Some(seconds);
                }
            }
            Err(e) => debug!(ffprobe = %ffprobe.display(), error = %e, "ffprobe failed"),
        }
    }

    let output = Command::new(ffmpeg).arg("-i").arg(input).output().ok()?;
    // ffmpeg -i exits non-zero without an output file but still prints the header
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));
    duration_from_header(&text)
}

/// Extract `Duration: HH:MM:SS.ff` from ffmpeg's input summary
pub fn duration_from_header(text: &str) -> Option<f64> {
    let stamp = DURATION_RE.captures(text)?.get(1)?.as_str();
    parse_timestamp(stamp)
}

/// Find ffmpeg: the explicit path, then next to the running executable, then `PATH`
pub fn locate_ffmpeg(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        warn!(path = %path.display(), "configured ffmpeg not found");
    }

    let local = std::env::current_exe()
        .ok()
        .and_then(|exe| sibling_tool(&exe, "ffmpeg"));
    local.or_else(|| which::which("ffmpeg").ok())
}

/// One video to re-encode
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    /// Original file, replaced on success
    pub input: PathBuf,
    /// Temporary output next to the original
    pub temp: PathBuf,
    /// Duration in seconds, once known
    pub duration: Option<f64>,
}

impl EncodeJob {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let temp = temp_path(&input);
        Self {
            input,
            temp,
            duration: None,
        }
    }

    /// Batch job running `ffmpeg` for this video
    pub fn to_job(&self, ffmpeg: &Path) -> Job {
        Job::new(file_name(&self.input), ffmpeg).args(encode_args(self))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `<stem>_converting<ext>` next to `input`, without doubling the suffix
pub fn temp_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = if stem.to_lowercase().ends_with(TEMP_SUFFIX) {
        stem
    } else {
        format!("{stem}{TEMP_SUFFIX}")
    };
    let name = match input.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem,
    };
    input.with_file_name(name)
}

/// ffmpeg arguments: H.264 high 4.1 / yuv420p video, stereo AAC audio if present
pub fn encode_args(job: &EncodeJob) -> Vec<String> {
    let mut args = vec!["-y".to_string(), "-i".to_string()];
    args.push(job.input.display().to_string());
    args.extend(
        [
            "-map", "0:v:0", "-map", "0:a?", "-c:v", "libx264", "-profile:v", "high", "-level",
            "4.1", "-pix_fmt", "yuv420p", "-preset", "slow", "-crf", "18", "-c:a", "aac", "-b:a",
            "128k", "-ar", "48000", "-ac", "2", "-movflags", "+faststart",
        ]
        .map(str::to_string),
    );
    args.push(job.temp.display().to_string());
    args
}

/// Settle the files after an encode.
///
/// On success the temp file replaces the original. On failure the temp file is removed
/// and the original is left as it was.
pub fn finalize(job: &EncodeJob, success: bool) -> Result<()> {
    if job.temp == job.input {
        return Err(Error::custom(format!(
            "'{}' is a temporary encode file",
            job.input.display()
        )));
    }
    if !success {
        if job.temp.exists() {
            fs::remove_file(&job.temp)
                .map_err(|e| Error::io(job.temp.display().to_string(), e.to_string()))?;
        }
        return Ok(());
    }

    if !job.temp.is_file() {
        return Err(Error::not_found(job.temp.display().to_string()));
    }
    if job.input.exists() {
        fs::remove_file(&job.input)
            .map_err(|e| Error::io(job.input.display().to_string(), e.to_string()))?;
    }
    fs::rename(&job.temp, &job.input)
        .map_err(|e| Error::io(job.input.display().to_string(), e.to_string()))?;
    info!(path = %job.input.display(), "replaced with re-encoded video");
    Ok(())
}

/// Whether `path` is a leftover `<stem>_converting<ext>` temp file
pub fn is_temp_file(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().to_lowercase().ends_with(TEMP_SUFFIX))
}

/// Video files directly inside `dir`, sorted by path. Leftover temp files are skipped.
pub fn scan_videos(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::not_found(dir.display().to_string()));
    }
    let read = fs::read_dir(dir).map_err(|e| Error::from_io(dir.display().to_string(), e))?;

    let mut videos = read
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension().is_some_and(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                VIDEO_EXTENSIONS.contains(&ext.as_str())
            })
        })
        .filter(|path| !is_temp_file(path))
        .collect::<Vec<_>>();
    videos.sort();
    Ok(videos)
}

/// Batch observer for encodes: reads durations, reports progress and settles files
pub struct EncodeObserver<'a> {
    ffmpeg: PathBuf,
    jobs: HashMap<String, EncodeJob>,
    tracker: ProgressTracker,
    on_progress: Box<dyn FnMut(&str, u8) + 'a>,
}

impl<'a> EncodeObserver<'a> {
    /// Observer for `jobs`; `on_progress` receives (label, percent) for the running file
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        jobs: &[EncodeJob],
        on_progress: impl FnMut(&str, u8) + 'a,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            jobs: jobs
                .iter()
                .map(|job| (file_name(&job.input), job.clone()))
                .collect(),
            tracker: ProgressTracker::default(),
            on_progress: Box::new(on_progress),
        }
    }
}

impl BatchObserver for EncodeObserver<'_> {
    fn job_started(&mut self, job: &Job) -> Result<()> {
        let encode = self
            .jobs
            .get_mut(&job.label)
            .ok_or_else(|| Error::custom(format!("Unknown encode job '{}'", job.label)))?;
        if encode.temp == encode.input {
            return Err(Error::custom(format!(
                "'{}' is a temporary encode file",
                encode.input.display()
            )));
        }

        encode.duration = media_duration(&self.ffmpeg, &encode.input);
        self.tracker = ProgressTracker::new(encode.duration);
        debug!(input = %encode.input.display(), duration = ?encode.duration, "duration read");

        if encode.temp.exists() {
            fs::remove_file(&encode.temp)
                .map_err(|e| Error::io(encode.temp.display().to_string(), e.to_string()))?;
        }
        (self.on_progress)(&job.label, 0);
        Ok(())
    }

    fn output(&mut self, job: &Job, line: &str) {
        if let Some(percent) = self.tracker.observe(line) {
            (self.on_progress)(&job.label, percent);
        }
    }

    fn job_finished(&mut self, job: &Job, outcome: &Result<i32>) -> JobStatus {
        let status = default_status(outcome);
        let Some(encode) = self.jobs.get(&job.label) else {
            return status;
        };

        match finalize(encode, status.is_success()) {
            Ok(()) if status.is_success() => {
                (self.on_progress)(&job.label, 100);
                status
            }
            Ok(()) => status,
            Err(e) => JobStatus::Failed(e.to_string()),
        }
    }
}
