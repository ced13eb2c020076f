//! Video source backed by the `ffmpeg` and `ffprobe` binaries.
//!
//! `ffprobe` supplies the stream metadata, then `ffmpeg` decodes the first
//! video stream to raw RGB24 on a pipe, one `width * height * 3` byte block
//! per frame. Both binaries must be on `PATH`.

use crate::frame::{ChannelOrder, Frame};
use crate::source::{VideoInfo, VideoSource};
use crate::{PlayerError, Result};
use log::{debug, info, warn};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Query `ffprobe` for the first video stream of `path`.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg(concat!(
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,duration",
            ":stream_tags=rotate:stream_side_data=rotation"
        ))
        .args(["-of", "default=noprint_wrappers=1"])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| PlayerError::SourceUnavailable(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(PlayerError::SourceUnavailable(format!(
            "ffprobe could not read '{}'",
            path.display()
        )));
    }

    let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        PlayerError::SourceUnavailable(format!("no video stream found in '{}'", path.display()))
    })?;
    info!(
        "Probed '{}': {}x{}, fps {:?}, frames {:?}",
        path.display(),
        info.width,
        info.height,
        info.fps,
        info.total_frames
    );
    Ok(info)
}

/// Parse `key=value` lines printed by `ffprobe -of default=noprint_wrappers=1`.
///
/// Width and height are the displayed geometry: a stream rotated by a quarter
/// turn (display matrix `rotation` or legacy `rotate` tag) reports its coded
/// dimensions swapped, matching what `ffmpeg` emits after autorotation.
/// Returns `None` when no usable width/height pair is present.
pub fn parse_probe_output(text: &str) -> Option<VideoInfo> {
    let mut width = 0u32;
    let mut height = 0u32;
    let mut avg_rate = None;
    let mut raw_rate = None;
    let mut total_frames = None;
    let mut duration = None;
    let mut rotation = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "width" => width = value.parse().unwrap_or(0),
            "height" => height = value.parse().unwrap_or(0),
            "avg_frame_rate" => avg_rate = parse_rational(value),
            "r_frame_rate" => raw_rate = parse_rational(value),
            "nb_frames" => total_frames = value.parse::<u64>().ok().filter(|&n| n > 0),
            "duration" => {
                duration = value.parse::<f64>().ok().filter(|d| d.is_finite() && *d > 0.0)
            }
            "rotation" | "TAG:rotate" => {
                rotation = rotation.or_else(|| value.parse::<f64>().ok())
            }
            _ => {}
        }
    }

    if width == 0 || height == 0 {
        return None;
    }
    if rotation.is_some_and(is_quarter_turn) {
        std::mem::swap(&mut width, &mut height);
    }
    Some(VideoInfo {
        width,
        height,
        fps: avg_rate.or(raw_rate),
        total_frames,
        duration,
    })
}

/// True for ±90° and ±270°.
fn is_quarter_turn(degrees: f64) -> bool {
    (degrees.round() as i64).rem_euclid(180) == 90
}

/// `"30000/1001"` style rates. Zero or malformed rates yield `None`.
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((num, den)) => (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?),
        None => (value.parse::<f64>().ok()?, 1.0),
    };
    let rate = num / den;
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// A running `ffmpeg` process streaming raw RGB frames.
pub struct FfmpegPipe {
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    frame_count: u64,
}

impl FfmpegPipe {
    /// Probe `path` and start decoding it.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlayerError::SourceUnavailable(format!(
                "video file does not exist: {}",
                path.display()
            )));
        }
        let info = probe_video(path)?;

        // Pin the output size so every block has the probed geometry.
        let scale = format!("scale={}:{}", info.width, info.height);
        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-an", "-vf", scale.as_str()])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::SourceUnavailable(format!("failed to start ffmpeg: {}", e)))?;
        let stdout = child.stdout.take();
        debug!("ffmpeg started for '{}' (pid {})", path.display(), child.id());

        Ok(Self {
            info,
            child: Some(child),
            stdout,
            frame_count: 0,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 3
    }
}

/// Fill `buf` completely. `Ok(false)` means the stream ended first.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

impl VideoSource for FfmpegPipe {
    fn nominal_frame_rate(&self) -> Option<f64> {
        self.info.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let len = self.frame_len();
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; len];
        match read_exact_or_eof(stdout, &mut data) {
            Ok(true) => {}
            Ok(false) => {
                debug!("ffmpeg pipe ended after {} frames", self.frame_count);
                return Ok(None);
            }
            Err(e) => {
                return Err(PlayerError::SourceUnavailable(format!(
                    "failed to read from ffmpeg: {}",
                    e
                )));
            }
        }

        self.frame_count += 1;
        Frame::from_packed(self.info.width, self.info.height, data, ChannelOrder::Rgb)
            .map(Some)
            .map_err(|e| PlayerError::DecodeFailure {
                frame: self.frame_count,
                reason: e.to_string(),
            })
    }

    fn total_frames(&self) -> Option<u64> {
        self.info.total_frames
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited on its own.
                debug!("ffmpeg kill: {}", e);
            }
            if let Err(e) = child.wait() {
                warn!("Failed to reap ffmpeg: {}", e);
            }
        }
    }
}

impl Drop for FfmpegPipe {
    fn drop(&mut self) {
        self.release();
    }
}
