use ascii_cinema::prelude::*;
use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// Horizontal gray gradient, so every rendered row has visible glyphs.
fn gradient_frame(width: u32, height: u32) -> Frame {
    Frame::Gray(GrayImage::from_fn(width, height, |x, _| Luma([(x * 255 / width.max(1)) as u8])))
}

fn plain_config(width: u32, fps: u32) -> RenderConfig {
    RenderConfig {
        width,
        frame_rate_override: fps,
        color: false,
        ..Default::default()
    }
}

enum Step {
    Frame(Frame),
    Corrupt,
    Gone,
}

/// Source that plays back a script and records whether it was released.
struct ScriptedSource {
    steps: VecDeque<Step>,
    fps: Option<f64>,
    total: Option<u64>,
    released: Arc<AtomicBool>,
    decoded: u64,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>, fps: Option<f64>) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let source = Self {
            total: Some(steps.len() as u64),
            steps: steps.into(),
            fps,
            released: Arc::clone(&released),
            decoded: 0,
        };
        (source, released)
    }
}

impl VideoSource for ScriptedSource {
    fn nominal_frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.decoded += 1;
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => Ok(Some(frame)),
            Some(Step::Corrupt) => Err(PlayerError::DecodeFailure {
                frame: self.decoded,
                reason: "corrupt packet".to_string(),
            }),
            Some(Step::Gone) => Err(PlayerError::SourceUnavailable("stream closed".to_string())),
            None => Ok(None),
        }
    }

    fn total_frames(&self) -> Option<u64> {
        self.total
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Sink that keeps each cleared screen as a block of lines.
#[derive(Default)]
struct RecordingSink {
    blocks: Vec<Vec<String>>,
    flushes: Vec<Instant>,
    cancel_after: Option<(usize, Canceller)>,
}

impl TextSink for RecordingSink {
    fn clear(&mut self) -> io::Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self.blocks.last_mut() {
            Some(block) => block.push(line.to_string()),
            None => self.blocks.push(vec![line.to_string()]),
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.push(Instant::now());
        if let Some((after, canceller)) = &self.cancel_after {
            if self.flushes.len() == *after {
                canceller.cancel();
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_frames_are_paced_and_laid_out() {
    let frames = vec![gradient_frame(20, 20), gradient_frame(20, 20)];
    let mut source = MemorySource::new(frames, Some(25.0));
    let mut sink = RecordingSink::default();
    let config = plain_config(10, 10);

    let started = Instant::now();
    let report = play(&mut source, &mut sink, &config, CancelToken::never()).await.unwrap();

    assert_eq!(report.state, PlaybackState::Ended);
    assert_eq!(report.frames_rendered, 2);
    assert_eq!(report.fps, 10.0);
    assert!(source.is_released());

    assert_eq!(sink.blocks.len(), 2);
    let height = target_height(20, 20, 10) as usize;
    assert_eq!(height, 5);
    for (i, block) in sink.blocks.iter().enumerate() {
        assert_eq!(block.len(), height + 2);
        for line in &block[..height] {
            assert_eq!(line.chars().count(), 10);
            assert!(!line.contains('\x1b'));
        }
        assert_eq!(block[height], "");
        let progress = format!("Frame: {}/2 ({:.1}%)", i + 1, (i + 1) as f64 * 50.0);
        assert_eq!(block[height + 1], progress);
    }

    assert_eq!(sink.flushes.len(), 2);
    // The second frame waits out the budget left after drawing the first.
    let first_draw = sink.flushes[0].duration_since(started);
    let gap = sink.flushes[1].duration_since(sink.flushes[0]);
    assert!(first_draw < Duration::from_millis(100), "first frame took {first_draw:?}");
    assert!(gap >= Duration::from_millis(100) - first_draw, "displays only {gap:?} apart");
}

#[tokio::test]
async fn test_source_rate_used_without_override() {
    let mut source = MemorySource::new(vec![gradient_frame(8, 8)], Some(50.0));
    let mut sink = RecordingSink::default();
    let report = play(&mut source, &mut sink, &plain_config(4, 0), CancelToken::never())
        .await
        .unwrap();
    assert_eq!(report.fps, 50.0);

    let mut source = MemorySource::new(vec![gradient_frame(8, 8)], None);
    let report = play(&mut source, &mut sink, &plain_config(4, 0), CancelToken::never())
        .await
        .unwrap();
    assert_eq!(report.fps, 30.0);
}

#[tokio::test]
async fn test_plays_to_end_of_stream() {
    let frames = vec![gradient_frame(16, 16); 3];
    let mut source = MemorySource::new(frames, None);
    let mut sink = RecordingSink::default();

    let report = play(&mut source, &mut sink, &plain_config(8, 200), CancelToken::never())
        .await
        .unwrap();

    assert_eq!(report.state, PlaybackState::Ended);
    assert_eq!(report.frames_rendered, 3);
    assert_eq!(report.frames_skipped, 0);
    assert_eq!(report.total_frames, Some(3));
    assert_eq!(report.progress_percent(), Some(100.0));
    assert_eq!(sink.blocks.len(), 3);
    assert_eq!(sink.blocks[2].last().unwrap(), "Frame: 3/3 (100.0%)");
    assert!(source.is_released());
}

#[tokio::test]
async fn test_cancel_during_sleep_stops_promptly() {
    let (canceller, token) = cancel_pair();
    let frames = vec![gradient_frame(16, 16); 3];
    let mut source = MemorySource::new(frames, Some(2.0));
    let mut sink = RecordingSink {
        cancel_after: Some((1, canceller)),
        ..Default::default()
    };

    let report = play(&mut source, &mut sink, &plain_config(8, 0), token).await.unwrap();

    assert_eq!(report.state, PlaybackState::Stopped);
    assert_eq!(report.frames_rendered, 1);
    assert_eq!(sink.blocks.len(), 1);
    assert!(report.elapsed < Duration::from_millis(400));
    assert!(source.is_released());
}

#[tokio::test]
async fn test_cancel_from_another_task() {
    let (canceller, token) = cancel_pair();
    let frames = vec![gradient_frame(16, 16); 3];
    let mut source = MemorySource::new(frames, None);
    let mut sink = RecordingSink::default();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let report = play(&mut source, &mut sink, &plain_config(8, 2), token).await.unwrap();

    assert_eq!(report.state, PlaybackState::Stopped);
    assert_eq!(report.frames_rendered, 1);
    assert!(report.elapsed < Duration::from_millis(450));
    assert!(source.is_released());
}

#[tokio::test]
async fn test_cancel_before_start_renders_nothing() {
    let (canceller, token) = cancel_pair();
    canceller.cancel();
    let mut source = MemorySource::new(vec![gradient_frame(4, 4)], None);
    let mut sink = RecordingSink::default();

    let report = play(&mut source, &mut sink, &plain_config(4, 0), token).await.unwrap();

    assert_eq!(report.state, PlaybackState::Stopped);
    assert_eq!(report.frames_rendered, 0);
    assert!(sink.blocks.is_empty());
    assert!(source.is_released());
}

#[tokio::test]
async fn test_bad_frames_are_skipped() {
    let (mut source, released) = ScriptedSource::new(
        vec![
            Step::Frame(gradient_frame(12, 12)),
            Step::Corrupt,
            Step::Frame(Frame::filled(0, 0, [0, 0, 0])),
            Step::Frame(gradient_frame(12, 12)),
        ],
        Some(500.0),
    );
    let mut sink = RecordingSink::default();

    let report = play(&mut source, &mut sink, &plain_config(6, 0), CancelToken::never())
        .await
        .unwrap();

    assert_eq!(report.state, PlaybackState::Ended);
    assert_eq!(report.frames_rendered, 2);
    assert_eq!(report.frames_skipped, 2);
    assert_eq!(sink.blocks.len(), 2);
    assert_eq!(sink.blocks[1].last().unwrap(), "Frame: 2/4 (50.0%)");
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_lost_source_is_released_and_reported() {
    let (mut source, released) =
        ScriptedSource::new(vec![Step::Frame(gradient_frame(12, 12)), Step::Gone], Some(500.0));
    let mut sink = RecordingSink::default();

    let result = play(&mut source, &mut sink, &plain_config(6, 0), CancelToken::never()).await;

    assert!(matches!(result, Err(PlayerError::SourceUnavailable(_))));
    assert_eq!(sink.blocks.len(), 1);
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_unusable_fallback_rate_is_rejected() {
    for fallback_fps in [0.0, -24.0, f64::NAN] {
        let (mut source, released) =
            ScriptedSource::new(vec![Step::Frame(gradient_frame(8, 8))], None);
        let mut sink = RecordingSink::default();
        let config = RenderConfig {
            fallback_fps,
            ..plain_config(4, 0)
        };

        let result = play(&mut source, &mut sink, &config, CancelToken::never()).await;

        assert!(matches!(result, Err(PlayerError::InvalidConfig(_))), "fallback {fallback_fps}");
        assert!(sink.blocks.is_empty());
        assert!(released.load(Ordering::SeqCst));
    }
}

#[tokio::test]
async fn test_terminal_output_of_a_session() {
    let mut source = MemorySource::new(vec![Frame::filled(8, 8, [200, 30, 30])], None);
    let mut renderer = TerminalRenderer::new(Vec::new());
    let config = RenderConfig {
        width: 4,
        frame_rate_override: 100,
        enhance: false,
        ..Default::default()
    };

    play(&mut source, &mut renderer, &config, CancelToken::never()).await.unwrap();

    let out = String::from_utf8(renderer.get_ref().clone()).unwrap();
    assert!(out.contains("\x1b[2J"));
    assert!(out.contains("\x1b[38;5;"));
    assert!(out.contains("Frame: 1/1 (100.0%)"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("ascii-cinema").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("text-art video player"))
        .stdout(predicate::str::contains("--no-color"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("ascii-cinema").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_missing_file() {
    let mut cmd = Command::cargo_bin("ascii-cinema").unwrap();
    cmd.arg("nonexistent.mp4");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_invalid_width() {
    let video = NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("ascii-cinema").unwrap();
    cmd.arg(video.path()).arg("--width").arg("0");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Width must be greater than 0"));
}

#[test]
fn test_cli_unknown_ramp() {
    let video = NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("ascii-cinema").unwrap();
    cmd.arg(video.path()).arg("--ramp").arg("emoji");
    cmd.assert().failure().stderr(predicate::str::contains("emoji"));
}

#[test]
fn test_cli_malformed_config() {
    let video = NamedTempFile::new().unwrap();
    let config = NamedTempFile::new().unwrap();
    std::fs::write(config.path(), "{ width: ").unwrap();

    let mut cmd = Command::cargo_bin("ascii-cinema").unwrap();
    cmd.arg(video.path()).arg("--config").arg(config.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("render configuration"));
}

mod unit_tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(30.0), "0:30");
        assert_eq!(format_duration(90.0), "1:30");
        assert_eq!(format_duration(3661.0), "1:01:01");
    }

    #[test]
    fn test_calculate_aspect_ratio() {
        assert_eq!(calculate_aspect_ratio(1920, 1080), 1920.0 / 1080.0);
        assert_eq!(calculate_aspect_ratio(100, 100), 1.0);
        assert_eq!(calculate_aspect_ratio(4, 3), 4.0 / 3.0);
    }

    #[test]
    fn test_error_recoverability() {
        assert!(PlayerError::DecodeFailure { frame: 3, reason: "x".into() }.is_recoverable());
        assert!(PlayerError::InvalidFrame("x".into()).is_recoverable());
        assert!(!PlayerError::SourceUnavailable("x".into()).is_recoverable());
        assert!(!PlayerError::InvalidConfig("x".into()).is_recoverable());
    }
}
