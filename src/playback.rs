//! The playback loop: acquire, render, display, sleep.
//!
//! Everything runs on the caller's task. The inter-frame sleep is the only
//! suspension point and races against the cancellation token, so a stop
//! request is honoured without waiting out the frame budget.

use crate::config::RenderConfig;
use crate::converter::FrameConverter;
use crate::renderer::TextSink;
use crate::source::{SourceGuard, VideoSource};
use crate::Result;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;

/// Where a playback session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    /// Cancelled by the user
    Stopped,
    /// The source ran out of frames
    Ended,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub state: PlaybackState,
    pub frames_rendered: u64,
    /// Frames dropped because they failed to decode or render
    pub frames_skipped: u64,
    pub total_frames: Option<u64>,
    /// Frame rate the session was paced at
    pub fps: f64,
    pub elapsed: Duration,
}

impl PlaybackReport {
    /// Share of the stream shown so far, when the total is known.
    pub fn progress_percent(&self) -> Option<f64> {
        progress_percent(self.frames_rendered, self.total_frames)
    }
}

fn progress_percent(shown: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => Some((shown as f64 / total as f64 * 100.0).min(100.0)),
        _ => None,
    }
}

/// Status line printed under each frame.
pub fn progress_line(shown: u64, total: Option<u64>) -> String {
    match (total, progress_percent(shown, total)) {
        (Some(total), Some(percent)) => format!("Frame: {}/{} ({:.1}%)", shown, total, percent),
        _ => format!("Frame: {}", shown),
    }
}

/// Requests cancellation of a running session.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes cancellation requests.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the
    /// matching [`Canceller`] is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// A connected canceller/token pair.
pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelToken { rx })
}

/// Play `source` into `sink` until it ends or `cancel` fires.
///
/// The source is released before this returns, whichever way it returns,
/// including when `config` is rejected up front.
/// Frames that fail to decode or render are skipped; a source that becomes
/// unreadable or a sink write error ends the session with that error.
pub async fn play<S, K>(
    source: &mut S,
    sink: &mut K,
    config: &RenderConfig,
    mut cancel: CancelToken,
) -> Result<PlaybackReport>
where
    S: VideoSource + ?Sized,
    K: TextSink + ?Sized,
{
    let mut source = SourceGuard::new(source);
    config.validate()?;
    let mut state = PlaybackState::Idle;

    let nominal = source.nominal_frame_rate();
    let fps = config.effective_fps(nominal);
    let frame_delay = config.frame_delay(nominal);
    let total_frames = source.total_frames();
    let converter = FrameConverter::new(config);
    info!(
        "Starting playback: {:.2} fps (source {:?}), {} frames, width {}",
        fps,
        nominal,
        total_frames.map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        config.width
    );

    let started = Instant::now();
    let mut frames_rendered = 0u64;
    let mut frames_skipped = 0u64;

    debug!("Playback state {:?} -> Playing", state);
    state = PlaybackState::Playing;

    while state == PlaybackState::Playing {
        if cancel.is_cancelled() {
            state = PlaybackState::Stopped;
            break;
        }

        let frame_start = Instant::now();
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                state = PlaybackState::Ended;
                break;
            }
            Err(e) if e.is_recoverable() => {
                warn!("Skipping frame: {}", e);
                frames_skipped += 1;
                continue;
            }
            Err(e) => {
                error!("Source failed after {} frames: {}", frames_rendered, e);
                return Err(e);
            }
        };

        let ascii = match converter.convert_frame(&frame) {
            Ok(ascii) => ascii,
            Err(e) => {
                warn!("Skipping frame: {}", e);
                frames_skipped += 1;
                continue;
            }
        };
        drop(frame);

        sink.clear()?;
        for line in ascii.lines() {
            sink.write_line(line)?;
        }
        frames_rendered += 1;
        sink.write_line("")?;
        sink.write_line(&progress_line(frames_rendered, total_frames))?;
        sink.flush()?;

        let render_time = frame_start.elapsed();
        let budget = frame_delay.saturating_sub(render_time);
        debug!("Frame {} drawn in {:?}, sleeping {:?}", frames_rendered, render_time, budget);

        tokio::select! {
            _ = sleep(budget) => {}
            _ = cancel.cancelled() => {
                state = PlaybackState::Stopped;
            }
        }
    }

    drop(source);
    match state {
        PlaybackState::Stopped => info!("Playback stopped after {} frames", frames_rendered),
        _ => info!("Playback complete: {} frames", frames_rendered),
    }

    Ok(PlaybackReport {
        state,
        frames_rendered,
        frames_skipped,
        total_frames,
        fps,
        elapsed: started.elapsed(),
    })
}
