//! Video source capability and the sources that ship with the crate.

use crate::frame::Frame;
use crate::Result;
use log::debug;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// Something that yields decoded frames in display order.
///
/// `next_frame` returns `Ok(None)` at end of stream. A
/// [`PlayerError::DecodeFailure`](crate::PlayerError::DecodeFailure) means a
/// single frame was lost and reading may continue; any other error means the
/// source is gone.
pub trait VideoSource {
    /// Frame rate the source reports, if any.
    fn nominal_frame_rate(&self) -> Option<f64>;

    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Number of frames in the stream, when known up front.
    fn total_frames(&self) -> Option<u64>;

    /// Release the underlying handle. Must tolerate being called twice.
    fn release(&mut self);
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn nominal_frame_rate(&self) -> Option<f64> {
        (**self).nominal_frame_rate()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn total_frames(&self) -> Option<u64> {
        (**self).total_frames()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Metadata of a file-backed source.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Average frame rate, if the container reports one
    pub fps: Option<f64>,
    /// Frame count, if the container reports one
    pub total_frames: Option<u64>,
    /// Duration in seconds, if known
    pub duration: Option<f64>,
}

/// Releases the wrapped source when dropped, on every exit path.
pub struct SourceGuard<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: VideoSource + ?Sized> SourceGuard<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }
}

impl<S: VideoSource + ?Sized> Deref for SourceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: VideoSource + ?Sized> DerefMut for SourceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: VideoSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        debug!("Releasing video source");
        self.source.release();
    }
}

/// Pre-decoded frames held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
    fps: Option<f64>,
    total: u64,
    released: bool,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, fps: Option<f64>) -> Self {
        let total = frames.len() as u64;
        Self {
            frames: frames.into(),
            fps,
            total,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl VideoSource for MemorySource {
    fn nominal_frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.released {
            return Ok(None);
        }
        Ok(self.frames.pop_front())
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total)
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }
}

/// Decoder backend selected at compile time.
#[cfg(feature = "ffmpeg")]
pub type FileSource = crate::decoder::VideoDecoder;

/// Decoder backend selected at compile time.
#[cfg(not(feature = "ffmpeg"))]
pub type FileSource = crate::pipe::FfmpegPipe;

/// Open a local video file with the compiled-in decoder backend.
pub fn open_video(path: &Path) -> Result<FileSource> {
    FileSource::open(path)
}
