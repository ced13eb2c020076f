//! ASCII Cinema - a colorized text-art video player for the terminal
//!
//! Frames are contrast-enhanced, downsampled to a character grid, mapped to
//! glyphs by luminance and tinted with the nearest 256-color palette entry,
//! then drawn to the terminal at the source's frame rate.

pub mod cli;
pub mod color;
pub mod config;
pub mod converter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;
pub mod enhance;
pub mod frame;
pub mod glyph;
pub mod palette;
#[cfg(not(feature = "ffmpeg"))]
pub mod pipe;
pub mod playback;
pub mod renderer;
pub mod source;

pub use cli::Cli;
pub use config::{calculate_frame_delay, RenderConfig};
pub use converter::{frame_to_ascii, target_height, AsciiFrame, FrameConverter};
pub use frame::{ChannelOrder, Frame};
pub use glyph::{map_luminance, GlyphRamp};
pub use palette::{quantize, PaletteIndex};
pub use playback::{cancel_pair, play, CancelToken, Canceller, PlaybackReport, PlaybackState};
pub use renderer::{TerminalRenderer, TextSink};
pub use source::{open_video, FileSource, MemorySource, VideoInfo, VideoSource};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Error types used throughout the application
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Failed to decode frame {frame}: {reason}")]
    DecodeFailure { frame: u64, reason: String },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    /// Errors that cost a single frame rather than the whole session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlayerError::DecodeFailure { .. } | PlayerError::InvalidFrame(_))
    }
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Utility functions
pub mod utils {
    /// Format duration in a human-readable way
    pub fn format_duration(seconds: f64) -> String {
        let total_seconds = seconds as u64;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{}:{:02}", minutes, secs)
        }
    }

    /// Calculate aspect ratio from dimensions
    pub fn calculate_aspect_ratio(width: u32, height: u32) -> f64 {
        width as f64 / height as f64
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        cancel_pair, frame_to_ascii, map_luminance, open_video, play, quantize, target_height,
        utils::*, AsciiFrame, CancelToken, Canceller, ChannelOrder, Cli, Frame, FrameConverter,
        GlyphRamp, MemorySource, PlaybackReport, PlaybackState, PlayerError, RenderConfig, Result,
        TerminalRenderer, TextSink, VideoSource,
    };
}
