use crate::glyph::GlyphRamp;
use crate::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default output width in characters
pub const DEFAULT_WIDTH: u32 = 120;

/// Frame rate used when the source does not report a usable one
pub const DEFAULT_FALLBACK_FPS: f64 = 30.0;

/// Per-session render and pacing settings.
///
/// Built once before playback starts and never changed while playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output width in characters
    pub width: u32,
    /// Frames per second to play at; 0 uses the source's own rate
    pub frame_rate_override: u32,
    /// Wrap every glyph in a 256-color foreground escape
    pub color: bool,
    /// Run CLAHE and the brightness/contrast curve before downsampling
    pub enhance: bool,
    /// Character ramp used for luminance mapping
    pub ramp: GlyphRamp,
    /// Rate used when the source reports none and no override is set
    pub fallback_fps: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            frame_rate_override: 0,
            color: true,
            enhance: true,
            ramp: GlyphRamp::Classic,
            fallback_fps: DEFAULT_FALLBACK_FPS,
        }
    }
}

impl RenderConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: RenderConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(PlayerError::InvalidConfig("width must be greater than 0".to_string()));
        }
        if !(self.fallback_fps.is_finite() && self.fallback_fps > 0.0) {
            return Err(PlayerError::InvalidConfig(format!(
                "fallback fps must be a positive number, got {}",
                self.fallback_fps
            )));
        }
        Ok(())
    }

    /// Frame rate to pace playback at, given the source's nominal rate.
    pub fn effective_fps(&self, nominal: Option<f64>) -> f64 {
        if self.frame_rate_override > 0 {
            return f64::from(self.frame_rate_override);
        }
        match nominal {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => self.fallback_fps,
        }
    }

    /// Time budget for one frame.
    pub fn frame_delay(&self, nominal: Option<f64>) -> Duration {
        calculate_frame_delay(self.effective_fps(nominal))
    }
}

/// `1 / fps` as a duration.
///
/// Rates that do not give a representable delay (zero, negative, NaN or
/// infinite) fall back to the delay of [`DEFAULT_FALLBACK_FPS`].
pub fn calculate_frame_delay(fps: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / fps)
        .ok()
        .filter(|delay| fps.is_finite() && fps > 0.0 && !delay.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_FALLBACK_FPS))
}
