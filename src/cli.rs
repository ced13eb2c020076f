use crate::config::RenderConfig;
use crate::glyph::GlyphRamp;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the video file to play
    #[arg(required = true)]
    pub file_path: PathBuf,

    /// Output width in characters
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Playback frame rate (0 plays at the video's own rate)
    #[arg(short, long)]
    pub fps: Option<u32>,

    /// Print plain glyphs without color escapes
    #[arg(long)]
    pub no_color: bool,

    /// Skip contrast enhancement
    #[arg(long)]
    pub no_enhance: bool,

    /// Character ramp used for brightness
    #[arg(short, long, value_enum)]
    pub ramp: Option<GlyphRamp>,

    /// JSON file with render settings; flags given here take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show video information only (don't play)
    #[arg(long)]
    pub info_only: bool,
}

impl Cli {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<(), String> {
        if !self.file_path.exists() {
            return Err(format!("Video file does not exist: {}", self.file_path.display()));
        }

        if self.width == Some(0) {
            return Err("Width must be greater than 0".to_string());
        }

        if let Some(config) = &self.config {
            if !config.exists() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        Ok(())
    }

    /// Settings for this session: defaults, then the config file, then flags.
    pub fn render_config(&self) -> crate::Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::from_json_file(path)?,
            None => RenderConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(fps) = self.fps {
            config.frame_rate_override = fps;
        }
        if self.no_color {
            config.color = false;
        }
        if self.no_enhance {
            config.enhance = false;
        }
        if let Some(ramp) = self.ramp {
            config.ramp = ramp;
        }

        config.validate()?;
        Ok(config)
    }
}
