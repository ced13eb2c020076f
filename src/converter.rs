use crate::color::{boost_saturation, SATURATION_BOOST};
use crate::config::RenderConfig;
use crate::enhance;
use crate::frame::Frame;
use crate::glyph::GlyphRamp;
use crate::palette::quantize;
use crate::{PlayerError, Result};
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::Command;
use log::debug;
use std::borrow::Cow;
use std::fmt;

/// A rendered text-art frame: `height` lines of `width` cells each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    /// One entry per row, without line terminators
    pub lines: Vec<String>,
    /// Frame width in characters
    pub width: u32,
    /// Frame height in characters
    pub height: u32,
}

impl AsciiFrame {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

impl fmt::Display for AsciiFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Output height for a frame scaled to `target_width` characters.
///
/// Character cells are about twice as tall as they are wide, so the height
/// is halved. Never returns 0.
pub fn target_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 {
        return 1;
    }
    let height = u64::from(src_height) * u64::from(target_width) / u64::from(src_width) / 2;
    height.clamp(1, u64::from(u32::MAX)) as u32
}

/// Video frame to text-art converter
pub struct FrameConverter {
    width: u32,
    color: bool,
    enhance: bool,
    ramp: GlyphRamp,
}

impl FrameConverter {
    /// Create a converter using the render settings of `config`.
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            width: config.width.max(1),
            color: config.color,
            enhance: config.enhance,
            ramp: config.ramp,
        }
    }

    /// Convert one frame. The input frame is never modified.
    pub fn convert_frame(&self, frame: &Frame) -> Result<AsciiFrame> {
        if frame.is_empty() {
            return Err(PlayerError::InvalidFrame(format!(
                "cannot render a {}x{} frame",
                frame.width(),
                frame.height()
            )));
        }

        let width = self.width;
        let height = target_height(frame.width(), frame.height(), width);
        debug!(
            "Converting frame {}x{} to {}x{} cells",
            frame.width(),
            frame.height(),
            width,
            height
        );

        let source: Cow<'_, Frame> = if self.enhance {
            Cow::Owned(enhance::enhance(frame))
        } else {
            Cow::Borrowed(frame)
        };
        let resized = source.resized(width, height);
        let luma = stretch_min_max(luminance_plane(&resized));

        let mut lines = Vec::with_capacity(height as usize);
        for y in 0..height {
            let mut line = String::with_capacity(width as usize * if self.color { 16 } else { 1 });
            for x in 0..width {
                let value = luma[(y * width + x) as usize];
                let glyph = self.ramp.map(f32::from(value) / 255.0);
                if self.color {
                    let [r, g, b] = resized.rgb_at(x, y);
                    push_colored(&mut line, glyph, cell_color(r, g, b));
                } else {
                    line.push(glyph);
                }
            }
            lines.push(line);
        }

        Ok(AsciiFrame { lines, width, height })
    }
}

/// Palette index for a cell: saturation boosted, then quantized.
pub fn cell_color(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = boost_saturation(r, g, b, SATURATION_BOOST);
    quantize(r, g, b)
}

fn push_colored(line: &mut String, glyph: char, index: u8) {
    // Writing into a String cannot fail.
    let _ = SetForegroundColor(Color::AnsiValue(index)).write_ansi(line);
    line.push(glyph);
    let _ = ResetColor.write_ansi(line);
}

/// BT.601 luma, one byte per pixel.
pub fn luminance_plane(frame: &Frame) -> Vec<u8> {
    match frame {
        Frame::Gray(img) => img.as_raw().clone(),
        Frame::Color(img) => img
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect(),
    }
}

/// Linearly map the observed range of `plane` onto `[0, 255]`.
///
/// A flat plane has no range to stretch and becomes all zeros.
pub fn stretch_min_max(mut plane: Vec<u8>) -> Vec<u8> {
    let Some((&min, &max)) = plane.iter().min().zip(plane.iter().max()) else {
        return plane;
    };
    if min == max {
        plane.fill(0);
        return plane;
    }
    let scale = 255.0 / f32::from(max - min);
    for v in plane.iter_mut() {
        *v = (f32::from(*v - min) * scale).round().clamp(0.0, 255.0) as u8;
    }
    plane
}

/// Convenience function to convert a frame with explicit settings.
pub fn frame_to_ascii(frame: &Frame, width: u32, color: bool, enhance: bool) -> Result<AsciiFrame> {
    let config = RenderConfig {
        width,
        color,
        enhance,
        ..Default::default()
    };
    FrameConverter::new(&config).convert_frame(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ChannelOrder;
    use image::{Rgb, RgbImage};

    fn test_pattern(width: u32, height: u32) -> Frame {
        Frame::Color(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn test_aspect_ratio_calculation() {
        assert_eq!(target_height(1920, 1080, 120), 33);
        assert_eq!(target_height(1920, 1080, 1), 1);
        assert_eq!(target_height(1, 1, 1), 1);
        assert_eq!(target_height(100, 100, 80), 40);
        assert_eq!(target_height(0, 10, 10), 1);
    }

    #[test]
    fn test_output_dimensions() {
        let frame = test_pattern(64, 48);
        let ascii = frame_to_ascii(&frame, 10, false, true).unwrap();
        assert_eq!(ascii.width, 10);
        assert_eq!(ascii.height, 3);
        assert_eq!(ascii.lines.len(), 3);
        for line in ascii.lines() {
            assert_eq!(line.chars().count(), 10);
        }
    }

    #[test]
    fn test_width_one_never_collapses() {
        let frame = test_pattern(500, 20);
        let ascii = frame_to_ascii(&frame, 1, true, true).unwrap();
        assert_eq!(ascii.height, 1);
        assert_eq!(ascii.lines.len(), 1);
    }

    #[test]
    fn test_color_cells_are_wrapped() {
        let frame = test_pattern(40, 20);
        let ascii = frame_to_ascii(&frame, 8, true, false).unwrap();
        for line in ascii.lines() {
            assert_eq!(line.matches("\x1b[0m").count(), 8);
            assert!(line.starts_with("\x1b[38;5;"));
        }
    }

    #[test]
    fn test_colored_cell_format() {
        let mut line = String::new();
        push_colored(&mut line, '#', 196);
        assert_eq!(line, "\x1b[38;5;196m#\x1b[0m");
    }

    #[test]
    fn test_gray_cells_use_gray_palette() {
        let frame = Frame::Color(RgbImage::from_fn(20, 10, |x, _| {
            let v = 20 + x as u8 * 10;
            Rgb([v, v, v])
        }));
        let ascii = frame_to_ascii(&frame, 20, true, false).unwrap();
        for line in ascii.lines() {
            for code in line.split("\x1b[38;5;").skip(1) {
                let index: u8 = code.split('m').next().unwrap().parse().unwrap();
                assert!(index == 16 || index == 231 || index >= 232, "color cast: {index}");
            }
        }
    }

    #[test]
    fn test_flat_frame_renders_blank() {
        let frame = Frame::filled(30, 30, [200, 10, 10]);
        let ascii = frame_to_ascii(&frame, 6, false, false).unwrap();
        for line in ascii.lines() {
            assert_eq!(line, "      ");
        }
    }

    #[test]
    fn test_stretch_spans_full_range() {
        let frame = Frame::Color(RgbImage::from_fn(10, 2, |x, _| {
            let v = 100 + x as u8 * 4;
            Rgb([v, v, v])
        }));
        let ascii = frame_to_ascii(&frame, 10, false, false).unwrap();
        let first = ascii.lines[0].chars().next().unwrap();
        let last = ascii.lines[0].chars().last().unwrap();
        assert_eq!(first, ' ');
        assert_eq!(last, '@');
    }

    #[test]
    fn test_stretch_min_max() {
        assert_eq!(stretch_min_max(vec![10, 20, 30]), vec![0, 128, 255]);
        assert_eq!(stretch_min_max(vec![5, 5]), vec![0, 0]);
        assert!(stretch_min_max(Vec::new()).is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let frame = test_pattern(73, 41);
        let first = frame_to_ascii(&frame, 30, true, true).unwrap();
        let second = frame_to_ascii(&frame, 30, true, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_source_frame_unchanged() {
        let frame = test_pattern(32, 32);
        let copy = frame.clone();
        let _ = frame_to_ascii(&frame, 16, true, true).unwrap();
        assert_eq!(frame, copy);
    }

    #[test]
    fn test_grayscale_input() {
        let frame = Frame::from_gray(16, 8, (0..128).map(|v| v as u8 * 2).collect()).unwrap();
        let ascii = frame_to_ascii(&frame, 16, true, true).unwrap();
        assert_eq!(ascii.height, 4);
    }

    #[test]
    fn test_bgr_and_rgb_agree() {
        let rgb: Vec<u8> = (0..4 * 4 * 3).map(|v| (v * 5) as u8).collect();
        let bgr: Vec<u8> = rgb.chunks_exact(3).flat_map(|p| [p[2], p[1], p[0]]).collect();
        let a = Frame::from_packed(4, 4, rgb, ChannelOrder::Rgb).unwrap();
        let b = Frame::from_packed(4, 4, bgr, ChannelOrder::Bgr).unwrap();
        assert_eq!(
            frame_to_ascii(&a, 4, true, false).unwrap(),
            frame_to_ascii(&b, 4, true, false).unwrap()
        );
    }

    #[test]
    fn test_zero_area_frame_is_rejected() {
        let frame = Frame::filled(0, 0, [0, 0, 0]);
        assert!(matches!(
            frame_to_ascii(&frame, 10, false, false),
            Err(PlayerError::InvalidFrame(_))
        ));
    }
}
