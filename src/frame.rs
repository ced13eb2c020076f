use crate::{PlayerError, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Channel order of packed three-channel pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A decoded video frame. Color frames are always stored as RGB.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Frame {
    /// Build a grayscale frame from one byte per pixel, row-major.
    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(PlayerError::InvalidFrame(format!(
                "expected {} bytes for a {}x{} grayscale frame, got {}",
                expected, width, height, data.len()
            )));
        }
        GrayImage::from_raw(width, height, data)
            .map(Frame::Gray)
            .ok_or_else(|| PlayerError::InvalidFrame("grayscale buffer rejected".to_string()))
    }

    /// Build a color frame from packed three-byte pixels in `order`.
    pub fn from_packed(
        width: u32,
        height: u32,
        mut data: Vec<u8>,
        order: ChannelOrder,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(PlayerError::InvalidFrame(format!(
                "expected {} bytes for a {}x{} color frame, got {}",
                expected, width, height, data.len()
            )));
        }
        if order == ChannelOrder::Bgr {
            for pixel in data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }
        RgbImage::from_raw(width, height, data)
            .map(Frame::Color)
            .ok_or_else(|| PlayerError::InvalidFrame("color buffer rejected".to_string()))
    }

    /// A frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Frame::Color(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    /// A grayscale frame where every pixel has the same intensity.
    pub fn filled_gray(width: u32, height: u32, value: u8) -> Self {
        Frame::Gray(GrayImage::from_pixel(width, height, Luma([value])))
    }

    pub fn width(&self) -> u32 {
        match self {
            Frame::Gray(img) => img.width(),
            Frame::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Frame::Gray(img) => img.height(),
            Frame::Color(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// True when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn is_color(&self) -> bool {
        matches!(self, Frame::Color(_))
    }

    /// Raw channel bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Gray(img) => img.as_raw(),
            Frame::Color(img) => img.as_raw(),
        }
    }

    /// RGB value of a pixel; gray pixels are replicated across channels.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        match self {
            Frame::Gray(img) => {
                let v = img.get_pixel(x, y).0[0];
                [v, v, v]
            }
            Frame::Color(img) => img.get_pixel(x, y).0,
        }
    }

    /// Resize with a triangle (bilinear) filter.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        match self {
            Frame::Gray(img) => {
                Frame::Gray(imageops::resize(img, width, height, FilterType::Triangle))
            }
            Frame::Color(img) => {
                Frame::Color(imageops::resize(img, width, height, FilterType::Triangle))
            }
        }
    }

    /// Apply `f` to every channel byte, producing a new frame of the same kind.
    pub fn map_channels(&self, f: impl Fn(u8) -> u8) -> Frame {
        match self {
            Frame::Gray(img) => {
                let mut out = img.clone();
                out.iter_mut().for_each(|c| *c = f(*c));
                Frame::Gray(out)
            }
            Frame::Color(img) => {
                let mut out = img.clone();
                out.iter_mut().for_each(|c| *c = f(*c));
                Frame::Color(out)
            }
        }
    }
}
