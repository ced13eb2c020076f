//! Contrast enhancement applied before downsampling.
//!
//! Two stages: contrast-limited adaptive histogram equalization (CLAHE) on
//! the lightness channel, then a global brightness/contrast curve. Neither
//! stage touches its input; both return a fresh [`Frame`].

use crate::color::{lab_to_rgb, rgb_to_lab, srgb_to_linear_table};
use crate::frame::Frame;
use image::{GrayImage, RgbImage};
use log::debug;

/// Histogram clip limit used by the renderer.
pub const DEFAULT_CLIP_LIMIT: f32 = 2.5;

/// Tiles per axis used by the renderer.
pub const DEFAULT_TILE_GRID: u32 = 8;

pub const DEFAULT_BRIGHTNESS: f32 = 15.0;

pub const DEFAULT_CONTRAST: f32 = 35.0;

const BINS: usize = 256;

/// Enhance a frame at the renderer's default operating point.
pub fn enhance(frame: &Frame) -> Frame {
    let equalized = equalize(frame, DEFAULT_CLIP_LIMIT, DEFAULT_TILE_GRID);
    adjust_brightness_contrast(&equalized, DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST)
}

/// CLAHE on lightness. Color frames keep their a*/b* chroma untouched.
pub fn equalize(frame: &Frame, clip_limit: f32, tile_grid: u32) -> Frame {
    match frame {
        Frame::Gray(plane) => Frame::Gray(equalize_plane(plane, clip_limit, tile_grid)),
        Frame::Color(img) => Frame::Color(equalize_color(img, clip_limit, tile_grid)),
    }
}

fn equalize_color(img: &RgbImage, clip_limit: f32, tile_grid: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    let linear = srgb_to_linear_table();

    let mut lightness = GrayImage::new(width, height);
    let mut chroma = Vec::with_capacity(width as usize * height as usize);
    for (pixel, l_out) in img.pixels().zip(lightness.iter_mut()) {
        let [r, g, b] = pixel.0;
        let (l, a, bb) = rgb_to_lab(&linear, r, g, b);
        *l_out = (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8;
        chroma.push((a, bb));
    }

    let equalized = equalize_plane(&lightness, clip_limit, tile_grid);

    let mut out = RgbImage::new(width, height);
    for ((pixel, &l), &(a, b)) in out.pixels_mut().zip(equalized.iter()).zip(chroma.iter()) {
        let (r, g, bl) = lab_to_rgb(f32::from(l) * 100.0 / 255.0, a, b);
        pixel.0 = [r, g, bl];
    }
    out
}

/// Per-tile lookup tables for one plane.
struct TileLuts {
    grid_x: u32,
    grid_y: u32,
    tile_w: f32,
    tile_h: f32,
    luts: Vec<[u8; BINS]>,
}

impl TileLuts {
    /// Tiles all share one size; the plane is padded by mirroring its last
    /// rows and columns when the grid does not divide it evenly.
    fn build(plane: &GrayImage, clip_limit: f32, tile_grid: u32) -> Self {
        let (width, height) = plane.dimensions();
        let grid_x = tile_grid.clamp(1, width.max(1));
        let grid_y = tile_grid.clamp(1, height.max(1));
        let tile_w = width.div_ceil(grid_x);
        let tile_h = height.div_ceil(grid_y);
        let area = tile_w * tile_h;

        let mut luts = Vec::with_capacity((grid_x * grid_y) as usize);
        for ty in 0..grid_y {
            for tx in 0..grid_x {
                let mut hist = [0u32; BINS];
                for y in ty * tile_h..(ty + 1) * tile_h {
                    let sy = reflect(y, height);
                    for x in tx * tile_w..(tx + 1) * tile_w {
                        hist[plane.get_pixel(reflect(x, width), sy).0[0] as usize] += 1;
                    }
                }
                luts.push(tile_lut(&mut hist, area, clip_limit));
            }
        }

        Self {
            grid_x,
            grid_y,
            tile_w: tile_w as f32,
            tile_h: tile_h as f32,
            luts,
        }
    }

    fn lut(&self, tx: u32, ty: u32) -> &[u8; BINS] {
        &self.luts[(ty * self.grid_x + tx) as usize]
    }
}

/// Clip `hist`, redistribute the excess and turn it into an equalization LUT.
fn tile_lut(hist: &mut [u32; BINS], area: u32, clip_limit: f32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        let mut clipped = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                clipped += *bin - limit;
                *bin = limit;
            }
        }

        let batch = clipped / BINS as u32;
        let mut residual = clipped - batch * BINS as u32;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (BINS as u32 / residual).max(1) as usize;
            let mut i = 0;
            while i < BINS && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut sum = 0u32;
    for (bin, v) in hist.iter().zip(lut.iter_mut()) {
        sum += bin;
        *v = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// CLAHE on a single 8-bit plane.
///
/// The plane is split into a `tile_grid × tile_grid` grid (fewer tiles when
/// the plane is smaller than the grid). Each output pixel blends the LUTs of
/// the four nearest tile centers.
pub fn equalize_plane(plane: &GrayImage, clip_limit: f32, tile_grid: u32) -> GrayImage {
    let (width, height) = plane.dimensions();
    if width == 0 || height == 0 {
        return plane.clone();
    }

    let tiles = TileLuts::build(plane, clip_limit, tile_grid);
    debug!(
        "CLAHE {}x{} with {}x{} tiles, clip {}",
        width, height, tiles.grid_x, tiles.grid_y, clip_limit
    );

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, fy) = neighbours(y, tiles.tile_h, tiles.grid_y);
        for x in 0..width {
            let (tx0, tx1, fx) = neighbours(x, tiles.tile_w, tiles.grid_x);
            let v = plane.get_pixel(x, y).0[0] as usize;

            let top = f32::from(tiles.lut(tx0, ty0)[v]) * (1.0 - fx)
                + f32::from(tiles.lut(tx1, ty0)[v]) * fx;
            let bottom = f32::from(tiles.lut(tx0, ty1)[v]) * (1.0 - fx)
                + f32::from(tiles.lut(tx1, ty1)[v]) * fx;
            let blended = top * (1.0 - fy) + bottom * fy;

            out.get_pixel_mut(x, y).0[0] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Mirror `pos` back into `0..len` without repeating the edge pixel.
fn reflect(pos: u32, len: u32) -> u32 {
    if pos < len {
        pos
    } else {
        (2 * (len - 1)).saturating_sub(pos)
    }
}

/// Indices of the two tiles whose centers bracket `pos`, and the weight of
/// the second one. Positions outside the outermost centers clamp to them.
fn neighbours(pos: u32, tile_size: f32, grid: u32) -> (u32, u32, f32) {
    let t = (pos as f32 + 0.5) / tile_size - 0.5;
    let lower = t.floor();
    let frac = t - lower;
    let last = grid as i64 - 1;

    let i0 = (lower as i64).clamp(0, last) as u32;
    let i1 = (lower as i64 + 1).clamp(0, last) as u32;
    (i0, i1, frac)
}

/// `clip(in * (contrast/127 + 1) - contrast + brightness, 0, 255)` on every
/// channel, truncated to 8 bits.
pub fn adjust_brightness_contrast(frame: &Frame, brightness: f32, contrast: f32) -> Frame {
    let gain = contrast / 127.0 + 1.0;
    frame.map_channels(|c| (f32::from(c) * gain - contrast + brightness).clamp(0.0, 255.0) as u8)
}
