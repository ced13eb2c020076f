//! Quantization of RGB colors onto the 256-color terminal palette.
//!
//! The palette is laid out as 16 base colors, a 6×6×6 RGB cube starting at
//! index 16 and a 24-step grayscale ramp starting at index 232. Only the cube
//! and the grayscale ramp are ever produced here.

/// Index into the 256-color terminal palette.
pub type PaletteIndex = u8;

/// First index of the 6×6×6 color cube (pure black).
pub const CUBE_START: PaletteIndex = 16;

/// Last index of the color cube (pure white).
pub const CUBE_END: PaletteIndex = 231;

/// First index of the grayscale ramp.
pub const GRAY_START: PaletteIndex = 232;

/// Map an RGB triple to the nearest palette index.
///
/// Achromatic inputs (`r == g == b`) always land on the grayscale ramp or on
/// the black/white corners of the cube, so neutral tones never pick up a
/// color cast. Everything else goes through the cube.
///
/// Rounding is half-up and computed in exact integer arithmetic. Integer
/// channel values never produce an exact tie in either formula, so the
/// result agrees with any consistent tie-break rule.
pub const fn quantize(r: u8, g: u8, b: u8) -> PaletteIndex {
    if r == g && g == b {
        return quantize_gray(r);
    }
    CUBE_START + 36 * cube_level(r) + 6 * cube_level(g) + cube_level(b)
}

/// `round(v / 255 * 5)`
const fn cube_level(v: u8) -> u8 {
    ((10 * v as u16 + 255) / 510) as u8
}

/// Grayscale ramp lookup: `round((v - 8) / 247 * 24) + 232` inside `[8, 248]`.
const fn quantize_gray(v: u8) -> PaletteIndex {
    if v < 8 {
        CUBE_START
    } else if v > 248 {
        CUBE_END
    } else {
        let step = (48 * (v as u16 - 8) + 247) / 494;
        GRAY_START + step as u8
    }
}
