//! Luminance to character mapping.

use serde::{Deserialize, Serialize};

/// Default ramp, lowest to highest ink density. The doubled space keeps the
/// darkest tenth of the range blank.
pub const CLASSIC_RAMP: &[char] = &[' ', ' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Extended ASCII ramp with more granular detail
pub const EXTENDED_RAMP: &[char] = &[
    ' ', '`', '.', '\'', '^', '"', ',', ':', ';', 'I', 'l', '!', 'i', '>', '<',
    '~', '+', '_', '-', '?', ']', '[', '}', '{', '1', ')', '(', '|', '\\', '/',
    't', 'f', 'j', 'r', 'x', 'n', 'u', 'v', 'c', 'z', 'X', 'Y', 'U', 'J', 'C',
    'L', 'Q', '0', 'O', 'Z', 'm', 'w', 'q', 'p', 'd', 'b', 'k', 'h', 'a', 'o',
    '*', '#', 'M', 'W', '&', '8', '%', 'B', '@',
];

/// Block character ramp for a more solid appearance
pub const BLOCK_RAMP: &[char] = &[' ', '░', '▒', '▓', '█'];

/// Selectable glyph ramp. Every variant refers to a fixed constant.
#[derive(clap::ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GlyphRamp {
    /// `  .:-=+*#%@`
    #[default]
    Classic,
    /// 70-step ASCII ramp
    Extended,
    /// Shade blocks
    Blocks,
}

impl GlyphRamp {
    /// Characters of this ramp, darkest first.
    pub fn chars(self) -> &'static [char] {
        match self {
            GlyphRamp::Classic => CLASSIC_RAMP,
            GlyphRamp::Extended => EXTENDED_RAMP,
            GlyphRamp::Blocks => BLOCK_RAMP,
        }
    }

    /// Map a normalized luminance onto this ramp.
    pub fn map(self, normalized: f32) -> char {
        map_luminance_in(self.chars(), normalized)
    }
}

/// Map a normalized luminance in `[0, 1]` onto the classic ramp.
pub fn map_luminance(normalized: f32) -> char {
    map_luminance_in(CLASSIC_RAMP, normalized)
}

/// `ramp[floor(normalized * (len - 1))]`, clamped into the ramp.
///
/// NaN and negative inputs select the first character.
pub fn map_luminance_in(ramp: &[char], normalized: f32) -> char {
    debug_assert!(ramp.len() >= 2, "glyph ramp needs at least two characters");
    let last = ramp.len() - 1;
    // `as usize` saturates: NaN and negatives become 0.
    let index = (normalized * last as f32).floor() as usize;
    ramp[index.min(last)]
}
