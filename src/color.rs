//! Per-pixel color transforms: HSV round-trip, saturation boost and
//! CIE L*a*b* conversion.
//!
//! All functions are free functions over plain value types.

/// Saturation multiplier applied to every colored cell.
pub const SATURATION_BOOST: f32 = 1.3;

/// Convert RGB [0,255] to HSV. H ∈ [0.0, 1.0), S ∈ [0.0, 1.0], V ∈ [0.0, 1.0].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max };
    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        (((g - b) / delta) % 6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let h = if h < 0.0 { h + 1.0 } else { h };

    (h, s, v)
}

/// Convert HSV back to RGB [0,255], rounding to the nearest channel value.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h * 6.0;
    let i = h.floor() as u32;
    let f = h - i as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    (to_channel(r), to_channel(g), to_channel(b))
}

fn to_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Multiply the saturation of a color by `factor`, keeping hue and value.
///
/// Saturation is clamped to `[0, 1]`. Achromatic colors have zero
/// saturation and come back unchanged.
pub fn boost_saturation(r: u8, g: u8, b: u8, factor: f32) -> (u8, u8, u8) {
    let (h, s, v) = rgb_to_hsv(r, g, b);
    let s = (s * factor).clamp(0.0, 1.0);
    hsv_to_rgb(h, s, v)
}

// D65 reference white.
const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;

const LAB_EPSILON: f32 = 0.008_856;
const LAB_KAPPA: f32 = 7.787;

/// sRGB transfer curve, one entry per 8-bit channel value.
pub fn srgb_to_linear_table() -> [f32; 256] {
    let mut table = [0.0f32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = srgb_to_linear(i as f32 / 255.0);
    }
    table
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    let cubed = t * t * t;
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (t - 16.0 / 116.0) / LAB_KAPPA
    }
}

/// Convert RGB to CIE L*a*b* with L ∈ [0, 100].
///
/// `linear` is the table from [`srgb_to_linear_table`]; callers converting a
/// whole frame build it once.
pub fn rgb_to_lab(linear: &[f32; 256], r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = linear[r as usize];
    let g = linear[g as usize];
    let b = linear[b as usize];

    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = if y > LAB_EPSILON {
        116.0 * fy - 16.0
    } else {
        903.3 * y
    };
    (l, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert CIE L*a*b* back to RGB, clamping out-of-gamut results.
pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> (u8, u8, u8) {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    // L* = 8 is where the cube-root and linear branches of `lab_f` meet.
    let y = if l > 8.0 {
        fy * fy * fy
    } else {
        l / 903.3
    };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    (
        to_channel(linear_to_srgb(r.clamp(0.0, 1.0))),
        to_channel(linear_to_srgb(g.clamp(0.0, 1.0))),
        to_channel(linear_to_srgb(b.clamp(0.0, 1.0))),
    )
}
