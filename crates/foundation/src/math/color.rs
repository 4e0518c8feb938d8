//! CIE color-space conversions used by the raster recoloring operators.
//!
//! sRGB (0-255) <-> CIE-XYZ (D65) <-> CIE-Lab <-> HCL, where HCL is the polar
//! form of Lab: hue in radians `[0, 2π)`, chroma, luminance.
//!
//! All functions are pure and total over finite input. NaN is not special
//! cased and propagates through the arithmetic.

use core::f64::consts::TAU;

/// D65 reference white.
pub const XN: f64 = 0.95047;
pub const YN: f64 = 1.0;
pub const ZN: f64 = 1.08883;

/// Lab piecewise breakpoints.
pub const T0: f64 = 4.0 / 29.0;
pub const T1: f64 = 6.0 / 29.0;
pub const T2: f64 = 3.0 * T1 * T1;
pub const T3: f64 = T1 * T1 * T1;

/// Inverse sRGB companding of one 0-255 channel into linear light.
pub fn rgb_to_xyz_component(c: f64) -> f64 {
    let c = c / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Forward sRGB companding of linear light, scaled back to 0-255.
///
/// Not clamped: out-of-gamut input yields values outside `[0, 255]`.
pub fn xyz_to_rgb_component(x: f64) -> f64 {
    255.0
        * if x <= 0.0031308 {
            12.92 * x
        } else {
            1.055 * x.powf(1.0 / 2.4) - 0.055
        }
}

pub fn xyz_to_lab_component(t: f64) -> f64 {
    if t > T3 { t.cbrt() } else { t / T2 + T0 }
}

pub fn lab_to_xyz_component(t: f64) -> f64 {
    if t > T1 { t * t * t } else { T2 * (t - T0) }
}

/// Converts `[r, g, b]` (0-255) into `[h, c, l]`.
pub fn rgb_to_hcl(pixel: [f64; 3]) -> [f64; 3] {
    let r = rgb_to_xyz_component(pixel[0]);
    let g = rgb_to_xyz_component(pixel[1]);
    let b = rgb_to_xyz_component(pixel[2]);

    let x = xyz_to_lab_component((0.4124564 * r + 0.3575761 * g + 0.1804375 * b) / XN);
    let y = xyz_to_lab_component((0.2126729 * r + 0.7151522 * g + 0.072175 * b) / YN);
    let z = xyz_to_lab_component((0.0193339 * r + 0.119192 * g + 0.9503041 * b) / ZN);

    let l = 116.0 * y - 16.0;
    let a = 500.0 * (x - y);
    let b = 200.0 * (y - z);

    let c = (a * a + b * b).sqrt();
    let mut h = b.atan2(a);
    if h < 0.0 {
        h += TAU;
    }
    [h, c, l]
}

/// Converts `[h, c, l]` back into `[r, g, b]` as unclamped floats.
pub fn hcl_to_rgb(pixel: [f64; 3]) -> [f64; 3] {
    let [h, c, l] = pixel;
    let a = h.cos() * c;
    let b = h.sin() * c;

    let y = (l + 16.0) / 116.0;
    // Infinite chroma (or NaN hue) collapses to the achromatic axis.
    let x = if a.is_finite() { y + a / 500.0 } else { y };
    let z = if b.is_finite() { y - b / 200.0 } else { y };

    let y = YN * lab_to_xyz_component(y);
    let x = XN * lab_to_xyz_component(x);
    let z = ZN * lab_to_xyz_component(z);

    [
        xyz_to_rgb_component(3.2404542 * x - 1.5371385 * y - 0.4985314 * z),
        xyz_to_rgb_component(-0.969266 * x + 1.8760108 * y + 0.041556 * z),
        xyz_to_rgb_component(0.0556434 * x - 0.2040259 * y + 1.0572252 * z),
    ]
}

/// Rounds a float channel into a display byte. NaN maps to 0.
#[inline]
pub fn to_channel(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Wraps an angle in radians into `[0, 2π)`.
#[inline]
pub fn wrap_hue(h: f64) -> f64 {
    let w = h.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if w >= TAU { 0.0 } else { w }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(rgb: [u8; 3]) -> [u8; 3] {
        let hcl = rgb_to_hcl([rgb[0] as f64, rgb[1] as f64, rgb[2] as f64]);
        let back = hcl_to_rgb(hcl);
        [to_channel(back[0]), to_channel(back[1]), to_channel(back[2])]
    }

    #[test]
    fn gamma_components_invert() {
        for c in [0.0, 1.0, 10.0, 11.0, 64.0, 128.0, 200.0, 255.0] {
            let linear = rgb_to_xyz_component(c);
            assert!((xyz_to_rgb_component(linear) - c).abs() < 1e-9, "{c}");
        }
    }

    #[test]
    fn lab_components_invert() {
        for t in [0.0, 0.001, T3, 0.01, 0.2, 0.5, 1.0] {
            let lab = xyz_to_lab_component(t);
            assert!((lab_to_xyz_component(lab) - t).abs() < 1e-12, "{t}");
        }
    }

    #[test]
    fn black_and_white_are_achromatic() {
        let black = rgb_to_hcl([0.0, 0.0, 0.0]);
        assert!(black[1].abs() < 1e-9);
        assert!(black[2].abs() < 1e-9);

        let white = rgb_to_hcl([255.0, 255.0, 255.0]);
        assert!(white[1] < 0.01, "chroma {}", white[1]);
        assert!((white[2] - 100.0).abs() < 0.01, "luminance {}", white[2]);
    }

    #[test]
    fn hue_is_normalized() {
        for rgb in [[255.0, 0.0, 0.0], [0.0, 255.0, 0.0], [0.0, 0.0, 255.0], [40.0, 200.0, 90.0]] {
            let [h, _, _] = rgb_to_hcl(rgb);
            assert!((0.0..TAU).contains(&h), "{rgb:?} -> {h}");
        }
    }

    #[test]
    fn round_trip_within_one_unit() {
        let mut levels: Vec<u8> = (0..=255u8).step_by(15).collect();
        levels.extend([1, 2, 127, 128, 254]);
        for &r in &levels {
            for &g in &levels {
                for &b in &levels {
                    let back = round_trip([r, g, b]);
                    for (i, (&orig, &got)) in [r, g, b].iter().zip(back.iter()).enumerate() {
                        let diff = (orig as i16 - got as i16).abs();
                        assert!(diff <= 1, "[{r},{g},{b}] channel {i} -> {back:?}");
                    }
                }
            }
        }
        assert_eq!(round_trip([0, 0, 0]), [0, 0, 0]);
        assert_eq!(round_trip([255, 255, 255]), [255, 255, 255]);
    }

    #[test]
    fn infinite_chroma_falls_back_to_lightness() {
        let rgb = hcl_to_rgb([0.0, f64::INFINITY, 50.0]);
        let gray = hcl_to_rgb([0.0, 0.0, 50.0]);
        for i in 0..3 {
            assert!((rgb[i] - gray[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn nan_propagates() {
        let hcl = rgb_to_hcl([f64::NAN, 0.0, 0.0]);
        assert!(hcl[2].is_nan());
        assert_eq!(to_channel(f64::NAN), 0);
    }

    #[test]
    fn wrap_hue_stays_in_range() {
        assert_eq!(wrap_hue(0.0), 0.0);
        assert!((wrap_hue(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_hue(-1.0) - (TAU - 1.0)).abs() < 1e-12);
        assert!(wrap_hue(-1e-18) < TAU);
    }
}
