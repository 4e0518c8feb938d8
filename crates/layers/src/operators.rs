//! Per-pixel recoloring operators.
//!
//! An operator is picked explicitly by the caller and configured with an
//! [`OperatorParameters`] map for each redraw. Parameters are resolved and
//! validated once per pass ([`PixelOperator::prepare`]); the resulting
//! [`PreparedOperator`] is immutable and safe to share across worker threads.
//!
//! Buffer-level operators (vertical gradient, grid snap) read neighbor or row
//! context from a read-only source and write into a distinct target, so the
//! result never depends on visiting order.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use foundation::math::{hcl_to_rgb, rgb_to_hcl, to_channel, wrap_hue};
use serde::{Deserialize, Serialize};

use crate::raster::{PixelBuffer, RasterError};
use crate::symbology::{
    DENSITY_FROM, DENSITY_LOW, DENSITY_TO, GRADIENT_TOP, OVERLAY_PALETTE, POSTER_LEVELS, Rgb,
    Rgba, SPLIT_BASE, SPLIT_PALETTE,
};
use crate::terrain::ElevationBands;

pub const THRESHOLD: &str = "threshold";
pub const HUE: &str = "hue";
pub const CHROMA: &str = "chroma";
pub const SHOW_RED: &str = "showRed";
pub const SHOW_GREEN: &str = "showGreen";
pub const SHOW_BLUE: &str = "showBlue";
pub const STEP: &str = "step";
pub const BAND_HEIGHT: &str = "bandHeight";

const DEFAULT_SPLIT_THRESHOLD: f64 = 200.0;
const DEFAULT_DENSITY_THRESHOLD: f64 = 0.1;
const DEFAULT_GRID_STEP: f64 = 4.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Scalar(f64),
}

/// Named scalar/boolean values for one redraw.
///
/// Deserializes from a flat JSON object such as
/// `{"threshold": 200, "showRed": true}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorParameters {
    values: BTreeMap<String, ParamValue>,
}

impl OperatorParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set_scalar(name, value);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set_flag(name, value);
        self
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), ParamValue::Scalar(value));
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.values.insert(name.into(), ParamValue::Flag(value));
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    /// Flags read as 0/1 so a toggle can drive a numeric parameter.
    pub fn scalar_or(&self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            Some(ParamValue::Scalar(v)) => v,
            Some(ParamValue::Flag(b)) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            None => default,
        }
    }

    pub fn flag_or(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(ParamValue::Flag(b)) => b,
            Some(ParamValue::Scalar(v)) => v != 0.0,
            None => default,
        }
    }

    fn channel_flags(&self) -> [bool; 3] {
        [
            self.flag_or(SHOW_RED, true),
            self.flag_or(SHOW_GREEN, true),
            self.flag_or(SHOW_BLUE, true),
        ]
    }
}

/// How the threshold split fills the alpha channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitAlpha {
    /// Alpha stays at the base value.
    Fixed,
    /// Alpha accumulates the value of every channel that passed, so pixels
    /// with no passing channel stay transparent.
    FromChannels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSplit {
    pub base: Rgba,
    pub palette: [Rgb; 3],
    pub alpha: SplitAlpha,
}

impl Default for ThresholdSplit {
    fn default() -> Self {
        Self {
            base: SPLIT_BASE,
            palette: SPLIT_PALETTE,
            alpha: SplitAlpha::Fixed,
        }
    }
}

impl ThresholdSplit {
    /// Transparent overlay variant drawn over a base map.
    pub fn overlay() -> Self {
        Self {
            base: [0, 0, 0, 0],
            palette: OVERLAY_PALETTE,
            alpha: SplitAlpha::FromChannels,
        }
    }

    fn apply(&self, p: Rgba, threshold: f64, flags: [bool; 3]) -> Rgba {
        let mut acc = self.base.map(u16::from);
        for channel in 0..3 {
            if flags[channel] && p[channel] as f64 > threshold {
                let color = self.palette[channel];
                acc[0] += color[0] as u16;
                acc[1] += color[1] as u16;
                acc[2] += color[2] as u16;
                if self.alpha == SplitAlpha::FromChannels {
                    acc[3] += p[channel] as u16;
                }
            }
        }
        acc.map(|v| v.min(255) as u8)
    }
}

/// Grayscale density ramp for single-band population rasters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DensityRamp {
    /// Emitted for values under the threshold.
    pub low: Rgba,
    pub from: Rgb,
    pub to: Rgb,
}

impl Default for DensityRamp {
    fn default() -> Self {
        Self {
            low: DENSITY_LOW,
            from: DENSITY_FROM,
            to: DENSITY_TO,
        }
    }
}

impl DensityRamp {
    fn apply(&self, p: Rgba, threshold: f64) -> Rgba {
        let v = (p[0] as f64 / 255.0 - threshold) / (1.0 - threshold);
        if v < 0.0 {
            return self.low;
        }
        let ramp = |c: usize, t: f64| {
            let a = self.from[c] as f64;
            let b = self.to[c] as f64;
            to_channel(a + (b - a) * t)
        };
        // The red channel is damped by the threshold as well.
        [ramp(0, v * threshold), ramp(1, v), ramp(2, v), p[3]]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PixelOperator {
    /// Zeroes each color channel whose `show*` flag is off.
    ChannelGate,
    /// Replicates the red (or, with `showRed` off, the blue) channel into
    /// all four channels.
    ChannelGray,
    ThresholdSplit(ThresholdSplit),
    /// Rotates hue by `hue` degrees and scales chroma by `chroma` percent.
    HueChromaRotate,
    /// Blends from `top` on the first row towards the source on the last.
    VerticalGradientBlend { top: Rgb },
    Posterize,
    /// Blocky downsample: every pixel takes its `step`-sized block origin,
    /// then posterizes.
    PixelGridSnap,
    ElevationBand(ElevationBands),
    DensityRamp(DensityRamp),
    /// Composes the red channel of source `i` into output channel `i`.
    BandStack,
}

impl PixelOperator {
    pub fn vertical_gradient() -> Self {
        PixelOperator::VerticalGradientBlend { top: GRADIENT_TOP }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelOperator::ChannelGate => "channel_gate",
            PixelOperator::ChannelGray => "channel_gray",
            PixelOperator::ThresholdSplit(_) => "threshold_split",
            PixelOperator::HueChromaRotate => "hue_chroma_rotate",
            PixelOperator::VerticalGradientBlend { .. } => "vertical_gradient_blend",
            PixelOperator::Posterize => "posterize",
            PixelOperator::PixelGridSnap => "pixel_grid_snap",
            PixelOperator::ElevationBand(_) => "elevation_band",
            PixelOperator::DensityRamp(_) => "density_ramp",
            PixelOperator::BandStack => "band_stack",
        }
    }

    /// Needs row or neighbor context rather than a single pixel.
    pub fn is_buffer_level(&self) -> bool {
        matches!(
            self,
            PixelOperator::VerticalGradientBlend { .. } | PixelOperator::PixelGridSnap
        )
    }

    /// Resolves this redraw's parameters.
    pub fn prepare(
        &self,
        params: &OperatorParameters,
    ) -> Result<PreparedOperator<'_>, RasterError> {
        let prepared = match self {
            PixelOperator::ChannelGate => PreparedOperator::Gate {
                flags: params.channel_flags(),
            },
            PixelOperator::ChannelGray => PreparedOperator::Gray {
                red: params.flag_or(SHOW_RED, true),
            },
            PixelOperator::ThresholdSplit(split) => PreparedOperator::Split {
                split,
                threshold: params.scalar_or(THRESHOLD, DEFAULT_SPLIT_THRESHOLD),
                flags: params.channel_flags(),
            },
            PixelOperator::HueChromaRotate => PreparedOperator::Rotate {
                hue_rad: PI * params.scalar_or(HUE, 0.0) / 180.0,
                chroma_scale: params.scalar_or(CHROMA, 100.0) / 100.0,
            },
            PixelOperator::VerticalGradientBlend { top } => {
                PreparedOperator::Gradient { top: *top }
            }
            PixelOperator::Posterize => PreparedOperator::Posterize,
            PixelOperator::PixelGridSnap => {
                let raw = params.scalar_or(STEP, DEFAULT_GRID_STEP);
                let step = if raw >= 1.0 {
                    raw.min(u32::MAX as f64) as u32
                } else {
                    1
                };
                PreparedOperator::GridSnap { step }
            }
            PixelOperator::ElevationBand(bands) => {
                let band_height_m = match params.get(BAND_HEIGHT) {
                    Some(_) => params.scalar_or(BAND_HEIGHT, 0.0).floor() as i64,
                    None => bands.band_height_m,
                };
                bands.validate_with(band_height_m)?;
                PreparedOperator::Elevation {
                    bands,
                    band_height_m,
                }
            }
            PixelOperator::DensityRamp(ramp) => {
                let raw = params.scalar_or(THRESHOLD, DEFAULT_DENSITY_THRESHOLD);
                // An unset slider reads as 0 and means "use the default".
                let raw = if raw == 0.0 || raw.is_nan() {
                    DEFAULT_DENSITY_THRESHOLD
                } else {
                    raw
                };
                PreparedOperator::Density {
                    ramp,
                    threshold: raw.clamp(0.0, 0.999),
                }
            }
            PixelOperator::BandStack => PreparedOperator::Stack,
        };
        Ok(prepared)
    }
}

/// An operator bound to one redraw's parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedOperator<'a> {
    Gate {
        flags: [bool; 3],
    },
    Gray {
        red: bool,
    },
    Split {
        split: &'a ThresholdSplit,
        threshold: f64,
        flags: [bool; 3],
    },
    Rotate {
        hue_rad: f64,
        chroma_scale: f64,
    },
    Gradient {
        top: Rgb,
    },
    Posterize,
    GridSnap {
        step: u32,
    },
    Elevation {
        bands: &'a ElevationBands,
        band_height_m: i64,
    },
    Density {
        ramp: &'a DensityRamp,
        threshold: f64,
    },
    Stack,
}

impl PreparedOperator<'_> {
    /// Output for one pixel given the co-located pixel of every source.
    ///
    /// Returns `None` for buffer-level operators, which need coordinates.
    pub fn apply_pixel(&self, inputs: &[Rgba]) -> Option<Rgba> {
        let p = inputs.first().copied().unwrap_or_default();
        let out = match self {
            PreparedOperator::Gate { flags } => [
                if flags[0] { p[0] } else { 0 },
                if flags[1] { p[1] } else { 0 },
                if flags[2] { p[2] } else { 0 },
                255,
            ],
            PreparedOperator::Gray { red } => {
                let c = if *red { p[0] } else { p[2] };
                [c, c, c, c]
            }
            PreparedOperator::Split {
                split,
                threshold,
                flags,
            } => split.apply(p, *threshold, *flags),
            PreparedOperator::Rotate {
                hue_rad,
                chroma_scale,
            } => rotate(p, *hue_rad, *chroma_scale),
            PreparedOperator::Posterize => posterize(p),
            PreparedOperator::Elevation {
                bands,
                band_height_m,
            } => {
                let [r, g, b] = bands.classify_with(p, *band_height_m);
                [r, g, b, 255]
            }
            PreparedOperator::Density { ramp, threshold } => ramp.apply(p, *threshold),
            PreparedOperator::Stack => {
                let red = |i: usize| inputs.get(i).map(|s| s[0]).unwrap_or(0);
                [red(0), red(1), red(2), 255]
            }
            PreparedOperator::Gradient { .. } | PreparedOperator::GridSnap { .. } => return None,
        };
        Some(out)
    }

    /// Fills output row `y` from the read-only `sources`.
    ///
    /// `row` is `width * 4` bytes; every source must share the output size.
    pub fn apply_row(&self, sources: &[PixelBuffer], y: u32, row: &mut [u8]) {
        let Some(first) = sources.first() else {
            return;
        };
        let height = first.height();
        let mut inputs: Vec<Rgba> = Vec::with_capacity(sources.len());
        for (x, out) in row.chunks_exact_mut(4).enumerate() {
            let x = x as u32;
            let px = match self {
                PreparedOperator::Gradient { top } => {
                    let t = y as f64 / height as f64;
                    let src = first.pixel(x, y);
                    [
                        lerp_channel(top[0], src[0], t),
                        lerp_channel(top[1], src[1], t),
                        lerp_channel(top[2], src[2], t),
                        255,
                    ]
                }
                PreparedOperator::GridSnap { step } => {
                    let origin = first.pixel(x - x % step, y - y % step);
                    posterize(origin)
                }
                _ => {
                    inputs.clear();
                    inputs.extend(sources.iter().map(|s| s.pixel(x, y)));
                    self.apply_pixel(&inputs).unwrap_or_default()
                }
            };
            out.copy_from_slice(&px);
        }
    }
}

fn rotate(p: Rgba, hue_rad: f64, chroma_scale: f64) -> Rgba {
    let [h, c, l] = rgb_to_hcl([p[0] as f64, p[1] as f64, p[2] as f64]);
    let rgb = hcl_to_rgb([wrap_hue(h + hue_rad), c * chroma_scale, l]);
    [
        to_channel(rgb[0]),
        to_channel(rgb[1]),
        to_channel(rgb[2]),
        p[3],
    ]
}

/// Snaps one channel onto the three posterize levels.
pub fn posterize_channel(v: u8) -> u8 {
    if v <= 120 {
        POSTER_LEVELS[0]
    } else if v >= 235 {
        POSTER_LEVELS[2]
    } else {
        POSTER_LEVELS[1]
    }
}

fn posterize(p: Rgba) -> Rgba {
    [
        posterize_channel(p[0]),
        posterize_channel(p[1]),
        posterize_channel(p[2]),
        255,
    ]
}

/// `a + (b - a) * t`, clamped into a display byte.
pub fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    let a = a as f64;
    to_channel(a + (b as f64 - a) * t)
}
