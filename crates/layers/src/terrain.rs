//! Terrain-RGB elevation tiles: decoding and elevation banding.
//!
//! A tile pixel packs `height + offset` across its R, G and B bytes
//! (R most significant). Alpha 0 marks no-data.

use foundation::InvalidInput;
use serde::{Deserialize, Serialize};

use crate::symbology::{RAINBOW_BANDS, Rgb, Rgba, SEA_COLOR};

/// Encoding offset used by the terrain tile server.
pub const TERRAIN_RGB_OFFSET: i64 = 100_000;

/// The terrain page's band slider moves in steps of this many meters.
pub const BAND_STEP_M: i64 = 500;

const MAX_ENCODED: i64 = 0xFF_FFFF;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainRgb {
    pub offset: i64,
}

impl Default for TerrainRgb {
    fn default() -> Self {
        Self {
            offset: TERRAIN_RGB_OFFSET,
        }
    }
}

impl TerrainRgb {
    pub fn with_offset(offset: i64) -> Self {
        Self { offset }
    }

    /// Saturates instead of overflowing for extreme configured offsets.
    pub fn decode(&self, r: u8, g: u8, b: u8) -> i64 {
        ((r as i64) * 65_536 + (g as i64) * 256 + b as i64).saturating_sub(self.offset)
    }

    /// Packs a height back into RGB; `None` if it does not fit in 24 bits.
    pub fn encode(&self, height: i64) -> Option<[u8; 3]> {
        let raw = height.checked_add(self.offset)?;
        if !(0..=MAX_ENCODED).contains(&raw) {
            return None;
        }
        Some([(raw >> 16) as u8, (raw >> 8) as u8, raw as u8])
    }
}

/// Decodes with the default offset.
pub fn decode_height(r: u8, g: u8, b: u8) -> i64 {
    TerrainRgb::default().decode(r, g, b)
}

/// Band of a height; negative heights collapse to sea level first.
pub fn band_index(height: i64, band_height_m: i64, band_count: u32) -> Result<u32, InvalidInput> {
    if band_height_m <= 0 {
        return Err(InvalidInput::new(format!(
            "band height must be > 0 m, got {band_height_m}"
        )));
    }
    if band_count == 0 {
        return Err(InvalidInput::new("band count must be > 0"));
    }
    Ok(band_index_unchecked(height, band_height_m, band_count))
}

#[inline]
fn band_index_unchecked(height: i64, band_height_m: i64, band_count: u32) -> u32 {
    let h = height.max(0);
    ((h / band_height_m) % band_count as i64) as u32
}

/// Palette and quantization for elevation banding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationBands {
    pub band_height_m: i64,
    pub band_count: u32,
    pub sea_color: Rgb,
    pub band_colors: Vec<Rgb>,
    pub codec: TerrainRgb,
}

impl Default for ElevationBands {
    fn default() -> Self {
        Self {
            band_height_m: 7 * BAND_STEP_M,
            band_count: RAINBOW_BANDS.len() as u32,
            sea_color: SEA_COLOR,
            band_colors: RAINBOW_BANDS.to_vec(),
            codec: TerrainRgb::default(),
        }
    }
}

impl ElevationBands {
    pub fn with_band_height(mut self, band_height_m: i64) -> Self {
        self.band_height_m = band_height_m;
        self
    }

    pub fn validate(&self) -> Result<(), InvalidInput> {
        self.validate_with(self.band_height_m)
    }

    pub(crate) fn validate_with(&self, band_height_m: i64) -> Result<(), InvalidInput> {
        if band_height_m <= 0 {
            return Err(InvalidInput::new(format!(
                "band height must be > 0 m, got {band_height_m}"
            )));
        }
        if self.band_count == 0 || self.band_count as usize > self.band_colors.len() {
            return Err(InvalidInput::new(format!(
                "band count {} needs between 1 and {} palette colors",
                self.band_count,
                self.band_colors.len()
            )));
        }
        Ok(())
    }

    /// Display color of one terrain pixel.
    pub fn classify(&self, pixel: Rgba) -> Result<Rgb, InvalidInput> {
        self.validate()?;
        Ok(self.classify_with(pixel, self.band_height_m))
    }

    /// Caller has run `validate_with(band_height_m)`.
    pub(crate) fn classify_with(&self, pixel: Rgba, band_height_m: i64) -> Rgb {
        if pixel[3] == 0 {
            return self.sea_color;
        }
        let height = self.codec.decode(pixel[0], pixel[1], pixel[2]).max(0);
        if height < 1 {
            return self.sea_color;
        }
        let band = band_index_unchecked(height, band_height_m, self.band_count);
        self.band_colors[band as usize]
    }
}
