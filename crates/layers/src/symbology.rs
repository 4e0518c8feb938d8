//! Fixed palettes used by the recoloring operators.

/// An opaque display color.
pub type Rgb = [u8; 3];

/// Display color with alpha.
pub type Rgba = [u8; 4];

/// Land bands of the terrain page, lowest band first.
pub const RAINBOW_BANDS: [Rgb; 6] = [
    [253, 143, 40],
    [253, 195, 70],
    [212, 255, 95],
    [1, 246, 30],
    [41, 69, 255],
    [246, 1, 246],
];

pub const SEA_COLOR: Rgb = [58, 27, 80];

/// Background of the threshold split before any channel contributes.
pub const SPLIT_BASE: Rgba = [0, 50, 100, 255];

/// Contribution per source channel (red, green, blue) for the colormap view.
pub const SPLIT_PALETTE: [Rgb; 3] = [[67, 8, 122], [0, 125, 84], [27, 72, 253]];

/// Contribution per source channel for the transparent overlay view.
pub const OVERLAY_PALETTE: [Rgb; 3] = [[255, 185, 54], [73, 255, 92], [255, 131, 64]];

/// Color the vertical gradient starts from on the top row.
pub const GRADIENT_TOP: Rgb = [133, 3, 255];

/// Density ramp endpoints: below-threshold marker, then white to magenta.
pub const DENSITY_LOW: Rgba = [0, 255, 0, 255];
pub const DENSITY_FROM: Rgb = [255, 255, 255];
pub const DENSITY_TO: Rgb = [255, 0, 255];

/// Levels of the three-step posterize.
pub const POSTER_LEVELS: [u8; 3] = [0, 128, 255];
