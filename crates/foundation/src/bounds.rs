use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// Fraction used by viewport callers: each side grows by half the view
/// extent, so the buffered box covers 4x the viewport area.
pub const DEFAULT_BUFFER_FRACTION: f64 = 0.5;

/// Axis-aligned bounding box in a single fixed 2-D frame.
///
/// Serialized as `[min_x, min_y, max_x, max_y]`, the same ordering WFS uses
/// for its `bbox` parameter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoundingBox {
    /// Builds a box, rejecting inverted or NaN extents.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, InvalidInput> {
        // Written as negated `<=` so NaN fails too.
        if !(min_x <= max_x) || !(min_y <= max_y) {
            return Err(InvalidInput::new(format!(
                "inverted bounds: [{min_x}, {min_y}, {max_x}, {max_y}]"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// True iff `inner` lies entirely within `self`, edges included.
    ///
    /// Comparison is exact. A viewport that lands on a coverage edge after
    /// float rounding may flip between reuse and refetch.
    pub fn contains(&self, inner: &BoundingBox) -> bool {
        self.min_x <= inner.min_x
            && self.min_y <= inner.min_y
            && self.max_x >= inner.max_x
            && self.max_y >= inner.max_y
    }

    /// Grows each side outward by `fraction` of the box extent on that axis.
    pub fn expand(&self, fraction: f64) -> Result<BoundingBox, InvalidInput> {
        Ok(self.buffered(BufferFraction::new(fraction)?))
    }

    /// Infallible [`BoundingBox::expand`] for an already validated fraction.
    pub fn buffered(&self, fraction: BufferFraction) -> BoundingBox {
        let dx = self.width() * fraction.0;
        let dy = self.height() * fraction.0;
        Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }
}

/// A buffer fraction known to be `>= 0`.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BufferFraction(f64);

impl BufferFraction {
    pub fn new(fraction: f64) -> Result<Self, InvalidInput> {
        if !(fraction >= 0.0) {
            return Err(InvalidInput::new(format!(
                "buffer fraction must be >= 0, got {fraction}"
            )));
        }
        Ok(Self(fraction))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for BufferFraction {
    fn default() -> Self {
        Self(DEFAULT_BUFFER_FRACTION)
    }
}

impl TryFrom<f64> for BufferFraction {
    type Error = InvalidInput;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<BufferFraction> for f64 {
    fn from(f: BufferFraction) -> Self {
        f.0
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = InvalidInput;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

/// Free-function form of [`BoundingBox::contains`].
pub fn contains(outer: &BoundingBox, inner: &BoundingBox) -> bool {
    outer.contains(inner)
}

/// Free-function form of [`BoundingBox::expand`].
pub fn expand(bounds: &BoundingBox, fraction: f64) -> Result<BoundingBox, InvalidInput> {
    bounds.expand(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bb(a: f64, b: f64, c: f64, d: f64) -> BoundingBox {
        BoundingBox::new(a, b, c, d).unwrap()
    }

    #[test]
    fn rejects_inverted_and_nan_extents() {
        assert!(BoundingBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 1.0, 1.0, 0.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(BoundingBox::new(2.0, 2.0, 2.0, 2.0).is_ok());
    }

    #[test]
    fn containment_includes_edges() {
        let outer = bb(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&bb(0.0, 0.0, 10.0, 10.0)));
        assert!(outer.contains(&bb(2.0, 2.0, 8.0, 8.0)));
        assert!(!outer.contains(&bb(-0.000001, 0.0, 10.0, 10.0)));
        assert!(!outer.contains(&bb(0.0, 0.0, 10.0, 10.000001)));
        assert!(!bb(2.0, 2.0, 8.0, 8.0).contains(&outer));
    }

    #[test]
    fn containment_is_antisymmetric() {
        let boxes = [
            bb(0.0, 0.0, 10.0, 10.0),
            bb(0.0, 0.0, 10.0, 10.0),
            bb(-1.0, 0.0, 10.0, 10.0),
            bb(0.0, 0.0, 5.0, 10.0),
            bb(3.0, 3.0, 3.0, 3.0),
        ];
        for a in &boxes {
            for b in &boxes {
                if contains(a, b) && contains(b, a) {
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn expand_by_half_doubles_each_axis() {
        let view = bb(0.0, 0.0, 10.0, 4.0);
        let grown = expand(&view, DEFAULT_BUFFER_FRACTION).unwrap();
        assert_eq!(grown, bb(-5.0, -2.0, 15.0, 6.0));
        assert_eq!(grown.width(), view.width() * 2.0);
        assert_eq!(grown.height(), view.height() * 2.0);
    }

    #[test]
    fn expanded_box_contains_original() {
        let views = [
            bb(0.0, 0.0, 10.0, 10.0),
            bb(-180.0, -85.0, 180.0, 85.0),
            bb(32.99, 3.32, 47.98, 14.89),
            bb(1.0, 1.0, 1.0, 1.0),
        ];
        for view in views {
            for fraction in [0.0, 0.1, 0.5, 1.0, 3.0] {
                let grown = view.expand(fraction).unwrap();
                assert!(grown.contains(&view), "{view:?} by {fraction}");
            }
        }
    }

    #[test]
    fn expand_rejects_negative_fraction() {
        let view = bb(0.0, 0.0, 1.0, 1.0);
        assert!(view.expand(-0.1).is_err());
        assert!(view.expand(f64::NAN).is_err());
    }

    #[test]
    fn serde_uses_bbox_array_order() {
        let view = bb(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&view).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, view);
        assert!(serde_json::from_str::<BoundingBox>("[3.0,0.0,1.0,1.0]").is_err());
    }

    #[test]
    fn buffer_fraction_validates_and_defaults() {
        assert_eq!(BufferFraction::default().value(), DEFAULT_BUFFER_FRACTION);
        assert!(BufferFraction::new(-1.0).is_err());
        assert!(serde_json::from_str::<BufferFraction>("-0.5").is_err());
        let f: BufferFraction = serde_json::from_str("0.25").unwrap();
        assert_eq!(bb(0.0, 0.0, 4.0, 4.0).buffered(f), bb(-1.0, -1.0, 5.0, 5.0));
    }
}
