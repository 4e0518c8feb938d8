use foundation::InvalidInput;

use crate::symbology::Rgba;

/// RGBA8 image, row-major, top row first.
///
/// Invariant: `data.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Transparent black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn filled(width: u32, height: u32, rgba: Rgba) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps raw RGBA bytes as delivered by a tile or image decoder.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, InvalidInput> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| InvalidInput::new(format!("buffer too large: {width}x{height}")))?;
        if data.len() != expected {
            return Err(InvalidInput::new(format!(
                "{width}x{height} buffer needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Builds a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgba) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`.
    ///
    /// Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        if x < self.width && y < self.height {
            Some(self.pixel(x, y))
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: Rgba) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn pixels(&self) -> impl Iterator<Item = Rgba> + '_ {
        self.data.chunks_exact(4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Failures of a raster pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    InvalidInput(InvalidInput),
    DimensionMismatch {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },
    EmptyInput,
}

impl std::fmt::Display for RasterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterError::InvalidInput(e) => write!(f, "{e}"),
            RasterError::DimensionMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "source {index} is {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            RasterError::EmptyInput => write!(f, "raster pass needs at least one source"),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::InvalidInput(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InvalidInput> for RasterError {
    fn from(e: InvalidInput) -> Self {
        RasterError::InvalidInput(e)
    }
}

#[cfg(test)]
mod tests {
    use super::PixelBuffer;

    #[test]
    fn from_rgba_checks_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::from_rgba(0, 5, Vec::new()).is_ok());
    }

    #[test]
    fn pixels_are_row_major() {
        let buf = PixelBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 0, 255]);
        assert_eq!(buf.pixel(2, 0), [2, 0, 0, 255]);
        assert_eq!(buf.pixel(0, 1), [0, 1, 0, 255]);
        assert_eq!(&buf.as_bytes()[12..16], &[0, 1, 0, 255]);
        assert_eq!(buf.get(3, 0), None);
        assert_eq!(buf.pixels().count(), 6);
    }

    #[test]
    fn set_pixel_overwrites_one_pixel() {
        let mut buf = PixelBuffer::filled(2, 2, [1, 2, 3, 4]);
        buf.set_pixel(1, 1, [9, 9, 9, 9]);
        assert_eq!(buf.pixel(1, 1), [9, 9, 9, 9]);
        assert_eq!(buf.pixel(0, 1), [1, 2, 3, 4]);
    }
}
