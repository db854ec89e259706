//! Device-independent sprite buffers
//!
//! A [`Sprite`] pairs a full-color body with a 1-bit transparency mask of the
//! same size. Both are plain row-major buffers; surfaces convert them into
//! their own server-side resources.

use super::SpriteError;

/// Full-color pixel buffer, one `0x00RRGGBB` word per pixel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Image {
    /// Create an image from row-major pixels
    ///
    /// Returns `None` if `pixels` does not hold exactly `width * height` entries.
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == area(width, height)).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at `(x, y)`, `None` when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[offset(self.width, x, y)])
    }

    /// Row-major pixel slice
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// One row of pixels
    #[must_use]
    pub fn row(&self, y: u32) -> &[u32] {
        let start = offset(self.width, 0, y);
        &self.pixels[start..start + self.width as usize]
    }

    fn mirrored(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: mirror_rows(&self.pixels, self.width),
        }
    }

    fn scaled(&self, factor: u32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            pixels: scale_rows(&self.pixels, self.width, factor),
        }
    }
}

/// 1-bit transparency mask; `true` marks an opaque pixel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Create a mask from row-major bits
    ///
    /// Returns `None` if `bits` does not hold exactly `width * height` entries.
    #[must_use]
    pub fn new(width: u32, height: u32, bits: Vec<bool>) -> Option<Self> {
        (bits.len() == area(width, height)).then_some(Self {
            width,
            height,
            bits,
        })
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` is opaque; out-of-bounds pixels are transparent
    #[must_use]
    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[offset(self.width, x, y)]
    }

    /// One row of bits
    #[must_use]
    pub fn row(&self, y: u32) -> &[bool] {
        let start = offset(self.width, 0, y);
        &self.bits[start..start + self.width as usize]
    }

    /// Number of opaque pixels
    #[must_use]
    pub fn opaque_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    fn mirrored(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            bits: mirror_rows(&self.bits, self.width),
        }
    }

    fn scaled(&self, factor: u32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            bits: scale_rows(&self.bits, self.width, factor),
        }
    }
}

/// A body image and its transparency mask
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    body: Image,
    mask: Mask,
}

impl Sprite {
    /// Pair a body with its mask
    ///
    /// # Errors
    ///
    /// Returns `SpriteError::DimensionMismatch` unless both have the same size.
    pub fn new(body: Image, mask: Mask) -> Result<Self, SpriteError> {
        if body.width != mask.width || body.height != mask.height {
            return Err(SpriteError::DimensionMismatch {
                body: (body.width, body.height),
                mask: (mask.width, mask.height),
            });
        }
        Ok(Self { body, mask })
    }

    /// The full-color layer
    #[must_use]
    pub fn body(&self) -> &Image {
        &self.body
    }

    /// The transparency layer
    #[must_use]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.body.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.body.height
    }

    /// Horizontal reflection (flip about the vertical axis)
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            body: self.body.mirrored(),
            mask: self.mask.mirrored(),
        }
    }

    /// Nearest-neighbor enlargement by an integer factor
    #[must_use]
    pub fn scaled(&self, factor: u32) -> Self {
        if factor <= 1 {
            return self.clone();
        }
        Self {
            body: self.body.scaled(factor),
            mask: self.mask.scaled(factor),
        }
    }
}

fn area(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn offset(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

fn mirror_rows<T: Copy>(data: &[T], width: u32) -> Vec<T> {
    if width == 0 {
        return Vec::new();
    }
    data.chunks_exact(width as usize)
        .flat_map(|row| row.iter().rev().copied())
        .collect()
}

fn scale_rows<T: Copy>(data: &[T], width: u32, factor: u32) -> Vec<T> {
    if width == 0 {
        return Vec::new();
    }
    let factor = factor as usize;
    let mut out = Vec::with_capacity(data.len() * factor * factor);
    for row in data.chunks_exact(width as usize) {
        let wide: Vec<T> = row
            .iter()
            .flat_map(|&v| std::iter::repeat(v).take(factor))
            .collect();
        for _ in 0..factor {
            out.extend_from_slice(&wide);
        }
    }
    out
}
