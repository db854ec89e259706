//! Client-side image packing
//!
//! Converts device-independent sprite buffers into the byte layouts the
//! server announced in its setup: Z-format pixels for the body, XY-format
//! bitmaps for the mask. Kept free of connection state so the bit twiddling
//! can be tested on its own.

use mascot_core::sprite::{Image, Mask};
use x11rb::protocol::xproto::{ImageOrder, Visualtype};

/// Fixed part of a `PutImage` request in bytes
const PUT_IMAGE_HEADER: usize = 24;

/// Byte or bit significance order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Least significant first
    LsbFirst,
    /// Most significant first
    MsbFirst,
}

impl From<ImageOrder> for Order {
    fn from(order: ImageOrder) -> Self {
        if order == ImageOrder::MSB_FIRST {
            Order::MsbFirst
        } else {
            Order::LsbFirst
        }
    }
}

/// How a TrueColor visual wants its 32-bit pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    /// Red channel mask
    pub red_mask: u32,
    /// Green channel mask
    pub green_mask: u32,
    /// Blue channel mask
    pub blue_mask: u32,
    /// Server image byte order
    pub byte_order: Order,
}

impl PixelLayout {
    /// Layout for a visual and the server byte order
    #[must_use]
    pub fn new(visual: &Visualtype, byte_order: ImageOrder) -> Self {
        Self {
            red_mask: visual.red_mask,
            green_mask: visual.green_mask,
            blue_mask: visual.blue_mask,
            byte_order: byte_order.into(),
        }
    }

    /// Map `0x00RRGGBB` onto the visual's channel masks
    #[must_use]
    pub fn pixel(&self, rgb: u32) -> u32 {
        let [_, r, g, b] = rgb.to_be_bytes();
        place(r, self.red_mask) | place(g, self.green_mask) | place(b, self.blue_mask)
    }
}

fn place(value: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let bits = (mask >> shift).count_ones().min(8);
    ((u32::from(value) >> (8 - bits)) << shift) & mask
}

/// How the server lays out depth-1 images
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapLayout {
    /// Bit order within a scanline unit
    pub bit_order: Order,
    /// Byte order within a scanline unit
    pub byte_order: Order,
    /// Scanline unit in bits (8, 16 or 32)
    pub scanline_unit: u8,
    /// Each row is padded to a multiple of this many bits
    pub scanline_pad: u8,
}

impl BitmapLayout {
    /// Bytes per packed row of `width` pixels
    #[must_use]
    pub fn stride(&self, width: u32) -> usize {
        let pad = usize::from(self.scanline_pad.max(8));
        (width as usize).div_ceil(pad) * pad / 8
    }
}

/// Pack an image as 32 bits per pixel Z-format data
#[must_use]
pub fn pack_body(image: &Image, layout: &PixelLayout) -> Vec<u8> {
    let mut data = Vec::with_capacity(image.pixels().len() * 4);
    for &rgb in image.pixels() {
        let pixel = layout.pixel(rgb);
        match layout.byte_order {
            Order::LsbFirst => data.extend_from_slice(&pixel.to_le_bytes()),
            Order::MsbFirst => data.extend_from_slice(&pixel.to_be_bytes()),
        }
    }
    data
}

/// Pack a mask as XY-format bitmap data, opaque pixels set
#[must_use]
pub fn pack_mask(mask: &Mask, layout: &BitmapLayout) -> Vec<u8> {
    let stride = layout.stride(mask.width());
    if stride == 0 {
        return Vec::new();
    }
    let mut data = vec![0u8; stride * mask.height() as usize];

    for (y, row) in data.chunks_exact_mut(stride).enumerate() {
        let bits = mask.row(u32::try_from(y).unwrap_or(u32::MAX));
        for (x, _) in bits.iter().enumerate().filter(|(_, opaque)| **opaque) {
            let bit = match layout.bit_order {
                Order::LsbFirst => 1u8 << (x % 8),
                Order::MsbFirst => 0x80u8 >> (x % 8),
            };
            row[x / 8] |= bit;
        }

        // Bytes were laid out as if byte order followed bit order
        let unit = usize::from(layout.scanline_unit / 8);
        if layout.byte_order != layout.bit_order && unit > 1 {
            for chunk in row.chunks_exact_mut(unit) {
                chunk.reverse();
            }
        }
    }

    data
}

/// Split `height` rows of `stride` bytes into `(first_row, rows)` bands
/// that each fit in one request
pub fn bands(
    height: u16,
    stride: usize,
    max_request_bytes: usize,
) -> impl Iterator<Item = (u16, u16)> {
    let budget = max_request_bytes.saturating_sub(PUT_IMAGE_HEADER);
    let per_band = (budget / stride.max(1)).clamp(1, usize::from(u16::MAX));
    let per_band = u16::try_from(per_band).unwrap_or(u16::MAX);

    (0..height)
        .step_by(usize::from(per_band))
        .map(move |start| (start, per_band.min(height - start)))
}
