//! XPM Decoder
//!
//! Decodes the XPM 3 text format the mascot artwork is embedded in. Only the
//! quoted strings of the C array matter; comments and the declaration are
//! skipped.
//!
//! # Layout
//!
//! ```text
//! "<width> <height> <ncolors> <chars-per-pixel> [<x_hot> <y_hot>]"
//! "<key> c <color>"            x ncolors   (color is "None", "#RRGGBB", or a name)
//! "<row of width*cpp chars>"   x height
//! ```
//!
//! Pixels whose color is `None` become transparent in the mask.

use std::collections::HashMap;

use thiserror::Error;

use super::image::{Image, Mask};

/// Errors produced while decoding XPM text
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum XpmError {
    /// The values line is missing or malformed
    #[error("Malformed XPM header: {0:?}")]
    Header(String),

    /// A color table line is malformed
    #[error("Malformed XPM color entry: {0:?}")]
    ColorEntry(String),

    /// A color specification cannot be interpreted
    #[error("Unknown XPM color {0:?}")]
    UnknownColor(String),

    /// Fewer strings than the header promised
    #[error("XPM truncated: expected {expected} strings, found {found}")]
    Truncated {
        /// Strings required by the header
        expected: usize,
        /// Strings present
        found: usize,
    },

    /// A pixel row has the wrong length
    #[error("XPM row {row} has {found} chars, expected {expected}")]
    RowLength {
        /// Zero-based row index
        row: usize,
        /// Chars required by width * cpp
        expected: usize,
        /// Chars present
        found: usize,
    },

    /// A pixel references a key missing from the color table
    #[error("XPM row {row} references undefined color key {key:?}")]
    UndefinedKey {
        /// Zero-based row index
        row: usize,
        /// The offending key
        key: String,
    },

    /// A string literal is not terminated
    #[error("Unterminated string in XPM source")]
    Unterminated,
}

/// Visual contexts in preference order; `c` is the color visual
const CONTEXTS: [&str; 4] = ["c", "g", "g4", "m"];

/// Color names understood without an rgb.txt database
const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0x00_00_00),
    ("white", 0xFF_FF_FF),
    ("red", 0xFF_00_00),
    ("green", 0x00_FF_00),
    ("blue", 0x00_00_FF),
    ("yellow", 0xFF_FF_00),
    ("cyan", 0x00_FF_FF),
    ("magenta", 0xFF_00_FF),
    ("gray", 0xBE_BE_BE),
    ("grey", 0xBE_BE_BE),
    ("orange", 0xFF_A5_00),
    ("brown", 0xA5_2A_2A),
];

/// Decode XPM source text into a body image and its transparency mask
///
/// # Errors
///
/// Returns an `XpmError` describing the first problem found.
pub fn decode(source: &str) -> Result<(Image, Mask), XpmError> {
    let strings = quoted_strings(source)?;
    let header = strings
        .first()
        .ok_or_else(|| XpmError::Header(String::new()))?;
    let (width, height, ncolors, cpp) = parse_header(header)?;

    let expected = 1 + ncolors + height as usize;
    if strings.len() < expected {
        return Err(XpmError::Truncated {
            expected,
            found: strings.len(),
        });
    }

    let mut palette: HashMap<String, Option<u32>> = HashMap::with_capacity(ncolors);
    for line in &strings[1..=ncolors] {
        let (key, color) = parse_color_entry(line, cpp)?;
        palette.insert(key, color);
    }

    let row_len = width as usize * cpp;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    let mut bits = Vec::with_capacity(pixels.capacity());
    for (row, line) in strings[1 + ncolors..expected].iter().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() < row_len {
            return Err(XpmError::RowLength {
                row,
                expected: row_len,
                found: chars.len(),
            });
        }
        for key in chars[..row_len].chunks(cpp) {
            let key: String = key.iter().collect();
            match palette.get(&key) {
                Some(Some(rgb)) => {
                    pixels.push(*rgb);
                    bits.push(true);
                }
                Some(None) => {
                    pixels.push(0);
                    bits.push(false);
                }
                None => return Err(XpmError::UndefinedKey { row, key }),
            }
        }
    }

    let image = Image::new(width, height, pixels).ok_or_else(|| XpmError::Header(header.clone()))?;
    let mask = Mask::new(width, height, bits).ok_or_else(|| XpmError::Header(header.clone()))?;
    Ok((image, mask))
}

/// Collect the contents of every `"..."` literal outside comments
fn quoted_strings(source: &str) -> Result<Vec<String>, XpmError> {
    let mut strings = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '"' => {
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => return Err(XpmError::Unterminated),
                        },
                        Some(c) => s.push(c),
                        None => return Err(XpmError::Unterminated),
                    }
                }
                strings.push(s);
            }
            _ => {}
        }
    }

    Ok(strings)
}

fn parse_header(line: &str) -> Result<(u32, u32, usize, usize), XpmError> {
    let bad = || XpmError::Header(line.to_string());
    let mut values = line.split_whitespace().map(str::parse::<u32>);
    let mut next = || values.next().and_then(Result::ok).ok_or_else(bad);

    let width = next()?;
    let height = next()?;
    let ncolors = next()? as usize;
    let cpp = next()? as usize;
    if width == 0 || height == 0 || ncolors == 0 || cpp == 0 {
        return Err(bad());
    }
    Ok((width, height, ncolors, cpp))
}

fn parse_color_entry(line: &str, cpp: usize) -> Result<(String, Option<u32>), XpmError> {
    let bad = || XpmError::ColorEntry(line.to_string());
    let key: String = line.chars().take(cpp).collect();
    if key.chars().count() != cpp {
        return Err(bad());
    }
    let rest: String = line.chars().skip(cpp).collect();

    // Group "<context> <value words...>" pairs
    let mut entries: Vec<(&str, Vec<&str>)> = Vec::new();
    for word in rest.split_whitespace() {
        if CONTEXTS.contains(&word) || word == "s" {
            entries.push((word, Vec::new()));
        } else if let Some((_, value)) = entries.last_mut() {
            value.push(word);
        } else {
            return Err(bad());
        }
    }

    let spec = CONTEXTS
        .iter()
        .find_map(|ctx| {
            entries
                .iter()
                .find(|(c, v)| c == ctx && !v.is_empty())
                .map(|(_, v)| v.join(" "))
        })
        .ok_or_else(bad)?;

    Ok((key, parse_color(&spec)?))
}

/// Parse a color spec; `Ok(None)` means transparent
fn parse_color(spec: &str) -> Result<Option<u32>, XpmError> {
    if spec.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let unknown = || XpmError::UnknownColor(spec.to_string());

    if let Some(hex) = spec.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) || hex.len() % 3 != 0 {
            return Err(unknown());
        }
        let digits = hex.len() / 3;
        if !(1..=4).contains(&digits) {
            return Err(unknown());
        }
        let mut rgb = 0u32;
        for channel in 0..3 {
            let part = &hex[channel * digits..(channel + 1) * digits];
            let value = u32::from_str_radix(part, 16).map_err(|_| unknown())?;
            // Normalize to 8 bits per channel
            let max = (1u32 << (4 * digits)) - 1;
            rgb = (rgb << 8) | ((value * 255 + max / 2) / max);
        }
        return Ok(Some(rgb));
    }

    let lower = spec.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|&(_, rgb)| Some(rgb))
        .ok_or_else(unknown)
}
