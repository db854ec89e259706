//! X11 surface errors

use mascot_core::SurfaceError;
use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

/// Errors raised by the X11 surface
#[derive(Debug, Error)]
pub enum X11Error {
    /// Could not reach the display server
    #[error("Cannot connect to X server: {0}")]
    Connect(#[from] ConnectError),

    /// The connection broke
    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A request returned an X error
    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    /// A request or resource id allocation failed
    #[error("X request or id allocation failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    /// Connection socket failure
    #[error("X socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The screen number from `$DISPLAY` does not exist
    #[error("Screen {0} does not exist")]
    NoScreen(usize),

    /// The root visual cannot be fed 32-bit TrueColor pixels
    #[error("Unsupported root visual: depth {depth}, {bits_per_pixel} bits per pixel")]
    UnsupportedVisual {
        /// Root window depth
        depth: u8,
        /// Bits per pixel of the matching pixmap format (0 if none)
        bits_per_pixel: u8,
    },

    /// Neither the configured font nor the fallback could be opened
    #[error("No usable caption font (tried {0:?} and \"fixed\")")]
    Font(String),

    /// Sprite does not fit the 16-bit X geometry
    #[error("Sprite {width}x{height} is too large for X")]
    SpriteTooLarge {
        /// Sprite width
        width: u32,
        /// Sprite height
        height: u32,
    },
}

impl From<X11Error> for SurfaceError {
    fn from(err: X11Error) -> Self {
        match err {
            X11Error::Io(io) => SurfaceError::Io(io),
            other => SurfaceError::backend(other),
        }
    }
}
