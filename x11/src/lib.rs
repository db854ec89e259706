//! Mascot X11 - X Window System Surface for the Desktop Mascot
//!
//! Implements [`mascot_core::Surface`] on top of `x11rb`. The core decides
//! what to show and where; this crate turns that into X requests:
//!
//! - Frames are uploaded once as a TrueColor body pixmap plus a 1-bit mask
//! - Presenting a frame reshapes the window to the mask and moves it
//! - Redraws copy the body and draw caption text with a core font
//! - Notifications arrive as `PropertyNotify` on the mascot window
//!
//! # Sending a Notification
//!
//! Any client can write a JSON object into the notification property of the
//! window named `Mascot`:
//!
//! ```bash
//! xprop -name Mascot -f MascotNotify 8s \
//!     -set MascotNotify '{"method":"message","content":"Build finished"}'
//! ```
//!
//! Scripts written for xgopher target a window named `Gopher` and the
//! `GopherNotify` property. `xprop -name` will not find this window, but
//! `xprop -id` with the window id will reach it once the mascot runs with
//! `MASCOT_NOTIFY_PROPERTY=GopherNotify`.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod session;
pub mod upload;

pub use error::X11Error;
pub use session::{X11Frame, X11Session};
