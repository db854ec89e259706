//! Mascot Core - Headless Animation Core for the Desktop Mascot
//!
//! This crate provides everything the mascot does, independent of any
//! windowing system. A surface crate (X11 today) plugs in through the
//! [`Surface`] trait and the core drives it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Surface                              │
//! │     upload / present / redraw      poll_event / readable      │
//! └───────────────┬───────────────────────────────┬──────────────┘
//!                 │ frame + position               │ SurfaceEvent
//! ┌───────────────┴───────────────────────────────┴──────────────┐
//! │                         Scheduler                             │
//! │  ┌────────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │  │ FrameTable │◄──│   Animator   │◄──│    MessageQueue     │  │
//! │  │ (sprites)  │   │ (state mach.)│   │ (notification FIFO) │  │
//! │  └────────────┘   └──────────────┘   └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`sprite`]: Embedded artwork, XPM decoding, mirroring, the typed frame table
//! - [`queue`]: Messages pushed in by external processes
//! - [`animation`]: The walk/jump/pause state machine
//! - [`scheduler`]: The cooperative event/timer loop and the [`Surface`] seam
//! - [`caption`]: Word-wrapping of message text onto the waiting sign
//! - [`config`]: Environment-driven tuning of motion and notification settings
//!
//! # No Windowing Dependencies
//!
//! This crate has **zero** dependencies on X11 or any other display protocol.
//! The whole behavior can be exercised with an in-memory surface.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod caption;
pub mod config;
pub mod queue;
pub mod scheduler;
pub mod sprite;

// Re-exports for convenience
pub use animation::{
    transition, AnimationContext, Animator, Geometry, Position, State, Transition,
};
pub use config::{ConfigError, MascotConfig, MotionConfig};
pub use queue::{Message, MessageQueue, Method};
pub use scheduler::{Scheduler, SchedulerError, Surface, SurfaceError, SurfaceEvent, Wake};
pub use sprite::{Facing, FrameId, FrameTable, Pose, Sprite, SpriteError, SpriteStore};
