//! Timer/Event Scheduler
//!
//! One cooperative loop drives everything:
//!
//! 1. Drain the state machine until it arms a timeout.
//! 2. Present the chosen frame at the new position.
//! 3. Pump pending surface events without blocking. A redraw request repaints
//!    the current frame; a notification is queued and cancels the rest of the
//!    wait.
//! 4. With nothing pending and time left, block until the surface has input
//!    or the deadline passes.
//!
//! The wait is a biased `tokio::select!` between [`Surface::readable`] and
//! `sleep_until`, so input always wins over an expiring timer.

use std::error::Error as StdError;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::animation::{Animator, Geometry, Position, State};
use crate::caption;
use crate::config::MotionConfig;
use crate::queue::MessageQueue;
use crate::sprite::{FrameTable, Sprite};

/// Errors reported by a surface implementation
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Socket-level failure
    #[error("Surface I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol or server-side failure
    #[error("Surface backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl SurfaceError {
    /// Wrap a backend-specific error
    pub fn backend(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Errors that end the scheduler loop
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Blocking for input failed
    #[error("Waiting for surface input failed: {0}")]
    Wait(#[source] SurfaceError),

    /// Presenting, drawing, or polling failed
    #[error("Surface operation failed: {0}")]
    Surface(#[from] SurfaceError),
}

/// Events a surface delivers to the scheduler
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The window contents must be repainted
    Expose,
    /// Raw notification payload from the notification channel
    Notification(Vec<u8>),
    /// Anything the mascot does not care about
    Other,
}

/// A windowing system the mascot can live in
///
/// Implementations own every server-side resource they hand out and release
/// them on drop.
#[async_trait(?Send)]
pub trait Surface {
    /// Server-side form of an uploaded sprite
    type Frame;

    /// Convert a sprite into a drawable frame
    ///
    /// # Errors
    ///
    /// Any allocation or transfer failure.
    fn upload(&mut self, sprite: &Sprite) -> Result<Self::Frame, SurfaceError>;

    /// Clip the window to the frame's mask and move it to `position`
    ///
    /// # Errors
    ///
    /// Any request failure.
    fn present(&mut self, frame: &Self::Frame, position: Position) -> Result<(), SurfaceError>;

    /// Paint the frame body, then the caption lines on top
    ///
    /// # Errors
    ///
    /// Any request failure.
    fn redraw(&mut self, frame: &Self::Frame, caption: &[String]) -> Result<(), SurfaceError>;

    /// Next already-received event, without blocking
    ///
    /// # Errors
    ///
    /// A broken connection.
    fn poll_event(&mut self) -> Result<Option<SurfaceEvent>, SurfaceError>;

    /// Resolve once new input may be available
    ///
    /// Spurious wakeups are allowed; the scheduler polls again afterwards.
    ///
    /// # Errors
    ///
    /// The underlying wait failed.
    async fn readable(&mut self) -> Result<(), SurfaceError>;

    /// Screen `(width, height)` in pixels
    fn screen_size(&self) -> (u32, u32);
}

/// Why an iteration ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    /// The armed timeout ran out
    Elapsed,
    /// A notification cancelled the remaining wait
    Preempted,
}

/// The mascot's main loop
pub struct Scheduler<S: Surface, R> {
    surface: S,
    frames: FrameTable<S::Frame>,
    animator: Animator,
    queue: MessageQueue,
    rng: R,
}

impl<S: Surface, R: Rng> Scheduler<S, R> {
    /// Build a scheduler around an initialized surface and its frames
    pub fn new(surface: S, frames: FrameTable<S::Frame>, motion: MotionConfig, rng: R) -> Self {
        let geometry = Geometry::new(surface.screen_size(), (frames.width(), frames.height()));
        info!(
            screen_width = geometry.screen_width,
            screen_height = geometry.screen_height,
            tick = ?motion.tick,
            "Scheduler ready"
        );
        Self {
            surface,
            frames,
            animator: Animator::new(geometry, motion),
            queue: MessageQueue::new(),
            rng,
        }
    }

    /// Run until the surface fails
    ///
    /// # Errors
    ///
    /// The first `SchedulerError`; there is no other way out.
    pub async fn run(&mut self) -> Result<(), SchedulerError> {
        loop {
            self.run_once().await?;
        }
    }

    /// One outer iteration: advance, present, then wait
    ///
    /// # Errors
    ///
    /// Surface failures while presenting, polling, or waiting.
    pub async fn run_once(&mut self) -> Result<Wake, SchedulerError> {
        let timeout = self.animator.advance(&mut self.queue, &mut self.rng);
        let frame = self.frames.get(self.animator.frame());
        self.surface.present(frame, self.animator.position())?;
        self.redraw()?;

        let mut deadline = Instant::now() + timeout;
        let mut wake = Wake::Elapsed;
        loop {
            while let Some(event) = self.surface.poll_event()? {
                if self.handle_event(event)? {
                    deadline = Instant::now();
                    wake = Wake::Preempted;
                }
            }

            if Instant::now() >= deadline {
                break;
            }

            tokio::select! {
                biased;

                ready = self.surface.readable() => {
                    ready.map_err(SchedulerError::Wait)?;
                }

                () = sleep_until(deadline) => {
                    break;
                }
            }
        }

        trace!(?wake, state = ?self.animator.state(), "Iteration finished");
        Ok(wake)
    }

    /// Returns `true` when the event should cut the current wait short
    fn handle_event(&mut self, event: SurfaceEvent) -> Result<bool, SchedulerError> {
        match event {
            SurfaceEvent::Expose => {
                self.redraw()?;
                Ok(false)
            }
            SurfaceEvent::Notification(payload) => {
                let accepted = self.queue.push_notification(&payload);
                if accepted {
                    debug!(pending = self.queue.len(), "Notification cancels wait");
                }
                Ok(accepted)
            }
            SurfaceEvent::Other => Ok(false),
        }
    }

    fn redraw(&mut self) -> Result<(), SchedulerError> {
        let lines = self
            .animator
            .caption(&self.queue)
            .map(|text| caption::layout(text, caption::COLUMNS, caption::MAX_LINES))
            .unwrap_or_default();
        let frame = self.frames.get(self.animator.frame());
        self.surface.redraw(frame, &lines)?;
        Ok(())
    }

    /// Current animation state
    #[must_use]
    pub fn state(&self) -> State {
        self.animator.state()
    }

    /// The animator
    #[must_use]
    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Pending messages
    #[must_use]
    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// The surface being driven
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }
}
