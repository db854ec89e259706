//! Animation State Machine
//!
//! The mascot walks along the bottom of the screen, hops now and then, and
//! stops to hold up a sign when a message arrives.
//!
//! ```text
//!   StartWalk ──► Walk ──► StartJump ──► Jump ──► StartWalk
//!                   │
//!                   └────► StartPause ──► Pause ──► StartWalk
//! ```
//!
//! `Start*` states are instant: they set things up and fall through without
//! a timeout. `Walk` and `Jump` arm the tick interval, `StartPause` arms the
//! pause duration. [`transition`] is a pure function of the current state,
//! the motion variables, and the queue head; [`Animator`] owns the mutable
//! state and drains instant states until something asks to wait.

use std::time::Duration;

use rand::Rng;
use tracing::{error, trace};

use crate::config::MotionConfig;
use crate::queue::{Message, MessageQueue, Method};
use crate::sprite::{Facing, FrameId};

/// Machine states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Land on the ground and reset the walk cycle
    StartWalk,
    /// Walk one step per tick
    Walk,
    /// Launch a jump
    StartJump,
    /// Follow the jump arc
    Jump,
    /// Raise the sign for the head message
    StartPause,
    /// Sign shown; consume the message when the pause ends
    Pause,
}

/// Window top-left in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Horizontal offset from the left screen edge
    pub x: i32,
    /// Vertical offset from the top screen edge
    pub y: i32,
}

/// Screen and sprite dimensions the motion is bounded by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Screen width in pixels
    pub screen_width: i32,
    /// Screen height in pixels
    pub screen_height: i32,
    /// Sprite (window) width in pixels
    pub sprite_width: i32,
    /// Sprite (window) height in pixels
    pub sprite_height: i32,
}

impl Geometry {
    /// Create geometry from unsigned surface dimensions
    #[must_use]
    pub fn new(screen: (u32, u32), sprite: (u32, u32)) -> Self {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        Self {
            screen_width: clamp(screen.0),
            screen_height: clamp(screen.1),
            sprite_width: clamp(sprite.0),
            sprite_height: clamp(sprite.1),
        }
    }

    /// `y` at which the sprite stands on the bottom edge
    #[must_use]
    pub fn ground(&self) -> i32 {
        self.screen_height - self.sprite_height
    }

    /// Largest `x` that keeps the sprite fully on screen
    #[must_use]
    pub fn right_edge(&self) -> i32 {
        self.screen_width - self.sprite_width
    }
}

/// Motion variables carried between transitions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationContext {
    /// Window left edge
    pub x: i32,
    /// Window top edge
    pub y: i32,
    /// Horizontal step per walking tick
    pub dx: i32,
    /// Vertical velocity, non-zero only mid-jump
    pub dy: i32,
    /// Walk cycle counter (wrapping)
    pub step: u32,
}

impl AnimationContext {
    /// Off the left edge, on the ground, heading right
    #[must_use]
    pub fn initial(geometry: &Geometry, motion: &MotionConfig) -> Self {
        Self {
            x: -geometry.sprite_width,
            y: geometry.ground(),
            dx: motion.walk_speed,
            dy: 0,
            step: 0,
        }
    }

    /// Direction implied by `dx`
    #[must_use]
    pub fn facing(&self) -> Facing {
        Facing::from_dx(self.dx)
    }

    /// Window position
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }
}

/// Result of one evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Next state
    pub state: State,
    /// Updated motion variables
    pub context: AnimationContext,
    /// Frame to show from now on; `None` keeps the current one
    pub frame: Option<FrameId>,
    /// Wait before the next evaluation; `None` means evaluate again immediately
    pub timeout: Option<Duration>,
    /// Whether the queue head was consumed
    pub consume_head: bool,
}

impl Transition {
    fn instant(state: State, context: AnimationContext) -> Self {
        Self {
            state,
            context,
            frame: None,
            timeout: None,
            consume_head: false,
        }
    }

    fn timed(state: State, context: AnimationContext, frame: FrameId, timeout: Duration) -> Self {
        Self {
            state,
            context,
            frame: Some(frame),
            timeout: Some(timeout),
            consume_head: false,
        }
    }

    fn consuming(mut self) -> Self {
        self.consume_head = true;
        self
    }
}

/// Evaluate one state
///
/// Pure apart from the random draw for spontaneous jumps.
pub fn transition<R: Rng + ?Sized>(
    state: State,
    mut ctx: AnimationContext,
    head: Option<&Message>,
    geometry: &Geometry,
    motion: &MotionConfig,
    rng: &mut R,
) -> Transition {
    match state {
        State::StartWalk => {
            ctx.step = 0;
            ctx.dy = 0;
            ctx.y = geometry.ground();
            Transition::instant(State::Walk, ctx)
        }

        State::Walk => match head.map(|m| m.method) {
            // The message stays queued until the pause completes
            Some(Method::Message) => Transition::instant(State::StartPause, ctx),
            Some(Method::Jump) => Transition::instant(State::StartJump, ctx).consuming(),
            None if rng.gen_ratio(1, motion.jump_odds.max(1)) => {
                Transition::instant(State::StartJump, ctx)
            }
            None => {
                ctx.step = ctx.step.wrapping_add(1);
                ctx.x = ctx.x.saturating_add(ctx.dx);
                ctx.y = ctx.y.saturating_add(ctx.dy);
                let frame = FrameId::walking(ctx.step, ctx.facing());
                Transition::timed(State::Walk, ctx, frame, motion.tick)
            }
        },

        State::StartJump => {
            ctx.dy = -motion.jump_velocity;
            Transition::instant(State::Jump, ctx)
        }

        State::Jump => {
            ctx.x = ctx.x.saturating_add(ctx.dx / 2);
            ctx.y = ctx.y.saturating_add(ctx.dy);
            ctx.dy = ctx.dy.saturating_add(motion.gravity);
            if ctx.y >= geometry.ground() {
                Transition::instant(State::StartWalk, ctx)
            } else {
                let frame = FrameId::walking(ctx.step, ctx.facing());
                Transition::timed(State::Jump, ctx, frame, motion.tick)
            }
        }

        State::StartPause => {
            if !pause_head_ok(state, head) {
                return Transition::instant(State::StartWalk, ctx);
            }
            let frame = FrameId::waiting(ctx.facing());
            Transition::timed(State::Pause, ctx, frame, motion.pause)
        }

        State::Pause => {
            if !pause_head_ok(state, head) {
                return Transition::instant(State::StartWalk, ctx);
            }
            Transition::instant(State::StartWalk, ctx).consuming()
        }
    }
}

/// Pause states are only reachable with a display message at the head
fn pause_head_ok(state: State, head: Option<&Message>) -> bool {
    let ok = head.is_some_and(Message::is_display);
    debug_assert!(ok, "{state:?} entered without a display message at the queue head");
    if !ok {
        error!(?state, head = ?head.map(|m| m.method), "Pause without a display message, resuming walk");
    }
    ok
}

/// Owner of the live animation state
#[derive(Debug)]
pub struct Animator {
    state: State,
    context: AnimationContext,
    frame: FrameId,
    geometry: Geometry,
    motion: MotionConfig,
}

impl Animator {
    /// Start in `StartWalk`, just off the left edge
    #[must_use]
    pub fn new(geometry: Geometry, motion: MotionConfig) -> Self {
        let context = AnimationContext::initial(&geometry, &motion);
        Self {
            state: State::StartWalk,
            frame: FrameId::walking(0, context.facing()),
            context,
            geometry,
            motion,
        }
    }

    /// Resume from an explicit state and context
    #[must_use]
    pub fn with_state(mut self, state: State, context: AnimationContext) -> Self {
        self.state = state;
        self.context = context;
        self
    }

    /// Run one transition against the queue
    ///
    /// Returns the timeout the new state armed, if any.
    pub fn evaluate<R: Rng + ?Sized>(
        &mut self,
        queue: &mut MessageQueue,
        rng: &mut R,
    ) -> Option<Duration> {
        let t = transition(
            self.state,
            self.context,
            queue.peek_head(),
            &self.geometry,
            &self.motion,
            rng,
        );
        if t.consume_head {
            queue.dequeue();
        }
        if t.state != self.state {
            trace!(from = ?self.state, to = ?t.state, x = t.context.x, y = t.context.y, "State change");
        }
        self.state = t.state;
        self.context = t.context;
        if let Some(frame) = t.frame {
            self.frame = frame;
        }
        t.timeout
    }

    /// Drain instant states until one arms a timeout, then bounce off edges
    pub fn advance<R: Rng + ?Sized>(&mut self, queue: &mut MessageQueue, rng: &mut R) -> Duration {
        let timeout = loop {
            match self.evaluate(queue, rng) {
                Some(timeout) if !timeout.is_zero() => break timeout,
                _ => {}
            }
        };
        self.bounce();
        timeout
    }

    /// Reverse `dx` when the sprite reaches a screen edge moving outward
    ///
    /// Returns `true` if the direction flipped.
    pub fn bounce(&mut self) -> bool {
        let ctx = &mut self.context;
        let leaving = (ctx.dx < 0 && ctx.x <= 0) || (ctx.dx > 0 && ctx.x >= self.geometry.right_edge());
        if leaving {
            ctx.dx = -ctx.dx;
            trace!(x = ctx.x, dx = ctx.dx, "Bounced off screen edge");
        }
        leaving
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Current motion variables
    #[must_use]
    pub fn context(&self) -> &AnimationContext {
        &self.context
    }

    /// Frame currently shown
    #[must_use]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Window position
    #[must_use]
    pub fn position(&self) -> Position {
        self.context.position()
    }

    /// Bounds in use
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Text to draw on the sign, only while paused
    #[must_use]
    pub fn caption<'q>(&self, queue: &'q MessageQueue) -> Option<&'q str> {
        if self.state != State::Pause {
            return None;
        }
        queue
            .peek_head()
            .filter(|m| m.is_display())
            .and_then(|m| m.content.as_deref())
    }
}
