//! Integration tests for the scheduler loop
//!
//! These tests drive a real `Scheduler` over a scripted in-memory surface with
//! tokio's paused clock, so every wait is measured exactly.
//! Tests cover:
//! - Idle iterations waiting one tick
//! - Notifications preempting the wait
//! - Expose during a pause painting the caption
//! - Malformed input leaving the mascot alone
//! - Wait failures ending the loop
//! - Long random runs keeping the mascot on the ground between jumps

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{sleep_until, Instant};
use tokio_test::{assert_pending, assert_ready};

use mascot_core::{
    Facing, FrameId, MotionConfig, Pose, Position, Scheduler, SchedulerError, Sprite, SpriteStore,
    State, Surface, SurfaceError, SurfaceEvent, Wake,
};

const SCREEN: (u32, u32) = (1920, 1080);
const GROUND: i32 = 1080 - 200;

// =============================================================================
// Scripted surface
// =============================================================================

/// Surface that records every draw and delivers events at fixed offsets
struct ScriptedSurface {
    start: Instant,
    script: VecDeque<(Duration, SurfaceEvent)>,
    inbox: VecDeque<SurfaceEvent>,
    uploaded: usize,
    presents: Vec<(usize, Position)>,
    redraws: Vec<(usize, Vec<String>)>,
    fail_wait: bool,
}

impl ScriptedSurface {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            script: VecDeque::new(),
            inbox: VecDeque::new(),
            uploaded: 0,
            presents: Vec::new(),
            redraws: Vec::new(),
            fail_wait: false,
        }
    }

    /// Deliver `event` once `at` has passed since creation
    fn at(mut self, at: Duration, event: SurfaceEvent) -> Self {
        self.script.push_back((at, event));
        self
    }

    fn failing_wait(mut self) -> Self {
        self.fail_wait = true;
        self
    }
}

#[async_trait(?Send)]
impl Surface for ScriptedSurface {
    type Frame = usize;

    fn upload(&mut self, _sprite: &Sprite) -> Result<usize, SurfaceError> {
        self.uploaded += 1;
        Ok(self.uploaded - 1)
    }

    fn present(&mut self, frame: &usize, position: Position) -> Result<(), SurfaceError> {
        self.presents.push((*frame, position));
        Ok(())
    }

    fn redraw(&mut self, frame: &usize, caption: &[String]) -> Result<(), SurfaceError> {
        self.redraws.push((*frame, caption.to_vec()));
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<SurfaceEvent>, SurfaceError> {
        Ok(self.inbox.pop_front())
    }

    async fn readable(&mut self) -> Result<(), SurfaceError> {
        if self.fail_wait {
            return Err(SurfaceError::Io(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "select failed",
            )));
        }
        match self.script.pop_front() {
            Some((at, event)) => {
                sleep_until(self.start + at).await;
                self.inbox.push_back(event);
                Ok(())
            }
            None => std::future::pending().await,
        }
    }

    fn screen_size(&self) -> (u32, u32) {
        SCREEN
    }
}

fn scheduler<R: rand::Rng>(mut surface: ScriptedSurface, rng: R) -> Scheduler<ScriptedSurface, R> {
    let store = SpriteStore::load().unwrap();
    let frames = store.upload(&mut surface).unwrap();
    assert_eq!(surface.uploaded, FrameId::COUNT);
    Scheduler::new(surface, frames, MotionConfig::default(), rng)
}

/// Never rolls a spontaneous jump
fn calm() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

fn notification(json: &str) -> SurfaceEvent {
    SurfaceEvent::Notification(json.as_bytes().to_vec())
}

// =============================================================================
// Test 1: Idle Iteration
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_iteration_waits_one_tick() {
    let mut scheduler = scheduler(ScriptedSurface::new(), calm());

    let before = Instant::now();
    let wake = scheduler.run_once().await.unwrap();
    assert_eq!(wake, Wake::Elapsed);
    assert_eq!(before.elapsed(), Duration::from_millis(50));

    assert_eq!(scheduler.state(), State::Walk);
    let presents = &scheduler.surface().presents;
    assert_eq!(
        presents,
        &vec![(
            FrameId::walking(1, Facing::Right).index(),
            Position { x: -190, y: GROUND }
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_walk_moves_each_tick() {
    let mut scheduler = scheduler(ScriptedSurface::new(), calm());
    for _ in 0..4 {
        scheduler.run_once().await.unwrap();
    }

    let xs: Vec<i32> = scheduler.surface().presents.iter().map(|(_, p)| p.x).collect();
    assert_eq!(xs, vec![-190, -180, -170, -160]);

    let poses: Vec<Pose> = scheduler
        .surface()
        .presents
        .iter()
        .map(|(index, _)| FrameId::all().nth(*index).unwrap().pose)
        .collect();
    assert_eq!(
        poses,
        vec![Pose::Walk2, Pose::Walk3, Pose::Walk2Again, Pose::Walk1]
    );
}

// =============================================================================
// Test 2: Notification Preempts the Wait
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_notification_preempts_and_pauses() {
    let surface = ScriptedSurface::new().at(
        Duration::from_millis(20),
        notification(r#"{"method":"message","content":"hello"}"#),
    );
    let mut scheduler = scheduler(surface, calm());

    let before = Instant::now();
    assert_eq!(scheduler.run_once().await.unwrap(), Wake::Preempted);
    assert_eq!(before.elapsed(), Duration::from_millis(20));
    assert_eq!(scheduler.queue().len(), 1);

    // Next iteration raises the sign and holds it for the pause duration
    let before = Instant::now();
    assert_eq!(scheduler.run_once().await.unwrap(), Wake::Elapsed);
    assert_eq!(before.elapsed(), Duration::from_secs(5));
    assert_eq!(scheduler.state(), State::Pause);

    let (frame, caption) = scheduler.surface().redraws.last().unwrap().clone();
    assert_eq!(frame, FrameId::waiting(Facing::Right).index());
    assert_eq!(caption, vec!["hello".to_string()]);

    // Pause ends: message consumed, walking again
    scheduler.run_once().await.unwrap();
    assert_eq!(scheduler.state(), State::Walk);
    assert!(scheduler.queue().is_empty());
    assert!(scheduler.surface().redraws.last().unwrap().1.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_jump_notification_starts_jump() {
    let surface =
        ScriptedSurface::new().at(Duration::from_millis(10), notification(r#"{"method":"jump"}"#));
    let mut scheduler = scheduler(surface, calm());

    scheduler.run_once().await.unwrap();
    scheduler.run_once().await.unwrap();

    assert_eq!(scheduler.state(), State::Jump);
    assert!(scheduler.queue().is_empty());
    let (_, position) = *scheduler.surface().presents.last().unwrap();
    assert_eq!(position, Position { x: -185, y: GROUND - 20 });
}

#[tokio::test(start_paused = true)]
async fn test_wait_stays_pending_until_notification() {
    let surface = ScriptedSurface::new().at(
        Duration::from_millis(30),
        notification(r#"{"method":"message","content":"deploy done"}"#),
    );
    let mut scheduler = scheduler(surface, calm());

    let mut iteration = tokio_test::task::spawn(scheduler.run_once());
    assert_pending!(iteration.poll());

    tokio::time::advance(Duration::from_millis(29)).await;
    assert_pending!(iteration.poll());

    tokio::time::advance(Duration::from_millis(1)).await;
    let wake = assert_ready!(iteration.poll()).unwrap();
    assert_eq!(wake, Wake::Preempted);
}

// =============================================================================
// Test 3: Expose During Pause
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_expose_during_pause_draws_caption() {
    let surface = ScriptedSurface::new()
        .at(
            Duration::from_millis(10),
            notification(r#"{"method":"message","content":"Build finished on main"}"#),
        )
        .at(Duration::from_secs(1), SurfaceEvent::Expose);
    let mut scheduler = scheduler(surface, calm());

    scheduler.run_once().await.unwrap();
    let redraws_before = scheduler.surface().redraws.len();

    // Expose arrives mid-pause and does not cut the pause short
    let before = Instant::now();
    assert_eq!(scheduler.run_once().await.unwrap(), Wake::Elapsed);
    assert_eq!(before.elapsed(), Duration::from_secs(5));

    let redraws = &scheduler.surface().redraws[redraws_before..];
    assert_eq!(redraws.len(), 2, "one eager paint plus one for the expose");
    for (frame, caption) in redraws {
        assert_eq!(*frame, FrameId::waiting(Facing::Right).index());
        assert_eq!(caption, &vec!["Build finished on main".to_string()]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_expose_while_walking_has_no_caption() {
    let surface = ScriptedSurface::new().at(Duration::from_millis(5), SurfaceEvent::Expose);
    let mut scheduler = scheduler(surface, calm());

    let before = Instant::now();
    assert_eq!(scheduler.run_once().await.unwrap(), Wake::Elapsed);
    assert_eq!(before.elapsed(), Duration::from_millis(50));

    let redraws = &scheduler.surface().redraws;
    assert_eq!(redraws.len(), 2);
    assert!(redraws.iter().all(|(_, caption)| caption.is_empty()));
}

// =============================================================================
// Test 4: Malformed Input
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_malformed_notification_changes_nothing() {
    let surface = ScriptedSurface::new()
        .at(Duration::from_millis(10), SurfaceEvent::Notification(b"{not json".to_vec()))
        .at(Duration::from_millis(15), notification(r#"{"method":"dance"}"#))
        .at(Duration::from_millis(20), SurfaceEvent::Other);
    let mut scheduler = scheduler(surface, calm());

    let before = Instant::now();
    assert_eq!(scheduler.run_once().await.unwrap(), Wake::Elapsed);
    assert_eq!(before.elapsed(), Duration::from_millis(50));
    assert!(scheduler.queue().is_empty());
    assert_eq!(scheduler.state(), State::Walk);
}

// =============================================================================
// Test 5: Wait Failure
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_error_ends_run() {
    let mut scheduler = scheduler(ScriptedSurface::new().failing_wait(), calm());

    let err = scheduler.run().await.unwrap_err();
    assert!(matches!(err, SchedulerError::Wait(SurfaceError::Io(_))));
    // The frame was still presented before the wait
    assert_eq!(scheduler.surface().presents.len(), 1);
}

// =============================================================================
// Test 6: Long Random Run
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_random_run_stays_grounded_between_jumps() {
    let mut scheduler = scheduler(ScriptedSurface::new(), StdRng::seed_from_u64(7));

    let mut jumps = 0;
    let mut bounced = false;
    let mut last_dx = scheduler.animator().context().dx;
    for _ in 0..3000 {
        scheduler.run_once().await.unwrap();
        let ctx = *scheduler.animator().context();
        match scheduler.state() {
            State::Walk => {
                assert_eq!(ctx.y, GROUND);
                assert_eq!(ctx.dy, 0);
            }
            State::Jump => {
                assert!(ctx.y < GROUND);
                if ctx.dy == -18 {
                    jumps += 1;
                }
            }
            other => panic!("iteration ended in instant state {other:?}"),
        }
        assert!(ctx.x >= -200 && ctx.x <= 1920, "x out of range: {}", ctx.x);
        if ctx.dx != last_dx {
            bounced = true;
            last_dx = ctx.dx;
        }
    }

    assert!(jumps > 0, "no spontaneous jump in 3000 ticks");
    assert!(bounced, "never reached a screen edge");
}
