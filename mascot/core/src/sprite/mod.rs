//! Sprite Store
//!
//! The mascot's artwork is a fixed set of poses baked into the binary as XPM
//! text. At startup the store decodes every pose, enlarges it to on-screen
//! size, derives the left-facing variant by mirroring, and finally uploads
//! all of them to the surface as body + mask pairs.
//!
//! Frames are addressed by [`FrameId`] (pose × facing) rather than by raw
//! index arithmetic. [`FrameId::index`] still gives the classic layout:
//! right-facing poses first, left-facing poses after them.

mod image;
pub mod xpm;

use thiserror::Error;
use tracing::{debug, info};

use crate::scheduler::{Surface, SurfaceError};

pub use image::{Image, Mask, Sprite};
pub use xpm::XpmError;

/// Integer enlargement applied to the embedded artwork
pub const SCALE: u32 = 4;

/// Errors raised while building the sprite set
#[derive(Debug, Error)]
pub enum SpriteError {
    /// Embedded artwork failed to decode
    #[error("Failed to decode {pose:?} artwork: {source}")]
    Decode {
        /// Pose whose artwork is broken
        pose: Pose,
        /// Decoder error
        source: XpmError,
    },

    /// Body and mask disagree on size
    #[error("Sprite body is {body:?} but mask is {mask:?}")]
    DimensionMismatch {
        /// Body (width, height)
        body: (u32, u32),
        /// Mask (width, height)
        mask: (u32, u32),
    },

    /// Poses must all share the window size
    #[error("{pose:?} is {found:?}, expected {expected:?} like the other poses")]
    InconsistentSize {
        /// Offending pose
        pose: Pose,
        /// Size of the first pose
        expected: (u32, u32),
        /// Size of the offending pose
        found: (u32, u32),
    },
}

/// A base pose of the mascot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pose {
    /// Stride, first foot forward
    Walk1,
    /// Feet together
    Walk2,
    /// Stride, other foot forward
    Walk3,
    /// Feet together again, closing the four-beat cycle
    Walk2Again,
    /// Standing still holding up a sign
    Waiting,
}

impl Pose {
    /// All poses in table order
    pub const ALL: [Pose; 5] = [
        Pose::Walk1,
        Pose::Walk2,
        Pose::Walk3,
        Pose::Walk2Again,
        Pose::Waiting,
    ];

    /// Number of base poses
    pub const COUNT: usize = Self::ALL.len();

    fn ordinal(self) -> usize {
        match self {
            Pose::Walk1 => 0,
            Pose::Walk2 => 1,
            Pose::Walk3 => 2,
            Pose::Walk2Again => 3,
            Pose::Waiting => 4,
        }
    }

    fn artwork(self) -> &'static str {
        match self {
            Pose::Walk1 => WALK1_XPM,
            Pose::Walk2 | Pose::Walk2Again => WALK2_XPM,
            Pose::Walk3 => WALK3_XPM,
            Pose::Waiting => WAITING_XPM,
        }
    }
}

/// The four-beat walk cycle, indexed by `step % 4`
pub const WALK_CYCLE: [Pose; 4] = [Pose::Walk1, Pose::Walk2, Pose::Walk3, Pose::Walk2Again];

/// Which way the mascot faces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Toward increasing x (the artwork as drawn)
    Right,
    /// Toward decreasing x (mirrored artwork)
    Left,
}

impl Facing {
    /// Facing implied by a horizontal step; zero counts as left
    #[must_use]
    pub fn from_dx(dx: i32) -> Self {
        if dx > 0 {
            Facing::Right
        } else {
            Facing::Left
        }
    }
}

/// Address of one frame in the table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId {
    /// Base pose
    pub pose: Pose,
    /// Orientation
    pub facing: Facing,
}

impl FrameId {
    /// Total number of frames
    pub const COUNT: usize = Pose::COUNT * 2;

    /// Create a frame id
    #[must_use]
    pub const fn new(pose: Pose, facing: Facing) -> Self {
        Self { pose, facing }
    }

    /// Walking frame for a step counter
    #[must_use]
    pub fn walking(step: u32, facing: Facing) -> Self {
        Self::new(WALK_CYCLE[(step % 4) as usize], facing)
    }

    /// Waiting frame for a facing
    #[must_use]
    pub const fn waiting(facing: Facing) -> Self {
        Self::new(Pose::Waiting, facing)
    }

    /// Table slot: right-facing in `[0, 5)`, left-facing in `[5, 10)`
    #[must_use]
    pub fn index(self) -> usize {
        let base = match self.facing {
            Facing::Right => 0,
            Facing::Left => Pose::COUNT,
        };
        base + self.pose.ordinal()
    }

    /// Every frame id in table order
    pub fn all() -> impl Iterator<Item = FrameId> {
        [Facing::Right, Facing::Left]
            .into_iter()
            .flat_map(|facing| Pose::ALL.into_iter().map(move |pose| FrameId::new(pose, facing)))
    }
}

const WALK1_XPM: &str = include_str!("../../assets/walk1.xpm");
const WALK2_XPM: &str = include_str!("../../assets/walk2.xpm");
const WALK3_XPM: &str = include_str!("../../assets/walk3.xpm");
const WAITING_XPM: &str = include_str!("../../assets/waiting.xpm");

/// Decoded, device-independent sprites for every frame
#[derive(Debug)]
pub struct SpriteStore {
    /// Indexed by `FrameId::index`
    sprites: Vec<Sprite>,
    width: u32,
    height: u32,
}

impl SpriteStore {
    /// Decode the embedded artwork at on-screen scale
    ///
    /// # Errors
    ///
    /// Any decode or size error; a broken asset leaves nothing to show.
    pub fn load() -> Result<Self, SpriteError> {
        Self::from_artwork(Pose::artwork, SCALE)
    }

    /// Build the store from per-pose XPM sources
    ///
    /// # Errors
    ///
    /// Returns `SpriteError` if any pose fails to decode or sizes differ.
    pub fn from_artwork(
        artwork: impl Fn(Pose) -> &'static str,
        scale: u32,
    ) -> Result<Self, SpriteError> {
        let mut originals = Vec::with_capacity(Pose::COUNT);
        for pose in Pose::ALL {
            let (body, mask) =
                xpm::decode(artwork(pose)).map_err(|source| SpriteError::Decode { pose, source })?;
            let sprite = Sprite::new(body, mask)?.scaled(scale);
            debug!(
                ?pose,
                width = sprite.width(),
                height = sprite.height(),
                opaque = sprite.mask().opaque_count(),
                "Decoded pose"
            );
            originals.push((pose, sprite));
        }

        let (width, height) = originals
            .first()
            .map_or((0, 0), |(_, s)| (s.width(), s.height()));
        for (pose, sprite) in &originals {
            if (sprite.width(), sprite.height()) != (width, height) {
                return Err(SpriteError::InconsistentSize {
                    pose: *pose,
                    expected: (width, height),
                    found: (sprite.width(), sprite.height()),
                });
            }
        }

        let mirrored: Vec<Sprite> = originals.iter().map(|(_, s)| s.mirrored()).collect();
        let sprites: Vec<Sprite> = originals
            .into_iter()
            .map(|(_, s)| s)
            .chain(mirrored)
            .collect();

        Ok(Self {
            sprites,
            width,
            height,
        })
    }

    /// Sprite for a frame
    #[must_use]
    pub fn get(&self, id: FrameId) -> &Sprite {
        &self.sprites[id.index()]
    }

    /// Shared sprite width
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Shared sprite height
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Convert every sprite into surface-side resources
    ///
    /// # Errors
    ///
    /// Propagates the first surface failure; already-uploaded frames stay
    /// owned by the surface and are released when it drops.
    pub fn upload<S: Surface>(&self, surface: &mut S) -> Result<FrameTable<S::Frame>, SurfaceError> {
        let mut frames = Vec::with_capacity(FrameId::COUNT);
        for id in FrameId::all() {
            frames.push(surface.upload(self.get(id))?);
        }
        info!(frames = frames.len(), width = self.width, height = self.height, "Sprites uploaded");
        Ok(FrameTable {
            frames,
            width: self.width,
            height: self.height,
        })
    }
}

/// Surface-side frames, addressed by [`FrameId`]
#[derive(Debug)]
pub struct FrameTable<F> {
    frames: Vec<F>,
    width: u32,
    height: u32,
}

impl<F> FrameTable<F> {
    /// Frame for an id
    #[must_use]
    pub fn get(&self, id: FrameId) -> &F {
        &self.frames[id.index()]
    }

    /// Frame width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}
