use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use super::state::{ActorState, AttackVariant};
use crate::sprite_keys::{validate_sprite_key, SpriteKeyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum AnimationKey {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "walk")]
    Walk,
    #[serde(rename = "attack_1")]
    Attack1,
    #[serde(rename = "attack_2")]
    Attack2,
    #[serde(rename = "attack_3")]
    Attack3,
    #[serde(rename = "hurt")]
    Hurt,
    #[serde(rename = "death")]
    Death,
}

impl AnimationKey {
    pub const ALL: [AnimationKey; 7] = [
        AnimationKey::Idle,
        AnimationKey::Walk,
        AnimationKey::Attack1,
        AnimationKey::Attack2,
        AnimationKey::Attack3,
        AnimationKey::Hurt,
        AnimationKey::Death,
    ];

    pub fn code(self) -> &'static str {
        match self {
            AnimationKey::Idle => "idle",
            AnimationKey::Walk => "walk",
            AnimationKey::Attack1 => "attack_1",
            AnimationKey::Attack2 => "attack_2",
            AnimationKey::Attack3 => "attack_3",
            AnimationKey::Hurt => "hurt",
            AnimationKey::Death => "death",
        }
    }

    pub fn for_state(state: ActorState) -> Self {
        match state {
            ActorState::Idle => AnimationKey::Idle,
            ActorState::Walking => AnimationKey::Walk,
            ActorState::Attacking(AttackVariant::One) => AnimationKey::Attack1,
            ActorState::Attacking(AttackVariant::Two) => AnimationKey::Attack2,
            ActorState::Attacking(AttackVariant::Three) => AnimationKey::Attack3,
            ActorState::Hurt => AnimationKey::Hurt,
            ActorState::Dead => AnimationKey::Death,
        }
    }

    /// Clips that drive completion events and therefore must play once.
    fn must_finish(self) -> bool {
        !matches!(self, AnimationKey::Idle | AnimationKey::Walk)
    }
}

impl fmt::Display for AnimationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationClip {
    pub sprite: String,
    pub frames: u32,
    pub ticks_per_frame: u32,
    #[serde(default)]
    pub looping: bool,
}

impl AnimationClip {
    pub fn new(
        sprite: impl Into<String>,
        frames: u32,
        ticks_per_frame: u32,
        looping: bool,
    ) -> Self {
        Self {
            sprite: sprite.into(),
            frames,
            ticks_per_frame,
            looping,
        }
    }

    pub fn duration_ticks(&self) -> u32 {
        self.frames.saturating_mul(self.ticks_per_frame)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationTableError {
    #[error("animation table is missing clip '{key}'")]
    MissingClip { key: AnimationKey },
    #[error("animation '{key}' has invalid sprite key '{sprite}': {source}")]
    InvalidSprite {
        key: AnimationKey,
        sprite: String,
        #[source]
        source: SpriteKeyError,
    },
    #[error("animation '{key}' must have at least one frame")]
    NoFrames { key: AnimationKey },
    #[error("animation '{key}' must have ticks_per_frame >= 1")]
    ZeroTicksPerFrame { key: AnimationKey },
    #[error("animation '{key}' must not loop")]
    MustNotLoop { key: AnimationKey },
}

/// Validated clip set for one actor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationTable {
    clips: BTreeMap<AnimationKey, AnimationClip>,
}

impl AnimationTable {
    pub fn new(clips: BTreeMap<AnimationKey, AnimationClip>) -> Result<Self, AnimationTableError> {
        for key in AnimationKey::ALL {
            let clip = clips
                .get(&key)
                .ok_or(AnimationTableError::MissingClip { key })?;
            validate_sprite_key(&clip.sprite).map_err(|source| {
                AnimationTableError::InvalidSprite {
                    key,
                    sprite: clip.sprite.clone(),
                    source,
                }
            })?;
            if clip.frames == 0 {
                return Err(AnimationTableError::NoFrames { key });
            }
            if clip.ticks_per_frame == 0 {
                return Err(AnimationTableError::ZeroTicksPerFrame { key });
            }
            if key.must_finish() && clip.looping {
                return Err(AnimationTableError::MustNotLoop { key });
            }
        }
        Ok(Self { clips })
    }

    /// Stand-in table used when no actor config is available.
    pub fn builtin() -> Self {
        let clips = [
            (AnimationKey::Idle, AnimationClip::new("knight/idle", 4, 10, true)),
            (AnimationKey::Walk, AnimationClip::new("knight/walk", 6, 6, true)),
            (AnimationKey::Attack1, AnimationClip::new("knight/attack_1", 4, 5, false)),
            (AnimationKey::Attack2, AnimationClip::new("knight/attack_2", 5, 5, false)),
            (AnimationKey::Attack3, AnimationClip::new("knight/attack_3", 6, 5, false)),
            (AnimationKey::Hurt, AnimationClip::new("knight/hurt", 3, 6, false)),
            (AnimationKey::Death, AnimationClip::new("knight/death", 6, 8, false)),
        ];
        Self {
            clips: clips.into_iter().collect(),
        }
    }

    pub fn clip(&self, key: AnimationKey) -> &AnimationClip {
        // Construction guarantees every key is present.
        &self.clips[&key]
    }
}

/// Tick-driven playback cursor over one clip at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationPlayer {
    key: AnimationKey,
    elapsed_ticks: u32,
    finished: bool,
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new(AnimationKey::Idle)
    }
}

impl AnimationPlayer {
    pub fn new(key: AnimationKey) -> Self {
        Self {
            key,
            elapsed_ticks: 0,
            finished: false,
        }
    }

    pub fn key(&self) -> AnimationKey {
        self.key
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Switches clips. Playing the current key again keeps its progress.
    pub fn play(&mut self, key: AnimationKey) {
        if self.key != key {
            self.restart(key);
        }
    }

    pub fn restart(&mut self, key: AnimationKey) {
        *self = Self::new(key);
    }

    /// Advances one tick. Returns true exactly once, on the tick a non-looping clip ends.
    pub fn advance(&mut self, table: &AnimationTable) -> bool {
        if self.finished {
            return false;
        }
        let clip = table.clip(self.key);
        let duration = clip.duration_ticks();
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);
        if clip.looping {
            self.elapsed_ticks %= duration.max(1);
            return false;
        }
        if self.elapsed_ticks >= duration {
            self.finished = true;
            return true;
        }
        false
    }

    /// Current frame index; a finished clip holds its last frame.
    pub fn frame(&self, table: &AnimationTable) -> u32 {
        let clip = table.clip(self.key);
        (self.elapsed_ticks / clip.ticks_per_frame).min(clip.frames - 1)
    }
}
