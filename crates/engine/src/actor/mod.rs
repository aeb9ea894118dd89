mod animation;
mod state;

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::app::Vec2;
use crate::collision::KinematicBody;

pub use animation::{
    AnimationClip, AnimationKey, AnimationPlayer, AnimationTable, AnimationTableError,
};
pub use state::{
    next_state, ActorState, AttackVariant, Facing, MoveIntent, TickSignals, Transition,
    TransitionCause,
};

pub const DEFAULT_MOVE_SPEED: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
}

impl Default for Hitbox {
    fn default() -> Self {
        Self {
            width: 12.0,
            height: 8.0,
        }
    }
}

/// Per-actor-type settings, usually read from `assets/config/actor.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorConfig {
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Ticks after an attack starts before another is accepted. 0 allows chaining
    /// attacks back to back.
    #[serde(default)]
    pub attack_cooldown_ticks: u32,
    #[serde(default)]
    pub hitbox: Hitbox,
    #[serde(default = "builtin_clips")]
    pub animations: BTreeMap<AnimationKey, AnimationClip>,
}

fn default_move_speed() -> f32 {
    DEFAULT_MOVE_SPEED
}

fn builtin_clips() -> BTreeMap<AnimationKey, AnimationClip> {
    let table = AnimationTable::builtin();
    AnimationKey::ALL
        .into_iter()
        .map(|key| (key, table.clip(key).clone()))
        .collect()
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            move_speed: DEFAULT_MOVE_SPEED,
            attack_cooldown_ticks: 0,
            hitbox: Hitbox::default(),
            animations: builtin_clips(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActorConfigError {
    #[error("move_speed must be finite and non-negative, got {value}")]
    InvalidMoveSpeed { value: f32 },
    #[error("hitbox must have positive finite size, got {width}x{height}")]
    InvalidHitbox { width: f32, height: f32 },
    #[error("attack_cooldown_ticks {value} is out of range")]
    CooldownOutOfRange { value: u32 },
    #[error(transparent)]
    Animations(#[from] AnimationTableError),
}

/// The one controllable actor. Position is the feet point, which is also the
/// center of the collision hitbox.
#[derive(Debug, Clone)]
pub struct Actor {
    position: Vec2,
    velocity: Vec2,
    facing: Facing,
    state: ActorState,
    attack_cooldown: i32,
    alive: bool,
    collision_enabled: bool,
    spawn_point: Vec2,
    move_speed: f32,
    attack_cooldown_ticks: i32,
    hitbox: Hitbox,
    animations: AnimationTable,
    animation: AnimationPlayer,
}

impl Actor {
    pub fn new(config: ActorConfig, spawn_point: Vec2) -> Result<Self, ActorConfigError> {
        if !config.move_speed.is_finite() || config.move_speed < 0.0 {
            return Err(ActorConfigError::InvalidMoveSpeed {
                value: config.move_speed,
            });
        }
        let Hitbox { width, height } = config.hitbox;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ActorConfigError::InvalidHitbox { width, height });
        }
        let attack_cooldown_ticks = i32::try_from(config.attack_cooldown_ticks).map_err(|_| {
            ActorConfigError::CooldownOutOfRange {
                value: config.attack_cooldown_ticks,
            }
        })?;
        let animations = AnimationTable::new(config.animations)?;

        Ok(Self {
            position: spawn_point,
            velocity: Vec2::ZERO,
            facing: Facing::default(),
            state: ActorState::Idle,
            attack_cooldown: 0,
            alive: true,
            collision_enabled: true,
            spawn_point,
            move_speed: config.move_speed,
            attack_cooldown_ticks,
            hitbox: config.hitbox,
            animations,
            animation: AnimationPlayer::new(AnimationKey::Idle),
        })
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn attack_cooldown(&self) -> i32 {
        self.attack_cooldown
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn spawn_point(&self) -> Vec2 {
        self.spawn_point
    }

    pub fn hitbox(&self) -> Hitbox {
        self.hitbox
    }

    pub fn animation(&self) -> &AnimationPlayer {
        &self.animation
    }

    pub fn animations(&self) -> &AnimationTable {
        &self.animations
    }

    pub fn current_clip(&self) -> &AnimationClip {
        self.animations.clip(self.animation.key())
    }

    pub fn current_frame(&self) -> u32 {
        self.animation.frame(&self.animations)
    }

    pub fn body(&self) -> KinematicBody {
        KinematicBody {
            position: self.position,
            half_extents: Vec2::new(self.hitbox.width * 0.5, self.hitbox.height * 0.5),
        }
    }

    pub fn decrement_cooldown(&mut self) {
        if self.attack_cooldown > 0 {
            self.attack_cooldown -= 1;
        }
    }

    /// Returns true on the tick a non-looping clip finishes.
    pub fn advance_animation(&mut self) -> bool {
        self.animation.advance(&self.animations)
    }

    /// Runs the transition table and applies its side effects.
    pub fn apply_signals(&mut self, signals: &TickSignals) -> Transition {
        let previous = self.state;
        let transition = next_state(previous, self.attack_cooldown, signals);
        self.state = transition.state;

        match transition.cause {
            TransitionCause::Reset => {
                self.reset();
                info!(x = self.position.x, y = self.position.y, "actor_reset");
            }
            TransitionCause::Died => {
                self.velocity = Vec2::ZERO;
                self.collision_enabled = false;
                self.alive = false;
                info!(from = %previous, "actor_died");
            }
            TransitionCause::Hurt => {
                self.velocity = Vec2::ZERO;
            }
            TransitionCause::AttackStarted => {
                self.velocity = Vec2::ZERO;
                self.attack_cooldown = self.attack_cooldown_ticks;
            }
            TransitionCause::HurtFinished
            | TransitionCause::AttackFinished
            | TransitionCause::Locomotion
            | TransitionCause::Unchanged => {}
        }

        if self.state.accepts_movement() {
            self.apply_movement(signals.movement);
        }

        let key = AnimationKey::for_state(self.state);
        if transition.cause == TransitionCause::Hurt {
            self.animation.restart(key);
        } else {
            self.animation.play(key);
        }

        if previous != self.state {
            debug!(
                from = %previous,
                to = %self.state,
                cause = ?transition.cause,
                "actor_state_changed"
            );
        }
        transition
    }

    /// Writes back the physics result. Ignored while dead so a dead actor stays put.
    pub fn apply_body(&mut self, body: &KinematicBody, velocity: Vec2) {
        if self.state == ActorState::Dead {
            return;
        }
        self.position = body.position;
        self.velocity = velocity;
    }

    /// Back to spawn, alive and idle. The actor is reused, not rebuilt.
    pub fn reset(&mut self) {
        self.position = self.spawn_point;
        self.velocity = Vec2::ZERO;
        self.facing = Facing::default();
        self.state = ActorState::Idle;
        self.attack_cooldown = 0;
        self.alive = true;
        self.collision_enabled = true;
        self.animation.restart(AnimationKey::Idle);
    }

    fn apply_movement(&mut self, movement: MoveIntent) {
        self.velocity = Vec2::new(
            f32::from(movement.x) * self.move_speed,
            f32::from(movement.y) * self.move_speed,
        );
        match movement.x {
            x if x < 0 => self.facing = Facing::Left,
            x if x > 0 => self.facing = Facing::Right,
            _ => {}
        }
    }
}
