use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttackVariant {
    One,
    Two,
    Three,
}

impl AttackVariant {
    pub const ALL: [AttackVariant; 3] = [
        AttackVariant::One,
        AttackVariant::Two,
        AttackVariant::Three,
    ];

    pub fn number(self) -> u8 {
        match self {
            AttackVariant::One => 1,
            AttackVariant::Two => 2,
            AttackVariant::Three => 3,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(AttackVariant::One),
            2 => Some(AttackVariant::Two),
            3 => Some(AttackVariant::Three),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorState {
    Idle,
    Walking,
    Attacking(AttackVariant),
    Hurt,
    Dead,
}

impl ActorState {
    pub fn accepts_movement(self) -> bool {
        matches!(self, ActorState::Idle | ActorState::Walking)
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorState::Idle => f.write_str("idle"),
            ActorState::Walking => f.write_str("walking"),
            ActorState::Attacking(variant) => write!(f, "attacking_{}", variant.number()),
            ActorState::Hurt => f.write_str("hurt"),
            ActorState::Dead => f.write_str("dead"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Per-axis direction in {-1, 0, 1}; y follows world coordinates (down is +1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub x: i8,
    pub y: i8,
}

impl MoveIntent {
    pub const NONE: MoveIntent = MoveIntent { x: 0, y: 0 };

    /// Left wins over right and up wins over down when both are held.
    pub fn from_held(left: bool, right: bool, up: bool, down: bool) -> Self {
        let x = if left {
            -1
        } else if right {
            1
        } else {
            0
        };
        let y = if up {
            -1
        } else if down {
            1
        } else {
            0
        };
        Self { x, y }
    }

    pub fn is_moving(self) -> bool {
        self.x != 0 || self.y != 0
    }
}

/// Everything the state machine reacts to in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSignals {
    pub movement: MoveIntent,
    pub attack: Option<AttackVariant>,
    pub hurt: bool,
    pub death: bool,
    pub reset: bool,
    pub animation_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    Unchanged,
    Reset,
    Died,
    Hurt,
    HurtFinished,
    AttackStarted,
    AttackFinished,
    Locomotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: ActorState,
    pub cause: TransitionCause,
}

impl Transition {
    fn to(state: ActorState, cause: TransitionCause) -> Self {
        Self { state, cause }
    }

    fn stay(state: ActorState) -> Self {
        Self::to(state, TransitionCause::Unchanged)
    }
}

/// Pure transition table, evaluated highest priority first. Triggers that do not
/// apply to `current` fall through and are ignored.
pub fn next_state(current: ActorState, attack_cooldown: i32, signals: &TickSignals) -> Transition {
    if current == ActorState::Dead {
        return if signals.reset {
            Transition::to(ActorState::Idle, TransitionCause::Reset)
        } else {
            Transition::stay(ActorState::Dead)
        };
    }
    if signals.death {
        return Transition::to(ActorState::Dead, TransitionCause::Died);
    }
    if signals.hurt {
        return Transition::to(ActorState::Hurt, TransitionCause::Hurt);
    }

    match current {
        ActorState::Hurt => {
            if signals.animation_finished {
                Transition::to(ActorState::Idle, TransitionCause::HurtFinished)
            } else {
                Transition::stay(current)
            }
        }
        ActorState::Attacking(_) => {
            if !signals.animation_finished {
                return Transition::stay(current);
            }
            let state = if signals.movement.is_moving() {
                ActorState::Walking
            } else {
                ActorState::Idle
            };
            Transition::to(state, TransitionCause::AttackFinished)
        }
        ActorState::Idle | ActorState::Walking => match signals.attack {
            Some(variant) if attack_cooldown <= 0 => {
                Transition::to(ActorState::Attacking(variant), TransitionCause::AttackStarted)
            }
            _ => {
                let state = if signals.movement.is_moving() {
                    ActorState::Walking
                } else {
                    ActorState::Idle
                };
                if state == current {
                    Transition::stay(current)
                } else {
                    Transition::to(state, TransitionCause::Locomotion)
                }
            }
        },
        ActorState::Dead => Transition::stay(current),
    }
}
