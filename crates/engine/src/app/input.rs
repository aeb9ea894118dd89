#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Attack1,
    Attack2,
    Attack3,
    HurtDebug,
    DeathDebug,
    Reset,
    ToggleColliderDebug,
    Quit,
}

const ACTION_COUNT: usize = 12;

/// Held state plus a pressed edge per action. An edge is raised on the
/// released -> held transition only and survives until `clear_pressed_edges`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn force_pressed(&mut self, action: InputAction, pressed: bool) {
        self.pressed[action.index()] = pressed;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn just_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_pressed_edges(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Attack1 => 4,
            InputAction::Attack2 => 5,
            InputAction::Attack3 => 6,
            InputAction::HurtDebug => 7,
            InputAction::DeathDebug => 8,
            InputAction::Reset => 9,
            InputAction::ToggleColliderDebug => 10,
            InputAction::Quit => 11,
        }
    }
}
