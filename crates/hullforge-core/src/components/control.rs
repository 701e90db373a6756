//! Abstract control actions supplied by the input collaborator each tick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::orientation::Direction;

/// Who is flying: a player seat, an AI pilot, a test script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControllerId(pub u32);

/// Device-agnostic ship control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    RotateLeft,
    RotateRight,
}

impl ControlAction {
    pub const ALL: [ControlAction; 6] = [
        ControlAction::MoveForward,
        ControlAction::MoveBackward,
        ControlAction::MoveLeft,
        ControlAction::MoveRight,
        ControlAction::RotateLeft,
        ControlAction::RotateRight,
    ];

    /// The movement action that fires thrusters pushing toward `direction`.
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Up => ControlAction::MoveForward,
            Direction::Down => ControlAction::MoveBackward,
            Direction::Left => ControlAction::MoveLeft,
            Direction::Right => ControlAction::MoveRight,
        }
    }

    fn bit(self) -> u8 {
        match self {
            ControlAction::MoveForward => 1,
            ControlAction::MoveBackward => 1 << 1,
            ControlAction::MoveLeft => 1 << 2,
            ControlAction::MoveRight => 1 << 3,
            ControlAction::RotateLeft => 1 << 4,
            ControlAction::RotateRight => 1 << 5,
        }
    }
}

/// Set of actions pressed during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const NONE: Self = Self(0);

    pub fn insert(&mut self, action: ControlAction) {
        self.0 |= action.bit();
    }

    pub fn remove(&mut self, action: ControlAction) {
        self.0 &= !action.bit();
    }

    pub fn contains(&self, action: ControlAction) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: ActionSet) -> ActionSet {
        ActionSet(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = ControlAction> {
        ControlAction::ALL.into_iter().filter(move |a| self.contains(*a))
    }

    /// Net rotation request: `Some(true)` for clockwise, `None` when
    /// neither or both rotation actions are held.
    pub fn rotation(&self) -> Option<bool> {
        match (
            self.contains(ControlAction::RotateLeft),
            self.contains(ControlAction::RotateRight),
        ) {
            (true, false) => Some(false),
            (false, true) => Some(true),
            _ => None,
        }
    }
}

impl FromIterator<ControlAction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = ControlAction>>(iter: I) -> Self {
        let mut set = ActionSet::NONE;
        for action in iter {
            set.insert(action);
        }
        set
    }
}

/// Pressed actions per controller for one tick.
#[derive(Debug, Clone, Default)]
pub struct ControlInputs {
    pressed: HashMap<ControllerId, ActionSet>,
}

impl ControlInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, controller: ControllerId, actions: ActionSet) {
        self.pressed.insert(controller, actions);
    }

    pub fn with(mut self, controller: ControllerId, actions: ActionSet) -> Self {
        self.set(controller, actions);
        self
    }

    pub fn get(&self, controller: ControllerId) -> ActionSet {
        self.pressed.get(&controller).copied().unwrap_or_default()
    }

    /// Everything pressed by any of `controllers`.
    pub fn combined(&self, controllers: impl IntoIterator<Item = ControllerId>) -> ActionSet {
        controllers
            .into_iter()
            .fold(ActionSet::NONE, |acc, c| acc.union(self.get(c)))
    }
}
