//! Part orientation: four directions times a mirror flag.
//!
//! The transition tables for rotation and the two flips are fixed; the
//! builder relies on them to cycle through placements predictably.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Facing of a part, clockwise from `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Quarter turns clockwise from `Up`.
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Combine two clockwise offsets, e.g. a part's facing and an
    /// extension's facing relative to the part.
    pub fn sum(self, other: Direction) -> Direction {
        Self::from_index(self.index() + other.index())
    }

    pub fn clockwise(self) -> Direction {
        self.sum(Direction::Right)
    }

    pub fn opposite(self) -> Direction {
        self.sum(Direction::Down)
    }

    /// Unit grid step in this direction (y grows upward).
    pub fn step(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::Y,
            Direction::Right => IVec2::X,
            Direction::Down => IVec2::NEG_Y,
            Direction::Left => IVec2::NEG_X,
        }
    }

    pub fn unit(self) -> Vec2 {
        self.step().as_vec2()
    }

    /// Whether the footprint is turned sideways.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Right | Direction::Left)
    }
}

/// Direction plus mirror flag: eight states in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    pub direction: Direction,
    pub flip: bool,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::UP
    }
}

impl Orientation {
    pub const UP: Self = Self::new(Direction::Up, false);
    pub const UP_FLIP: Self = Self::new(Direction::Up, true);
    pub const RIGHT: Self = Self::new(Direction::Right, false);
    pub const RIGHT_FLIP: Self = Self::new(Direction::Right, true);
    pub const DOWN: Self = Self::new(Direction::Down, false);
    pub const DOWN_FLIP: Self = Self::new(Direction::Down, true);
    pub const LEFT: Self = Self::new(Direction::Left, false);
    pub const LEFT_FLIP: Self = Self::new(Direction::Left, true);

    pub const ALL: [Orientation; 8] = [
        Self::UP,
        Self::UP_FLIP,
        Self::RIGHT,
        Self::RIGHT_FLIP,
        Self::DOWN,
        Self::DOWN_FLIP,
        Self::LEFT,
        Self::LEFT_FLIP,
    ];

    pub const fn new(direction: Direction, flip: bool) -> Self {
        Self { direction, flip }
    }

    /// Up -> Right -> Down -> Left -> Up, keeping the flip flag.
    pub fn rotate_clockwise(self) -> Self {
        Self::new(self.direction.clockwise(), self.flip)
    }

    /// Mirror across the vertical axis.
    ///
    /// Vertical facings only toggle the flag; horizontal ones also swap
    /// Left and Right.
    pub fn flip_x(self) -> Self {
        match self.direction {
            Direction::Up | Direction::Down => Self::new(self.direction, !self.flip),
            Direction::Right => Self::new(Direction::Left, !self.flip),
            Direction::Left => Self::new(Direction::Right, !self.flip),
        }
    }

    /// Mirror across the horizontal axis.
    ///
    /// Horizontal facings only toggle the flag; vertical ones also swap
    /// Up and Down.
    pub fn flip_y(self) -> Self {
        match self.direction {
            Direction::Left | Direction::Right => Self::new(self.direction, !self.flip),
            Direction::Up => Self::new(Direction::Down, !self.flip),
            Direction::Down => Self::new(Direction::Up, !self.flip),
        }
    }

    /// Grid footprint of a part whose unrotated size is `base`.
    pub fn effective_extent(self, base: IVec2) -> IVec2 {
        if self.direction.is_horizontal() {
            IVec2::new(base.y, base.x)
        } else {
            base
        }
    }

    /// Map a point of the unrotated footprint (`[0, base]`) into the
    /// oriented footprint. The mirror is applied before the rotation.
    pub fn map_local(self, point: Vec2, base: Vec2) -> Vec2 {
        let p = if self.flip {
            Vec2::new(base.x - point.x, point.y)
        } else {
            point
        };
        match self.direction {
            Direction::Up => p,
            Direction::Right => Vec2::new(p.y, base.x - p.x),
            Direction::Down => Vec2::new(base.x - p.x, base.y - p.y),
            Direction::Left => Vec2::new(base.y - p.y, p.x),
        }
    }
}
