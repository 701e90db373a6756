//! Common geometry shared by parts, fields and vessels.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::PreconditionError;

/// Lowest health a part can be driven to.
pub const MIN_HEALTH: i32 = -10;

/// Half-open integer rectangle `[start, end)` in grid cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub start: IVec2,
    pub end: IVec2,
}

impl Rect {
    pub const ZERO: Self = Self {
        start: IVec2::ZERO,
        end: IVec2::ZERO,
    };

    pub fn new(start: IVec2, end: IVec2) -> Self {
        Self { start, end }
    }

    pub fn from_size(start: IVec2, size: IVec2) -> Self {
        Self {
            start,
            end: start + size,
        }
    }

    pub fn size(&self) -> IVec2 {
        self.end - self.start
    }

    pub fn area(&self) -> i32 {
        let size = self.size();
        size.x.max(0) * size.y.max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= self.start.x && cell.x < self.end.x && cell.y >= self.start.y && cell.y < self.end.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.start.x < other.end.x
            && other.start.x < self.end.x
            && self.start.y < other.end.y
            && other.start.y < self.end.y
    }

    /// Same rectangle moved by `offset`.
    pub fn translated(&self, offset: IVec2) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    /// Smallest rectangle covering every input, `None` for an empty input.
    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc, r| {
            Some(match acc {
                None => *r,
                Some(b) => Rect::new(b.start.min(r.start), b.end.max(r.end)),
            })
        })
    }

    /// Every cell covered by the rectangle, row by row.
    pub fn cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        (self.start.y..self.end.y)
            .flat_map(move |y| (self.start.x..self.end.x).map(move |x| IVec2::new(x, y)))
    }
}

/// Mass concentrated at a point.
///
/// Parts carry one in footprint-local coordinates; vessels cache the
/// aggregate in grid coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CenterOfMass {
    pub position: Vec2,
    pub mass: f32,
}

impl CenterOfMass {
    pub const ZERO: Self = Self {
        position: Vec2::ZERO,
        mass: 0.0,
    };

    pub fn new(position: Vec2, mass: f32) -> Result<Self, PreconditionError> {
        if mass < 0.0 || mass.is_nan() {
            return Err(PreconditionError::NegativeMass(mass));
        }
        Ok(Self { position, mass })
    }

    /// Mass-weighted average of all points. Zero total mass yields [`Self::ZERO`].
    pub fn average(points: impl IntoIterator<Item = CenterOfMass>) -> Self {
        let mut moment = Vec2::ZERO;
        let mut mass = 0.0;
        for p in points {
            moment += p.position * p.mass;
            mass += p.mass;
        }
        if mass > 0.0 {
            Self {
                position: moment / mass,
                mass,
            }
        } else {
            Self::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_cells() {
        let r = Rect::new(IVec2::new(1, 1), IVec2::new(3, 2));
        let cells: Vec<_> = r.cells().collect();
        assert_eq!(cells, vec![IVec2::new(1, 1), IVec2::new(2, 1)]);
        assert_eq!(r.area(), 2);
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(IVec2::ZERO, IVec2::new(2, 2));
        let b = Rect::new(IVec2::new(2, 0), IVec2::new(4, 2));
        let c = Rect::new(IVec2::new(1, 1), IVec2::new(3, 3));
        assert!(!a.intersects(&b)); // touching edges only
        assert!(a.intersects(&c));
    }

    #[test]
    fn test_rect_bounding() {
        let rects = [
            Rect::new(IVec2::new(2, 3), IVec2::new(4, 4)),
            Rect::new(IVec2::new(0, 5), IVec2::new(1, 9)),
        ];
        let b = Rect::bounding(&rects).unwrap();
        assert_eq!(b, Rect::new(IVec2::new(0, 3), IVec2::new(4, 9)));
        assert!(Rect::bounding(&[]).is_none());
    }

    #[test]
    fn test_center_of_mass_weighted() {
        let com = CenterOfMass::average([
            CenterOfMass::new(Vec2::new(0.0, 0.0), 1.0).unwrap(),
            CenterOfMass::new(Vec2::new(4.0, 0.0), 3.0).unwrap(),
        ]);
        assert_eq!(com.mass, 4.0);
        assert!((com.position.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_center_of_mass_empty() {
        assert_eq!(CenterOfMass::average([]), CenterOfMass::ZERO);
        assert!(CenterOfMass::new(Vec2::ZERO, -1.0).is_err());
    }
}
