//! Occupancy field: which part holds each grid cell.
//!
//! Cells are indexed `[x, y]` with `(0, 0)` at the bottom-left and store
//! part ids, never parts. Rectangles are half-open `[start, end)`.

use std::collections::BTreeSet;

use glam::{IVec2, Vec2};

use crate::components::{PartId, Rect};
use crate::error::PreconditionError;

/// Largest cell count a field will allocate.
pub const MAX_FIELD_CELLS: usize = 1 << 24;

/// Fixed-size grid of optional part references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyField {
    size: IVec2,
    cells: Vec<Option<PartId>>,
}

impl OccupancyField {
    /// Create an empty field. Zero-sized fields are allowed.
    pub fn new(width: i32, height: i32) -> Result<Self, PreconditionError> {
        if width < 0 || height < 0 {
            return Err(PreconditionError::NegativeFieldSize { width, height });
        }
        let cells = (width as usize)
            .checked_mul(height as usize)
            .filter(|n| *n <= MAX_FIELD_CELLS)
            .ok_or(PreconditionError::FieldTooLarge {
                width,
                height,
                limit: MAX_FIELD_CELLS,
            })?;
        Ok(Self {
            size: IVec2::new(width, height),
            cells: vec![None; cells],
        })
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    /// The whole field as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(IVec2::ZERO, self.size)
    }

    /// Whether `0 <= start <= end <= size` holds componentwise.
    pub fn is_inside(&self, rect: &Rect) -> bool {
        rect.start.cmpge(IVec2::ZERO).all()
            && rect.start.cmple(rect.end).all()
            && rect.end.cmple(self.size).all()
    }

    fn validate(&self, rect: &Rect) -> Result<(), PreconditionError> {
        if self.is_inside(rect) {
            Ok(())
        } else {
            Err(PreconditionError::InvalidRect {
                start: rect.start,
                end: rect.end,
                size: self.size,
            })
        }
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        if self.bounds().contains(cell) {
            Some((cell.y * self.size.x + cell.x) as usize)
        } else {
            None
        }
    }

    /// Occupant of a cell. Out-of-bounds cells read as empty.
    pub fn get(&self, cell: IVec2) -> Option<PartId> {
        self.index(cell).and_then(|i| self.cells[i])
    }

    /// True iff no cell of `[start, end)` is occupied.
    pub fn check_employment(&self, start: IVec2, end: IVec2) -> Result<bool, PreconditionError> {
        let rect = Rect::new(start, end);
        self.validate(&rect)?;
        let free = rect.cells().all(|cell| self.get(cell).is_none());
        Ok(free)
    }

    /// Write `part` into every cell of `[start, end)`. Overlap is not checked.
    pub fn fill(&mut self, part: PartId, start: IVec2, end: IVec2) -> Result<(), PreconditionError> {
        let rect = Rect::new(start, end);
        self.validate(&rect)?;
        for cell in rect.cells() {
            if let Some(i) = self.index(cell) {
                self.cells[i] = Some(part);
            }
        }
        Ok(())
    }

    /// Remove every reference to `part`. Returns the number of cells freed.
    pub fn clear(&mut self, part: PartId) -> usize {
        let mut freed = 0;
        for cell in self.cells.iter_mut() {
            if *cell == Some(part) {
                *cell = None;
                freed += 1;
            }
        }
        freed
    }

    /// Part at the cell containing `position`.
    pub fn point_query(&self, position: Vec2) -> Option<PartId> {
        if !position.is_finite() {
            return None;
        }
        self.get(position.floor().as_ivec2())
    }

    /// Grid rectangle of a footprint of `extent` centered at `center`.
    pub fn placement_rect(center: Vec2, extent: IVec2) -> Rect {
        let start = (center - extent.as_vec2() / 2.0).round().as_ivec2();
        Rect::from_size(start, extent)
    }

    /// Distinct parts touching the edges of `rect`, excluding `own`.
    ///
    /// Scans the one-cell strip outside each edge, clipped to the field.
    pub fn neighbors_of(&self, rect: &Rect, own: PartId) -> BTreeSet<PartId> {
        let strips = [
            Rect::new(
                IVec2::new(rect.start.x - 1, rect.start.y),
                IVec2::new(rect.start.x, rect.end.y),
            ),
            Rect::new(
                IVec2::new(rect.end.x, rect.start.y),
                IVec2::new(rect.end.x + 1, rect.end.y),
            ),
            Rect::new(
                IVec2::new(rect.start.x, rect.start.y - 1),
                IVec2::new(rect.end.x, rect.start.y),
            ),
            Rect::new(
                IVec2::new(rect.start.x, rect.end.y),
                IVec2::new(rect.end.x, rect.end.y + 1),
            ),
        ];
        strips
            .iter()
            .flat_map(|strip| strip.cells())
            .filter_map(|cell| self.get(cell))
            .filter(|id| *id != own)
            .collect()
    }

    /// Occupied cells and their occupants, row by row.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (IVec2, PartId)> + '_ {
        let width = self.size.x;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let i = i as i32;
            cell.map(|id| (IVec2::new(i % width, i / width), id))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Distinct occupants in first-cell order.
    pub fn parts(&self) -> Vec<PartId> {
        let mut seen = BTreeSet::new();
        self.cells
            .iter()
            .flatten()
            .filter(|id| seen.insert(**id))
            .copied()
            .collect()
    }
}
