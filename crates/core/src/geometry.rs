//! Calorimeter crystal indexing.
//!
//! Crystals are addressed by `(ix, iy)` with `ix ∈ [-23, 23] \ {0}` and
//! `iy ∈ [-5, 5] \ {0}`. There is no row or column zero: `ix = -1` and
//! `ix = 1` are physically adjacent, while `iy = -1` and `iy = 1` sit on
//! opposite sides of the beam gap and are never neighbors.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest valid `|ix|`.
pub const MAX_IX: i32 = 23;
/// Largest valid `|iy|`.
pub const MAX_IY: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    pub ix: i32,
    pub iy: i32,
}

impl CellIndex {
    pub const fn new(ix: i32, iy: i32) -> Self {
        Self { ix, iy }
    }

    pub fn is_valid(&self) -> bool {
        self.ix != 0 && self.iy != 0 && self.ix.abs() <= MAX_IX && self.iy.abs() <= MAX_IY
    }

    pub fn half(&self) -> Half {
        Half::of(*self)
    }

    /// The up-to-eight crystals surrounding this one, excluding itself.
    pub fn neighbors(&self) -> BTreeSet<CellIndex> {
        let mut cells = self.footprint();
        cells.remove(self);
        cells
    }

    /// The 3×3 block centred on this crystal, including itself, clipped
    /// to the detector edges.
    pub fn footprint(&self) -> BTreeSet<CellIndex> {
        let mut cells = BTreeSet::new();

        for dx in -1..=1 {
            let mut hix = self.ix + dx;
            if hix.abs() > MAX_IX {
                continue;
            }
            // Skip over the missing column.
            if hix == 0 {
                hix = if self.ix == -1 { 1 } else { -1 };
            }

            for dy in -1..=1 {
                let hiy = self.iy + dy;
                if hiy == 0 || hiy.abs() > MAX_IY {
                    continue;
                }
                cells.insert(CellIndex::new(hix, hiy));
            }
        }

        cells
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:3}, {:3})", self.ix, self.iy)
    }
}

/// Detector half, split at the beam plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Half {
    Top,
    Bottom,
}

impl Half {
    pub fn of(cell: CellIndex) -> Self {
        if cell.iy > 0 {
            Half::Top
        } else {
            Half::Bottom
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::Top => write!(f, "top"),
            Half::Bottom => write!(f, "bottom"),
        }
    }
}
