//! Dense per-event hit grid and charge calibration lookup.
//!
//! Both are flat arrays with manual row-major striding; the neighbourhood
//! scan of the cluster builder depends on the cache locality of this layout.

use fei4pix_core::geometry::{
    charge_index, grid_index, CHARGE_CELLS, COLUMNS, GRID_CELLS, MAX_RELATIVE_BCID,
    MAX_TOT_LOOKUP, ROWS,
};

/// Cell value marking an empty grid position.
const EMPTY: i16 = -1;

/// Dense 3-D occupancy grid over `(column, row, relative BCID)`.
///
/// Each occupied cell stores the hit ToT and a back-pointer into the batch
/// hit slice. The cluster builder clears cells as it consumes hits, so the
/// grid is empty again once an event is fully clusterized; the full-array
/// wipe is only paid at construction and on explicit reset.
#[derive(Debug)]
pub struct HitGrid {
    tot: Vec<i16>,
    hit_index: Vec<u32>,
    live_hits: usize,
}

impl HitGrid {
    /// Allocates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tot: vec![EMPTY; GRID_CELLS],
            hit_index: vec![0; GRID_CELLS],
            live_hits: 0,
        }
    }

    /// Number of occupied cells.
    #[inline]
    #[must_use]
    pub fn live_hits(&self) -> usize {
        self.live_hits
    }

    /// Inserts a hit at a 0-based cell. Returns `false` when the cell is
    /// already occupied; the existing occupant is left in place.
    pub fn insert(
        &mut self,
        column: usize,
        row: usize,
        rel_bcid: usize,
        tot: u8,
        hit_index: u32,
    ) -> bool {
        let idx = grid_index(column, row, rel_bcid);
        if self.tot[idx] != EMPTY {
            return false;
        }
        self.tot[idx] = i16::from(tot);
        self.hit_index[idx] = hit_index;
        self.live_hits += 1;
        true
    }

    /// Whether a cell holds a hit. Coordinates outside the grid are vacant.
    #[inline]
    #[must_use]
    pub fn occupied(&self, column: i32, row: i32, rel_bcid: i32) -> bool {
        in_grid(column, row, rel_bcid)
            && self.tot[grid_index(column as usize, row as usize, rel_bcid as usize)] != EMPTY
    }

    /// ToT stored at an occupied 0-based cell.
    #[inline]
    #[must_use]
    pub fn tot_at(&self, column: usize, row: usize, rel_bcid: usize) -> i16 {
        self.tot[grid_index(column, row, rel_bcid)]
    }

    /// Batch hit index stored at an occupied 0-based cell.
    #[inline]
    #[must_use]
    pub fn hit_index_at(&self, column: usize, row: usize, rel_bcid: usize) -> u32 {
        self.hit_index[grid_index(column, row, rel_bcid)]
    }

    /// Clears a cell and decrements the live count. Returns `true` when the
    /// grid has just become empty.
    pub fn take(&mut self, column: usize, row: usize, rel_bcid: usize) -> bool {
        let idx = grid_index(column, row, rel_bcid);
        debug_assert!(self.tot[idx] != EMPTY, "take on an empty cell");
        self.tot[idx] = EMPTY;
        self.live_hits -= 1;
        self.live_hits == 0
    }

    /// Optimistic sweep: scans cells only while hits remain, so the cost is
    /// proportional to the leftover population instead of the grid size.
    pub fn clear_used_cells(&mut self) {
        if self.live_hits == 0 {
            return;
        }
        for cell in &mut self.tot {
            if *cell != EMPTY {
                *cell = EMPTY;
                self.live_hits -= 1;
                if self.live_hits == 0 {
                    break;
                }
            }
        }
        self.live_hits = 0;
    }

    /// Unconditional full wipe.
    pub fn reset(&mut self) {
        self.tot.fill(EMPTY);
        self.live_hits = 0;
    }

    /// Occupied cells as 0-based `(column, row, relative BCID, ToT)` tuples.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, usize, usize, i16)> + '_ {
        self.tot
            .iter()
            .enumerate()
            .filter(|(_, &tot)| tot != EMPTY)
            .map(|(idx, &tot)| {
                (
                    idx % COLUMNS,
                    (idx / COLUMNS) % ROWS,
                    idx / (COLUMNS * ROWS),
                    tot,
                )
            })
    }
}

impl Default for HitGrid {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn in_grid(column: i32, row: i32, rel_bcid: i32) -> bool {
    (0..COLUMNS as i32).contains(&column)
        && (0..ROWS as i32).contains(&row)
        && (0..MAX_RELATIVE_BCID as i32).contains(&rel_bcid)
}

/// Dense charge calibration lookup keyed by 0-based `(column, row, ToT)`.
///
/// Populated externally; unset cells read as 0.
#[derive(Debug)]
pub struct ChargeLookup {
    values: Vec<f32>,
}

impl ChargeLookup {
    /// Allocates a zero-filled lookup.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: vec![0.0; CHARGE_CELLS],
        }
    }

    /// Calibrated charge for a pixel and ToT; 0 beyond the lookup depth.
    #[inline]
    #[must_use]
    pub fn get(&self, column: usize, row: usize, tot: usize) -> f32 {
        if tot >= MAX_TOT_LOOKUP {
            return 0.0;
        }
        self.values[charge_index(column, row, tot)]
    }

    /// Stores a calibration value; coordinates outside the lookup are ignored.
    pub fn set(&mut self, column: usize, row: usize, tot: usize, charge: f32) {
        if column < COLUMNS && row < ROWS && tot < MAX_TOT_LOOKUP {
            self.values[charge_index(column, row, tot)] = charge;
        }
    }
}

impl Default for ChargeLookup {
    fn default() -> Self {
        Self::new()
    }
}
