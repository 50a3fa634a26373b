//! Per-event accumulator state.

use fei4pix_core::geometry::{COLUMNS, ROWS};

/// Bounding box of the current event, snapshotted when the event closes.
#[derive(Clone, Copy, Debug)]
pub struct EventBounds {
    /// Lowest occupied 0-based column.
    pub min_column: usize,
    /// Highest occupied 0-based column.
    pub max_column: usize,
    /// Lowest occupied 0-based row.
    pub min_row: usize,
    /// Highest occupied 0-based row.
    pub max_row: usize,
    /// Relative BCID of the first inserted hit.
    pub bcid_first: usize,
    /// Highest relative BCID seen.
    pub bcid_last: usize,
}

/// State accumulated while the current event's hits are inserted.
///
/// The bounding box brackets every occupied grid cell. Min and max start
/// inverted so the first insertion collapses them onto the hit.
#[derive(Debug)]
pub struct EventState {
    /// Event number currently being filled, `None` before the first hit of
    /// the stream.
    pub number: Option<u64>,
    /// OR of all hit event-status bits seen for this event.
    pub status: u16,
    /// Next cluster ID to assign within this event.
    pub next_cluster_id: u16,
    min_column: usize,
    max_column: usize,
    min_row: usize,
    max_row: usize,
    bcid_first: Option<u8>,
    bcid_last: u8,
}

impl EventState {
    /// Empty state for the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        let mut state = Self {
            number: None,
            status: 0,
            next_cluster_id: 0,
            min_column: 0,
            max_column: 0,
            min_row: 0,
            max_row: 0,
            bcid_first: None,
            bcid_last: 0,
        };
        state.clear_box();
        state
    }

    /// Expands the bounding box around a freshly inserted 0-based cell.
    pub fn expand(&mut self, column: usize, row: usize, rel_bcid: u8) {
        if self.bcid_first.is_none() {
            self.bcid_first = Some(rel_bcid);
        }
        if rel_bcid > self.bcid_last {
            self.bcid_last = rel_bcid;
        }
        if column < self.min_column {
            self.min_column = column;
        }
        if column > self.max_column {
            self.max_column = column;
        }
        if row < self.min_row {
            self.min_row = row;
        }
        if row > self.max_row {
            self.max_row = row;
        }
    }

    /// Bounding box of the current event, `None` while no hit is stored.
    #[must_use]
    pub fn bounds(&self) -> Option<EventBounds> {
        let bcid_first = self.bcid_first?;
        Some(EventBounds {
            min_column: self.min_column,
            max_column: self.max_column,
            min_row: self.min_row,
            max_row: self.max_row,
            bcid_first: usize::from(bcid_first),
            bcid_last: usize::from(self.bcid_last),
        })
    }

    /// Clears everything for the next event.
    pub fn clear(&mut self) {
        self.number = None;
        self.status = 0;
        self.next_cluster_id = 0;
        self.clear_box();
    }

    fn clear_box(&mut self) {
        self.min_column = COLUMNS - 1;
        self.max_column = 0;
        self.min_row = ROWS - 1;
        self.max_row = 0;
        self.bcid_first = None;
        self.bcid_last = 0;
    }
}

impl Default for EventState {
    fn default() -> Self {
        Self::new()
    }
}
