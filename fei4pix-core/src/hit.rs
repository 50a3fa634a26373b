//! FE-I4 hit record type.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single interpreted FE-I4 hit, pinned to a logical event.
///
/// `column` and `row` are 1-based detector coordinates; `relative_bcid` is
/// the BCID offset within the event readout window. All other fields are
/// carried through clustering untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct HitRecord {
    /// Logical event number, monotonically non-decreasing across the stream.
    pub event_number: u64,
    /// Trigger number from the readout system.
    pub trigger_number: u32,
    /// Service record word.
    pub service_record: u32,
    /// BCID offset within the event window, `0..MAX_RELATIVE_BCID`.
    pub relative_bcid: u8,
    /// Level-1 trigger ID.
    pub lvl_id: u16,
    /// Pixel column, 1-based (`1..=COLUMNS`).
    pub column: u8,
    /// Pixel row, 1-based (`1..=ROWS`).
    pub row: u16,
    /// Time over threshold, a digitised charge proxy.
    pub tot: u8,
    /// Absolute bunch crossing ID.
    pub bcid: u16,
    /// TDC counter value.
    pub tdc: u16,
    /// Trigger status flags.
    pub trigger_status: u8,
    /// Event status flag bits, OR-reduced per event by the clusterizer.
    pub event_status: u16,
}

impl HitRecord {
    /// Creates a hit with the clustering-relevant fields set and every
    /// pass-through field zeroed.
    #[must_use]
    pub fn new(event_number: u64, column: u8, row: u16, relative_bcid: u8, tot: u8) -> Self {
        Self {
            event_number,
            column,
            row,
            relative_bcid,
            tot,
            ..Self::default()
        }
    }
}
