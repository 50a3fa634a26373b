//! Clusterizer configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fei4pix_core::geometry::{COLUMNS, MAX_RELATIVE_BCID, ROWS};

/// Configuration for the hit clusterizer.
///
/// The search distances define the anisotropic adjacency window of the
/// cluster builder: per search layer a neighbour may be up to
/// `column_distance` columns and `row_distance` rows away, within a
/// forward-only window of `bcid_distance` BCIDs from the cluster seed BCID.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterizerConfig {
    /// Maximum column step per neighbour search layer.
    pub column_distance: u16,
    /// Maximum row step per neighbour search layer.
    pub row_distance: u16,
    /// Forward BCID window from the cluster seed BCID.
    pub bcid_distance: u16,
    /// Clusters below this size are discarded with a warning.
    pub min_cluster_hits: u16,
    /// Clusters above this size are aborted.
    pub max_cluster_hits: u16,
    /// A hit ToT above this value aborts its cluster.
    pub max_cluster_hit_tot: u8,
    /// Hits above this ToT are dropped on insert.
    pub max_hit_tot: u8,
    /// Emit per-cluster summary records.
    pub emit_cluster_info: bool,
    /// Emit per-hit cluster annotations.
    pub emit_hit_info: bool,
}

impl Default for ClusterizerConfig {
    fn default() -> Self {
        Self {
            column_distance: 1,
            row_distance: 2,
            bcid_distance: 4,
            min_cluster_hits: 1,
            max_cluster_hits: 9,
            max_cluster_hit_tot: 13,
            max_hit_tot: 13,
            emit_cluster_info: true,
            emit_hit_info: false,
        }
    }
}

impl ClusterizerConfig {
    /// Set the column search distance.
    #[must_use]
    pub fn with_column_distance(mut self, dx: u16) -> Self {
        self.column_distance = dx;
        self
    }

    /// Set the row search distance.
    #[must_use]
    pub fn with_row_distance(mut self, dy: u16) -> Self {
        self.row_distance = dy;
        self
    }

    /// Set the forward BCID window.
    #[must_use]
    pub fn with_bcid_distance(mut self, db: u16) -> Self {
        self.bcid_distance = db;
        self
    }

    /// Set the minimum committed cluster size.
    #[must_use]
    pub fn with_min_cluster_hits(mut self, hits: u16) -> Self {
        self.min_cluster_hits = hits;
        self
    }

    /// Set the maximum cluster size before abort.
    #[must_use]
    pub fn with_max_cluster_hits(mut self, hits: u16) -> Self {
        self.max_cluster_hits = hits;
        self
    }

    /// Set the per-hit ToT cap above which a cluster is aborted.
    #[must_use]
    pub fn with_max_cluster_hit_tot(mut self, tot: u8) -> Self {
        self.max_cluster_hit_tot = tot;
        self
    }

    /// Set the per-hit ToT cap above which a hit is dropped on insert.
    #[must_use]
    pub fn with_max_hit_tot(mut self, tot: u8) -> Self {
        self.max_hit_tot = tot;
        self
    }

    /// Enable or disable per-cluster summary output.
    #[must_use]
    pub fn with_cluster_info(mut self, enable: bool) -> Self {
        self.emit_cluster_info = enable;
        self
    }

    /// Enable or disable per-hit annotation output.
    #[must_use]
    pub fn with_hit_info(mut self, enable: bool) -> Self {
        self.emit_hit_info = enable;
        self
    }

    pub(crate) fn valid_column_distance(dx: u16) -> bool {
        dx > 1 && usize::from(dx) < COLUMNS - 1
    }

    pub(crate) fn valid_row_distance(dy: u16) -> bool {
        dy > 1 && usize::from(dy) < ROWS - 1
    }

    pub(crate) fn valid_bcid_distance(db: u16) -> bool {
        usize::from(db) < MAX_RELATIVE_BCID - 1
    }
}
