//! Cluster output records and caller-owned result buffers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hit::HitRecord;

/// Per-hit cluster annotation, indexed 1:1 with the input hit slice.
///
/// Carries every input field plus the cluster assignment. `cluster_id` is
/// `-1` while unassigned; hits dropped on insert, duplicate hits, and hits of
/// discarded clusters keep that value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct ClusterHit {
    /// Logical event number.
    pub event_number: u64,
    /// Trigger number from the readout system.
    pub trigger_number: u32,
    /// Service record word.
    pub service_record: u32,
    /// BCID offset within the event window.
    pub relative_bcid: u8,
    /// Level-1 trigger ID.
    pub lvl_id: u16,
    /// Pixel column, 1-based.
    pub column: u8,
    /// Pixel row, 1-based.
    pub row: u16,
    /// Time over threshold.
    pub tot: u8,
    /// Absolute bunch crossing ID.
    pub bcid: u16,
    /// TDC counter value.
    pub tdc: u16,
    /// Trigger status flags.
    pub trigger_status: u8,
    /// Event status flag bits.
    pub event_status: u16,
    /// Cluster ID within the event, `-1` while unassigned.
    pub cluster_id: i32,
    /// Whether this hit is its cluster's seed.
    pub is_seed: bool,
    /// Size of the committed cluster containing this hit, 0 if none.
    pub cluster_size: u16,
    /// Number of committed clusters in this hit's event.
    pub n_cluster: u16,
}

impl Default for ClusterHit {
    fn default() -> Self {
        Self {
            event_number: 0,
            trigger_number: 0,
            service_record: 0,
            relative_bcid: 0,
            lvl_id: 0,
            column: 0,
            row: 0,
            tot: 0,
            bcid: 0,
            tdc: 0,
            trigger_status: 0,
            event_status: 0,
            cluster_id: -1,
            is_seed: false,
            cluster_size: 0,
            n_cluster: 0,
        }
    }
}

impl ClusterHit {
    /// Annotation slot for a freshly inserted hit: pass-through fields
    /// copied, cluster assignment still open.
    #[must_use]
    pub fn unassigned(hit: &HitRecord) -> Self {
        Self {
            event_number: hit.event_number,
            trigger_number: hit.trigger_number,
            service_record: hit.service_record,
            relative_bcid: hit.relative_bcid,
            lvl_id: hit.lvl_id,
            column: hit.column,
            row: hit.row,
            tot: hit.tot,
            bcid: hit.bcid,
            tdc: hit.tdc,
            trigger_status: hit.trigger_status,
            event_status: hit.event_status,
            ..Self::default()
        }
    }
}

/// Per-cluster summary record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct ClusterInfo {
    /// Logical event number the cluster belongs to.
    pub event_number: u64,
    /// Cluster ID, restarting at 0 on every event.
    pub id: u16,
    /// Number of hits in the cluster.
    pub size: u16,
    /// Summed time over threshold.
    pub tot: u16,
    /// Summed calibrated charge.
    pub charge: f32,
    /// Seed pixel column, 1-based.
    pub seed_column: u8,
    /// Seed pixel row, 1-based.
    pub seed_row: u16,
    /// OR of the event status bits of the cluster's event.
    pub event_status: u16,
}

/// Caller-owned output buffers with fixed capacities.
///
/// The clusterizer clears both buffers at the start of every batch and never
/// grows them past their construction capacity; exceeding either capacity is
/// fatal for the batch in progress.
#[derive(Debug)]
pub struct ClusterResults {
    clusters: Vec<ClusterInfo>,
    cluster_hits: Vec<ClusterHit>,
    cluster_capacity: usize,
    hit_capacity: usize,
}

impl ClusterResults {
    /// Creates buffers holding up to `clusters` summaries and annotations for
    /// up to `hits` hits per batch.
    #[must_use]
    pub fn with_capacity(clusters: usize, hits: usize) -> Self {
        Self {
            clusters: Vec::with_capacity(clusters),
            cluster_hits: Vec::with_capacity(hits),
            cluster_capacity: clusters,
            hit_capacity: hits,
        }
    }

    /// Cluster summaries emitted by the last batch.
    #[must_use]
    pub fn clusters(&self) -> &[ClusterInfo] {
        &self.clusters
    }

    /// Per-hit annotations of the last batch, indexed like its hit slice.
    #[must_use]
    pub fn cluster_hits(&self) -> &[ClusterHit] {
        &self.cluster_hits
    }

    /// Configured summary capacity.
    #[must_use]
    pub fn cluster_capacity(&self) -> usize {
        self.cluster_capacity
    }

    /// Configured annotation capacity.
    #[must_use]
    pub fn hit_capacity(&self) -> usize {
        self.hit_capacity
    }

    /// Empties both buffers, then prepares one unassigned annotation slot per
    /// batch hit when annotation output is enabled.
    pub fn start_batch(&mut self, n_hits: usize, annotate: bool) -> Result<()> {
        self.clusters.clear();
        self.cluster_hits.clear();
        if annotate {
            if n_hits > self.hit_capacity {
                return Err(Error::HitBufferOverflow {
                    required: n_hits,
                    capacity: self.hit_capacity,
                });
            }
            self.cluster_hits.resize(n_hits, ClusterHit::default());
        }
        Ok(())
    }

    /// Whether one more summary fits.
    #[must_use]
    pub fn has_cluster_capacity(&self) -> bool {
        self.clusters.len() < self.cluster_capacity
    }

    /// Appends a cluster summary.
    pub fn push_cluster(&mut self, info: ClusterInfo) -> Result<()> {
        if !self.has_cluster_capacity() {
            return Err(Error::ClusterBufferOverflow {
                capacity: self.cluster_capacity,
            });
        }
        self.clusters.push(info);
        Ok(())
    }

    /// Mutable annotation slots for the engine's assignment passes.
    pub fn cluster_hits_mut(&mut self) -> &mut [ClusterHit] {
        &mut self.cluster_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_annotation_copies_passthrough_fields() {
        let mut hit = HitRecord::new(9, 17, 200, 2, 11);
        hit.trigger_number = 77;
        hit.service_record = 5;
        hit.event_status = 0b1010;
        let slot = ClusterHit::unassigned(&hit);
        assert_eq!(slot.event_number, 9);
        assert_eq!(slot.trigger_number, 77);
        assert_eq!(slot.service_record, 5);
        assert_eq!(slot.column, 17);
        assert_eq!(slot.row, 200);
        assert_eq!(slot.tot, 11);
        assert_eq!(slot.event_status, 0b1010);
        assert_eq!(slot.cluster_id, -1);
        assert!(!slot.is_seed);
        assert_eq!(slot.cluster_size, 0);
    }

    #[test]
    fn test_start_batch_rejects_oversized_batch() {
        let mut results = ClusterResults::with_capacity(4, 2);
        assert!(results.start_batch(3, true).is_err());
        assert!(results.start_batch(3, false).is_ok());
        assert!(results.start_batch(2, true).is_ok());
        assert_eq!(results.cluster_hits().len(), 2);
    }

    #[test]
    fn test_push_cluster_enforces_capacity() {
        let mut results = ClusterResults::with_capacity(1, 0);
        assert!(results.push_cluster(ClusterInfo::default()).is_ok());
        assert!(results.push_cluster(ClusterInfo::default()).is_err());
        assert_eq!(results.clusters().len(), 1);
    }
}
