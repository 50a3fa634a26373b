//! Error types for the clusterizer workspace.

use thiserror::Error;

/// Result type alias using the clusterizer [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal clustering errors.
///
/// Every variant indicates caller miscapacity and aborts the batch in
/// progress; the engine must be reset before it accepts further batches.
#[derive(Error, Debug)]
pub enum Error {
    /// More committed clusters than the summary buffer can hold.
    #[error("cluster buffer full: capacity {capacity} exceeded")]
    ClusterBufferOverflow {
        /// Configured summary buffer capacity.
        capacity: usize,
    },

    /// The batch has more hits than the annotation buffer can hold.
    #[error("hit annotation buffer too small: batch has {required} hits, capacity is {capacity}")]
    HitBufferOverflow {
        /// Hits in the submitted batch.
        required: usize,
        /// Configured annotation buffer capacity.
        capacity: usize,
    },

    /// A committed cluster size falls outside the size histogram.
    #[error("cluster size {size} does not fit into the cluster size histogram")]
    SizeBinOverflow {
        /// Offending cluster size.
        size: usize,
    },

    /// A committed cluster ToT sum falls outside the ToT histogram.
    #[error("cluster tot {tot} with cluster size {size} does not fit into the cluster tot histogram")]
    TotBinOverflow {
        /// Offending summed ToT.
        tot: usize,
        /// Size of the offending cluster.
        size: usize,
    },
}
