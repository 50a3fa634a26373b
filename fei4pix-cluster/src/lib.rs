//! fei4pix-cluster: streaming clusterizer for FE-I4 hit data.
//!
//! Groups spatially and temporally adjacent hits of one event into clusters
//! with a bounded flood fill over a dense `(column, row, relative BCID)`
//! grid, emits per-cluster summaries and optional per-hit annotations, and
//! accumulates cluster-size and cluster-ToT summary histograms.
//!
//! # Example
//! ```
//! use fei4pix_cluster::{ClusterResults, Clusterizer, HitRecord};
//!
//! let mut clusterizer = Clusterizer::default();
//! let mut results = ClusterResults::with_capacity(1024, 4096);
//! let hits = vec![
//!     HitRecord::new(1, 5, 10, 0, 4),
//!     HitRecord::new(1, 6, 10, 0, 5),
//! ];
//! clusterizer.add_hits(&hits, &mut results).unwrap();
//! assert_eq!(results.clusters().len(), 1);
//! assert_eq!(results.clusters()[0].size, 2);
//! ```

mod clusterizer;
mod config;
mod event;
mod grid;
mod histogram;

pub use clusterizer::{BatchStatistics, Clusterizer};
pub use config::ClusterizerConfig;
pub use grid::{ChargeLookup, HitGrid};
pub use histogram::HistogramBank;

// Re-export the core data types for convenience
pub use fei4pix_core::{ClusterHit, ClusterInfo, ClusterResults, Error, HitRecord, Result};
