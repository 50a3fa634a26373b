//! fei4pix-core: data model for FE-I4 pixel-hit clustering.
//!
//! This crate provides the detector geometry constants, the interpreted hit
//! record consumed by the clusterizer, the cluster output records with their
//! caller-owned result buffers, and the shared error type.

pub mod cluster;
pub mod error;
pub mod geometry;
pub mod hit;

pub use cluster::{ClusterHit, ClusterInfo, ClusterResults};
pub use error::{Error, Result};
pub use hit::HitRecord;
