//! Result histogram bank.

use fei4pix_core::error::{Error, Result};
use fei4pix_core::geometry::{
    MAX_CHARGE_BINS, MAX_POS_X_BINS, MAX_POS_Y_BINS, MAX_SIZE_BINS, MAX_TOT_BINS,
};

/// Accumulates per-cluster summary histograms.
///
/// The size histogram counts committed clusters per cluster size. The ToT
/// histogram is a flat row-major `[size][tot]` array whose `size = 0` row
/// aggregates all cluster sizes. Charge and position banks are allocated and
/// cleared alongside, but nothing accumulates into them; callers that read
/// them see zero-filled arrays of the declared shape.
#[derive(Debug)]
pub struct HistogramBank {
    size: Vec<u32>,
    tot: Vec<u32>,
    charge: Vec<u32>,
    position: Vec<u32>,
}

impl HistogramBank {
    /// Allocates the full bank, zero-filled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: vec![0; MAX_SIZE_BINS],
            tot: vec![0; MAX_SIZE_BINS * MAX_TOT_BINS],
            charge: vec![0; MAX_SIZE_BINS * MAX_CHARGE_BINS],
            position: vec![0; MAX_POS_X_BINS * MAX_POS_Y_BINS],
        }
    }

    /// Records one committed cluster, or fails without touching any bin when
    /// either value falls outside its histogram.
    pub fn record(&mut self, size: usize, tot: usize) -> Result<()> {
        if size >= MAX_SIZE_BINS {
            return Err(Error::SizeBinOverflow { size });
        }
        if tot >= MAX_TOT_BINS {
            return Err(Error::TotBinOverflow { tot, size });
        }
        self.size[size] += 1;
        self.tot[tot + size * MAX_TOT_BINS] += 1;
        self.tot[tot] += 1; // the size = 0 row aggregates all cluster sizes
        Ok(())
    }

    /// Cluster-size histogram, `MAX_SIZE_BINS` long.
    #[must_use]
    pub fn size_hist(&self) -> &[u32] {
        &self.size
    }

    /// Cluster-ToT histogram, flat `MAX_SIZE_BINS x MAX_TOT_BINS` row-major.
    #[must_use]
    pub fn tot_hist(&self) -> &[u32] {
        &self.tot
    }

    /// Cluster-charge histogram; allocated but never written.
    #[must_use]
    pub fn charge_hist(&self) -> &[u32] {
        &self.charge
    }

    /// Cluster-position histogram; allocated but never written.
    #[must_use]
    pub fn position_hist(&self) -> &[u32] {
        &self.position
    }

    /// Zeroes every bank.
    pub fn clear(&mut self) {
        self.size.fill(0);
        self.tot.fill(0);
        self.charge.fill(0);
        self.position.fill(0);
    }
}

impl Default for HistogramBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fills_size_and_tot_rows() {
        let mut bank = HistogramBank::new();
        bank.record(2, 9).unwrap();
        bank.record(2, 9).unwrap();
        bank.record(1, 7).unwrap();
        assert_eq!(bank.size_hist()[2], 2);
        assert_eq!(bank.size_hist()[1], 1);
        assert_eq!(bank.tot_hist()[9 + 2 * MAX_TOT_BINS], 2);
        assert_eq!(bank.tot_hist()[7 + MAX_TOT_BINS], 1);
        // aggregate row
        assert_eq!(bank.tot_hist()[9], 2);
        assert_eq!(bank.tot_hist()[7], 1);
    }

    #[test]
    fn test_record_rejects_out_of_range_bins() {
        let mut bank = HistogramBank::new();
        assert!(bank.record(MAX_SIZE_BINS, 0).is_err());
        assert!(bank.record(1, MAX_TOT_BINS).is_err());
        // nothing was written by the failed calls
        assert!(bank.size_hist().iter().all(|&b| b == 0));
        assert!(bank.tot_hist().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_disabled_banks_stay_zeroed() {
        let mut bank = HistogramBank::new();
        bank.record(1, 1).unwrap();
        assert_eq!(bank.charge_hist().len(), MAX_SIZE_BINS * MAX_CHARGE_BINS);
        assert_eq!(bank.position_hist().len(), MAX_POS_X_BINS * MAX_POS_Y_BINS);
        assert!(bank.charge_hist().iter().all(|&b| b == 0));
        assert!(bank.position_hist().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clear_zeroes_accumulated_bins() {
        let mut bank = HistogramBank::new();
        bank.record(3, 20).unwrap();
        bank.clear();
        assert!(bank.size_hist().iter().all(|&b| b == 0));
        assert!(bank.tot_hist().iter().all(|&b| b == 0));
    }
}
