//! The streaming hit clusterizer engine.
//!
//! Consumes event-ordered hit batches, groups adjacent hits with a bounded
//! flood fill over the dense `(column, row, relative BCID)` grid, and emits
//! cluster summaries, optional per-hit annotations, and summary histograms.

use std::ops::Range;

use log::{debug, warn};

use fei4pix_core::cluster::{ClusterHit, ClusterInfo, ClusterResults};
use fei4pix_core::error::{Error, Result};
use fei4pix_core::geometry::{COLUMNS, MAX_RELATIVE_BCID, ROWS};
use fei4pix_core::hit::HitRecord;

use crate::config::ClusterizerConfig;
use crate::event::EventState;
use crate::grid::{ChargeLookup, HitGrid};
use crate::histogram::HistogramBank;

/// Per-batch counters, reset at every `add_hits` call.
#[derive(Clone, Debug, Default)]
pub struct BatchStatistics {
    /// Hits handed to the driver.
    pub hits_processed: usize,
    /// Hits dropped for exceeding the insert ToT cap or lying outside the grid.
    pub hits_dropped: usize,
    /// Hits ignored because their cell was already occupied.
    pub duplicate_hits: usize,
    /// Events closed.
    pub events_processed: usize,
    /// Clusters committed to the outputs.
    pub clusters_committed: usize,
    /// Clusters discarded for falling below the minimum size.
    pub clusters_undersized: usize,
    /// Clusters dropped by the size or per-hit ToT caps.
    pub clusters_aborted: usize,
    /// Neighbour cells probed by the flood fill.
    pub search_steps: u64,
}

/// Neighbour probe offsets per search layer, as multipliers of the current
/// `(column step, row step)`. The first entry revisits the frame's own pixel
/// in later BCID layers; the rest walk the compass (up, up-right, right,
/// down-right, down, down-left, left, up-left).
const DIRECTIONS: [(i32, i32); 9] = [
    (0, 0),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// One suspended neighbour scan of the flood fill.
///
/// Replaces recursion: a frame remembers where its nested
/// `(BCID, column step, row step, direction)` scan stopped and which
/// directions it has already descended into. The direction latches suppress
/// re-descending along one axis at increasing step sizes; they are local to
/// the frame, so a neighbour's scan starts fresh.
#[derive(Clone, Copy, Debug)]
struct Frame {
    column: i32,
    row: i32,
    bcid: usize,
    step_x: u16,
    step_y: u16,
    dir: u8,
    taken: u16,
}

impl Frame {
    fn new(column: usize, row: usize, bcid_start: usize) -> Self {
        Self {
            column: column as i32,
            row: row as i32,
            bcid: bcid_start,
            step_x: 1,
            step_y: 1,
            dir: 0,
            taken: 0,
        }
    }
}

/// Scratch state of the cluster currently being grown.
#[derive(Debug, Default)]
struct ClusterScratch {
    size: u32,
    tot_sum: u32,
    charge_sum: f32,
    max_tot: i16,
    seed_column: usize,
    seed_row: usize,
    seed_hit_index: u32,
    rel_bcid: usize,
    abort: bool,
    hit_indices: Vec<u32>,
}

impl ClusterScratch {
    fn clear(&mut self) {
        self.size = 0;
        self.tot_sum = 0;
        self.charge_sum = 0.0;
        self.max_tot = 0;
        self.seed_column = 0;
        self.seed_row = 0;
        self.seed_hit_index = 0;
        self.rel_bcid = 0;
        self.abort = false;
        self.hit_indices.clear();
    }
}

/// Streaming pixel-hit clusterizer.
///
/// Single-threaded and non-reentrant: one instance owns its grid, histogram
/// bank and scratch state, and every call completes synchronously. Separate
/// instances share nothing and may run in parallel.
///
/// Hits are submitted in event order via [`add_hits`](Self::add_hits); the
/// engine splits the stream on event-number changes and drains each event's
/// grid into clusters before the next event's hits are inserted. After a
/// fatal error the batch is abandoned and [`reset`](Self::reset) is required
/// before further batches.
pub struct Clusterizer {
    config: ClusterizerConfig,
    grid: HitGrid,
    charge: ChargeLookup,
    histograms: HistogramBank,
    event: EventState,
    scratch: ClusterScratch,
    frames: Vec<Frame>,
    committed_sizes: Vec<u16>,
    n_clusters: u32,
    statistics: BatchStatistics,
}

impl Clusterizer {
    /// Creates an engine with the given configuration. The dense maps and
    /// histogram banks are allocated here and reused for the engine's
    /// lifetime.
    #[must_use]
    pub fn new(config: ClusterizerConfig) -> Self {
        Self {
            config,
            grid: HitGrid::new(),
            charge: ChargeLookup::new(),
            histograms: HistogramBank::new(),
            event: EventState::new(),
            scratch: ClusterScratch::default(),
            frames: Vec::new(),
            committed_sizes: Vec::new(),
            n_clusters: 0,
            statistics: BatchStatistics::default(),
        }
    }

    /// Zeroes every externally observable counter, empties the grid and
    /// clears the histogram bank. Charge calibration survives.
    pub fn reset(&mut self) {
        debug!("reset");
        self.grid.reset();
        self.histograms.clear();
        self.event.clear();
        self.scratch.clear();
        self.frames.clear();
        self.committed_sizes.clear();
        self.n_clusters = 0;
        self.statistics = BatchStatistics::default();
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ClusterizerConfig {
        &self.config
    }

    /// Sets the column search distance; out-of-range values keep the
    /// previous setting.
    pub fn set_column_cluster_distance(&mut self, dx: u16) {
        if ClusterizerConfig::valid_column_distance(dx) {
            self.config.column_distance = dx;
        } else {
            warn!(
                "column cluster distance {dx} rejected, keeping {}",
                self.config.column_distance
            );
        }
    }

    /// Sets the row search distance; out-of-range values keep the previous
    /// setting.
    pub fn set_row_cluster_distance(&mut self, dy: u16) {
        if ClusterizerConfig::valid_row_distance(dy) {
            self.config.row_distance = dy;
        } else {
            warn!(
                "row cluster distance {dy} rejected, keeping {}",
                self.config.row_distance
            );
        }
    }

    /// Sets the forward BCID window; out-of-range values keep the previous
    /// setting.
    pub fn set_bcid_cluster_distance(&mut self, db: u16) {
        if ClusterizerConfig::valid_bcid_distance(db) {
            self.config.bcid_distance = db;
        } else {
            warn!(
                "BCID cluster distance {db} rejected, keeping {}",
                self.config.bcid_distance
            );
        }
    }

    /// Sets the minimum committed cluster size.
    pub fn set_min_cluster_hits(&mut self, hits: u16) {
        self.config.min_cluster_hits = hits;
    }

    /// Sets the cluster size above which a cluster is aborted.
    pub fn set_max_cluster_hits(&mut self, hits: u16) {
        self.config.max_cluster_hits = hits;
    }

    /// Sets the per-hit ToT above which a cluster is aborted.
    pub fn set_max_cluster_hit_tot(&mut self, tot: u8) {
        self.config.max_cluster_hit_tot = tot;
    }

    /// Sets the per-hit ToT above which a hit is dropped on insert.
    pub fn set_max_hit_tot(&mut self, tot: u8) {
        self.config.max_hit_tot = tot;
    }

    /// Enables or disables per-cluster summary output.
    pub fn set_emit_cluster_info(&mut self, enable: bool) {
        self.config.emit_cluster_info = enable;
    }

    /// Enables or disables per-hit annotation output.
    pub fn set_emit_hit_info(&mut self, enable: bool) {
        self.config.emit_hit_info = enable;
    }

    /// Stores an externally calibrated charge for a 1-based pixel and ToT.
    pub fn set_pixel_charge(&mut self, column: u8, row: u16, tot: u8, charge: f32) {
        if column == 0 || row == 0 {
            return;
        }
        self.charge.set(
            usize::from(column) - 1,
            usize::from(row) - 1,
            usize::from(tot),
            charge,
        );
    }

    /// Clusters committed by the last batch.
    #[must_use]
    pub fn n_clusters(&self) -> u32 {
        self.n_clusters
    }

    /// Counters of the last batch.
    #[must_use]
    pub fn statistics(&self) -> &BatchStatistics {
        &self.statistics
    }

    /// Cluster-size histogram.
    #[must_use]
    pub fn cluster_size_hist(&self) -> &[u32] {
        self.histograms.size_hist()
    }

    /// Cluster-ToT histogram, flat row-major `[size][tot]`.
    #[must_use]
    pub fn cluster_tot_hist(&self) -> &[u32] {
        self.histograms.tot_hist()
    }

    /// Cluster-charge histogram; allocated but never accumulated.
    #[must_use]
    pub fn cluster_charge_hist(&self) -> &[u32] {
        self.histograms.charge_hist()
    }

    /// Cluster-position histogram; allocated but never accumulated.
    #[must_use]
    pub fn cluster_position_hist(&self) -> &[u32] {
        self.histograms.position_hist()
    }

    /// Clusterizes a batch of event-ordered hits.
    ///
    /// Splits the batch on event-number changes, drains each event's grid
    /// into clusters, and writes summaries and annotations into `results`.
    /// The final event of the batch is closed at the end of the call, so
    /// batches must be aligned on event boundaries; a batch continuing the
    /// previous batch's last event is flagged but processed.
    pub fn add_hits(&mut self, hits: &[HitRecord], results: &mut ClusterResults) -> Result<()> {
        debug!("add_hits: {} hits", hits.len());
        self.n_clusters = 0;
        self.statistics = BatchStatistics::default();
        self.statistics.hits_processed = hits.len();
        results.start_batch(hits.len(), self.config.emit_hit_info)?;
        if hits.is_empty() {
            return Ok(());
        }
        if self.event.number == Some(hits[0].event_number) {
            warn!(
                "batch does not start on an event boundary: event {} continues from the previous batch",
                hits[0].event_number
            );
        }
        let mut event_start = 0;
        for (index, hit) in hits.iter().enumerate() {
            if self.event.number != Some(hit.event_number) {
                self.close_event(event_start..index, results)?;
                self.event.clear();
                self.committed_sizes.clear();
                self.event.number = Some(hit.event_number);
                event_start = index;
            }
            self.insert_hit(hit, index as u32, results);
        }
        // the final event closes here; its state is kept so a misaligned
        // follow-up batch continues with consistent cluster IDs
        self.close_event(event_start..hits.len(), results)?;
        Ok(())
    }

    /// Inserts one hit into the grid and the event accumulator.
    fn insert_hit(&mut self, hit: &HitRecord, hit_index: u32, results: &mut ClusterResults) {
        self.event.status |= hit.event_status;

        if hit.tot > self.config.max_hit_tot {
            self.statistics.hits_dropped += 1;
            return;
        }

        if !(1..=COLUMNS as u8).contains(&hit.column)
            || !(1..=ROWS as u16).contains(&hit.row)
            || usize::from(hit.relative_bcid) >= MAX_RELATIVE_BCID
        {
            warn!(
                "event {}: hit at column/row/BCID {}/{}/{} outside the detector grid, dropped",
                hit.event_number, hit.column, hit.row, hit.relative_bcid
            );
            self.statistics.hits_dropped += 1;
            return;
        }

        if self.config.emit_hit_info {
            results.cluster_hits_mut()[hit_index as usize] = ClusterHit::unassigned(hit);
        }

        let column = usize::from(hit.column) - 1;
        let row = usize::from(hit.row) - 1;
        let rel_bcid = usize::from(hit.relative_bcid);

        if self.grid.insert(column, row, rel_bcid, hit.tot, hit_index) {
            self.event.expand(column, row, hit.relative_bcid);
        } else {
            warn!(
                "event {}: duplicate hit at column/row/relative BCID {}/{}/{}, ignored",
                hit.event_number, hit.column, hit.row, hit.relative_bcid
            );
            self.statistics.duplicate_hits += 1;
        }
    }

    /// Clusterizes the current event and stamps its annotations.
    fn close_event(&mut self, range: Range<usize>, results: &mut ClusterResults) -> Result<()> {
        if !self.clusterize(results)? {
            warn!(
                "event {:?}: not all hits clustered, sweeping {} leftover hits",
                self.event.number,
                self.grid.live_hits()
            );
            self.log_unclustered();
            self.grid.clear_used_cells();
        }
        if !range.is_empty() {
            self.statistics.events_processed += 1;
        }
        if self.config.emit_hit_info {
            self.stamp_annotations(range, results);
        }
        Ok(())
    }

    /// Drains the grid for the current event, growing a cluster from every
    /// still-occupied cell in deterministic scan order (BCID outermost, then
    /// column, then row). Returns whether the grid is empty afterwards.
    fn clusterize(&mut self, results: &mut ClusterResults) -> Result<bool> {
        if self.grid.live_hits() == 0 {
            return Ok(true);
        }
        let Some(bounds) = self.event.bounds() else {
            return Ok(true);
        };
        debug!(
            "clusterize: event {:?}, {} live hits, columns {}..={}, rows {}..={}, BCIDs {}..={}",
            self.event.number,
            self.grid.live_hits(),
            bounds.min_column,
            bounds.max_column,
            bounds.min_row,
            bounds.max_row,
            bounds.bcid_first,
            bounds.bcid_last
        );
        for bcid in bounds.bcid_first..=bounds.bcid_last {
            for column in bounds.min_column..=bounds.max_column {
                for row in bounds.min_row..=bounds.max_row {
                    if self.grid.occupied(column as i32, row as i32, bcid as i32) {
                        self.build_cluster(column, row, bcid, bounds.bcid_last, results)?;
                    }
                    if self.grid.live_hits() == 0 {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(self.grid.live_hits() == 0)
    }

    /// Grows one cluster from a seed cell, then commits or discards it.
    fn build_cluster(
        &mut self,
        column: usize,
        row: usize,
        bcid: usize,
        bcid_last: usize,
        results: &mut ClusterResults,
    ) -> Result<()> {
        self.scratch.clear();
        self.scratch.rel_bcid = bcid;
        let window_end = (bcid + usize::from(self.config.bcid_distance)).min(bcid_last);

        self.frames.clear();
        if !self.consume(column, row, bcid, results) {
            self.frames.push(Frame::new(column, row, bcid));
        }

        while let Some(&top) = self.frames.last() {
            let mut frame = top;
            let mut found: Option<(usize, usize, usize)> = None;
            while frame.bcid <= window_end {
                let (sx, sy) = DIRECTIONS[usize::from(frame.dir)];
                let mask = 1u16 << frame.dir;
                let target_column = frame.column + sx * i32::from(frame.step_x);
                let target_row = frame.row + sy * i32::from(frame.step_y);
                let target_bcid = frame.bcid;
                self.statistics.search_steps += 1;
                let descend = frame.taken & mask == 0
                    && self
                        .grid
                        .occupied(target_column, target_row, target_bcid as i32);
                if descend {
                    frame.taken |= mask;
                }

                frame.dir += 1;
                if usize::from(frame.dir) == DIRECTIONS.len() {
                    frame.dir = 0;
                    frame.step_y += 1;
                    if frame.step_y > self.config.row_distance {
                        frame.step_y = 1;
                        frame.step_x += 1;
                        if frame.step_x > self.config.column_distance {
                            frame.step_x = 1;
                            frame.bcid += 1;
                        }
                    }
                }

                if descend {
                    found = Some((target_column as usize, target_row as usize, target_bcid));
                    break;
                }
            }

            let last = self.frames.len() - 1;
            self.frames[last] = frame;

            match found {
                Some((next_column, next_row, next_bcid)) => {
                    if self.consume(next_column, next_row, next_bcid, results) {
                        self.frames.clear();
                        break;
                    }
                    // the new frame's window restarts at the cluster BCID
                    self.frames
                        .push(Frame::new(next_column, next_row, self.scratch.rel_bcid));
                }
                None => {
                    self.frames.pop();
                }
            }
        }

        self.finish_cluster(results)
    }

    /// Folds an occupied cell into the cluster scratch and clears it from
    /// the grid. Returns `true` when the grid has just become empty.
    fn consume(
        &mut self,
        column: usize,
        row: usize,
        bcid: usize,
        results: &mut ClusterResults,
    ) -> bool {
        let tot = self.grid.tot_at(column, row, bcid);
        let hit_index = self.grid.hit_index_at(column, row, bcid);

        self.scratch.size += 1;

        // ties go to the most recently scanned cell
        if tot >= self.scratch.max_tot && tot <= i16::from(self.config.max_hit_tot) {
            self.scratch.max_tot = tot;
            self.scratch.seed_column = column;
            self.scratch.seed_row = row;
            self.scratch.seed_hit_index = hit_index;
        }

        if tot > i16::from(self.config.max_cluster_hit_tot) {
            self.scratch.abort = true;
        }
        if self.scratch.size > u32::from(self.config.max_cluster_hits) {
            self.scratch.abort = true;
        }

        self.scratch.tot_sum += tot as u32;
        self.scratch.charge_sum += self.charge.get(column, row, tot as usize);

        if self.config.emit_hit_info {
            results.cluster_hits_mut()[hit_index as usize].cluster_id =
                i32::from(self.event.next_cluster_id);
            self.scratch.hit_indices.push(hit_index);
        }

        self.grid.take(column, row, bcid)
    }

    /// Commits the grown cluster to every output, or discards it.
    fn finish_cluster(&mut self, results: &mut ClusterResults) -> Result<()> {
        if self.scratch.size < u32::from(self.config.min_cluster_hits) {
            warn!(
                "event {:?}: cluster size {} below minimum {}, discarded",
                self.event.number, self.scratch.size, self.config.min_cluster_hits
            );
            self.statistics.clusters_undersized += 1;
            self.discard_annotations(results);
            return Ok(());
        }
        if self.scratch.abort {
            self.statistics.clusters_aborted += 1;
            self.discard_annotations(results);
            return Ok(());
        }

        // all or nothing: the summary slot and both histogram bins are
        // checked before any of them is written
        if self.config.emit_cluster_info && !results.has_cluster_capacity() {
            return Err(Error::ClusterBufferOverflow {
                capacity: results.cluster_capacity(),
            });
        }
        self.histograms
            .record(self.scratch.size as usize, self.scratch.tot_sum as usize)?;

        if self.config.emit_cluster_info {
            results.push_cluster(ClusterInfo {
                event_number: self.event.number.unwrap_or(0),
                id: self.event.next_cluster_id,
                size: self.scratch.size as u16,
                tot: self.scratch.tot_sum as u16,
                charge: self.scratch.charge_sum,
                seed_column: (self.scratch.seed_column + 1) as u8,
                seed_row: (self.scratch.seed_row + 1) as u16,
                event_status: self.event.status,
            })?;
        }
        if self.config.emit_hit_info {
            results.cluster_hits_mut()[self.scratch.seed_hit_index as usize].is_seed = true;
        }

        self.committed_sizes.push(self.scratch.size as u16);
        self.n_clusters += 1;
        self.statistics.clusters_committed += 1;
        self.event.next_cluster_id += 1;
        Ok(())
    }

    /// Returns the annotations of a discarded cluster to the unassigned
    /// state.
    fn discard_annotations(&mut self, results: &mut ClusterResults) {
        if !self.config.emit_hit_info {
            return;
        }
        let slots = results.cluster_hits_mut();
        for &hit_index in &self.scratch.hit_indices {
            slots[hit_index as usize].cluster_id = -1;
        }
    }

    /// Writes the per-event fields onto every annotation of a just-closed
    /// event.
    fn stamp_annotations(&mut self, range: Range<usize>, results: &mut ClusterResults) {
        let n_cluster = self.committed_sizes.len() as u16;
        for slot in &mut results.cluster_hits_mut()[range] {
            slot.n_cluster = n_cluster;
            slot.cluster_size = if slot.cluster_id >= 0 {
                self.committed_sizes[slot.cluster_id as usize]
            } else {
                0
            };
        }
    }

    fn log_unclustered(&self) {
        if self.grid.live_hits() > 100 {
            debug!("{} unclustered hits, not listing", self.grid.live_hits());
            return;
        }
        for (column, row, bcid, tot) in self.grid.occupied_cells() {
            debug!("unclustered hit: column/row/BCID/ToT = {column}/{row}/{bcid}/{tot}");
        }
    }
}

impl Default for Clusterizer {
    fn default() -> Self {
        Self::new(ClusterizerConfig::default())
    }
}
