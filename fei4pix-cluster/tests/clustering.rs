use fei4pix_cluster::{ClusterResults, Clusterizer, ClusterizerConfig, HitRecord};
use fei4pix_core::geometry::MAX_TOT_BINS;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(clusterizer: &mut Clusterizer, hits: &[HitRecord]) -> ClusterResults {
    let mut results = ClusterResults::with_capacity(256, 256);
    clusterizer.add_hits(hits, &mut results).unwrap();
    results
}

#[test]
fn test_single_isolated_hit() {
    init_logs();
    let mut clusterizer = Clusterizer::default();
    let results = run(&mut clusterizer, &[HitRecord::new(1, 5, 10, 0, 7)]);

    assert_eq!(results.clusters().len(), 1);
    let cluster = &results.clusters()[0];
    assert_eq!(cluster.event_number, 1);
    assert_eq!(cluster.id, 0);
    assert_eq!(cluster.size, 1);
    assert_eq!(cluster.tot, 7);
    assert_eq!(cluster.seed_column, 5);
    assert_eq!(cluster.seed_row, 10);

    assert_eq!(clusterizer.n_clusters(), 1);
    assert_eq!(clusterizer.cluster_size_hist()[1], 1);
    assert_eq!(clusterizer.cluster_tot_hist()[7 + MAX_TOT_BINS], 1);
    assert_eq!(clusterizer.cluster_tot_hist()[7], 1);
}

#[test]
fn test_two_adjacent_hits_merge_and_higher_tot_seeds() {
    let mut clusterizer = Clusterizer::default();
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 0, 4), HitRecord::new(1, 6, 10, 0, 5)],
    );

    assert_eq!(results.clusters().len(), 1);
    let cluster = &results.clusters()[0];
    assert_eq!(cluster.size, 2);
    assert_eq!(cluster.tot, 9);
    assert_eq!(cluster.seed_column, 6);
    assert_eq!(cluster.seed_row, 10);
    assert_eq!(clusterizer.cluster_size_hist()[2], 1);
}

#[test]
fn test_diagonal_hits_beyond_window_stay_separate() {
    let mut clusterizer = Clusterizer::default();
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 0, 4), HitRecord::new(1, 7, 13, 0, 4)],
    );

    assert_eq!(results.clusters().len(), 2);
    assert!(results.clusters().iter().all(|c| c.size == 1));
    assert_eq!(results.clusters()[0].id, 0);
    assert_eq!(results.clusters()[1].id, 1);
    assert_eq!(clusterizer.cluster_size_hist()[1], 2);
}

#[test]
fn test_temporal_spread_merges_across_bcids() {
    let mut clusterizer = Clusterizer::default();
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 0, 4), HitRecord::new(1, 5, 10, 3, 4)],
    );

    assert_eq!(results.clusters().len(), 1);
    assert_eq!(results.clusters()[0].size, 2);
    assert_eq!(results.clusters()[0].tot, 8);
}

#[test]
fn test_bcid_window_is_forward_only() {
    // the second hit sits before the first inserted BCID; the forward-only
    // window cannot reach it and the leftover is swept at event close
    let mut clusterizer = Clusterizer::default();
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 2, 4), HitRecord::new(1, 5, 10, 0, 4)],
    );

    assert_eq!(results.clusters().len(), 1);
    assert_eq!(results.clusters()[0].size, 1);

    // the sweep leaves the engine clean for the next event
    let results = run(&mut clusterizer, &[HitRecord::new(2, 5, 10, 0, 4)]);
    assert_eq!(results.clusters().len(), 1);
    assert_eq!(results.clusters()[0].event_number, 2);
}

#[test]
fn test_event_split_restarts_cluster_ids() {
    let mut clusterizer = Clusterizer::default();
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 0, 4), HitRecord::new(2, 5, 10, 0, 4)],
    );

    assert_eq!(results.clusters().len(), 2);
    assert_eq!(results.clusters()[0].event_number, 1);
    assert_eq!(results.clusters()[0].id, 0);
    assert_eq!(results.clusters()[1].event_number, 2);
    assert_eq!(results.clusters()[1].id, 0);
    assert_eq!(clusterizer.statistics().events_processed, 2);
}

#[test]
fn test_oversize_cluster_aborts_silently() {
    init_logs();
    let mut clusterizer = Clusterizer::default();
    // ten hits in one column, each within the row window of its neighbours
    let hits: Vec<HitRecord> = (0..10)
        .map(|i| HitRecord::new(1, 5, 10 + i, 0, 4))
        .collect();
    let results = run(&mut clusterizer, &hits);

    assert!(results.clusters().is_empty());
    assert_eq!(clusterizer.n_clusters(), 0);
    assert_eq!(clusterizer.statistics().clusters_aborted, 1);
    assert!(clusterizer.cluster_size_hist().iter().all(|&b| b == 0));

    // the grid was drained; the next event clusters normally
    let results = run(&mut clusterizer, &[HitRecord::new(2, 5, 10, 0, 4)]);
    assert_eq!(results.clusters().len(), 1);
    assert_eq!(clusterizer.cluster_size_hist()[1], 1);
}

#[test]
fn test_hot_hit_aborts_whole_cluster() {
    let mut clusterizer =
        Clusterizer::new(ClusterizerConfig::default().with_max_hit_tot(15));
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 0, 4), HitRecord::new(1, 6, 10, 0, 14)],
    );

    // ToT 14 passes the insert cap but trips the per-hit cluster cap
    assert!(results.clusters().is_empty());
    assert_eq!(clusterizer.statistics().clusters_aborted, 1);
    assert!(clusterizer.cluster_size_hist().iter().all(|&b| b == 0));
}

#[test]
fn test_undersized_cluster_is_discarded() {
    let mut clusterizer =
        Clusterizer::new(ClusterizerConfig::default().with_min_cluster_hits(2));
    let results = run(&mut clusterizer, &[HitRecord::new(1, 5, 10, 0, 4)]);

    assert!(results.clusters().is_empty());
    assert_eq!(clusterizer.statistics().clusters_undersized, 1);
    assert!(clusterizer.cluster_size_hist().iter().all(|&b| b == 0));
}

#[test]
fn test_size_histogram_totals_match_committed_clusters() {
    let mut clusterizer = Clusterizer::default();
    let hits = [
        HitRecord::new(1, 5, 10, 0, 4),
        HitRecord::new(1, 6, 10, 0, 5),
        HitRecord::new(1, 40, 200, 0, 3),
        HitRecord::new(2, 70, 300, 1, 2),
    ];
    run(&mut clusterizer, &hits);

    let committed: u32 = clusterizer.cluster_size_hist().iter().sum();
    assert_eq!(committed, clusterizer.n_clusters());
    assert_eq!(committed, 3);
    // the aggregate ToT row counts every committed cluster once
    let aggregate: u32 = clusterizer.cluster_tot_hist()[..MAX_TOT_BINS].iter().sum();
    assert_eq!(aggregate, 3);
}

#[test]
fn test_disabled_histograms_read_as_zero() {
    let mut clusterizer = Clusterizer::default();
    run(&mut clusterizer, &[HitRecord::new(1, 5, 10, 0, 7)]);
    assert!(clusterizer.cluster_charge_hist().iter().all(|&b| b == 0));
    assert!(clusterizer.cluster_position_hist().iter().all(|&b| b == 0));
}

#[test]
fn test_annotations_cover_every_hit() {
    let mut clusterizer =
        Clusterizer::new(ClusterizerConfig::default().with_hit_info(true));
    let hits = [
        HitRecord::new(1, 5, 10, 0, 4),
        HitRecord::new(1, 6, 10, 0, 5),
        HitRecord::new(1, 30, 30, 0, 3),
    ];
    let results = run(&mut clusterizer, &hits);

    let annotations = results.cluster_hits();
    assert_eq!(annotations.len(), hits.len());

    // both hits of the first cluster share its id, the higher ToT is the seed
    assert_eq!(annotations[0].cluster_id, 0);
    assert_eq!(annotations[1].cluster_id, 0);
    assert!(!annotations[0].is_seed);
    assert!(annotations[1].is_seed);
    assert_eq!(annotations[0].cluster_size, 2);
    assert_eq!(annotations[1].cluster_size, 2);

    assert_eq!(annotations[2].cluster_id, 1);
    assert!(annotations[2].is_seed);
    assert_eq!(annotations[2].cluster_size, 1);

    assert!(annotations.iter().all(|a| a.n_cluster == 2));
    assert_eq!(
        annotations.iter().filter(|a| a.is_seed).count(),
        results.clusters().len()
    );
}

#[test]
fn test_annotations_of_dropped_and_discarded_hits_stay_unassigned() {
    let mut clusterizer = Clusterizer::new(
        ClusterizerConfig::default()
            .with_hit_info(true)
            .with_min_cluster_hits(2),
    );
    let hits = [
        HitRecord::new(1, 5, 10, 0, 14), // over the insert ToT cap
        HitRecord::new(1, 40, 40, 0, 4), // lone hit, below the minimum size
        HitRecord::new(1, 60, 60, 0, 4),
        HitRecord::new(1, 61, 60, 0, 4),
    ];
    let results = run(&mut clusterizer, &hits);

    assert_eq!(results.clusters().len(), 1);
    let annotations = results.cluster_hits();
    assert_eq!(annotations[0].cluster_id, -1);
    assert_eq!(annotations[0].cluster_size, 0);
    assert_eq!(annotations[1].cluster_id, -1);
    assert_eq!(annotations[1].cluster_size, 0);
    assert!(annotations[2].cluster_id >= 0);
    assert_eq!(annotations[2].cluster_size, 2);
}

#[test]
fn test_annotation_ids_restart_per_event() {
    let mut clusterizer =
        Clusterizer::new(ClusterizerConfig::default().with_hit_info(true));
    let hits = [
        HitRecord::new(1, 5, 10, 0, 4),
        HitRecord::new(1, 30, 30, 0, 4),
        HitRecord::new(2, 5, 10, 0, 4),
    ];
    let results = run(&mut clusterizer, &hits);

    let annotations = results.cluster_hits();
    assert_eq!(annotations[0].cluster_id, 0);
    assert_eq!(annotations[1].cluster_id, 1);
    assert_eq!(annotations[2].cluster_id, 0);
    assert_eq!(annotations[0].n_cluster, 2);
    assert_eq!(annotations[2].n_cluster, 1);
}

#[test]
fn test_wide_search_window_merges_distant_hits() {
    let mut clusterizer = Clusterizer::default();
    clusterizer.set_column_cluster_distance(3);
    let results = run(
        &mut clusterizer,
        &[HitRecord::new(1, 5, 10, 0, 4), HitRecord::new(1, 8, 10, 0, 4)],
    );
    assert_eq!(results.clusters().len(), 1);
    assert_eq!(results.clusters()[0].size, 2);
}
