//! End-to-end harness tests over the in-process mode.
//!
//! Exercises the full pipeline: gold-standard computation, both lifecycle
//! phases, the query sweep, and report expansion, using the exact flat
//! backend so recall is 1.0 by construction.

use annbench::dataset::generate_uniform_dense;
use annbench::{
    benchmark_index, expand_case_reports, split_data, write_report, CaseReport, CaseSpec, DataKind,
    DistanceType, FlatIndex, Params, RunSettings, TestCase, VectorSet,
};
use std::path::Path;

fn run_case(
    work_dir: &Path,
    dist: DistanceType,
    data: &VectorSet,
    queries: &VectorSet,
    k: usize,
    repeat_qty: usize,
    query_param_arr: &[Params],
) -> annbench::PhaseResults {
    let index_params = Params::new();
    let spec = CaseSpec {
        work_dir,
        dist_type: dist,
        data_kind: DataKind::Dense,
        method_name: "flat",
        index_time_params: &index_params,
        query_time_param_arr: query_param_arr,
        k,
        repeat_qty,
        num_threads: 1,
        max_data_qty: None,
    };
    benchmark_index(&spec, data, queries, &|| Ok(Box::new(FlatIndex::new(dist)))).unwrap()
}

#[test]
fn thousand_vector_l2_case_produces_two_phase_results() {
    let dir = tempfile::tempdir().unwrap();
    let all = VectorSet::Dense(generate_uniform_dense(1100, 16, 42));
    let (data, queries) = split_data(&all, 100, 0).unwrap();
    assert_eq!(data.len(), 1000);

    let query_params = vec![Params::new()];
    let results = run_case(
        dir.path(),
        DistanceType::L2,
        &data,
        &queries,
        10,
        3,
        &query_params,
    );

    // One query-time parameter set, two phases: exactly 2 result records.
    assert_eq!(results.new_index.len(), 1);
    assert_eq!(results.reload_index.len(), 1);

    let new = &results.new_index[0];
    let reload = &results.reload_index[0];
    assert!(new.recall <= 1.0 && new.recall >= 0.0);
    assert!(new.index_time >= 0.0);
    assert_eq!(reload.index_time, 0.0);
    assert!(new.query_time > 0.0);
    assert!(new.qps > 0.0);

    // Exact backend against an exact gold standard.
    assert_eq!(new.recall, 1.0);
    assert_eq!(reload.recall, 1.0);
}

#[test]
fn sweep_produces_one_result_per_query_param_set() {
    let dir = tempfile::tempdir().unwrap();
    let all = VectorSet::Dense(generate_uniform_dense(400, 8, 9));
    let (data, queries) = split_data(&all, 40, 0).unwrap();

    let query_params = vec![
        Params::new().with("ef", 25),
        Params::new().with("ef", 50),
        Params::new().with("ef", 100),
    ];
    let results = run_case(
        dir.path(),
        DistanceType::Cosine,
        &data,
        &queries,
        10,
        2,
        &query_params,
    );
    assert_eq!(results.new_index.len(), 3);
    assert_eq!(results.reload_index.len(), 3);
}

#[test]
fn phases_agree_on_the_shared_gold_standard() {
    // With a deterministic exact backend the two phases must report the
    // same recall for identical query-time parameters.
    let dir = tempfile::tempdir().unwrap();
    let all = VectorSet::Dense(generate_uniform_dense(300, 12, 77));
    let (data, queries) = split_data(&all, 30, 0).unwrap();

    let query_params = vec![Params::new()];
    let results = run_case(
        dir.path(),
        DistanceType::InnerProd,
        &data,
        &queries,
        5,
        2,
        &query_params,
    );
    assert_eq!(
        results.new_index[0].recall,
        results.reload_index[0].recall
    );
}

#[test]
fn kldiv_case_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut base = generate_uniform_dense(330, 8, 5);
    for v in base.data.iter_mut() {
        *v += 0.01;
    }
    let all = VectorSet::Dense(base);
    let (data, queries) = split_data(&all, 30, 0).unwrap();

    let query_params = vec![Params::new()];
    let results = run_case(
        dir.path(),
        DistanceType::KlDiv,
        &data,
        &queries,
        5,
        2,
        &query_params,
    );
    assert_eq!(results.new_index[0].recall, 1.0);
    assert_eq!(results.reload_index[0].recall, 1.0);
}

#[test]
fn full_run_report_serializes() {
    let dir = tempfile::tempdir().unwrap();
    let all = VectorSet::Dense(generate_uniform_dense(220, 8, 3));
    let (data, queries) = split_data(&all, 20, 0).unwrap();

    let case = TestCase {
        dataset_name: "uniform-test".into(),
        dist_type: DistanceType::L2,
        k: 5,
        method_name: "flat".into(),
        index_time_params: Params::new(),
        query_time_param_arr: vec![Params::new()],
    };
    let results = run_case(
        dir.path(),
        case.dist_type,
        &data,
        &queries,
        case.k,
        2,
        &case.query_time_param_arr,
    );

    let settings = RunSettings {
        repeat_qty: 2,
        query_qty: queries.len(),
        max_data_qty: None,
        num_threads: 1,
    };
    let reports = expand_case_reports(0, &case, false, &settings, &results);
    assert_eq!(reports.len(), 2);

    let out = dir.path().join("report.json");
    write_report(&out, &reports).unwrap();
    let parsed: Vec<CaseReport> =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed, reports);
    assert!(!parsed[0].is_index_reload);
    assert!(parsed[1].is_index_reload);
}

#[test]
fn rerun_with_same_namespace_succeeds_after_stale_files() {
    // The second run must delete the first run's index file and rebuild.
    let dir = tempfile::tempdir().unwrap();
    let all = VectorSet::Dense(generate_uniform_dense(150, 6, 8));
    let (data, queries) = split_data(&all, 15, 0).unwrap();

    let query_params = vec![Params::new()];
    for _ in 0..2 {
        let results = run_case(
            dir.path(),
            DistanceType::L2,
            &data,
            &queries,
            5,
            1,
            &query_params,
        );
        assert_eq!(results.new_index[0].recall, 1.0);
    }
}
