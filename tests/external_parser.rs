//! Out-of-process mode tests against a stub `experiment` executable.
//!
//! The stub is a shell script that records its arguments and writes a
//! well-formed result table, which lets the full spawn/parse/validate path
//! run without a real ANN binary.

#![cfg(unix)]

use annbench::{benchmark_external, BenchError, CaseSpec, DataKind, DistanceType, Params};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const HEADER: &str = "MethodName\tRecall\tIndexTime\tQueryPerSec\tIndexParams\tQueryTimeParams";

/// Install an `experiment` stub into `bin_dir` that writes `table` into the
/// result file named by its `-o` and `-k` flags.
fn install_stub(bin_dir: &Path, table: &str) {
    let table_file = bin_dir.join("table.txt");
    fs::write(&table_file, table).unwrap();
    let script = format!(
        r#"#!/bin/sh
out=""
k=""
prev=""
for a in "$@"; do
  [ "$prev" = "-o" ] && out="$a"
  [ "$prev" = "-k" ] && k="$a"
  prev="$a"
done
cp {} "${{out}}_K=${{k}}.dat"
"#,
        table_file.display()
    );
    let path = bin_dir.join("experiment");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn install_failing_stub(bin_dir: &Path) {
    let path = bin_dir.join("experiment");
    fs::write(&path, "#!/bin/sh\necho 'could not parse data file' >&2\nexit 3\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn spec<'a>(
    work_dir: &'a Path,
    index_params: &'a Params,
    query_params: &'a [Params],
) -> CaseSpec<'a> {
    CaseSpec {
        work_dir,
        dist_type: DistanceType::L2,
        data_kind: DataKind::Dense,
        method_name: "hnsw",
        index_time_params: index_params,
        query_time_param_arr: query_params,
        k: 10,
        repeat_qty: 2,
        num_threads: 1,
        max_data_qty: None,
    }
}

#[test]
fn stub_binary_round_trip_selects_fastest_trials() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();

    // 1 query-param set x repeat 2; the 2000-qps row is the fastest trial.
    let table = format!(
        "{HEADER}\nhnsw\t0.91\t7.5\t1000\tM=20\tef=25\nhnsw\t0.88\t7.5\t2000\tM=20\tef=25\n"
    );
    install_stub(bin.path(), &table);

    let index_params = Params::new().with("M", 20);
    let query_params = vec![Params::new().with("ef", 25)];
    let spec = spec(work.path(), &index_params, &query_params);

    let query_qty = 500;
    let results =
        benchmark_external(&spec, bin.path(), Path::new("/data/vectors.txt"), query_qty).unwrap();

    assert_eq!(results.new_index.len(), 1);
    assert_eq!(results.reload_index.len(), 1);
    let r = &results.new_index[0];
    assert_eq!(r.recall, 0.88);
    assert_eq!(r.index_time, 7.5);
    assert!((r.query_time - query_qty as f64 / 2000.0).abs() < 1e-12);
    assert!((r.qps - 2000.0).abs() < 1e-9);
}

#[test]
fn short_result_table_is_fatal() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();

    // repeat 2 requires 2 rows, only 1 provided.
    let table = format!("{HEADER}\nhnsw\t0.91\t7.5\t1000\tM=20\tef=25\n");
    install_stub(bin.path(), &table);

    let index_params = Params::new().with("M", 20);
    let query_params = vec![Params::new().with("ef", 25)];
    let spec = spec(work.path(), &index_params, &query_params);

    let err = benchmark_external(&spec, bin.path(), Path::new("/data/vectors.txt"), 100);
    assert!(matches!(err, Err(BenchError::ResultTable(_))));
}

#[test]
fn mismatched_query_param_echo_is_fatal() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();

    let table = format!(
        "{HEADER}\nhnsw\t0.91\t7.5\t1000\tM=20\tef=999\nhnsw\t0.88\t7.5\t2000\tM=20\tef=999\n"
    );
    install_stub(bin.path(), &table);

    let index_params = Params::new().with("M", 20);
    let query_params = vec![Params::new().with("ef", 25)];
    let spec = spec(work.path(), &index_params, &query_params);

    let err = benchmark_external(&spec, bin.path(), Path::new("/data/vectors.txt"), 100);
    assert!(matches!(err, Err(BenchError::ResultTable(_))));
}

#[test]
fn nonzero_exit_surfaces_stderr() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    install_failing_stub(bin.path());

    let index_params = Params::new().with("M", 20);
    let query_params = vec![Params::new().with("ef", 25)];
    let spec = spec(work.path(), &index_params, &query_params);

    match benchmark_external(&spec, bin.path(), Path::new("/data/vectors.txt"), 100) {
        Err(BenchError::External { status, stderr }) => {
            assert_eq!(status, 3);
            assert!(stderr.contains("could not parse data file"));
        }
        other => panic!("expected External error, got {other:?}"),
    }
}
