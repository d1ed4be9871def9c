//! Out-of-process mode: drive an external `experiment` binary and parse its
//! result table.
//!
//! The external process performs its own repeat loop (one `-t` flag per
//! repetition per query-time parameter set) and reports one row per trial in
//! a tab-delimited table. All text parsing and validation lives here; the
//! two-phase protocol on top is the same one the in-process mode uses, so
//! the orchestrator does not care which backend it drives.

use crate::error::{BenchError, Result};
use crate::lifecycle::{CaseSpec, Phase, PhaseResults};
use crate::naming;
use crate::params::Params;
use crate::space::resolve_space;
use crate::trial::{select_fastest, ExperResult};
use csv::ReaderBuilder;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

const METHOD_NAME_FIELD: &str = "MethodName";
const INDEX_PARAMS_FIELD: &str = "IndexParams";
const QUERY_PARAMS_FIELD: &str = "QueryTimeParams";
const RECALL_FIELD: &str = "Recall";
const INDEX_TIME_FIELD: &str = "IndexTime";
const QPS_FIELD: &str = "QueryPerSec";

/// One parsed row of the external result table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub method_name: String,
    pub index_params: String,
    pub query_params: String,
    pub recall: f64,
    pub index_time: f64,
    pub qps: f64,
}

/// Parse the tab-delimited result table written by the external binary.
///
/// The first line is a header; fields may be double-quoted (with doubled
/// quotes escaping embedded ones). Only the six required columns are
/// consumed, extra columns are ignored.
pub fn parse_result_table(path: &Path) -> Result<Vec<ResultRow>> {
    let table_err =
        |msg: String| BenchError::ResultTable(format!("{}: {msg}", path.display()));

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| table_err(e.to_string()))?;

    let columns = reader
        .headers()
        .map_err(|e| table_err(e.to_string()))?
        .clone();
    let col = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| table_err(format!("missing column {name}")))
    };
    let (method_col, index_params_col, query_params_col) = (
        col(METHOD_NAME_FIELD)?,
        col(INDEX_PARAMS_FIELD)?,
        col(QUERY_PARAMS_FIELD)?,
    );
    let (recall_col, index_time_col, qps_col) = (
        col(RECALL_FIELD)?,
        col(INDEX_TIME_FIELD)?,
        col(QPS_FIELD)?,
    );

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| table_err(e.to_string()))?;
        let field = |idx: usize, name: &str| -> Result<&str> {
            record
                .get(idx)
                .ok_or_else(|| table_err(format!("row {}: missing {name}", row_no + 2)))
        };
        let num = |idx: usize, name: &str| -> Result<f64> {
            field(idx, name)?.parse().map_err(|e| {
                table_err(format!("row {}: bad {name}: {e}", row_no + 2))
            })
        };
        rows.push(ResultRow {
            method_name: field(method_col, METHOD_NAME_FIELD)?.to_string(),
            index_params: field(index_params_col, INDEX_PARAMS_FIELD)?.to_string(),
            query_params: field(query_params_col, QUERY_PARAMS_FIELD)?.to_string(),
            recall: num(recall_col, RECALL_FIELD)?,
            index_time: num(index_time_col, INDEX_TIME_FIELD)?,
            qps: num(qps_col, QPS_FIELD)?,
        });
    }
    Ok(rows)
}

/// Validate the parsed table against the requested parameters and reduce
/// each block of `repeat_qty` trial rows to one [`ExperResult`].
///
/// Row count and per-row parameter echoes are checked before any result is
/// produced; a mismatch means output corruption or version skew and is fatal.
pub fn collect_exper_results(
    rows: &[ResultRow],
    method_name: &str,
    index_time_params: &Params,
    query_time_param_arr: &[Params],
    repeat_qty: usize,
    query_qty: usize,
) -> Result<Vec<ExperResult>> {
    let expected_qty = repeat_qty * query_time_param_arr.len();
    if rows.len() != expected_qty {
        return Err(BenchError::ResultTable(format!(
            "unexpected result count: expected {expected_qty}, got {}",
            rows.len()
        )));
    }

    let index_params_str = index_time_params.to_arg_string();
    let mut out = Vec::with_capacity(query_time_param_arr.len());

    for (ti, query_time_params) in query_time_param_arr.iter().enumerate() {
        let query_params_str = query_time_params.to_arg_string();
        let mut index_time = 0.0;
        let mut trials = Vec::with_capacity(repeat_qty);

        for rep in 0..repeat_qty {
            let row_id = ti * repeat_qty + rep;
            let row = &rows[row_id];
            if row.method_name != method_name {
                return Err(BenchError::ResultTable(format!(
                    "unexpected method name {:?} in row {}",
                    row.method_name,
                    row_id + 2
                )));
            }
            if row.index_params != index_params_str {
                return Err(BenchError::ResultTable(format!(
                    "unexpected index-time parameters {:?} in row {}, expecting {index_params_str:?}",
                    row.index_params,
                    row_id + 2
                )));
            }
            if row.query_params != query_params_str {
                return Err(BenchError::ResultTable(format!(
                    "unexpected query-time parameters {:?} in row {}, expecting {query_params_str:?}",
                    row.query_params,
                    row_id + 2
                )));
            }

            // The binary reports throughput; convert back to a per-batch
            // time so the fastest-trial rule matches the in-process mode.
            let query_tm = query_qty as f64 / row.qps;
            if rep == 0 {
                index_time = row.index_time;
            }
            trials.push((query_tm, row.recall));
        }

        let (best_tm, best_tm_recall) = select_fastest(&trials);
        out.push(ExperResult {
            recall: best_tm_recall,
            index_time,
            query_time: best_tm,
            qps: query_qty as f64 / best_tm,
        });
    }

    Ok(out)
}

/// File paths an external run reads and writes.
struct CasePaths {
    index_file: std::path::PathBuf,
    gold_standard_file: std::path::PathBuf,
    result_file_pref: std::path::PathBuf,
    log_file: std::path::PathBuf,
}

fn case_paths(spec: &CaseSpec<'_>, space_name: &str) -> CasePaths {
    CasePaths {
        index_file: naming::index_file_name(
            spec.work_dir,
            spec.method_name,
            space_name,
            spec.index_time_params,
        ),
        gold_standard_file: naming::gold_standard_file_name(
            spec.work_dir,
            spec.method_name,
            space_name,
            spec.index_time_params,
        ),
        result_file_pref: naming::result_file_name_pref(
            spec.work_dir,
            spec.method_name,
            space_name,
            spec.index_time_params,
        ),
        log_file: naming::log_file_name(
            spec.work_dir,
            spec.method_name,
            space_name,
            spec.index_time_params,
        ),
    }
}

/// Build the full argument list for the `experiment` binary.
fn build_args(
    spec: &CaseSpec<'_>,
    space_name: &str,
    paths: &CasePaths,
    data_file: &Path,
    query_qty: usize,
) -> Vec<String> {
    let mut args = vec![
        "--dataFile".into(),
        data_file.display().to_string(),
        "--recallOnly".into(),
        "1".into(),
        "--threadTestQty".into(),
        spec.num_threads.to_string(),
        // One split only; the best time over repeated runs is what counts.
        "--testSetQty".into(),
        "1".into(),
        "--maxNumQuery".into(),
        query_qty.to_string(),
        "-l".into(),
        paths.log_file.display().to_string(),
        "-s".into(),
        space_name.to_string(),
        "-k".into(),
        spec.k.to_string(),
        "-o".into(),
        paths.result_file_pref.display().to_string(),
        "-g".into(),
        paths.gold_standard_file.display().to_string(),
        "-m".into(),
        spec.method_name.to_string(),
        "-S".into(),
        paths.index_file.display().to_string(),
        "-L".into(),
        paths.index_file.display().to_string(),
        "-c".into(),
        spec.index_time_params.to_arg_string(),
    ];
    if let Some(max_qty) = spec.max_data_qty {
        args.push("--maxNumData".into());
        args.push(max_qty.to_string());
    }
    // The external process runs the repeat loop itself: one -t flag per
    // repetition per query-time parameter set.
    for query_time_params in spec.query_time_param_arr {
        for _ in 0..spec.repeat_qty {
            args.push("-t".into());
            args.push(query_time_params.to_arg_string());
        }
    }
    args
}

/// Run the external binary once for a test case and parse its output.
///
/// If the index file already exists the binary loads it instead of building
/// a new one; the caller controls this through prefix deletion.
fn run_external_case(
    binary_dir: &Path,
    spec: &CaseSpec<'_>,
    space_name: &str,
    paths: &CasePaths,
    data_file: &Path,
    query_qty: usize,
) -> Result<Vec<ExperResult>> {
    naming::delete_files_with_prefix(&paths.result_file_pref)?;

    let program = binary_dir.join("experiment");
    let args = build_args(spec, space_name, paths, data_file, query_qty);
    debug!(program = %program.display(), ?args, "spawning external benchmark");

    let output = Command::new(&program).args(&args).output()?;
    if !output.status.success() {
        return Err(BenchError::External {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let result_file = naming::result_file_name(&paths.result_file_pref, spec.k);
    let rows = parse_result_table(&result_file)?;
    collect_exper_results(
        &rows,
        spec.method_name,
        spec.index_time_params,
        spec.query_time_param_arr,
        spec.repeat_qty,
        query_qty,
    )
}

/// Benchmark an external binary through both lifecycle phases.
///
/// The binary is invoked twice with identical arguments. Before the first
/// call the index and gold-standard files are deleted, so the first run
/// builds and persists both; the second run finds them on disk and reloads.
pub fn benchmark_external(
    spec: &CaseSpec<'_>,
    binary_dir: &Path,
    data_file: &Path,
    query_qty: usize,
) -> Result<PhaseResults> {
    let space_name = resolve_space(spec.data_kind, spec.dist_type)?;
    let paths = case_paths(spec, &space_name);

    naming::delete_files_with_prefix(&paths.index_file)?;
    naming::delete_files_with_prefix(&paths.gold_standard_file)?;

    let mut results = PhaseResults {
        new_index: Vec::new(),
        reload_index: Vec::new(),
    };
    for phase in Phase::ALL {
        info!(phase = ?phase, space = %space_name, "external benchmark phase");
        let phase_results =
            run_external_case(binary_dir, spec, &space_name, &paths, data_file, query_qty)?;
        match phase {
            Phase::New => results.new_index = phase_results,
            Phase::Reload => results.reload_index = phase_results,
        }
    }
    Ok(results)
}
