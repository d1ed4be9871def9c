//! Index lifecycle controller: build-and-persist, then destroy-and-reload.
//!
//! Each test case runs the same query sweep twice. Phase one builds a fresh
//! index from data, times the construction, and persists it. Phase two
//! starts from a brand-new index object and loads the persisted state, with
//! index time reported as zero. Both phases score against the same gold
//! standard and query set, so their results are directly comparable.

use crate::backend::AnnIndex;
use crate::dataset::VectorSet;
use crate::error::Result;
use crate::gold::compute_neighbors;
use crate::naming;
use crate::params::Params;
use crate::space::{resolve_space, DataKind, DistanceType};
use crate::trial::{run_query_sweep, ExperResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Benchmark phase: fresh build vs. reload from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    New,
    Reload,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::New, Phase::Reload];
}

/// Per-phase experiment results for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResults {
    pub new_index: Vec<ExperResult>,
    pub reload_index: Vec<ExperResult>,
}

impl PhaseResults {
    pub fn get(&self, phase: Phase) -> &[ExperResult] {
        match phase {
            Phase::New => &self.new_index,
            Phase::Reload => &self.reload_index,
        }
    }
}

/// Static description of one benchmark cell shared by both access modes.
#[derive(Debug, Clone)]
pub struct CaseSpec<'a> {
    pub work_dir: &'a Path,
    pub dist_type: DistanceType,
    pub data_kind: DataKind,
    pub method_name: &'a str,
    pub index_time_params: &'a Params,
    pub query_time_param_arr: &'a [Params],
    pub k: usize,
    pub repeat_qty: usize,
    pub num_threads: usize,
    pub max_data_qty: Option<usize>,
}

/// Benchmark an in-process index through both lifecycle phases.
///
/// `make_index` must return a *fresh* index object each time it is called;
/// the reload phase deliberately discards the built index and reconstructs
/// state from the persisted file.
///
/// Any build or load error aborts this test case without retry.
pub fn benchmark_index(
    spec: &CaseSpec<'_>,
    data: &VectorSet,
    queries: &VectorSet,
    make_index: &dyn Fn() -> Result<Box<dyn AnnIndex>>,
) -> Result<PhaseResults> {
    if data.kind() != spec.data_kind || queries.kind() != spec.data_kind {
        return Err(crate::error::BenchError::Config(format!(
            "test case declares {} but data/query sets disagree",
            spec.data_kind
        )));
    }
    let space_name = resolve_space(spec.data_kind, spec.dist_type)?;

    let mut data = data.clone();
    if let Some(max_qty) = spec.max_data_qty {
        data.truncate(max_qty);
    }

    info!(
        space = %space_name,
        dist = %spec.dist_type,
        data_qty = data.len(),
        query_qty = queries.len(),
        k = spec.k,
        "computing gold standard"
    );
    // Computed once; both phases score against this same object.
    let gold = compute_neighbors(spec.dist_type, &data, queries, spec.k)?;

    let index_file = naming::index_file_name(
        spec.work_dir,
        spec.method_name,
        &space_name,
        spec.index_time_params,
    );
    naming::delete_files_with_prefix(&index_file)?;

    let mut results = PhaseResults {
        new_index: Vec::new(),
        reload_index: Vec::new(),
    };

    for phase in Phase::ALL {
        let mut index = make_index()?;

        let index_time = match phase {
            Phase::New => {
                info!(phase = ?phase, "indexing data");
                index.add_batch(&data, None)?;

                let start = Instant::now();
                index.build(spec.index_time_params)?;
                let index_time = start.elapsed().as_secs_f64();
                info!(index_time, "index construction done");

                index.save(&index_file, true)?;
                index_time
            }
            Phase::Reload => {
                info!(phase = ?phase, "loading index and data");
                index.load(&index_file, true)?;
                0.0
            }
        };

        let phase_results = run_query_sweep(
            index.as_mut(),
            spec.query_time_param_arr,
            queries,
            spec.k,
            spec.repeat_qty,
            spec.num_threads,
            &gold,
            index_time,
        )?;
        match phase {
            Phase::New => results.new_index = phase_results,
            Phase::Reload => results.reload_index = phase_results,
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FlatIndex;
    use crate::dataset::generate_uniform_dense;

    fn spec<'a>(
        work_dir: &'a Path,
        index_params: &'a Params,
        query_params: &'a [Params],
    ) -> CaseSpec<'a> {
        CaseSpec {
            work_dir,
            dist_type: DistanceType::L2,
            data_kind: DataKind::Dense,
            method_name: "flat",
            index_time_params: index_params,
            query_time_param_arr: query_params,
            k: 5,
            repeat_qty: 2,
            num_threads: 1,
            max_data_qty: None,
        }
    }

    #[test]
    fn both_phases_run_and_reload_has_zero_index_time() {
        let dir = tempfile::tempdir().unwrap();
        let data = VectorSet::Dense(generate_uniform_dense(200, 8, 1));
        let queries = VectorSet::Dense(generate_uniform_dense(20, 8, 2));
        let index_params = Params::new();
        let query_params = vec![Params::new()];
        let spec = spec(dir.path(), &index_params, &query_params);

        let results = benchmark_index(&spec, &data, &queries, &|| {
            Ok(Box::new(FlatIndex::new(DistanceType::L2)))
        })
        .unwrap();

        assert_eq!(results.new_index.len(), 1);
        assert_eq!(results.reload_index.len(), 1);
        assert!(results.new_index[0].index_time >= 0.0);
        assert_eq!(results.reload_index[0].index_time, 0.0);
        // Exact backend: recall must be 1.0 in both phases.
        assert_eq!(results.new_index[0].recall, 1.0);
        assert_eq!(results.reload_index[0].recall, 1.0);
    }

    #[test]
    fn max_data_qty_truncates_before_gold_standard() {
        let dir = tempfile::tempdir().unwrap();
        let data = VectorSet::Dense(generate_uniform_dense(100, 4, 3));
        let queries = VectorSet::Dense(generate_uniform_dense(5, 4, 4));
        let index_params = Params::new();
        let query_params = vec![Params::new()];
        let mut spec = spec(dir.path(), &index_params, &query_params);
        spec.max_data_qty = Some(3);
        spec.k = 10;

        let results = benchmark_index(&spec, &data, &queries, &|| {
            Ok(Box::new(FlatIndex::new(DistanceType::L2)))
        })
        .unwrap();
        // Only 3 data points survive; the sweep still completes with full
        // recall because gold sets are clamped the same way.
        assert_eq!(results.new_index[0].recall, 1.0);
    }

    #[test]
    fn unsupported_space_fails_before_any_phase() {
        let dir = tempfile::tempdir().unwrap();
        // L2 over sparse vectors has no space table entry.
        let data = VectorSet::Sparse(crate::dataset::generate_uniform_sparse(10, 8, 3, 7));
        let queries = VectorSet::Sparse(crate::dataset::generate_uniform_sparse(2, 8, 3, 8));
        let index_params = Params::new();
        let query_params = vec![Params::new()];
        let mut spec = spec(dir.path(), &index_params, &query_params);
        spec.data_kind = DataKind::Sparse;

        let err = benchmark_index(&spec, &data, &queries, &|| {
            Ok(Box::new(FlatIndex::new(DistanceType::L2)))
        });
        assert!(err.is_err());
        // Nothing was written into the working directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
