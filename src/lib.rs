//! annbench: an evaluation harness for (approximate) nearest-neighbor search.
//!
//! Given a dataset, a distance type, and a search method, the harness
//! computes exact gold-standard neighbors, drives the method through a
//! build-and-persist / destroy-and-reload lifecycle, sweeps query-time
//! parameters, and reports recall and throughput in a comparable format.
//!
//! Two access modes share the same protocol:
//!
//! - **In-process**: any type implementing [`AnnIndex`] is benchmarked
//!   directly ([`benchmark_index`]).
//! - **Out-of-process**: an external `experiment` binary is invoked with the
//!   encoded parameters and its tabular output is parsed and validated
//!   ([`benchmark_external`]).
//!
//! # Measurement rules
//!
//! Each (phase, query-time parameter set) cell repeats the full query batch
//! `repeat_qty` times and keeps the *fastest* trial; the reported recall is
//! the recall of that same trial. Reload phases report an index time of
//! zero. Both phases of a test case are scored against one gold standard,
//! computed once.
//!
//! # Example
//!
//! ```no_run
//! use annbench::{
//!     benchmark_index, CaseSpec, DataKind, DistanceType, FlatIndex, Params, VectorSet,
//! };
//! use annbench::dataset::generate_uniform_dense;
//!
//! # fn main() -> annbench::Result<()> {
//! let data = VectorSet::Dense(generate_uniform_dense(1000, 32, 0));
//! let queries = VectorSet::Dense(generate_uniform_dense(100, 32, 1));
//! let index_params = Params::new();
//! let query_params = vec![Params::new()];
//! let spec = CaseSpec {
//!     work_dir: std::path::Path::new("/tmp/annbench"),
//!     dist_type: DistanceType::L2,
//!     data_kind: DataKind::Dense,
//!     method_name: "flat",
//!     index_time_params: &index_params,
//!     query_time_param_arr: &query_params,
//!     k: 10,
//!     repeat_qty: 3,
//!     num_threads: 1,
//!     max_data_qty: None,
//! };
//! let results = benchmark_index(&spec, &data, &queries, &|| {
//!     Ok(Box::new(FlatIndex::new(DistanceType::L2)))
//! })?;
//! assert_eq!(results.reload_index[0].index_time, 0.0);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod dataset;
pub mod error;
pub mod external;
pub mod gold;
pub mod lifecycle;
pub mod naming;
pub mod params;
pub mod report;
pub mod space;
pub mod trial;

pub use backend::{AnnIndex, FlatIndex};
pub use dataset::{split_data, DenseMatrix, SparseMatrix, VectorSet};
pub use error::{BenchError, Result};
pub use external::benchmark_external;
pub use gold::{compute_neighbors, DIST_COMPUTE_BATCH_SIZE};
pub use lifecycle::{benchmark_index, CaseSpec, Phase, PhaseResults};
pub use params::{ParamValue, Params};
pub use report::{expand_case_reports, write_report, CaseReport, RunSettings, TestCase};
pub use space::{resolve_space, DataKind, DistanceType};
pub use trial::{batch_recall, run_query_sweep, ExperResult};
