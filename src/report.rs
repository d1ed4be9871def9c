//! Test-case descriptors and the structured run report.
//!
//! A run evaluates a list of [`TestCase`]s and emits one [`CaseReport`] per
//! (test case, phase) pair, serialized together as a single pretty-printed
//! JSON document so runs of different methods and versions stay comparable.

use crate::error::Result;
use crate::lifecycle::{Phase, PhaseResults};
use crate::params::Params;
use crate::space::DistanceType;
use crate::trial::ExperResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Immutable description of one benchmark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub dataset_name: String,
    pub dist_type: DistanceType,
    pub k: usize,
    pub method_name: String,
    pub index_time_params: Params,
    pub query_time_param_arr: Vec<Params>,
}

/// One phase of one evaluated test case, as it appears in the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub case_id: usize,
    pub harness_version: String,
    pub dataset_name: String,
    pub dist_type: DistanceType,
    pub k: usize,
    pub is_binary: bool,
    pub is_index_reload: bool,
    pub repeat_qty: usize,
    pub query_qty: usize,
    pub max_data_qty: Option<usize>,
    pub num_threads: usize,
    pub result_list: Vec<ExperResult>,
}

/// Run-level settings shared by every case report.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub repeat_qty: usize,
    pub query_qty: usize,
    pub max_data_qty: Option<usize>,
    pub num_threads: usize,
}

/// Expand a test case's per-phase results into report records: one per
/// phase, in NEW then RELOAD order.
pub fn expand_case_reports(
    case_id: usize,
    case: &TestCase,
    is_binary: bool,
    settings: &RunSettings,
    results: &PhaseResults,
) -> Vec<CaseReport> {
    Phase::ALL
        .iter()
        .map(|&phase| CaseReport {
            case_id,
            harness_version: env!("CARGO_PKG_VERSION").to_string(),
            dataset_name: case.dataset_name.clone(),
            dist_type: case.dist_type,
            k: case.k,
            is_binary,
            is_index_reload: phase == Phase::Reload,
            repeat_qty: settings.repeat_qty,
            query_qty: settings.query_qty,
            max_data_qty: settings.max_data_qty,
            num_threads: settings.num_threads,
            result_list: results.get(phase).to_vec(),
        })
        .collect()
}

/// Serialize the whole run as one pretty-printed JSON document.
pub fn write_report(path: &Path, reports: &[CaseReport]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, reports)?;
    Ok(())
}
