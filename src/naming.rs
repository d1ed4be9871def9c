//! Namespaced file paths for indices, gold standards, results, and logs.
//!
//! Every artifact of a test case is named deterministically from the
//! (method, space, index-time parameters) tuple, so reruns with the same
//! configuration land on the same paths and stale artifacts can be removed
//! by prefix before a fresh run.

use crate::error::Result;
use crate::params::Params;
use std::fs;
use std::path::{Path, PathBuf};

fn namespace_key(method: &str, space: &str, index_time_params: &Params) -> String {
    format!("{method}_{space}_{}", index_time_params.to_arg_string())
}

/// Path of the saved index for a test case.
pub fn index_file_name(
    work_dir: &Path,
    method: &str,
    space: &str,
    index_time_params: &Params,
) -> PathBuf {
    work_dir.join(format!(
        "index_{}",
        namespace_key(method, space, index_time_params)
    ))
}

/// Path of the cached gold-standard file for a test case.
pub fn gold_standard_file_name(
    work_dir: &Path,
    method: &str,
    space: &str,
    index_time_params: &Params,
) -> PathBuf {
    work_dir.join(format!(
        "gs_{}",
        namespace_key(method, space, index_time_params)
    ))
}

/// Prefix of the result files for a test case; the external binary appends
/// a `_K=<K>.dat` suffix per neighbor count.
pub fn result_file_name_pref(
    work_dir: &Path,
    method: &str,
    space: &str,
    index_time_params: &Params,
) -> PathBuf {
    work_dir.join(format!(
        "result_{}",
        namespace_key(method, space, index_time_params)
    ))
}

/// Complete result-file path for a given K.
pub fn result_file_name(result_file_name_pref: &Path, k: usize) -> PathBuf {
    let mut name = result_file_name_pref.as_os_str().to_os_string();
    name.push(format!("_K={k}.dat"));
    PathBuf::from(name)
}

/// Path of the log file for a test case.
pub fn log_file_name(
    work_dir: &Path,
    method: &str,
    space: &str,
    index_time_params: &Params,
) -> PathBuf {
    work_dir.join(format!(
        "{}.log",
        namespace_key(method, space, index_time_params)
    ))
}

/// Delete every file in the prefix's directory whose name starts with the
/// prefix's file name. Missing directories and files are not errors; the
/// point is only that nothing stale survives into the next run.
pub fn delete_files_with_prefix(prefix: &Path) -> Result<()> {
    let Some(dir) = prefix.parent() else {
        return Ok(());
    };
    let Some(stem) = prefix.file_name().and_then(|n| n.to_str()) else {
        return Ok(());
    };
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with(stem))
            && entry.file_type()?.is_file()
        {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
