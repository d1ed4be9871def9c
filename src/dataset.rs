//! Vector datasets: dense and sparse matrices, splits, and text loaders.
//!
//! Dense data is stored row-major in one flat buffer; sparse data uses CSR.
//! Text formats match what the external `experiment` binary consumes: dense
//! rows are whitespace-separated floats, sparse rows are `index:value` pairs.

use crate::error::{BenchError, Result};
use crate::space::DataKind;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A row-major dense matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl DenseMatrix {
    pub fn new(rows: usize, dim: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * dim {
            return Err(BenchError::Config(format!(
                "dense matrix: {} values for {} x {} shape",
                data.len(),
                rows,
                dim
            )));
        }
        Ok(Self { rows, dim, data })
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let n = rows.len();
        let dim = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != dim) {
            return Err(BenchError::Config("dense matrix: ragged rows".into()));
        }
        let data = rows.into_iter().flatten().collect();
        Self::new(n, dim, data)
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
}

/// A CSR sparse matrix.
///
/// Row `i` occupies `indices[indptr[i]..indptr[i+1]]` (column ids, strictly
/// increasing within a row) and the matching slice of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub rows: usize,
    pub dim: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseMatrix {
    pub fn from_rows(rows: Vec<Vec<(u32, f32)>>, dim: usize) -> Result<Self> {
        let n = rows.len();
        let mut indptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);
        for row in rows {
            let mut last: Option<u32> = None;
            for (idx, val) in row {
                if idx as usize >= dim {
                    return Err(BenchError::Config(format!(
                        "sparse matrix: column {idx} out of bounds (dim {dim})"
                    )));
                }
                if last.is_some_and(|l| idx <= l) {
                    return Err(BenchError::Config(
                        "sparse matrix: column ids must be strictly increasing".into(),
                    ));
                }
                last = Some(idx);
                indices.push(idx);
                values.push(val);
            }
            indptr.push(indices.len());
        }
        Ok(Self {
            rows: n,
            dim,
            indptr,
            indices,
            values,
        })
    }

    #[inline]
    pub fn row(&self, i: usize) -> (&[u32], &[f32]) {
        let (lo, hi) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[lo..hi], &self.values[lo..hi])
    }
}

/// A set of vectors in either representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorSet {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl VectorSet {
    pub fn len(&self) -> usize {
        match self {
            VectorSet::Dense(m) => m.rows,
            VectorSet::Sparse(m) => m.rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> DataKind {
        match self {
            VectorSet::Dense(_) => DataKind::Dense,
            VectorSet::Sparse(_) => DataKind::Sparse,
        }
    }

    /// Keep only the first `max_qty` vectors (used for debugging-sized runs).
    pub fn truncate(&mut self, max_qty: usize) {
        match self {
            VectorSet::Dense(m) => {
                if max_qty < m.rows {
                    m.rows = max_qty;
                    m.data.truncate(max_qty * m.dim);
                }
            }
            VectorSet::Sparse(m) => {
                if max_qty < m.rows {
                    m.rows = max_qty;
                    m.indptr.truncate(max_qty + 1);
                    let nnz = *m.indptr.last().unwrap_or(&0);
                    m.indices.truncate(nnz);
                    m.values.truncate(nnz);
                }
            }
        }
    }

    /// Select a subset of rows in the given order.
    fn select(&self, idxs: &[usize]) -> VectorSet {
        match self {
            VectorSet::Dense(m) => {
                let mut data = Vec::with_capacity(idxs.len() * m.dim);
                for &i in idxs {
                    data.extend_from_slice(m.row(i));
                }
                VectorSet::Dense(DenseMatrix {
                    rows: idxs.len(),
                    dim: m.dim,
                    data,
                })
            }
            VectorSet::Sparse(m) => {
                let mut rows = Vec::with_capacity(idxs.len());
                for &i in idxs {
                    let (cols, vals) = m.row(i);
                    rows.push(cols.iter().copied().zip(vals.iter().copied()).collect());
                }
                // Row slices come from a valid CSR matrix, re-assembly cannot fail.
                SparseMatrix::from_rows(rows, m.dim)
                    .map(VectorSet::Sparse)
                    .expect("subset of valid CSR matrix")
            }
        }
    }
}

/// Split a vector set into (data, queries) with a seeded shuffle.
///
/// Deterministic for a fixed seed, so repeated harness runs see the same
/// split.
pub fn split_data(all: &VectorSet, query_qty: usize, seed: u64) -> Result<(VectorSet, VectorSet)> {
    if query_qty >= all.len() {
        return Err(BenchError::Config(format!(
            "query_qty {} >= total vectors {}",
            query_qty,
            all.len()
        )));
    }
    let mut idxs: Vec<usize> = (0..all.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idxs.shuffle(&mut rng);
    let (data_idxs, query_idxs) = idxs.split_at(all.len() - query_qty);
    Ok((all.select(data_idxs), all.select(query_idxs)))
}

/// Read dense vectors from a whitespace-separated text file.
pub fn read_dense_from_text(path: &Path, max_qty: Option<usize>) -> Result<DenseMatrix> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        if max_qty.is_some_and(|m| rows.len() >= m) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: std::result::Result<Vec<f32>, _> =
            line.split_whitespace().map(str::parse::<f32>).collect();
        rows.push(row.map_err(|e| {
            BenchError::Config(format!("{}:{}: bad float: {e}", path.display(), line_no + 1))
        })?);
    }
    DenseMatrix::from_rows(rows)
}

/// Read sparse vectors from a text file of `index:value` pairs.
///
/// The dimensionality is one past the largest column id seen.
pub fn read_sparse_from_text(path: &Path, max_qty: Option<usize>) -> Result<SparseMatrix> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows: Vec<Vec<(u32, f32)>> = Vec::new();
    let mut dim = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        if max_qty.is_some_and(|m| rows.len() >= m) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut row = Vec::new();
        for tok in line.split_whitespace() {
            let (idx, val) = tok.split_once(':').ok_or_else(|| {
                BenchError::Config(format!(
                    "{}:{}: expected index:value pair, got {tok:?}",
                    path.display(),
                    line_no + 1
                ))
            })?;
            let idx: u32 = idx.parse().map_err(|e| {
                BenchError::Config(format!("{}:{}: bad index: {e}", path.display(), line_no + 1))
            })?;
            let val: f32 = val.parse().map_err(|e| {
                BenchError::Config(format!("{}:{}: bad value: {e}", path.display(), line_no + 1))
            })?;
            dim = dim.max(idx as usize + 1);
            row.push((idx, val));
        }
        row.sort_by_key(|(idx, _)| *idx);
        rows.push(row);
    }
    SparseMatrix::from_rows(rows, dim)
}

/// Generate a seeded uniform dense dataset (tests and benches).
pub fn generate_uniform_dense(rows: usize, dim: usize, seed: u64) -> DenseMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..rows * dim).map(|_| rng.random::<f32>()).collect();
    DenseMatrix { rows, dim, data }
}

/// Generate a seeded sparse dataset with `nnz_per_row` nonzeros per row.
pub fn generate_uniform_sparse(rows: usize, dim: usize, nnz_per_row: usize, seed: u64) -> SparseMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut cols: Vec<u32> = (0..dim as u32).collect();
        cols.shuffle(&mut rng);
        let mut row: Vec<(u32, f32)> = cols[..nnz_per_row.min(dim)]
            .iter()
            .map(|&c| (c, rng.random::<f32>() + 0.01))
            .collect();
        row.sort_by_key(|(c, _)| *c);
        out.push(row);
    }
    SparseMatrix::from_rows(out, dim).expect("generated rows are valid CSR")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn dense_row_access() {
        let m = DenseMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.row(0), &[1.0, 2.0]);
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn dense_ragged_rows_rejected() {
        assert!(DenseMatrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn sparse_row_access() {
        let m = SparseMatrix::from_rows(
            vec![vec![(0, 1.0), (3, 2.0)], vec![], vec![(2, 5.0)]],
            4,
        )
        .unwrap();
        assert_eq!(m.row(0), (&[0u32, 3][..], &[1.0f32, 2.0][..]));
        assert_eq!(m.row(1).0.len(), 0);
        assert_eq!(m.row(2), (&[2u32][..], &[5.0f32][..]));
    }

    #[test]
    fn truncate_dense() {
        let mut v = VectorSet::Dense(generate_uniform_dense(10, 4, 1));
        v.truncate(3);
        assert_eq!(v.len(), 3);
        match &v {
            VectorSet::Dense(m) => assert_eq!(m.data.len(), 12),
            VectorSet::Sparse(_) => unreachable!(),
        }
    }

    #[test]
    fn split_is_deterministic() {
        let all = VectorSet::Dense(generate_uniform_dense(50, 3, 7));
        let (d1, q1) = split_data(&all, 10, 0).unwrap();
        let (d2, q2) = split_data(&all, 10, 0).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(q1, q2);
        assert_eq!(d1.len(), 40);
        assert_eq!(q1.len(), 10);
    }

    #[test]
    fn read_dense_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dense.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "1.0 2.0 3.0").unwrap();
        writeln!(f, "4.0 5.0 6.0").unwrap();
        let m = read_dense_from_text(&path, None).unwrap();
        assert_eq!(m.rows, 2);
        assert_eq!(m.dim, 3);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn read_sparse_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "0:1.5 4:2.0").unwrap();
        writeln!(f, "2:3.0").unwrap();
        let m = read_sparse_from_text(&path, None).unwrap();
        assert_eq!(m.rows, 2);
        assert_eq!(m.dim, 5);
        assert_eq!(m.row(0), (&[0u32, 4][..], &[1.5f32, 2.0][..]));
    }
}
