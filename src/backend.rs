//! Index capability interface and the exact scan backend.
//!
//! The harness drives any method under test through [`AnnIndex`]: bulk
//! insert, parameterized build, query-time parameter updates, batch k-NN
//! queries, and save/load for the reload phase. The in-process mode is
//! agnostic to the implementation behind the trait; the out-of-process mode
//! wires the same protocol to an external executable (see `external`).
//!
//! [`FlatIndex`] is the bundled reference backend: an exact linear scan with
//! bincode persistence. It exists so the lifecycle and trial machinery can be
//! exercised end to end without an ANN library; recall against the gold
//! standard is 1.0 by construction.

use crate::dataset::VectorSet;
use crate::error::{BenchError, Result};
use crate::gold;
use crate::params::Params;
use crate::space::{DataKind, DistanceType};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Capability interface every benchmarked index must provide.
pub trait AnnIndex {
    /// Bulk-insert vectors. `ids` defaults to positional (0..n) when absent.
    fn add_batch(&mut self, data: &VectorSet, ids: Option<&[u32]>) -> Result<()>;

    /// Construct the index with the given index-time parameters. May be
    /// slow; the lifecycle controller times this call.
    fn build(&mut self, index_time_params: &Params) -> Result<()>;

    /// Apply query-time parameters ahead of a query sweep.
    fn set_query_params(&mut self, query_time_params: &Params) -> Result<()>;

    /// Batch k-NN query: one `(neighbor_ids, distances)` pair list per query.
    fn knn_query_batch(
        &self,
        queries: &VectorSet,
        k: usize,
        num_threads: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>>;

    /// Serialize the index (and, when requested, the source data) to a file.
    fn save(&self, path: &Path, include_data: bool) -> Result<()>;

    /// Reinitialize this index from a previously saved file.
    fn load(&mut self, path: &Path, include_data: bool) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct FlatIndexState {
    dist: DistanceType,
    ids: Vec<u32>,
    data: Option<VectorSet>,
}

/// Exact linear-scan index.
pub struct FlatIndex {
    dist: DistanceType,
    ids: Vec<u32>,
    data: Option<VectorSet>,
    built: bool,
}

impl FlatIndex {
    pub fn new(dist: DistanceType) -> Self {
        Self {
            dist,
            ids: Vec::new(),
            data: None,
            built: false,
        }
    }

    fn data(&self) -> Result<&VectorSet> {
        self.data
            .as_ref()
            .ok_or_else(|| BenchError::Backend("flat index has no data".into()))
    }

    /// Distances from query `qi` to every stored vector.
    fn query_dists(&self, queries: &VectorSet, qi: usize) -> Result<Vec<f32>> {
        let data = self.data()?;
        match (data, queries) {
            (VectorSet::Dense(data), VectorSet::Dense(queries)) => {
                let q = queries.row(qi);
                Ok((0..data.rows)
                    .map(|di| gold::dense_metric_dist(self.dist, data.row(di), q))
                    .collect())
            }
            (VectorSet::Sparse(data), VectorSet::Sparse(queries)) => {
                let (qc, qv) = queries.row(qi);
                match self.dist {
                    DistanceType::Cosine => Ok((0..data.rows)
                        .map(|di| {
                            let (dc, dv) = data.row(di);
                            gold::sparse_cosine_dist(dc, dv, qc, qv)
                        })
                        .collect()),
                    DistanceType::InnerProd => Ok((0..data.rows)
                        .map(|di| {
                            let (dc, dv) = data.row(di);
                            -gold::sparse_dot(dc, dv, qc, qv)
                        })
                        .collect()),
                    _ => Err(BenchError::UnsupportedSpace {
                        kind: DataKind::Sparse.to_string(),
                        dist: self.dist.to_string(),
                    }),
                }
            }
            _ => Err(BenchError::Backend(
                "query representation does not match indexed data".into(),
            )),
        }
    }

    fn knn_range(
        &self,
        queries: &VectorSet,
        range: std::ops::Range<usize>,
        k: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        let mut out = Vec::with_capacity(range.len());
        for qi in range {
            let dists = self.query_dists(queries, qi)?;
            let nbrs = gold::top_k(&dists, k)
                .into_iter()
                .map(|pos| (self.ids[pos as usize], dists[pos as usize]))
                .collect();
            out.push(nbrs);
        }
        Ok(out)
    }
}

impl AnnIndex for FlatIndex {
    fn add_batch(&mut self, data: &VectorSet, ids: Option<&[u32]>) -> Result<()> {
        if self.data.is_some() {
            return Err(BenchError::Backend("flat index already holds data".into()));
        }
        let ids = match ids {
            Some(ids) => {
                if ids.len() != data.len() {
                    return Err(BenchError::Backend(format!(
                        "{} ids for {} vectors",
                        ids.len(),
                        data.len()
                    )));
                }
                ids.to_vec()
            }
            None => (0..data.len() as u32).collect(),
        };
        self.ids = ids;
        self.data = Some(data.clone());
        Ok(())
    }

    fn build(&mut self, _index_time_params: &Params) -> Result<()> {
        self.data()?;
        self.built = true;
        Ok(())
    }

    // A linear scan has no query-time knobs; accept and ignore.
    fn set_query_params(&mut self, _query_time_params: &Params) -> Result<()> {
        Ok(())
    }

    fn knn_query_batch(
        &self,
        queries: &VectorSet,
        k: usize,
        num_threads: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        if !self.built {
            return Err(BenchError::Backend("flat index not built".into()));
        }
        let query_qty = queries.len();
        let threads = num_threads.max(1).min(query_qty.max(1));
        if threads <= 1 {
            return self.knn_range(queries, 0..query_qty, k);
        }

        // Split the query range across scoped threads; chunk order is fixed
        // so results concatenate back in query order.
        let chunk = query_qty.div_ceil(threads);
        let ranges: Vec<_> = (0..threads)
            .map(|t| (t * chunk).min(query_qty)..((t + 1) * chunk).min(query_qty))
            .collect();
        let parts = std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|r| scope.spawn(move || self.knn_range(queries, r, k)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .map_err(|_| BenchError::Backend("query worker panicked".into()))?
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(parts.into_iter().flatten().collect())
    }

    fn save(&self, path: &Path, include_data: bool) -> Result<()> {
        let state = FlatIndexState {
            dist: self.dist,
            ids: self.ids.clone(),
            data: if include_data { self.data.clone() } else { None },
        };
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, &state)?;
        Ok(())
    }

    fn load(&mut self, path: &Path, include_data: bool) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let state: FlatIndexState = bincode::deserialize_from(reader)?;
        if include_data && state.data.is_none() {
            return Err(BenchError::Backend(
                "saved index does not embed its data".into(),
            ));
        }
        self.dist = state.dist;
        self.ids = state.ids;
        self.data = state.data;
        self.built = self.data.is_some();
        Ok(())
    }
}
