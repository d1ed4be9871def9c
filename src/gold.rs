//! Exact gold-standard neighbor computation.
//!
//! Every benchmark evaluates recall against an exact brute-force top-K
//! computed here. Two distance families need different treatment:
//!
//! - Proper metrics (L1, L2, Minkowski-p, Chebyshev, cosine) are scanned
//!   query by query; each query only ever holds one distance row in memory.
//! - Inner product and KL-divergence materialize a batch-sized distance
//!   matrix, so queries are processed in fixed-size batches and the
//!   batch-local matrix is dropped before the next batch is allocated. This
//!   bounds peak memory at O(batch_size x N) instead of O(M x N).
//!
//! Ties in the top-K selection break toward the lowest data index; the
//! result is fully deterministic for fixed inputs.

use crate::dataset::VectorSet;
use crate::error::{BenchError, Result};
use crate::space::{DataKind, DistanceType};
use tracing::debug;

/// Query batch size for the inner-product and KL-divergence paths.
pub const DIST_COMPUTE_BATCH_SIZE: usize = 100;

/// Compute exact top-K neighbor ids per query, ascending distance.
///
/// Returns one id list per query, each of length `min(k, data.len())`.
/// An unsupported (distance, representation) combination is a fatal
/// configuration error.
pub fn compute_neighbors(
    dist: DistanceType,
    data: &VectorSet,
    queries: &VectorSet,
    k: usize,
) -> Result<Vec<Vec<u32>>> {
    if data.kind() != queries.kind() {
        return Err(BenchError::Config(
            "data and query sets have different representations".into(),
        ));
    }
    debug!(
        dist = %dist,
        data_qty = data.len(),
        query_qty = queries.len(),
        k,
        "computing gold standard"
    );
    match dist {
        DistanceType::InnerProd => {
            compute_neighbors_batched(data, queries, k, DIST_COMPUTE_BATCH_SIZE, inner_prod_dists)
        }
        DistanceType::KlDiv => match (data, queries) {
            (VectorSet::Dense(_), VectorSet::Dense(_)) => {
                compute_neighbors_batched(data, queries, k, DIST_COMPUTE_BATCH_SIZE, kldiv_dists)
            }
            _ => Err(unsupported(queries.kind(), dist)),
        },
        _ => compute_neighbors_scan(dist, data, queries, k),
    }
}

fn unsupported(kind: DataKind, dist: DistanceType) -> BenchError {
    BenchError::UnsupportedSpace {
        kind: kind.to_string(),
        dist: dist.to_string(),
    }
}

/// Brute-force scan for the metric family; one distance row per query.
fn compute_neighbors_scan(
    dist: DistanceType,
    data: &VectorSet,
    queries: &VectorSet,
    k: usize,
) -> Result<Vec<Vec<u32>>> {
    match (data, queries) {
        (VectorSet::Dense(data), VectorSet::Dense(queries)) => {
            let mut out = Vec::with_capacity(queries.rows);
            for qi in 0..queries.rows {
                let q = queries.row(qi);
                let dists: Vec<f32> = (0..data.rows)
                    .map(|di| dense_metric_dist(dist, data.row(di), q))
                    .collect();
                out.push(top_k(&dists, k));
            }
            Ok(out)
        }
        (VectorSet::Sparse(data), VectorSet::Sparse(queries)) if dist == DistanceType::Cosine => {
            let mut out = Vec::with_capacity(queries.rows);
            for qi in 0..queries.rows {
                let (qc, qv) = queries.row(qi);
                let dists: Vec<f32> = (0..data.rows)
                    .map(|di| {
                        let (dc, dv) = data.row(di);
                        sparse_cosine_dist(dc, dv, qc, qv)
                    })
                    .collect();
                out.push(top_k(&dists, k));
            }
            Ok(out)
        }
        _ => Err(unsupported(queries.kind(), dist)),
    }
}

/// Batched top-K: process queries in `batch_size` chunks, concatenating
/// per-batch results in original query order.
fn compute_neighbors_batched<F>(
    data: &VectorSet,
    queries: &VectorSet,
    k: usize,
    batch_size: usize,
    batch_processor: F,
) -> Result<Vec<Vec<u32>>>
where
    F: Fn(&VectorSet, &VectorSet, usize, usize) -> Result<Vec<Vec<f32>>>,
{
    let query_qty = queries.len();
    let mut neighbors = Vec::with_capacity(query_qty);

    let mut start = 0;
    while start < query_qty {
        let end = (start + batch_size).min(query_qty);
        // The batch distance matrix lives only inside this iteration; it is
        // released before the next batch allocates its own.
        let dists_batch = batch_processor(data, queries, start, end)?;
        for dists in &dists_batch {
            neighbors.push(top_k(dists, k));
        }
        start = end;
    }

    Ok(neighbors)
}

/// Inner-product distances for one query batch, dense or sparse.
///
/// Larger dot product means closer, so the sign is flipped before ranking.
fn inner_prod_dists(
    data: &VectorSet,
    queries: &VectorSet,
    start: usize,
    end: usize,
) -> Result<Vec<Vec<f32>>> {
    match (data, queries) {
        (VectorSet::Dense(data), VectorSet::Dense(queries)) => Ok((start..end)
            .map(|qi| {
                let q = queries.row(qi);
                (0..data.rows).map(|di| -dot(data.row(di), q)).collect()
            })
            .collect()),
        (VectorSet::Sparse(data), VectorSet::Sparse(queries)) => Ok((start..end)
            .map(|qi| {
                let (qc, qv) = queries.row(qi);
                (0..data.rows)
                    .map(|di| {
                        let (dc, dv) = data.row(di);
                        -sparse_dot(dc, dv, qc, qv)
                    })
                    .collect()
            })
            .collect()),
        _ => Err(BenchError::Config(
            "data and query sets have different representations".into(),
        )),
    }
}

/// KL-divergence distances for one query batch (dense only).
///
/// Per data row `d` and query `q`: sum_j rel_entr(d_j, q_j), with the data
/// matrix as the left (reference) argument.
fn kldiv_dists(
    data: &VectorSet,
    queries: &VectorSet,
    start: usize,
    end: usize,
) -> Result<Vec<Vec<f32>>> {
    let (VectorSet::Dense(data), VectorSet::Dense(queries)) = (data, queries) else {
        return Err(BenchError::Config("KL-divergence requires dense vectors".into()));
    };
    Ok((start..end)
        .map(|qi| {
            let q = queries.row(qi);
            (0..data.rows)
                .map(|di| {
                    data.row(di)
                        .iter()
                        .zip(q.iter())
                        .map(|(&x, &y)| rel_entr(x, y))
                        .sum()
                })
                .collect()
        })
        .collect())
}

/// Elementwise relative entropy term, matching the usual convention:
/// `x ln(x/y)` for `x > 0, y > 0`; `0` for `x = 0`; `+inf` for `x > 0, y = 0`.
#[inline]
fn rel_entr(x: f32, y: f32) -> f32 {
    if x > 0.0 {
        if y > 0.0 {
            x * (x / y).ln()
        } else {
            f32::INFINITY
        }
    } else {
        0.0
    }
}

/// Indices of the `k` smallest distances, ascending; ties break toward the
/// lowest index.
pub(crate) fn top_k(dists: &[f32], k: usize) -> Vec<u32> {
    let mut idx: Vec<u32> = (0..dists.len() as u32).collect();
    idx.sort_by(|&a, &b| {
        dists[a as usize]
            .total_cmp(&dists[b as usize])
            .then(a.cmp(&b))
    });
    idx.truncate(k);
    idx
}

// ---------------------------------------------------------------------------
// Distance kernels
// ---------------------------------------------------------------------------

#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Dense distance for the metric family.
#[inline]
pub fn dense_metric_dist(dist: DistanceType, a: &[f32], b: &[f32]) -> f32 {
    match dist {
        DistanceType::L1 => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        DistanceType::L2 => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
        DistanceType::Lp(p) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs().powi(p as i32))
            .sum::<f32>()
            .powf(1.0 / p as f32),
        DistanceType::Linf => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max),
        DistanceType::Cosine => cosine_dist(a, b),
        DistanceType::InnerProd => -dot(a, b),
        DistanceType::KlDiv => a
            .iter()
            .zip(b.iter())
            .map(|(&x, &y)| rel_entr(x, y))
            .sum(),
    }
}

/// Cosine distance `1 - cos(a, b)`; zero vectors are maximally distant.
#[inline]
#[must_use]
pub fn cosine_dist(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = dot(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < 1e-10 || norm_b < 1e-10 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Dot product over two sorted sparse rows (merge join on column ids).
#[must_use]
pub fn sparse_dot(ac: &[u32], av: &[f32], bc: &[u32], bv: &[f32]) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < ac.len() && j < bc.len() {
        match ac[i].cmp(&bc[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += av[i] * bv[j];
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Cosine distance over two sorted sparse rows.
#[must_use]
pub fn sparse_cosine_dist(ac: &[u32], av: &[f32], bc: &[u32], bv: &[f32]) -> f32 {
    let dot = sparse_dot(ac, av, bc, bv);
    let norm_a = av.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = bv.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < 1e-10 || norm_b < 1e-10 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
