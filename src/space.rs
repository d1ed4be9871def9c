//! Distance types and space resolution.
//!
//! A *space* is the pairing of a data representation (dense or sparse) with a
//! distance type; index methods are built against a concrete space name.
//! Only a fixed set of pairings is meaningful, so resolution goes through a
//! closed table and anything outside it fails fast as a configuration error.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance type used for both gold-standard computation and space naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceType {
    /// Manhattan (L1) distance.
    L1,
    /// Euclidean (L2) distance.
    L2,
    /// Minkowski distance with integer exponent `p >= 1`.
    Lp(u32),
    /// Chebyshev (L-infinity) distance.
    Linf,
    /// Cosine distance `1 - cos(a, b)`.
    Cosine,
    /// Inner-product distance `-<a, b>` (larger dot product means closer).
    InnerProd,
    /// KL-divergence (dense probability vectors only).
    KlDiv,
}

impl DistanceType {
    /// Parse the textual distance tag used in test-case configuration.
    ///
    /// `l<p>` with `p >= 3` parses as the Minkowski distance of order `p`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.to_lowercase();
        match s.as_str() {
            "l1" => Ok(DistanceType::L1),
            "l2" => Ok(DistanceType::L2),
            "linf" => Ok(DistanceType::Linf),
            "cosine" => Ok(DistanceType::Cosine),
            "inner_prod" => Ok(DistanceType::InnerProd),
            "kldiv" => Ok(DistanceType::KlDiv),
            _ => {
                if let Some(p) = s.strip_prefix('l').and_then(|p| p.parse::<u32>().ok()) {
                    if p >= 1 {
                        return Ok(match p {
                            1 => DistanceType::L1,
                            2 => DistanceType::L2,
                            _ => DistanceType::Lp(p),
                        });
                    }
                }
                Err(BenchError::Config(format!("unsupported distance: {s}")))
            }
        }
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceType::L1 => write!(f, "l1"),
            DistanceType::L2 => write!(f, "l2"),
            DistanceType::Lp(p) => write!(f, "l{p}"),
            DistanceType::Linf => write!(f, "linf"),
            DistanceType::Cosine => write!(f, "cosine"),
            DistanceType::InnerProd => write!(f, "inner_prod"),
            DistanceType::KlDiv => write!(f, "kldiv"),
        }
    }
}

/// Data representation of a vector set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Dense,
    Sparse,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Dense => write!(f, "vector_dense"),
            DataKind::Sparse => write!(f, "vector_sparse"),
        }
    }
}

/// Fixed-name space table entries; `Lp` is handled separately because the
/// space name carries the exponent.
const SPACE_TABLE: &[(DataKind, DistanceType, &str)] = &[
    (DataKind::Dense, DistanceType::KlDiv, "kldivfast"),
    (DataKind::Dense, DistanceType::Linf, "linf"),
    (DataKind::Dense, DistanceType::L1, "l1"),
    (DataKind::Dense, DistanceType::L2, "l2"),
    (DataKind::Dense, DistanceType::Cosine, "cosinesimil"),
    (DataKind::Sparse, DistanceType::Cosine, "cosinesimil_sparse_fast"),
    (DataKind::Dense, DistanceType::InnerProd, "negdotprod"),
    (DataKind::Sparse, DistanceType::InnerProd, "negdotprod_sparse_fast"),
];

/// Resolve a (data kind, distance type) pair to its concrete space name.
///
/// Every pair resolves to exactly one space or the harness fails fast; there
/// is no fallback.
pub fn resolve_space(kind: DataKind, dist: DistanceType) -> Result<String> {
    if let DistanceType::Lp(p) = dist {
        if kind == DataKind::Dense {
            return Ok(format!("lp:p={p}"));
        }
    }
    SPACE_TABLE
        .iter()
        .find(|(k, d, _)| *k == kind && *d == dist)
        .map(|(_, _, name)| (*name).to_string())
        .ok_or_else(|| BenchError::UnsupportedSpace {
            kind: kind.to_string(),
            dist: dist.to_string(),
        })
}
