//! Exact inner-product index over unit vectors.
//!
//! Vectors are stored row-major in insertion order; the row number is the
//! positional id that maps back to a `FaqRecord`. Because every stored and
//! query vector is L2-normalised, inner product ranks exactly like cosine
//! similarity.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Scales `v` to unit L2 norm in place. Returns `false` (leaving `v` untouched)
/// when the norm is zero or not finite.
pub fn normalize_l2(v: &mut [f32]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 { return false; }
    for x in v.iter_mut() { *x /= norm; }
    true
}

pub fn inner_product(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIpIndex {
    dim: usize,
    ntotal: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self { Self { dim, ntotal: 0, data: Vec::new() } }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.ntotal }
    pub fn is_empty(&self) -> bool { self.ntotal == 0 }

    /// Appends one row. The caller guarantees the vector is already normalised.
    pub fn add(&mut self, vector: &[f32]) -> Result<(), String> {
        if vector.len() != self.dim {
            return Err(format!("vector has dimension {}, index expects {}", vector.len(), self.dim));
        }
        self.data.extend_from_slice(vector);
        self.ntotal += 1;
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ { self.data.chunks_exact(self.dim.max(1)).take(self.ntotal) }

    /// The `k` rows with the highest inner product against `query`, best first.
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || query.len() != self.dim { return Vec::new(); }
        let mut scored: Vec<(usize, f32)> = self.rows().map(|row| inner_product(row, query)).enumerate().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }

    /// True when the stored row count matches the raw data length.
    pub fn is_well_formed(&self) -> bool { self.dim > 0 && self.data.len() == self.dim * self.ntotal }
}
