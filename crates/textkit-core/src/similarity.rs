//! Vector math used by the default similarity metric.

use crate::error::{Error, Result};
use crate::types::Vector;

fn same_len(u: &[f32], v: &[f32]) -> Result<()> {
    if u.len() == v.len() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected: u.len(), actual: v.len() })
    }
}

pub fn dot(u: &[f32], v: &[f32]) -> Result<f32> {
    same_len(u, v)?;
    Ok(u.iter().zip(v).map(|(a, b)| a * b).sum())
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns `0.0` when either vector has zero norm.
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> Result<f32> {
    let d = dot(u, v)?;
    let denom = l2_norm(u) * l2_norm(v);
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok((d / denom).clamp(-1.0, 1.0))
}

/// L2-normalize `v`. Zero vectors are returned unchanged.
pub fn normalize_l2(v: &[f32]) -> Vector {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}
