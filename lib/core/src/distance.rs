// Similarity scoring. Every score is "higher is better" so results can be
// ranked the same way whatever the metric.
use crate::{MetricType, SparseVector};
use std::collections::HashMap;

/// Dot product with two accumulators for better pipelining.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let mut dot0 = 0.0f32;
    let mut dot1 = 0.0f32;

    let chunks = a.chunks_exact(8);
    let remainder = chunks.remainder().len();
    for (a_chunk, b_chunk) in chunks.zip(b.chunks_exact(8)) {
        dot0 += a_chunk[0] * b_chunk[0]
            + a_chunk[1] * b_chunk[1]
            + a_chunk[2] * b_chunk[2]
            + a_chunk[3] * b_chunk[3];
        dot1 += a_chunk[4] * b_chunk[4]
            + a_chunk[5] * b_chunk[5]
            + a_chunk[6] * b_chunk[6]
            + a_chunk[7] * b_chunk[7];
    }

    let len = a.len().min(b.len());
    for i in (a.len() - remainder)..len {
        dot0 += a[i] * b[i];
    }
    dot0 + dot1
}

#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Euclidean distance. Mismatched lengths are infinitely far apart.
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    let mut sum0 = 0.0f32;
    let mut sum1 = 0.0f32;

    let chunks = a.chunks_exact(4);
    let remainder = chunks.remainder().len();
    for (a_chunk, b_chunk) in chunks.zip(b.chunks_exact(4)) {
        let d0 = a_chunk[0] - b_chunk[0];
        let d1 = a_chunk[1] - b_chunk[1];
        let d2 = a_chunk[2] - b_chunk[2];
        let d3 = a_chunk[3] - b_chunk[3];
        sum0 += d0 * d0 + d1 * d1;
        sum1 += d2 * d2 + d3 * d3;
    }
    for i in (a.len() - remainder)..a.len() {
        let diff = a[i] - b[i];
        sum0 += diff * diff;
    }
    (sum0 + sum1).sqrt()
}

/// Cosine similarity; 0 when either side is a zero vector.
#[inline]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Score two dense vectors under `metric`.
pub fn score_dense(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        MetricType::L2 => -l2_distance(a, b),
        MetricType::Cosine => cosine(a, b),
        MetricType::Ip | MetricType::MipsL2 | MetricType::Undefined => dot(a, b),
    }
}

/// Negative Hamming distance between two packed bit vectors.
pub fn score_binary32(a: &[i32], b: &[i32]) -> f32 {
    let bits: u32 = a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum();
    -(bits as f32)
}

pub fn score_binary64(a: &[i64], b: &[i64]) -> f32 {
    let bits: u32 = a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum();
    -(bits as f32)
}

/// Score two sparse vectors under `metric`, treating missing indices as 0.
pub fn score_sparse(metric: MetricType, query: &SparseVector, doc: &SparseVector) -> f32 {
    let lookup: HashMap<u32, f32, ahash::RandomState> = doc.iter().collect();
    let dot: f32 = query
        .iter()
        .filter_map(|(i, q)| lookup.get(&i).map(|d| q * d))
        .sum();
    let norm_q = query.values().iter().map(|v| v * v).sum::<f32>();
    let norm_d = doc.values().iter().map(|v| v * v).sum::<f32>();

    match metric {
        MetricType::L2 => -(norm_q + norm_d - 2.0 * dot).max(0.0).sqrt(),
        MetricType::Cosine => {
            if norm_q == 0.0 || norm_d == 0.0 {
                0.0
            } else {
                dot / (norm_q.sqrt() * norm_d.sqrt())
            }
        }
        MetricType::Ip | MetricType::MipsL2 | MetricType::Undefined => dot,
    }
}
