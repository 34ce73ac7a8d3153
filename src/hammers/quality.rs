use std::sync::Arc;

use fxhash::FxHashMap;

use crate::hammers::hit::Hit;

/// Phred quality character offset (`'!'` = Q0), the universal Sanger/Illumina
/// 1.8+ convention.
const PHRED_OFFSET: u8 = 33;

/// Probability that a single base at Phred quality `q_char` was called
/// correctly: `1 - 10^(-Q/10)`.
fn base_call_probability(q_char: u8) -> f64 {
    let q = (q_char.saturating_sub(PHRED_OFFSET)) as f64;
    1.0 - 10f64.powf(-q / 10.0)
}

/// Product of per-base call probabilities across a hit's hammer window.
fn hit_probability(hit: &Hit, quality: &str) -> Option<f64> {
    let start = hit.left.min(hit.right) as usize - 1;
    let end = start + hit.hammer.len();
    let bytes = quality.as_bytes();
    if end > bytes.len() {
        return None;
    }
    Some(bytes[start..end].iter().map(|&q| base_call_probability(q)).product())
}

/// Drop every hit whose window's combined base-call probability falls below
/// `min_probability`, per spec.md §4.8. A contig with no entry in
/// `qualities` is a programming error upstream (every hit must come from a
/// sequence whose quality string was supplied); every hit on it is dropped
/// and folded into the returned missing-quality count instead of panicking.
pub fn filter_hits(
    hits: Vec<Hit>,
    qualities: &FxHashMap<Arc<str>, String>,
    min_probability: f64,
) -> (Vec<Hit>, usize) {
    let mut missing = 0usize;
    let kept = hits
        .into_iter()
        .filter(|hit| match qualities.get(&hit.contig) {
            Some(quality) => hit_probability(hit, quality).map_or(false, |p| p >= min_probability),
            None => {
                missing += 1;
                false
            }
        })
        .collect();
    (kept, missing)
}
