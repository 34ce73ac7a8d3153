use std::sync::atomic::{AtomicBool, Ordering};

/// The payload stored for every hammer: which feature certified it, which
/// role that feature plays, and how strongly the upstream pipeline trusts
/// it.
#[derive(Debug)]
pub struct Source {
    /// `fig|<genome_id>.peg.<n>` — the genome id is a parseable prefix.
    pub feature_id: String,
    pub role_id: String,
    /// Confidence in `[0, 1]`.
    pub strength: f32,
    /// Construction-time prune flag set by [`super::map::HammerMap::anchorize`].
    bad: AtomicBool,
}

impl Source {
    pub fn new(feature_id: String, role_id: String, strength: f32) -> Self {
        Source {
            feature_id,
            role_id,
            strength,
            bad: AtomicBool::new(false),
        }
    }

    pub fn is_bad(&self) -> bool {
        self.bad.load(Ordering::Relaxed)
    }

    pub fn mark_bad(&self) {
        self.bad.store(true, Ordering::Relaxed);
    }

    /// Extract the genome id out of a `fig|<genome_id>.peg.<n>` feature id.
    /// Returns the whole string (minus the `fig|` prefix, if present) when
    /// the `.peg.` suffix is missing, so malformed ids still bucket
    /// somewhere rather than panicking.
    pub fn genome_of(feature_id: &str) -> &str {
        let rest = feature_id.strip_prefix("fig|").unwrap_or(feature_id);
        match rest.find(".peg.") {
            Some(idx) => &rest[..idx],
            None => rest,
        }
    }
}

/// How a hit contributes to a score map. A small enum rather than dynamic
/// dispatch, per Design Notes §9 ("keep as a small enum with a
/// `weight(&Source) -> f64` function").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingMethod {
    /// Every hit contributes exactly 1.
    Count,
    /// Every hit contributes `source.strength`.
    Strength,
}

impl CountingMethod {
    pub fn weight(&self, source: &Source) -> f64 {
        self.weight_value(source.strength)
    }

    /// Same rule as [`CountingMethod::weight`], applied to a strength value
    /// already copied out of a `Source` (a [`SourceInfo`] or a [`super::hit::Hit`]).
    pub fn weight_value(&self, strength: f32) -> f64 {
        match self {
            CountingMethod::Count => 1.0,
            CountingMethod::Strength => strength as f64,
        }
    }
}

/// Owned snapshot of a [`Source`] returned by a query, plus the genome id
/// derived from its feature id. Decoupled from the map's internal `Source`
/// so callers never hold a bucket lock past the query call.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub feature_id: String,
    pub role_id: String,
    pub strength: f32,
    pub genome_id: String,
}

impl SourceInfo {
    pub fn from_source(source: &Source) -> Self {
        SourceInfo {
            feature_id: source.feature_id.clone(),
            role_id: source.role_id.clone(),
            strength: source.strength,
            genome_id: Source::genome_of(&source.feature_id).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genome_of_extracts_prefix() {
        assert_eq!(Source::genome_of("fig|1278308.3.peg.2084"), "1278308.3");
        assert_eq!(Source::genome_of("fig|565575.4.peg.12"), "565575.4");
    }

    #[test]
    fn genome_of_tolerates_missing_suffix() {
        assert_eq!(Source::genome_of("fig|565575.4"), "565575.4");
        assert_eq!(Source::genome_of("565575.4"), "565575.4");
    }

    #[test]
    fn counting_method_weight() {
        let s = Source::new("fig|1.1.peg.1".into(), "role1".into(), 0.75);
        assert_eq!(CountingMethod::Count.weight(&s), 1.0);
        assert!((CountingMethod::Strength.weight(&s) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn bad_flag_defaults_false_and_can_be_set() {
        let s = Source::new("fig|1.1.peg.1".into(), "role1".into(), 0.5);
        assert!(!s.is_bad());
        s.mark_bad();
        assert!(s.is_bad());
    }
}
