use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::hammers::codec::{encode, reverse_complement_string};
use crate::hammers::database::HammerDb;
use crate::hammers::hit::{Hit, Strand};
use crate::hammers::score::ScoreMap;

/// Walks query sequences against a [`HammerDb`], forward and
/// reverse-complemented, emitting every window that lands on a hammer.
/// `parallel` selects between a plain sequential walk and a `rayon`
/// work-stealing walk partitioned one sequence per task — mirrors the
/// teacher's `par_iter()` split over chromosomes, generalized to arbitrary
/// query sequences (spec.md §4.5).
pub struct ScanEngine<'a> {
    db: &'a HammerDb,
    parallel: bool,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> ScanEngine<'a> {
    pub fn new(db: &'a HammerDb, parallel: bool) -> Self {
        ScanEngine { db, parallel, cancel: None }
    }

    /// Check `flag` at every sequence boundary; once set, the scan discards
    /// whatever it has accumulated and returns an empty result rather than a
    /// partial one (spec.md §5's cooperative cancellation).
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.map_or(false, |f| f.load(Ordering::Relaxed))
    }

    fn scan_one_to_hits(&self, contig: Arc<str>, bases: &str) -> Vec<Hit> {
        let k = self.db.k() as usize;
        let len = bases.len();
        if k == 0 || k > len {
            return Vec::new();
        }
        let mut hits = Vec::new();

        for i in 0..=(len - k) {
            let window = &bases[i..i + k];
            let code = encode(window, k);
            if let Some(info) = self.db.get_source_by_code(code) {
                hits.push(Hit {
                    contig: contig.clone(),
                    left: (i + 1) as u64,
                    right: (i + k) as u64,
                    strand: Strand::Forward,
                    feature_id: info.feature_id,
                    role_id: info.role_id,
                    strength: info.strength,
                    hammer: window.to_string(),
                });
            }
        }

        let rev = reverse_complement_string(bases);
        for i in 0..=(len - k) {
            let window = &rev[i..i + k];
            let code = encode(window, k);
            if let Some(info) = self.db.get_source_by_code(code) {
                let left = (len - i) as u64;
                let right = left - k as u64 + 1;
                hits.push(Hit {
                    contig: contig.clone(),
                    left,
                    right,
                    strand: Strand::Reverse,
                    feature_id: info.feature_id,
                    role_id: info.role_id,
                    strength: info.strength,
                    hammer: window.to_string(),
                });
            }
        }
        hits
    }

    fn scan_one_to_scores(&self, bases: &str, external_weight: f64) -> ScoreMap {
        let k = self.db.k() as usize;
        let len = bases.len();
        let mut local = ScoreMap::new();
        if k == 0 || k > len {
            return local;
        }
        let method = self.db.method();

        for i in 0..=(len - k) {
            let code = encode(&bases[i..i + k], k);
            if let Some(info) = self.db.get_source_by_code(code) {
                let w = method.weight_value(info.strength) * external_weight;
                local.add(&info.genome_id, w, &info.role_id);
            }
        }
        let rev = reverse_complement_string(bases);
        for i in 0..=(len - k) {
            let code = encode(&rev[i..i + k], k);
            if let Some(info) = self.db.get_source_by_code(code) {
                let w = method.weight_value(info.strength) * external_weight;
                local.add(&info.genome_id, w, &info.role_id);
            }
        }
        local
    }

    /// Collect every hit across `seqs`, sorted and de-duplicated by location
    /// and feature id (spec.md §3).
    pub fn scan_to_hits<I, L, B>(&self, seqs: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = (L, B)>,
        L: AsRef<str>,
        B: AsRef<str>,
    {
        let pairs: Vec<(Arc<str>, String)> = seqs
            .into_iter()
            .map(|(l, b)| (Arc::from(l.as_ref()), b.as_ref().to_string()))
            .collect();

        let mut all: Vec<Hit> = if self.parallel {
            if self.cancelled() {
                return Vec::new();
            }
            pairs
                .par_iter()
                .flat_map(|(contig, bases)| self.scan_one_to_hits(contig.clone(), bases))
                .collect()
        } else {
            let mut acc = Vec::new();
            for (contig, bases) in &pairs {
                if self.cancelled() {
                    return Vec::new();
                }
                acc.extend(self.scan_one_to_hits(contig.clone(), bases));
            }
            acc
        };
        all.sort();
        all.dedup();
        all
    }

    /// Aggregate every window across `seqs` into a single [`ScoreMap`],
    /// scaling every contribution by `external_weight`.
    pub fn scan_to_scores<I, L, B>(&self, seqs: I, external_weight: f64) -> ScoreMap
    where
        I: IntoIterator<Item = (L, B)>,
        L: AsRef<str>,
        B: AsRef<str>,
    {
        let bases: Vec<String> = seqs.into_iter().map(|(_, b)| b.as_ref().to_string()).collect();

        if self.parallel {
            if self.cancelled() {
                return ScoreMap::new();
            }
            bases
                .par_iter()
                .map(|b| self.scan_one_to_scores(b, external_weight))
                .reduce(ScoreMap::new, |mut a, b| {
                    a.accumulate(&b, 1.0);
                    a
                })
        } else {
            let mut global = ScoreMap::new();
            for b in &bases {
                if self.cancelled() {
                    return ScoreMap::new();
                }
                global.accumulate(&self.scan_one_to_scores(b, external_weight), 1.0);
            }
            global
        }
    }
}
