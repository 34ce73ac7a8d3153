use std::io::Write;

use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::hammers::hit::Hit;
use crate::hammers::score::ScoreMap;
use crate::hammers::source::{CountingMethod, Source};

/// Fallback coverage when a contig's label/comment carries no recognizable
/// coverage annotation — spec.md §4.7.
const DEFAULT_COVERAGE: f64 = 50.0;
const DEFAULT_MIN_LENGTH: u64 = 400;
const DEFAULT_MIN_COVERAGE: f64 = 4.0;

/// Matches `covg`, `coverage`, `cov`, or `multi`, optionally followed by `_`
/// or `=`, then a number — e.g. `contig_1_covg_23.4`, `coverage=12`.
static COVERAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:covg|coverage|cov|multi)[_=]?([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Parse a coverage value out of a contig label or assembler comment
/// (spec.md §4.7 / scenario S5). Falls back to [`DEFAULT_COVERAGE`] when
/// neither matches.
pub fn parse_coverage(label: &str, comment: Option<&str>) -> f64 {
    for text in [Some(label), comment].into_iter().flatten() {
        if let Some(caps) = COVERAGE_RE.captures(text) {
            if let Ok(v) = caps[1].parse::<f64>() {
                return v;
            }
        }
    }
    DEFAULT_COVERAGE
}

/// Per-contig metadata a [`MappingBinRule`] decides on. `comment` mirrors a
/// FASTA header's free-text suffix, the usual place an assembler leaves a
/// coverage annotation when the label itself doesn't carry one.
#[derive(Debug, Clone)]
pub struct ContigMeta {
    pub label: String,
    pub length: u64,
    pub comment: Option<String>,
}

/// Maps some per-contig or per-sequence input to a bin id, or `None` to
/// reject. Two concrete rules implement this (spec.md §4.7); kept generic
/// over `Input` rather than forcing both into one signature, since one
/// consumes contig metadata and the other a score map.
pub trait BinningRule {
    type Input;
    fn classify(&self, input: &Self::Input) -> Option<String>;
}

/// Looks a contig's label up in a fixed table, gated by minimum length and
/// coverage. Coverage is parsed out of the label (or an assembler comment)
/// by [`parse_coverage`]; a contig too short or too shallow is rejected
/// before the table lookup even runs.
pub struct MappingBinRule {
    pub table: FxHashMap<String, String>,
    pub min_length: u64,
    pub min_coverage: f64,
}

impl MappingBinRule {
    pub fn new(table: FxHashMap<String, String>) -> Self {
        MappingBinRule {
            table,
            min_length: DEFAULT_MIN_LENGTH,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

impl BinningRule for MappingBinRule {
    type Input = ContigMeta;

    fn classify(&self, input: &ContigMeta) -> Option<String> {
        if input.length < self.min_length {
            return None;
        }
        let coverage = parse_coverage(&input.label, input.comment.as_deref());
        if coverage < self.min_coverage {
            return None;
        }
        self.table.get(&input.label).cloned()
    }
}

/// Picks the top genome out of a per-contig [`ScoreMap`] only if it clears
/// the runner-up by at least `margin` — otherwise the contig is ambiguous
/// and gets rejected (spec.md §4.7's margin-δ rule).
pub struct MaxHammerBinningRule {
    pub margin: f64,
}

impl BinningRule for MaxHammerBinningRule {
    type Input = ScoreMap;

    fn classify(&self, scores: &ScoreMap) -> Option<String> {
        let ranked = scores.sorted_counts();
        let (top_key, top_entry) = *ranked.first()?;
        let second_weight = ranked.get(1).map(|&(_, e)| e.weight).unwrap_or(0.0);
        if top_entry.weight - second_weight >= self.margin {
            Some(top_key.to_string())
        } else {
            None
        }
    }
}

/// Reserved bin id for contigs `BinBuilder::store` rejects — never a real
/// lookup-table bin id (spec.md §3's "reserved virtual bin").
pub const REJECTED_BIN_ID: &str = "__rejected__";

/// Running per-bin counters: how many contigs landed in a bin and their
/// total length, plus whether the bin is the reserved virtual one
/// (spec.md §3's "Binning statistics per bin").
#[derive(Debug, Clone)]
pub struct BinStats {
    pub bin_id: String,
    pub contig_count: u64,
    pub total_length: u64,
    pub is_virtual: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    contig_count: u64,
    total_length: u64,
}

/// Owns one output sink per bin id (plus a reserved sink for rejected
/// contigs) and the running `(count, length)` stats behind it. `store`
/// writes an already-formatted record to the right sink and updates its
/// counters — formatting the record itself (FASTA, TSV, …) is left to the
/// caller, per spec.md §1's "report formatting" non-goal.
#[derive(Default)]
pub struct BinBuilder {
    sinks: FxHashMap<String, Box<dyn Write + Send>>,
    rejected_sink: Option<Box<dyn Write + Send>>,
    counters: FxHashMap<String, Counters>,
    rejected_counters: Counters,
}

impl BinBuilder {
    pub fn new() -> Self {
        BinBuilder::default()
    }

    /// Register (or replace) the sink a bin's contigs are written to.
    pub fn set_sink(&mut self, bin_id: &str, sink: Box<dyn Write + Send>) {
        self.sinks.insert(bin_id.to_string(), sink);
    }

    pub fn set_rejected_sink(&mut self, sink: Box<dyn Write + Send>) {
        self.rejected_sink = Some(sink);
    }

    /// Write `record` to `bin`'s sink (or the rejected sink if `bin` is
    /// `None`) when one is registered, and update that bin's `(count,
    /// length)` stats regardless. Returns the bin id actually used
    /// ([`REJECTED_BIN_ID`] for a rejection).
    pub fn store(&mut self, bin: Option<String>, record: &[u8], length: u64) -> Result<String> {
        match bin {
            Some(id) => {
                if let Some(sink) = self.sinks.get_mut(&id) {
                    sink.write_all(record)?;
                }
                let c = self.counters.entry(id.clone()).or_default();
                c.contig_count += 1;
                c.total_length += length;
                Ok(id)
            }
            None => {
                if let Some(sink) = self.rejected_sink.as_mut() {
                    sink.write_all(record)?;
                }
                self.rejected_counters.contig_count += 1;
                self.rejected_counters.total_length += length;
                Ok(REJECTED_BIN_ID.to_string())
            }
        }
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_counters.contig_count
    }

    pub fn total(&self) -> u64 {
        self.counters.values().map(|c| c.contig_count).sum::<u64>() + self.rejected_counters.contig_count
    }

    /// Real bins before the virtual one, then by total length descending,
    /// then by bin id ascending (spec.md §3).
    pub fn stats(&self) -> Vec<BinStats> {
        let mut v: Vec<BinStats> = self
            .counters
            .iter()
            .map(|(id, c)| BinStats {
                bin_id: id.clone(),
                contig_count: c.contig_count,
                total_length: c.total_length,
                is_virtual: false,
            })
            .collect();
        if self.rejected_counters.contig_count > 0 {
            v.push(BinStats {
                bin_id: REJECTED_BIN_ID.to_string(),
                contig_count: self.rejected_counters.contig_count,
                total_length: self.rejected_counters.total_length,
                is_virtual: true,
            });
        }
        v.sort_by(|a, b| {
            a.is_virtual
                .cmp(&b.is_virtual)
                .then_with(|| b.total_length.cmp(&a.total_length))
                .then_with(|| a.bin_id.cmp(&b.bin_id))
        });
        v
    }
}

fn get_weight(len: usize, coverage: f64) -> f64 {
    len as f64 * coverage / 180.0
}

/// Shared entry point for the two classification strategies of spec.md
/// §4.6, rewriting the original's `ClassStrategy` polymorphism as a trait
/// with two concrete implementations (Design Notes §9).
pub trait ClassifyStrategy {
    fn classify(&self, hits: &[Hit], method: CountingMethod) -> ScoreMap;
}

/// Every hit contributes `getWeight(len, coverage) * method.weight` to its
/// genome, roles tracked alongside (spec.md §4.6).
pub struct HitsStrategy {
    pub len: usize,
    pub coverage: f64,
}

impl ClassifyStrategy for HitsStrategy {
    fn classify(&self, hits: &[Hit], method: CountingMethod) -> ScoreMap {
        let w = get_weight(self.len, self.coverage);
        let mut out = ScoreMap::new();
        for hit in hits {
            let genome = Source::genome_of(&hit.feature_id);
            out.add(genome, w * method.weight_value(hit.strength), &hit.role_id);
        }
        out
    }
}

/// Counts hits per genome first; only if the winner clears the runner-up by
/// `delta` does it emit a single entry, carrying the winner's roles but
/// reweighted to `getWeight(len, coverage)` (spec.md §4.6).
pub struct RegionsStrategy {
    pub len: usize,
    pub coverage: f64,
    pub delta: f64,
}

impl ClassifyStrategy for RegionsStrategy {
    fn classify(&self, hits: &[Hit], method: CountingMethod) -> ScoreMap {
        let mut counts = ScoreMap::new();
        for hit in hits {
            let genome = Source::genome_of(&hit.feature_id);
            counts.add(genome, method.weight_value(hit.strength), &hit.role_id);
        }

        let mut out = ScoreMap::new();
        let ranked = counts.sorted_counts();
        let Some(&(top_key, top_entry)) = ranked.first() else {
            return out;
        };
        let second_weight = ranked.get(1).map(|&(_, e)| e.weight).unwrap_or(0.0);
        if top_entry.weight - second_weight < self.delta {
            return out;
        }
        let final_weight = get_weight(self.len, self.coverage);
        for (role, w) in &top_entry.roles {
            out.add(top_key, w / top_entry.weight * final_weight, role);
        }
        out
    }
}
