use std::io::BufRead;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;

use crate::error::{HammerError, Result};
use crate::hammers::array::HammerArray;
use crate::hammers::codec::{decode, encode, reverse_complement_string, INVALID};
use crate::hammers::map::HammerMap;
use crate::hammers::quality;
use crate::hammers::scan::ScanEngine;
use crate::hammers::score::ScoreMap;
use crate::hammers::source::{CountingMethod, Source, SourceInfo};
use crate::hammers::Hit;

/// How often the loader is allowed to print a progress line, per spec.md
/// §4.3 ("at most once per 5 seconds").
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// The in-memory hammer index plus everything needed to answer queries
/// against it: the two-level map, one [`HammerArray`] per source genome,
/// and the counting method this instance was built with.
pub struct HammerDb {
    k: u8,
    map: HammerMap<Source>,
    per_genome: FxHashMap<String, HammerArray>,
    method: CountingMethod,
}

impl HammerDb {
    /// Load a hammer table: one header line (discarded) followed by rows of
    /// `hammer\tfeature_id\tstrength\t...\trole_id`. The first data row's
    /// hammer length fixes `k` for the whole load; every later row must
    /// match it exactly.
    pub fn load_tsv<R: BufRead>(reader: R, method: CountingMethod) -> Result<Self> {
        let mut lines = reader.lines();
        lines.next().ok_or(HammerError::EmptyDatabase)??;

        let mut k: Option<u8> = None;
        let mut map: Option<HammerMap<Source>> = None;
        let mut per_genome: FxHashMap<String, HammerArray> = FxHashMap::default();
        let mut count: u64 = 0;
        let mut last_progress = Instant::now();

        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(HammerError::MalformedRow(line));
            }
            let hammer = fields[0];
            let feature_id = fields[1].to_string();
            let strength: f32 = fields[2].parse()?;
            let role_id = fields.get(6).copied().unwrap_or("").to_string();

            let this_k = hammer.len();
            let kk = match k {
                None => {
                    let kk = this_k as u8;
                    map = Some(HammerMap::new(kk)?);
                    k = Some(kk);
                    kk
                }
                Some(kk) => {
                    if this_k != kk as usize {
                        return Err(HammerError::InvalidHammerLength {
                            expected: kk,
                            found: this_k,
                        });
                    }
                    kk
                }
            };

            let code = encode(hammer, kk as usize);
            if code == INVALID {
                return Err(HammerError::InvalidHammerChar {
                    hammer: hammer.to_string(),
                });
            }
            let genome_id = Source::genome_of(&feature_id).to_string();
            map.as_ref()
                .unwrap()
                .insert(code, Source::new(feature_id, role_id, strength))?;
            per_genome
                .entry(genome_id)
                .or_insert_with(|| HammerArray::new(kk))
                .push(code);

            count += 1;
            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                println!("  ... loaded {count} hammers");
                last_progress = Instant::now();
            }
        }

        if count == 0 {
            return Err(HammerError::EmptyDatabase);
        }

        let mut map = map.unwrap();
        map.freeze();

        Ok(HammerDb {
            k: k.unwrap(),
            map,
            per_genome,
            method,
        })
    }

    pub fn k(&self) -> u8 {
        self.k
    }

    pub fn method(&self) -> CountingMethod {
        self.method
    }

    /// Prune every hammer with no single-base-substitution neighbor, per
    /// spec.md §4.2's `anchorize`. Call once after loading, before any
    /// concurrent query traffic starts.
    pub fn anchorize(&self) -> Result<()> {
        self.map.anchorize()
    }

    /// Look up a hammer string directly. A hammer marked bad by
    /// [`HammerDb::anchorize`] is reported as absent.
    pub fn get_source(&self, hammer: &str) -> Option<SourceInfo> {
        self.get_source_by_code(encode(hammer, self.k as usize))
    }

    pub(crate) fn get_source_by_code(&self, code: u64) -> Option<SourceInfo> {
        if code == INVALID {
            return None;
        }
        self.map
            .get_with(code, |s| {
                if s.is_bad() {
                    None
                } else {
                    Some(SourceInfo::from_source(s))
                }
            })
            .flatten()
    }

    /// Every distinct hammer string present (on either strand) in any of
    /// `seqs`.
    pub fn find_hammers<I, B>(&self, seqs: I) -> std::collections::HashSet<String>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<str>,
    {
        let k = self.k as usize;
        let mut out = std::collections::HashSet::new();
        for bases in seqs {
            let bases = bases.as_ref();
            if k == 0 || k > bases.len() {
                continue;
            }
            let len = bases.len();
            for i in 0..=(len - k) {
                let code = encode(&bases[i..i + k], k);
                if self.get_source_by_code(code).is_some() {
                    out.insert(bases[i..i + k].to_string());
                }
            }
            let rev = reverse_complement_string(bases);
            for i in 0..=(len - k) {
                let code = encode(&rev[i..i + k], k);
                if self.get_source_by_code(code).is_some() {
                    out.insert(rev[i..i + k].to_string());
                }
            }
        }
        out
    }

    /// Every hammer belonging to genome `genome_id`, decoded, alongside its
    /// source metadata.
    pub fn find_genome_hammers(&self, genome_id: &str) -> FxHashMap<String, SourceInfo> {
        let mut out = FxHashMap::default();
        if let Some(arr) = self.per_genome.get(genome_id) {
            for &code in arr.codes() {
                if let Some(info) = self.get_source_by_code(code) {
                    out.insert(decode(code, self.k as usize), info);
                }
            }
        }
        out
    }

    /// All windows of `seqs` (forward and reverse-complement) that land on a
    /// hammer, as positional [`Hit`]s. Runs single-threaded; see
    /// [`HammerDb::find_hits_parallel`] for the `rayon`-backed variant.
    pub fn find_hits<I, L, B>(&self, seqs: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = (L, B)>,
        L: AsRef<str>,
        B: AsRef<str>,
    {
        ScanEngine::new(self, false).scan_to_hits(seqs)
    }

    pub fn find_hits_parallel<I, L, B>(&self, seqs: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = (L, B)>,
        L: AsRef<str>,
        B: AsRef<str>,
    {
        ScanEngine::new(self, true).scan_to_hits(seqs)
    }

    /// Same windows as [`HammerDb::find_hits`], but a hit surviving into the
    /// result must also clear the Phred quality gate (spec.md §4.8).
    /// Returns the surviving hits; contigs with no entry in `qualities` have
    /// every hit on them dropped and counted (see
    /// [`crate::hammers::quality::filter_hits`]).
    pub fn find_hits_with_quality<I, L, B, Q>(
        &self,
        seqs: I,
        min_probability: f64,
    ) -> Result<(Vec<Hit>, usize)>
    where
        I: IntoIterator<Item = (L, B, Q)>,
        L: AsRef<str>,
        B: AsRef<str>,
        Q: AsRef<str>,
    {
        let mut qualities: FxHashMap<std::sync::Arc<str>, String> = FxHashMap::default();
        let mut owned: Vec<(std::sync::Arc<str>, String)> = Vec::new();
        for (label, bases, quality) in seqs {
            let bases = bases.as_ref();
            let quality = quality.as_ref();
            if bases.len() != quality.len() {
                return Err(HammerError::MismatchedQuality {
                    bases: bases.len(),
                    quality: quality.len(),
                });
            }
            let contig: std::sync::Arc<str> = std::sync::Arc::from(label.as_ref());
            qualities.insert(contig.clone(), quality.to_string());
            owned.push((contig, bases.to_string()));
        }
        let hits = ScanEngine::new(self, false).scan_to_hits(owned);
        Ok(quality::filter_hits(hits, &qualities, min_probability))
    }

    /// Aggregate every window of `seqs` into a genome-level [`ScoreMap`]
    /// using this database's configured [`CountingMethod`]. `external_weight`
    /// multiplies every contribution uniformly (classification strategies
    /// pass a per-sequence `getWeight(len, coverage)` here instead of 1.0).
    pub fn find_closest<I, L, B>(&self, seqs: I, external_weight: f64) -> ScoreMap
    where
        I: IntoIterator<Item = (L, B)>,
        L: AsRef<str>,
        B: AsRef<str>,
    {
        ScanEngine::new(self, false).scan_to_scores(seqs, external_weight)
    }

    pub fn find_closest_parallel<I, L, B>(&self, seqs: I, external_weight: f64) -> ScoreMap
    where
        I: IntoIterator<Item = (L, B)>,
        L: AsRef<str>,
        B: AsRef<str>,
    {
        ScanEngine::new(self, true).scan_to_scores(seqs, external_weight)
    }
}
