use fxhash::FxHashMap;
use std::cmp::Ordering;

/// Per-genome bookkeeping in a [`ScoreMap`]: a running weight total and the
/// per-role weighted counts that contributed to it.
#[derive(Debug, Clone, Default)]
pub struct ScoreEntry {
    pub weight: f64,
    pub roles: FxHashMap<String, f64>,
}

/// Mapping from genome id to `{weight, roles-with-per-role-weights}`.
/// Single-threaded; shard one per worker thread for a parallel scan and
/// merge with [`ScoreMap::accumulate`] afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScoreMap {
    entries: FxHashMap<String, ScoreEntry>,
}

fn cmp_entries(a: (&str, &ScoreEntry), b: (&str, &ScoreEntry)) -> Ordering {
    b.1.weight
        .partial_cmp(&a.1.weight)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.1.roles.len().cmp(&a.1.roles.len()))
        .then_with(|| a.0.cmp(b.0))
}

impl ScoreMap {
    pub fn new() -> Self {
        ScoreMap::default()
    }

    /// Add `weight` to `key`'s total and to its per-role weighted count for
    /// `role_id`.
    pub fn add(&mut self, key: &str, weight: f64, role_id: &str) {
        let entry = self.entries.entry(key.to_string()).or_default();
        entry.weight += weight;
        *entry.roles.entry(role_id.to_string()).or_insert(0.0) += weight;
    }

    /// Merge `other` into `self`, optionally scaling every contribution.
    pub fn accumulate(&mut self, other: &ScoreMap, scale: f64) {
        for (key, other_entry) in &other.entries {
            let entry = self.entries.entry(key.clone()).or_default();
            entry.weight += other_entry.weight * scale;
            for (role, w) in &other_entry.roles {
                *entry.roles.entry(role.clone()).or_insert(0.0) += w * scale;
            }
        }
    }

    pub fn sum(&self) -> f64 {
        self.entries.values().map(|e| e.weight).sum()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&ScoreEntry> {
        self.entries.get(key)
    }

    /// By weight descending, then number of distinct roles descending, then
    /// key ascending — spec.md §3.
    pub fn sorted_counts(&self) -> Vec<(&str, &ScoreEntry)> {
        let mut v: Vec<(&str, &ScoreEntry)> =
            self.entries.iter().map(|(k, e)| (k.as_str(), e)).collect();
        v.sort_by(|&a, &b| cmp_entries(a, b));
        v
    }

    pub fn top_n(&self, n: usize) -> Vec<(&str, &ScoreEntry)> {
        let mut v = self.sorted_counts();
        v.truncate(n);
        v
    }

    /// The single best entry, or `None` if empty. Expressed explicitly
    /// rather than via a min-with-reversed-order trick (Design Notes §9(c)).
    pub fn top(&self) -> Option<(&str, &ScoreEntry)> {
        self.sorted_counts().into_iter().next()
    }
}

/// Simplified view of a [`ScoreMap`]: `roles` collapses to a count of
/// distinct roles seen plus the per-role weights, dropping the full role
/// set — cheaper to carry around when a caller only needs "how many roles"
/// rather than "which roles."
#[derive(Debug, Clone, Default)]
pub struct SummaryEntry {
    pub weight: f64,
    pub max_role_count: usize,
    pub role_weights: FxHashMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryMap {
    entries: FxHashMap<String, SummaryEntry>,
}

impl SummaryMap {
    pub fn new() -> Self {
        SummaryMap::default()
    }

    pub fn add(&mut self, key: &str, weight: f64, role_id: &str) {
        let entry = self.entries.entry(key.to_string()).or_default();
        entry.weight += weight;
        *entry.role_weights.entry(role_id.to_string()).or_insert(0.0) += weight;
        entry.max_role_count = entry.max_role_count.max(entry.role_weights.len());
    }

    pub fn accumulate(&mut self, other: &SummaryMap, scale: f64) {
        for (key, other_entry) in &other.entries {
            let entry = self.entries.entry(key.clone()).or_default();
            entry.weight += other_entry.weight * scale;
            for (role, w) in &other_entry.role_weights {
                *entry.role_weights.entry(role.clone()).or_insert(0.0) += w * scale;
            }
            entry.max_role_count = entry.max_role_count.max(entry.role_weights.len());
        }
    }

    pub fn sum(&self) -> f64 {
        self.entries.values().map(|e| e.weight).sum()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&SummaryEntry> {
        self.entries.get(key)
    }
}

impl From<&ScoreMap> for SummaryMap {
    fn from(scores: &ScoreMap) -> Self {
        let mut summary = SummaryMap::new();
        for (key, entry) in &scores.entries {
            for (role, w) in &entry.roles {
                summary.add(key, *w, role);
            }
        }
        summary
    }
}
