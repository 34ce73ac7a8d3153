use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

/// A single positional hammer hit inside one query sequence.
///
/// `left`/`right` are 1-based and inclusive. On the forward strand
/// `left <= right`; on the reverse strand `left > right`, which is itself
/// the signal for which strand the hit landed on (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct Hit {
    pub contig: Arc<str>,
    pub left: u64,
    pub right: u64,
    pub strand: Strand,
    pub feature_id: String,
    pub role_id: String,
    pub strength: f32,
    pub hammer: String,
}

impl Hit {
    fn location_key(&self) -> (u64, u64) {
        (self.left, self.right)
    }
}

impl PartialEq for Hit {
    fn eq(&self, other: &Self) -> bool {
        self.contig == other.contig
            && self.left == other.left
            && self.right == other.right
            && self.feature_id == other.feature_id
    }
}
impl Eq for Hit {}

impl PartialOrd for Hit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hit {
    /// By location (contig, then left, then right), then by feature id —
    /// per spec.md §3.
    fn cmp(&self, other: &Self) -> Ordering {
        self.contig
            .cmp(&other.contig)
            .then_with(|| self.location_key().cmp(&other.location_key()))
            .then_with(|| self.feature_id.cmp(&other.feature_id))
    }
}
