use crate::error::{HammerError, Result};
use crate::hammers::codec::{check_k, decode, INVALID};
use crate::hammers::source::Source;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Load factor above which a sub-hash grows, per spec.
const LOAD_FACTOR: f64 = 0.75;
/// A sub-hash never grows its table past this many slots; once reached,
/// further inserts just lengthen chains.
const SUBHASH_MAX_CAPACITY: usize = 1 << 28;
/// Starting size for a fresh sub-hash's chain table.
const SUBHASH_INITIAL_CAPACITY: usize = 17;
/// Low 30 bits of a code select the slot within a sub-hash.
const SUBHASH_INDEX_MASK: u64 = (1u64 << 30) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    Replaced,
}

struct Node<T> {
    code: u64,
    value: T,
    next: Option<Box<Node<T>>>,
}

/// The second level of the hammer map: a chained hash table over the low 30
/// bits of the code, growing by "double+1" on load, capped at 2^28 slots.
struct SubHash<T> {
    table: Vec<Option<Box<Node<T>>>>,
    size: usize,
    growth_capped: bool,
}

fn sub_index(code: u64, table_len: usize) -> usize {
    ((code & SUBHASH_INDEX_MASK) % table_len as u64) as usize
}

impl<T> SubHash<T> {
    fn new() -> Self {
        SubHash {
            table: (0..SUBHASH_INITIAL_CAPACITY).map(|_| None).collect(),
            size: 0,
            growth_capped: false,
        }
    }

    fn load_factor(&self) -> f64 {
        if self.table.is_empty() {
            0.0
        } else {
            self.size as f64 / self.table.len() as f64
        }
    }

    fn maybe_grow(&mut self) {
        if self.growth_capped {
            return;
        }
        if (self.size + 1) as f64 / self.table.len() as f64 <= LOAD_FACTOR {
            return;
        }
        let new_len = 2 * self.table.len() + 1;
        if new_len > SUBHASH_MAX_CAPACITY {
            self.growth_capped = true;
            return;
        }
        self.grow_to(new_len);
    }

    /// Re-thread every node into a fresh, larger table. Nodes move by
    /// pointer, never clone — only their `next` links change.
    fn grow_to(&mut self, new_len: usize) {
        let mut new_table: Vec<Option<Box<Node<T>>>> = (0..new_len).map(|_| None).collect();
        for slot in self.table.iter_mut() {
            let mut cur = slot.take();
            while let Some(mut node) = cur {
                cur = node.next.take();
                let idx = sub_index(node.code, new_len);
                node.next = new_table[idx].take();
                new_table[idx] = Some(node);
            }
        }
        self.table = new_table;
    }

    fn insert(&mut self, code: u64, value: T) -> InsertOutcome {
        self.maybe_grow();
        let idx = sub_index(code, self.table.len());
        let mut slot = &mut self.table[idx];
        loop {
            match slot {
                Some(node) if node.code == code => {
                    node.value = value;
                    return InsertOutcome::Replaced;
                }
                Some(node) => slot = &mut node.next,
                None => {
                    *slot = Some(Box::new(Node {
                        code,
                        value,
                        next: None,
                    }));
                    self.size += 1;
                    return InsertOutcome::Added;
                }
            }
        }
    }

    fn get_or_insert_with(
        &mut self,
        code: u64,
        on_hit: impl FnOnce(&mut T),
        make: impl FnOnce() -> T,
    ) {
        self.maybe_grow();
        let idx = sub_index(code, self.table.len());
        let mut slot = &mut self.table[idx];
        loop {
            match slot {
                Some(node) if node.code == code => {
                    on_hit(&mut node.value);
                    return;
                }
                Some(node) => slot = &mut node.next,
                None => {
                    *slot = Some(Box::new(Node {
                        code,
                        value: make(),
                        next: None,
                    }));
                    self.size += 1;
                    return;
                }
            }
        }
    }

    fn get<R>(&self, code: u64, f: impl FnOnce(&T) -> R) -> Option<R> {
        if self.table.is_empty() {
            return None;
        }
        let idx = sub_index(code, self.table.len());
        let mut cur = self.table[idx].as_deref();
        while let Some(node) = cur {
            if node.code == code {
                return Some(f(&node.value));
            }
            cur = node.next.as_deref();
        }
        None
    }

    fn for_each(&self, k: u8, f: &mut impl FnMut(String, &T)) {
        for slot in &self.table {
            let mut cur = slot.as_deref();
            while let Some(node) = cur {
                f(decode(node.code, k as usize), &node.value);
                cur = node.next.as_deref();
            }
        }
    }

    fn max_chain_len(&self) -> usize {
        self.table
            .iter()
            .map(|slot| {
                let mut len = 0;
                let mut cur = slot.as_deref();
                while let Some(node) = cur {
                    len += 1;
                    cur = node.next.as_deref();
                }
                len
            })
            .max()
            .unwrap_or(0)
    }
}

/// First-level storage, one variant per lifecycle phase. Building guards
/// every bucket with its own `parking_lot::RwLock` so concurrent inserts
/// into disjoint buckets never contend (Design Notes §9's "per-sub-hash
/// locking" for concurrent hash insert during load). Frozen drops the locks
/// entirely: once loading is done, [`HammerMap::freeze`] moves every bucket
/// out from under its lock so steady-state queries index straight into a
/// plain `Vec`, per spec.md §5's "steady-state queries never acquire a
/// lock."
enum Buckets<T> {
    Building(Vec<RwLock<SubHash<T>>>),
    Frozen(Vec<SubHash<T>>),
}

/// Two-level hash map from packed k-mer codes to a payload `T`.
///
/// First level: a fixed-size array indexed by the top `2*(k-15)` bits of
/// the code (one bucket total when `k <= 15`). Second level: a
/// [`SubHash`] chained on the low 30 bits.
pub struct HammerMap<T> {
    k: u8,
    top_bits: u32,
    buckets: Buckets<T>,
    iterating: AtomicBool,
}

impl<T> HammerMap<T> {
    pub fn new(k: u8) -> Result<Self> {
        check_k(k as u32)?;
        let top_bits = if k > 15 { 2 * (k as u32 - 15) } else { 0 };
        let num_buckets = if top_bits == 0 {
            1usize
        } else {
            1usize << top_bits
        };
        Ok(HammerMap {
            k,
            top_bits,
            buckets: Buckets::Building((0..num_buckets).map(|_| RwLock::new(SubHash::new())).collect()),
            iterating: AtomicBool::new(false),
        })
    }

    pub fn k(&self) -> u8 {
        self.k
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.buckets, Buckets::Frozen(_))
    }

    /// One-way transition out of the loading phase: every bucket's lock is
    /// discarded and its contents move into a plain, unlocked `Vec`. A
    /// no-op if already frozen. Called once by [`super::database::HammerDb::load_tsv`]
    /// right before it hands the built map to callers.
    pub fn freeze(&mut self) {
        if let Buckets::Building(locked) = &mut self.buckets {
            let frozen = std::mem::take(locked)
                .into_iter()
                .map(RwLock::into_inner)
                .collect();
            self.buckets = Buckets::Frozen(frozen);
        }
    }

    fn bucket_index(&self, code: u64) -> usize {
        if self.top_bits == 0 {
            0
        } else {
            let shift = 2 * self.k as u32 - self.top_bits;
            (code >> shift) as usize
        }
    }

    fn guard_not_iterating(&self) -> Result<()> {
        if self.iterating.load(Ordering::SeqCst) {
            Err(HammerError::IterationWhileMutating)
        } else {
            Ok(())
        }
    }

    pub fn insert(&self, code: u64, value: T) -> Result<InsertOutcome> {
        if code == INVALID {
            return Err(HammerError::InvalidKey);
        }
        self.guard_not_iterating()?;
        let idx = self.bucket_index(code);
        match &self.buckets {
            Buckets::Building(b) => Ok(b[idx].write().insert(code, value)),
            Buckets::Frozen(_) => Err(HammerError::MapFrozen),
        }
    }

    /// Look up `code` and, if present, run `f` on the stored value. Once
    /// frozen this indexes straight into the bucket with no lock; while
    /// still building it takes a brief read lock. Returns the closure's
    /// result rather than a borrowed reference so callers never hold a
    /// bucket lock (or a borrow of `self`) past this call.
    pub fn get_with<R>(&self, code: u64, f: impl FnOnce(&T) -> R) -> Option<R> {
        if code == INVALID {
            return None;
        }
        let idx = self.bucket_index(code);
        match &self.buckets {
            Buckets::Building(b) => b[idx].read().get(code, f),
            Buckets::Frozen(b) => b[idx].get(code, f),
        }
    }

    pub fn contains(&self, code: u64) -> bool {
        self.get_with(code, |_| ()).is_some()
    }

    pub fn get_or_insert_with(
        &self,
        code: u64,
        on_hit: impl FnOnce(&mut T),
        make: impl FnOnce() -> T,
    ) -> Result<()> {
        if code == INVALID {
            return Err(HammerError::InvalidKey);
        }
        self.guard_not_iterating()?;
        let idx = self.bucket_index(code);
        match &self.buckets {
            Buckets::Building(b) => {
                b[idx].write().get_or_insert_with(code, on_hit, make);
                Ok(())
            }
            Buckets::Frozen(_) => Err(HammerError::MapFrozen),
        }
    }

    /// Visit every `(decoded hammer string, &T)` pair. Must not be called
    /// concurrently with any mutating method — enforced by a debug guard
    /// rather than true exclusion, matching spec.md §7's
    /// `IterationWhileMutating`.
    pub fn for_each(&self, mut f: impl FnMut(String, &T)) -> Result<()> {
        if self.iterating.swap(true, Ordering::SeqCst) {
            return Err(HammerError::IterationWhileMutating);
        }
        match &self.buckets {
            Buckets::Building(b) => {
                for bucket in b {
                    bucket.read().for_each(self.k, &mut f);
                }
            }
            Buckets::Frozen(b) => {
                for bucket in b {
                    bucket.for_each(self.k, &mut f);
                }
            }
        }
        self.iterating.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn size(&self) -> usize {
        match &self.buckets {
            Buckets::Building(b) => b.iter().map(|x| x.read().size).sum(),
            Buckets::Frozen(b) => b.iter().map(|x| x.size).sum(),
        }
    }

    pub fn load_factor(&self) -> f64 {
        let total_slots: usize = match &self.buckets {
            Buckets::Building(b) => b.iter().map(|x| x.read().table.len()).sum(),
            Buckets::Frozen(b) => b.iter().map(|x| x.table.len()).sum(),
        };
        if total_slots == 0 {
            0.0
        } else {
            self.size() as f64 / total_slots as f64
        }
    }

    /// Worst-case ratio of a bucket's longest chain to its own expected
    /// (ideal) chain length, across all buckets. A diagnostic only — not
    /// consulted by lookups or inserts.
    pub fn overload_factor(&self) -> f64 {
        let ratio = |lf: f64, max_chain: usize| if lf <= 0.0 { 0.0 } else { max_chain as f64 / lf };
        match &self.buckets {
            Buckets::Building(b) => b
                .iter()
                .map(|x| {
                    let g = x.read();
                    ratio(g.load_factor(), g.max_chain_len())
                })
                .fold(0.0, f64::max),
            Buckets::Frozen(b) => b
                .iter()
                .map(|sub| ratio(sub.load_factor(), sub.max_chain_len()))
                .fold(0.0, f64::max),
        }
    }
}

impl HammerMap<Source> {
    /// Mark every hammer that has no single-base-substitution neighbor also
    /// present in the map as "bad". Construction-time only: must not run
    /// concurrently with queries. Safe to call before or after
    /// [`HammerMap::freeze`] — it only reads bucket contents and flips each
    /// affected [`Source`]'s own atomic `bad` flag, never the bucket
    /// structure itself.
    pub fn anchorize(&self) -> Result<()> {
        if self.iterating.swap(true, Ordering::SeqCst) {
            return Err(HammerError::IterationWhileMutating);
        }
        let k = self.k as usize;
        let mut codes = Vec::with_capacity(self.size());
        match &self.buckets {
            Buckets::Building(b) => {
                for bucket in b {
                    collect_codes(&bucket.read(), &mut codes);
                }
            }
            Buckets::Frozen(b) => {
                for bucket in b {
                    collect_codes(bucket, &mut codes);
                }
            }
        }
        self.iterating.store(false, Ordering::SeqCst);

        for code in codes {
            let mut has_neighbor = false;
            'positions: for pos in 0..k {
                let shift = 2 * (k - 1 - pos);
                let orig = (code >> shift) & 0b11;
                for val in 0..4u64 {
                    if val == orig {
                        continue;
                    }
                    let neighbor = (code & !(0b11u64 << shift)) | (val << shift);
                    if self.contains(neighbor) {
                        has_neighbor = true;
                        break 'positions;
                    }
                }
            }
            if !has_neighbor {
                self.get_with(code, |s| s.mark_bad());
            }
        }
        Ok(())
    }
}

fn collect_codes<T>(sub: &SubHash<T>, out: &mut Vec<u64>) {
    for slot in &sub.table {
        let mut cur = slot.as_deref();
        while let Some(node) = cur {
            out.push(node.code);
            cur = node.next.as_deref();
        }
    }
}
