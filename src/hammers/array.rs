use crate::hammers::codec::decode;
use crate::hammers::map::HammerMap;

/// Default initial capacity and growth step for a fresh [`HammerArray`],
/// per spec.md §3.
const INITIAL_CAPACITY: usize = 1000;
const GROWTH_STEP: usize = 500;

/// Append-only list of packed k-mer codes for one source genome. Built
/// during load: every hammer's code is pushed here in addition to being
/// inserted into the main [`HammerMap`].
#[derive(Debug, Clone)]
pub struct HammerArray {
    k: u8,
    codes: Vec<u64>,
}

impl HammerArray {
    pub fn new(k: u8) -> Self {
        HammerArray {
            k,
            codes: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn push(&mut self, code: u64) {
        if self.codes.len() == self.codes.capacity() {
            self.codes.reserve(GROWTH_STEP);
        }
        self.codes.push(code);
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[u64] {
        &self.codes
    }

    /// Decoded hammer strings, in insertion order.
    pub fn iter_decoded(&self) -> impl Iterator<Item = String> + '_ {
        let k = self.k as usize;
        self.codes.iter().map(move |&c| decode(c, k))
    }
}

/// A set of packed codes, membership only. Reuses the [`HammerMap`]
/// bucket/chain layout with a unit payload rather than re-deriving the
/// two-level structure (Design Notes §9).
pub struct HammerSet {
    map: HammerMap<()>,
}

impl HammerSet {
    pub fn new(k: u8) -> crate::error::Result<Self> {
        Ok(HammerSet {
            map: HammerMap::new(k)?,
        })
    }

    pub fn insert(&self, code: u64) -> crate::error::Result<()> {
        // A set membership insert is a no-op "hit" when already present.
        self.map.get_or_insert_with(code, |_| (), || ())
    }

    pub fn contains(&self, code: u64) -> bool {
        self.map.contains(code)
    }

    pub fn len(&self) -> usize {
        self.map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hammers::codec::encode;

    #[test]
    fn array_push_and_decode() {
        let mut arr = HammerArray::new(4);
        arr.push(encode("ACGT", 4));
        arr.push(encode("TTTT", 4));
        assert_eq!(arr.len(), 2);
        let decoded: Vec<String> = arr.iter_decoded().collect();
        assert_eq!(decoded, vec!["acgt".to_string(), "tttt".to_string()]);
    }

    #[test]
    fn array_grows_past_initial_capacity() {
        let mut arr = HammerArray::new(4);
        for i in 0..(INITIAL_CAPACITY + GROWTH_STEP + 1) as u64 {
            arr.push(i);
        }
        assert_eq!(arr.len(), INITIAL_CAPACITY + GROWTH_STEP + 1);
    }

    #[test]
    fn set_membership_and_dedup() {
        let set = HammerSet::new(4).unwrap();
        let code = encode("ACGT", 4);
        set.insert(code).unwrap();
        set.insert(code).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(code));
        assert!(!set.contains(encode("TTTT", 4)));
    }
}
