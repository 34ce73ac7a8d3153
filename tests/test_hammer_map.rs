#[cfg(test)]
mod tests {
    use hammers::hammers::codec::{encode, INVALID};
    use hammers::{HammerError, HammerMap, InsertOutcome, Source};

    fn src(fid: &str, role: &str, strength: f32) -> Source {
        Source::new(fid.to_string(), role.to_string(), strength)
    }

    #[test]
    fn new_rejects_bad_k() {
        assert!(HammerMap::<Source>::new(0).is_err());
        assert!(HammerMap::<Source>::new(32).is_err());
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let map = HammerMap::new(8).unwrap();
        let code = encode("ACGTACGT", 8);
        assert_eq!(
            map.insert(code, src("fig|1.1.peg.1", "roleA", 0.5)).unwrap(),
            InsertOutcome::Added
        );
        let strength = map.get_with(code, |s| s.strength).unwrap();
        assert_eq!(strength, 0.5);
        assert!(map.get_with(code + 1, |_| ()).is_none());
    }

    #[test]
    fn insert_rejects_invalid_key() {
        let map = HammerMap::new(8).unwrap();
        assert!(matches!(
            map.insert(INVALID, src("fig|1.1.peg.1", "r", 0.1)),
            Err(HammerError::InvalidKey)
        ));
    }

    #[test]
    fn insert_replaces_existing_key() {
        let map = HammerMap::new(4).unwrap();
        let code = encode("ACGT", 4);
        map.insert(code, src("fig|1.1.peg.1", "r", 0.1)).unwrap();
        let outcome = map.insert(code, src("fig|2.1.peg.1", "r", 0.9)).unwrap();
        assert_eq!(outcome, InsertOutcome::Replaced);
        assert_eq!(map.size(), 1);
        assert_eq!(map.get_with(code, |s| s.feature_id.clone()).unwrap(), "fig|2.1.peg.1");
    }

    #[test]
    fn grows_past_load_factor() {
        let map = HammerMap::new(12).unwrap();
        // Enough distinct codes in one bucket (k<=15 => one bucket) to force growth.
        for i in 0..200u64 {
            map.insert(i, src("fig|1.1.peg.1", "r", 0.1)).unwrap();
        }
        assert_eq!(map.size(), 200);
        for i in 0..200u64 {
            assert!(map.contains(i));
        }
    }

    #[test]
    fn for_each_visits_every_entry() {
        let map = HammerMap::new(4).unwrap();
        let codes: Vec<u64> = ["AAAA", "CCCC", "GGGG", "TTTT"]
            .iter()
            .map(|s| encode(s, 4))
            .collect();
        for &c in &codes {
            map.insert(c, src("fig|1.1.peg.1", "r", 0.2)).unwrap();
        }
        let mut seen = Vec::new();
        map.for_each(|hammer, _| seen.push(hammer)).unwrap();
        seen.sort();
        assert_eq!(seen, vec!["aaaa", "cccc", "gggg", "tttt"]);
    }

    #[test]
    fn get_or_insert_with_calls_on_hit_when_present() {
        let map = HammerMap::new(4).unwrap();
        let code = encode("ACGT", 4);
        map.get_or_insert_with(code, |_| panic!("should not hit"), || src("fig|1.1.peg.1", "r", 0.4))
            .unwrap();
        let mut hit = false;
        map.get_or_insert_with(
            code,
            |_| hit = true,
            || panic!("should not construct again"),
        )
        .unwrap();
        assert!(hit);
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn anchorize_marks_isolated_hammers_bad() {
        let map = HammerMap::new(4).unwrap();
        let a = encode("AAAA", 4);
        let b = encode("AAAC", 4); // one substitution from a
        let isolated = encode("GGGG", 4);
        map.insert(a, src("fig|1.1.peg.1", "r", 0.1)).unwrap();
        map.insert(b, src("fig|1.1.peg.2", "r", 0.1)).unwrap();
        map.insert(isolated, src("fig|1.1.peg.3", "r", 0.1)).unwrap();

        map.anchorize().unwrap();

        assert!(!map.get_with(a, |s| s.is_bad()).unwrap());
        assert!(!map.get_with(b, |s| s.is_bad()).unwrap());
        assert!(map.get_with(isolated, |s| s.is_bad()).unwrap());
    }

    #[test]
    fn frozen_map_answers_queries_without_locking_and_rejects_further_inserts() {
        let mut map = HammerMap::new(4).unwrap();
        let code = encode("ACGT", 4);
        map.insert(code, src("fig|1.1.peg.1", "r", 0.3)).unwrap();

        map.freeze();

        assert!(map.is_frozen());
        assert_eq!(map.get_with(code, |s| s.strength).unwrap(), 0.3);
        assert!(matches!(
            map.insert(encode("TTTT", 4), src("fig|2.1.peg.1", "r", 0.1)),
            Err(HammerError::MapFrozen)
        ));
    }
}
