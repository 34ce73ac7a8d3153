#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use fxhash::FxHashMap;

    use hammers::{
        BinBuilder, BinningRule, ClassifyStrategy, ContigMeta, CountingMethod, Hit,
        HitsStrategy, MappingBinRule, MaxHammerBinningRule, RegionsStrategy, ScoreMap,
        Strand, REJECTED_BIN_ID,
    };
    use hammers::parse_coverage;

    fn hit(feature_id: &str, role: &str, strength: f32) -> Hit {
        Hit {
            contig: Arc::from("c1"),
            left: 1,
            right: 8,
            strand: Strand::Forward,
            feature_id: feature_id.to_string(),
            role_id: role.to_string(),
            strength,
            hammer: "ACGTACGT".to_string(),
        }
    }

    #[test]
    fn parse_coverage_reads_underscore_and_equals_forms() {
        assert!((parse_coverage("contig_1_covg_23.5", None) - 23.5).abs() < 1e-9);
        assert!((parse_coverage("x", Some("coverage=12")) - 12.0).abs() < 1e-9);
        assert!((parse_coverage("nothing_here", None) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn mapping_bin_rule_rejects_short_or_shallow_contigs() {
        let mut table = FxHashMap::default();
        table.insert("ctg1_covg_10".to_string(), "binA".to_string());
        let rule = MappingBinRule::new(table);

        let short = ContigMeta {
            label: "ctg1_covg_10".to_string(),
            length: 100,
            comment: None,
        };
        assert_eq!(rule.classify(&short), None);

        let ok = ContigMeta {
            label: "ctg1_covg_10".to_string(),
            length: 1000,
            comment: None,
        };
        assert_eq!(rule.classify(&ok), Some("binA".to_string()));
    }

    #[test]
    fn max_hammer_rule_requires_margin() {
        let rule = MaxHammerBinningRule { margin: 5.0 };
        let mut close = ScoreMap::new();
        close.add("g1", 10.0, "r");
        close.add("g2", 8.0, "r");
        assert_eq!(rule.classify(&close), None);

        let mut clear = ScoreMap::new();
        clear.add("g1", 10.0, "r");
        clear.add("g2", 2.0, "r");
        assert_eq!(rule.classify(&clear), Some("g1".to_string()));
    }

    #[test]
    fn bin_builder_tracks_counts_and_rejections() {
        let mut b = BinBuilder::new();
        b.store(Some("binA".to_string()), b">c1\nACGT\n", 4).unwrap();
        b.store(Some("binA".to_string()), b">c2\nACGT\n", 4).unwrap();
        b.store(None, b">c3\nACGT\n", 4).unwrap();
        assert_eq!(b.rejected(), 1);
        assert_eq!(b.total(), 3);

        let stats = b.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].bin_id, "binA");
        assert_eq!(stats[0].contig_count, 2);
        assert_eq!(stats[0].total_length, 8);
        assert!(!stats[0].is_virtual);
        assert_eq!(stats[1].bin_id, REJECTED_BIN_ID);
        assert!(stats[1].is_virtual);
    }

    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn bin_builder_writes_to_registered_sinks() {
        let backing = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut b = BinBuilder::new();
        b.set_sink("binA", Box::new(SharedBuf(backing.clone())));
        b.store(Some("binA".to_string()), b">c1\nACGT\n", 4).unwrap();
        // binB has no registered sink, so this just updates counters.
        b.store(Some("binB".to_string()), b">c2\nACGT\n", 4).unwrap();
        assert_eq!(&*backing.lock().unwrap(), b">c1\nACGT\n");
    }

    #[test]
    fn hits_strategy_weighs_by_length_and_coverage() {
        let hits = vec![hit("fig|1.1.peg.1", "roleA", 1.0)];
        let strategy = HitsStrategy { len: 180, coverage: 1.0 };
        let scores = strategy.classify(&hits, CountingMethod::Count);
        assert!((scores.get("1.1").unwrap().weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn regions_strategy_emits_only_past_margin() {
        let hits = vec![
            hit("fig|1.1.peg.1", "roleA", 1.0),
            hit("fig|1.1.peg.2", "roleA", 1.0),
            hit("fig|2.1.peg.1", "roleB", 1.0),
        ];
        let strategy = RegionsStrategy { len: 180, coverage: 1.0, delta: 1.0 };
        let scores = strategy.classify(&hits, CountingMethod::Count);
        assert_eq!(scores.size(), 1);
        assert!(scores.get("1.1").is_some());
    }

    #[test]
    fn regions_strategy_rejects_when_margin_not_met() {
        let hits = vec![hit("fig|1.1.peg.1", "roleA", 1.0), hit("fig|2.1.peg.1", "roleB", 1.0)];
        let strategy = RegionsStrategy { len: 180, coverage: 1.0, delta: 1.0 };
        let scores = strategy.classify(&hits, CountingMethod::Count);
        assert_eq!(scores.size(), 0);
    }
}
