#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::AtomicBool;

    use hammers::hammers::codec::reverse_complement_string;
    use hammers::{CountingMethod, HammerDb, ScanEngine, Strand};

    fn db() -> HammerDb {
        let tsv = "hammer\tfeature_id\tstrength\n\
                   ACGTACGT\tfig|1.1.peg.1\t0.9\n\
                   AAAACCCC\tfig|2.1.peg.1\t0.2\n";
        HammerDb::load_tsv(Cursor::new(tsv), CountingMethod::Strength).unwrap()
    }

    #[test]
    fn scan_to_hits_finds_forward_window() {
        let db = db();
        let engine = ScanEngine::new(&db, false);
        let hits = engine.scan_to_hits([("c1", "NNACGTACGTNN")]);
        assert!(hits
            .iter()
            .any(|h| h.strand == Strand::Forward && h.feature_id == "fig|1.1.peg.1"));
    }

    #[test]
    fn scan_to_hits_finds_reverse_window() {
        let db = db();
        let fwd = "ACGTACGT";
        let rc = reverse_complement_string(fwd);
        let seq = format!("NN{rc}NN");
        let engine = ScanEngine::new(&db, false);
        let hits = engine.scan_to_hits([("c1", seq.as_str())]);
        assert!(hits.iter().any(|h| h.strand == Strand::Reverse && h.left > h.right));
    }

    #[test]
    fn scan_to_scores_weights_by_strength() {
        // "ACGTACGT" is its own reverse complement, so a single k-length
        // query matches once per strand — two windows, each contributing
        // `strength`.
        let db = db();
        let engine = ScanEngine::new(&db, false);
        let scores = engine.scan_to_scores([("c1", "ACGTACGT")], 1.0);
        let entry = scores.get("1.1").unwrap();
        assert!((entry.weight - 1.8).abs() < 1e-6);
    }

    #[test]
    fn scan_to_scores_applies_external_weight() {
        let db = db();
        let engine = ScanEngine::new(&db, false);
        let scores = engine.scan_to_scores([("c1", "ACGTACGT")], 2.0);
        let entry = scores.get("1.1").unwrap();
        assert!((entry.weight - 3.6).abs() < 1e-6);
    }

    #[test]
    fn cancelled_scan_discards_partial_results() {
        let db = db();
        let flag = AtomicBool::new(true);
        let engine = ScanEngine::new(&db, false).with_cancel(&flag);
        let hits = engine.scan_to_hits([("c1", "NNACGTACGTNN")]);
        assert!(hits.is_empty());
    }

    #[test]
    fn parallel_and_sequential_scans_agree() {
        let db = db();
        let seqs = vec![("a", "NNACGTACGTNN"), ("b", "NNAAAACCCCNN")];
        let seq_hits = ScanEngine::new(&db, false).scan_to_hits(seqs.clone());
        let par_hits = ScanEngine::new(&db, true).scan_to_hits(seqs);
        assert_eq!(seq_hits, par_hits);
    }
}
