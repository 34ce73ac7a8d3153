pub mod error;
pub mod hammers;

pub use error::{HammerError, Result};
pub use hammers::{
    binning::{
        parse_coverage, BinBuilder, BinStats, BinningRule, ClassifyStrategy, ContigMeta,
        HitsStrategy, MappingBinRule, MaxHammerBinningRule, RegionsStrategy, REJECTED_BIN_ID,
    },
    quality::filter_hits,
    CountingMethod, HammerArray, HammerDb, HammerMap, HammerSet, Hit, InsertOutcome, ScanEngine, ScoreEntry, ScoreMap,
    Source, SourceInfo, Strand, SummaryEntry, SummaryMap,
};
