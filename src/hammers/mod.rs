pub mod array;
pub mod binning;
pub mod codec;
pub mod database;
pub mod hit;
pub mod map;
pub mod quality;
pub mod scan;
pub mod score;
pub mod source;

pub use array::{HammerArray, HammerSet};
pub use database::HammerDb;
pub use hit::{Hit, Strand};
pub use map::{HammerMap, InsertOutcome};
pub use scan::ScanEngine;
pub use score::{ScoreEntry, ScoreMap, SummaryEntry, SummaryMap};
pub use source::{CountingMethod, Source, SourceInfo};
