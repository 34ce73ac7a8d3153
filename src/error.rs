use thiserror::Error;

/// Every way a hammer index can fail to load or be queried.
///
/// Per-window invalid codes during a scan are *not* represented here — they
/// are recovered locally by `get_source` returning `None` (see
/// [`crate::hammers::database`]).
#[derive(Debug, Error)]
pub enum HammerError {
    #[error("hammer length mismatch: expected {expected}, found {found}")]
    InvalidHammerLength { expected: u8, found: usize },

    #[error("invalid hammer '{hammer}': contains a non-ACGT base")]
    InvalidHammerChar { hammer: String },

    #[error("hammer database is empty: load produced zero records")]
    EmptyDatabase,

    #[error("unsupported k-mer size {k}: must be in 1..=31")]
    UnsupportedK { k: u32 },

    #[error("quality string length {quality} does not match base string length {bases}")]
    MismatchedQuality { bases: usize, quality: usize },

    #[error("iterate() called while another thread is mutating the map")]
    IterationWhileMutating,

    #[error("malformed hammer table row: {0}")]
    MalformedRow(String),

    #[error("cannot insert: key code is the INVALID sentinel")]
    InvalidKey,

    #[error("cannot mutate: map is frozen for steady-state queries")]
    MapFrozen,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse strength: {0}")]
    ParseStrength(#[from] std::num::ParseFloatError),
}

pub type Result<T> = std::result::Result<T, HammerError>;
