use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MarketDataError {
    #[error("No valid symbols provided.")]
    NoSymbols,

    #[error("minutes must be between {min} and {max}, got {requested}")]
    LookbackOutOfRange { requested: u32, min: u32, max: u32 },

    #[error("misaligned arrays: '{field}' has {found} entries, timestamp has {expected}")]
    MisalignedArrays {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid {field} value at index {index}: {value}")]
    InvalidValue {
        field: &'static str,
        index: usize,
        value: String,
    },
}
