use thiserror::Error;

/// Failures of the synthetic measurement engine. Always returned, never
/// panicked: the instrument shows an error screen and goes back, the session
/// never dies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeasureError {
    /// Accumulated loss is beyond the instrument's dynamic range.
    #[error("loss exceeds measurement range ({total_db:.2} dB > {max_db:.2} dB)")]
    RangeExceeded { total_db: f64, max_db: f64 },
    /// The component under test has no fiber length configured.
    #[error("component {id} has no fiber length specified")]
    MissingFiberLength { id: String },
}

/// Structural mistakes in the student-assembled connection scheme.
///
/// Both variants carry enough detail for self-correction; positions are
/// 1-indexed because they are shown to students as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("wrong number of elements in the scheme (expected {expected}, got {actual})")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("wrong element at position {position}")]
    ElementMismatch { position: usize },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
