//! codebookr error types

/// codebookr result type
pub type Result<T> = std::result::Result<T, Error>;

/// codebookr errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from numr operations
    #[error("numr error: {0}")]
    Numr(#[from] numr::error::Error),

    /// Index or codebook lengths disagree with the configured grouping
    #[error("shape mismatch: {reason}")]
    ShapeMismatch {
        /// Description of what went wrong
        reason: String,
    },

    /// A combined codebook address fell outside the table
    #[error(
        "codebook index out of range at position {position}: row {row_index}, col {col_index} \
         -> address {address} (codebook has {codebook_len} entries)"
    )]
    IndexOutOfRange {
        /// Output position that produced the address
        position: usize,
        /// Row index shared by the position's group
        row_index: usize,
        /// Column index of the position
        col_index: usize,
        /// Combined address (saturated on overflow)
        address: usize,
        /// Length of the codebook
        codebook_len: usize,
    },

    /// Validation found outputs that differ from the reference
    #[error(
        "validation failed: {mismatches} of {checked} elements exceed tolerance {tolerance}, \
         {out_of_range} out of range"
    )]
    ToleranceExceeded {
        /// Number of elements outside tolerance
        mismatches: usize,
        /// Number of elements whose address could not be resolved
        out_of_range: usize,
        /// Number of elements scanned
        checked: usize,
        /// Absolute tolerance used for the comparison
        tolerance: f32,
    },

    /// Invalid argument to an operation
    #[error("invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// Argument name
        arg: &'static str,
        /// Why it's invalid
        reason: String,
    },

    /// Configuration could not be read or parsed
    #[error("config error: {reason}")]
    ConfigError {
        /// Description of what went wrong
        reason: String,
    },
}
