use thiserror::Error;

/// Failure to build a [`NeuralNetwork`](super::NeuralNetwork) from its text form.
///
/// Line numbers are 1-based and point at the token that caused the failure.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("line {line}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}: network description ends early, expected {expected}")]
    UnexpectedEof { line: usize, expected: String },

    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: {section} declares {expected} values but {found} are present")]
    DimensionMismatch {
        line: usize,
        section: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: empty range [{min}, {max}] in {section}")]
    DegenerateRange {
        line: usize,
        section: String,
        min: f64,
        max: f64,
    },

    #[error("line {line}: unexpected trailing data '{token}'")]
    TrailingData { line: usize, token: String },

    #[error("failed to read network description: {0}")]
    Io(#[from] std::io::Error),
}
