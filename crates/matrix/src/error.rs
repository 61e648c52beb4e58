use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatrixError>;

#[derive(Error, Debug, PartialEq)]
pub enum MatrixError {
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid symbol type: {0:?}")]
    InvalidSymbolType(String),
}

impl MatrixError {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        MatrixError::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}
