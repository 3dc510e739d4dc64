use thiserror::Error;

/// Failures raised while querying a single trace document or merging its
/// metrics. Per-document errors are isolated by the aggregator; only
/// `DuplicateKey` indicates a caller-side contract violation.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("string {0:?} is not convertible to a time unit (valid units: us, ms, s, m, h, d)")]
    Format(String),

    #[error("no key {0:?} in mapping")]
    MissingKey(String),

    #[error("no element named {0:?} in sequence")]
    MissingName(String),

    #[error("cannot descend into scalar at step {0:?}")]
    ScalarDescent(String),

    #[error("unsupported attribute entry type: {0}")]
    UnsupportedType(String),

    #[error("query for {0:?} did not resolve to a numeric value")]
    NotNumeric(String),

    #[error("query for {0:?} resolved to a bare value, expected a record node")]
    NotANode(String),

    #[error("accumulator key {0:?} is already present")]
    DuplicateKey(String),

    #[error("no observations recorded under {0:?}")]
    EmptyAccumulator(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
