use thiserror::Error;

/// Device-scoped failures raised at the I/O boundary. None of these abort a
/// scan: the affected device simply ends up without protocol metrics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("malformed source output: {0}")]
    MalformedSource(String),

    #[error("no diagnostic candidate matched the device identity")]
    NoMatch,

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

pub type ProbeResult<T> = Result<T, ProbeError>;
