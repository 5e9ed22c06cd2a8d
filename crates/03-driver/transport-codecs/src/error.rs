use thiserror::Error;
use transport::{TransportError, TransportResult};

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The tag is outside the closed set for this stream.
    #[error("unknown {stream} tag {tag}")]
    UnknownTag { stream: &'static str, tag: u32 },

    /// The batch ended in the middle of an item.
    #[error("{stream} item truncated at end of batch")]
    Truncated { stream: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Reads one field, reporting an early end of batch as truncation.
pub(crate) fn field<T>(stream: &'static str, value: TransportResult<T>) -> CodecResult<T> {
    match value {
        Ok(value) => Ok(value),
        Err(TransportError::BatchExhausted) => Err(CodecError::Truncated { stream }),
        Err(err) => Err(err.into()),
    }
}
