use thiserror::Error;
use transport::TransportError;
use transport_codecs::CodecError;

/// Failures of the synchronous resource bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A second request was issued before the first one completed.
    #[error("a resource request for `{pending}` is already outstanding")]
    RequestOutstanding { pending: String },

    /// `respond` was called with no request in flight.
    #[error("no resource request is pending")]
    NoPendingRequest,

    /// The other end of the request side channel is gone.
    #[error("resource bridge side channel closed")]
    Disconnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failures of the frame stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The receiving side was dropped; no further frames can be presented.
    #[error("frame receiver closed")]
    ReceiverClosed,

    #[error(transparent)]
    Codec(#[from] CodecError),
}
