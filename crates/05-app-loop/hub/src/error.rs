use app::Phase;
use fsm::TableError;
use std::io;
use thiserror::Error;
use transport::TransportError;
use transport_codecs::CodecError;

/// Failures of the control-side coordinator.
#[derive(Debug, Error)]
pub enum HubError {
    /// `init` while the previous session has not returned to `Stopped`.
    #[error("a session is still {phase}; stop it before initialising another")]
    SessionActive { phase: Phase },

    /// `init` right after `start`, before the producer has picked it up.
    #[error("a start request is still in flight; wait for it before initialising another session")]
    StartPending,

    #[error("no session has been initialised")]
    NoSession,

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: io::Error,
    },

    /// The producer thread exited while its session was still live.
    #[error("producer thread is gone")]
    ChannelClosed,

    #[error(transparent)]
    Table(#[from] TableError<Phase>),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
