//! Control side of rayframe.
//!
//! [`Coordinator`] owns one producer session at a time: it allocates the
//! session rings, spawns the producer worker plus a dispatcher thread that
//! relays producer notices to the [`Platform`](service_abi::Platform), and
//! optionally a dedicated renderer thread.

mod config;
mod coordinator;
mod dispatcher;
mod error;

pub use config::{RendererPlacement, SessionConfig};
pub use coordinator::Coordinator;
pub use error::HubError;

pub use app::Phase;
pub use fsm::{Destroyed, StateFuture, SubscriptionId};
