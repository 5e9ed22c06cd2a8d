//! Table-driven finite state machines with queued event processing.
//!
//! The crate stays independent of rings and threads. It provides:
//! * [`TableBuilder`] / [`TransitionTable`]: a declarative `(state, event kind)`
//!   table, validated once at construction.
//! * [`Service`]: the running machine. Events sent while another is being
//!   processed are queued and handled strictly in order.
//! * [`Subscribers`] / [`StateFuture`]: change observers and one-shot waits
//!   for a particular state.

/// Running machine and the context handed to transition hooks.
pub mod service;
/// Observer set and state futures.
pub mod subscribers;
/// Transition table, builder, and validation.
pub mod table;

use std::fmt;
use std::hash::Hash;

pub use crate::service::{Ctx, Service};
pub use crate::subscribers::{Destroyed, StateFuture, Subscribers, SubscriptionId};
pub use crate::table::{TableBuilder, TableError, Transition, TransitionTable};

/// Requirements on a machine's state type.
pub trait MachineState: Copy + Eq + Hash + fmt::Debug + Send + 'static {}

impl<T> MachineState for T where T: Copy + Eq + Hash + fmt::Debug + Send + 'static {}

/// Events carry a kind used as the table key; the payload stays with the event.
pub trait MachineEvent {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}
