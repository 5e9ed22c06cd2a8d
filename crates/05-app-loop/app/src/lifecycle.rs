//! Producer-side lifecycle machine.
//!
//! ```text
//! Stopped --Start--> Started --always--> Running --Stop--> Stopping
//!    ^                                      |                 |
//!    +--------------- Exited ---------------+----- Exited ----+
//! ```
//!
//! Entering `Running` only records a launch request; the worker picks it up
//! once the triggering `send` returns and runs the program outside the machine.

use crate::input::InputState;
use fsm::{
    Ctx, MachineEvent, Service, StateFuture, SubscriptionId, TableBuilder, TableError,
    Transition, TransitionTable,
};
use serde::{Deserialize, Serialize};
use service_abi::{Event, EventKind};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Stopped,
    /// Transient: immediately advances to `Running`.
    Started,
    Running,
    /// Close requested; waiting for the program to return.
    Stopping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Stopped => "stopped",
            Phase::Started => "started",
            Phase::Running => "running",
            Phase::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Events the lifecycle reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// An event decoded from the event ring.
    Wire(Event),
    /// The program's entry point returned. Never carried on the wire.
    Exited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    Wire(EventKind),
    Exited,
}

impl MachineEvent for Input {
    type Kind = InputKind;

    fn kind(&self) -> InputKind {
        match self {
            Input::Wire(event) => InputKind::Wire(event.kind()),
            Input::Exited => InputKind::Exited,
        }
    }
}

#[derive(Debug, Default)]
pub struct LifecycleContext {
    pub input: InputState,
    /// Path from the most recent `Start`.
    pub program_path: Option<String>,
    pub window_should_close: bool,
    launch: Option<String>,
}

type LifecycleCtx<'a> = Ctx<'a, LifecycleContext, Input>;

pub type LifecycleTable = TransitionTable<Phase, LifecycleContext, Input>;

fn remember_path(ctx: &mut LifecycleCtx<'_>, input: &Input) {
    if let Input::Wire(Event::Start { path }) = input {
        ctx.context.program_path = Some(path.clone());
    }
}

fn request_launch(ctx: &mut LifecycleCtx<'_>, _: &Input) {
    ctx.context.launch = ctx.context.program_path.clone();
}

fn record_input(ctx: &mut LifecycleCtx<'_>, input: &Input) {
    if let Input::Wire(event) = input {
        ctx.context.input.apply(event);
    }
}

fn raise_close(ctx: &mut LifecycleCtx<'_>, _: &Input) {
    ctx.context.window_should_close = true;
}

fn finish_run(ctx: &mut LifecycleCtx<'_>, _: &Input) {
    ctx.context.window_should_close = false;
    ctx.context.launch = None;
    ctx.context.input.reset();
}

/// Builds the lifecycle transition table.
pub fn lifecycle_table() -> Result<LifecycleTable, TableError<Phase>> {
    use InputKind::{Exited, Wire};

    let mut builder = TableBuilder::new()
        .on(
            Phase::Stopped,
            Wire(EventKind::Start),
            Transition::to(Phase::Started).with_action(remember_path),
        )
        .on(
            Phase::Stopped,
            Wire(EventKind::AddResource),
            Transition::internal().with_action(record_input),
        )
        .always(Phase::Started, Transition::to(Phase::Running))
        .enter(Phase::Running, request_launch)
        .on(
            Phase::Running,
            Wire(EventKind::Stop),
            Transition::to(Phase::Stopping).with_action(raise_close),
        )
        .on(
            Phase::Running,
            Exited,
            Transition::to(Phase::Stopped).with_action(finish_run),
        )
        .on(
            Phase::Stopping,
            Exited,
            Transition::to(Phase::Stopped).with_action(finish_run),
        );
    for kind in EventKind::ALL.into_iter().filter(|kind| kind.is_input()) {
        builder = builder.on(
            Phase::Running,
            Wire(kind),
            Transition::internal().with_action(record_input),
        );
    }
    builder.build(Phase::Stopped)
}

/// The lifecycle machine plus the convenience operations around it.
pub struct Lifecycle {
    service: Service<Phase, LifecycleContext, Input>,
}

impl Lifecycle {
    pub fn new() -> Result<Self, TableError<Phase>> {
        Ok(Self {
            service: Service::new(lifecycle_table()?, LifecycleContext::default()),
        })
    }

    pub fn phase(&self) -> Phase {
        self.service.state()
    }

    pub fn send(&mut self, event: Event) {
        self.service.send(Input::Wire(event));
    }

    /// Reports that the program returned.
    pub fn exited(&mut self) {
        self.service.send(Input::Exited);
    }

    /// Sends `Start` and resolves when `Started` is entered.
    pub fn start(&mut self, path: impl Into<String>) -> StateFuture<Phase> {
        let start = Input::Wire(Event::Start { path: path.into() });
        self.service.send_until(start, Phase::Started)
    }

    /// Sends `Stop` and resolves once the machine is back in `Stopped`.
    pub fn stop(&mut self) -> StateFuture<Phase> {
        if self.phase() == Phase::Stopped {
            return StateFuture::ready(Phase::Stopped);
        }
        self.service
            .send_until(Input::Wire(Event::Stop), Phase::Stopped)
    }

    /// Takes the pending launch request left by entering `Running`.
    pub fn take_launch(&mut self) -> Option<String> {
        self.service.context_mut().launch.take()
    }

    pub fn window_should_close(&self) -> bool {
        self.service.context().window_should_close
    }

    pub fn input(&self) -> &InputState {
        &self.service.context().input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.service.context_mut().input
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Phase) + Send + 'static) -> SubscriptionId {
        self.service.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.service.unsubscribe(id)
    }

    /// Drops observers; pending start/stop futures resolve as destroyed.
    pub fn destroy(&mut self) {
        self.service.destroy();
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("phase", &self.phase())
            .field("context", self.service.context())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_abi::keys;
    use std::sync::{Arc, Mutex};

    fn observed(lifecycle: &mut Lifecycle) -> Arc<Mutex<Vec<Phase>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        lifecycle.subscribe(move |phase| sink.lock().unwrap().push(phase));
        seen
    }

    #[test]
    fn start_notifies_started_then_running() {
        let mut lifecycle = Lifecycle::new().unwrap();
        let seen = observed(&mut lifecycle);
        let started = lifecycle.start("games/ball.wasm");
        assert_eq!(*seen.lock().unwrap(), vec![Phase::Started, Phase::Running]);
        assert_eq!(started.wait(), Ok(Phase::Started));
        assert_eq!(lifecycle.take_launch().as_deref(), Some("games/ball.wasm"));
        assert_eq!(lifecycle.take_launch(), None);
    }

    #[test]
    fn stop_waits_for_program_exit() {
        let mut lifecycle = Lifecycle::new().unwrap();
        let _ = lifecycle.start("a");
        let mut stopped = lifecycle.stop();
        assert_eq!(lifecycle.phase(), Phase::Stopping);
        assert!(lifecycle.window_should_close());
        assert_eq!(stopped.wait_timeout(std::time::Duration::ZERO), Ok(None));

        lifecycle.exited();
        assert_eq!(stopped.wait(), Ok(Phase::Stopped));
        assert!(!lifecycle.window_should_close());
    }

    #[test]
    fn program_returning_on_its_own_stops() {
        let mut lifecycle = Lifecycle::new().unwrap();
        let _ = lifecycle.start("a");
        lifecycle.send(Event::KeyDown { key: keys::UP });
        lifecycle.exited();
        assert_eq!(lifecycle.phase(), Phase::Stopped);
        assert!(!lifecycle.input().is_key_down(keys::UP));
    }

    #[test]
    fn inputs_only_count_while_running() {
        let mut lifecycle = Lifecycle::new().unwrap();
        lifecycle.send(Event::KeyDown { key: keys::ENTER });
        lifecycle.send(Event::AddResource {
            name: "logo.png".into(),
            data: vec![9],
        });
        assert!(!lifecycle.input().is_key_down(keys::ENTER));
        assert!(lifecycle.input().resource("logo.png").is_some());

        let _ = lifecycle.start("a");
        lifecycle.send(Event::KeyDown { key: keys::ENTER });
        lifecycle.send(Event::Start { path: "b".into() });
        assert!(lifecycle.input().is_key_down(keys::ENTER));
        assert_eq!(lifecycle.phase(), Phase::Running);
        assert_eq!(lifecycle.take_launch().as_deref(), Some("a"));
    }

    #[test]
    fn stop_when_stopped_is_immediate() {
        let mut lifecycle = Lifecycle::new().unwrap();
        assert_eq!(lifecycle.stop().wait(), Ok(Phase::Stopped));
    }
}
