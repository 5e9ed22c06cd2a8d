use crate::subscribers::{StateFuture, Subscribers, SubscriptionId};
use crate::table::{Transition, TransitionTable};
use crate::{MachineEvent, MachineState};
use std::collections::VecDeque;

/// What a hook can touch while a transition runs.
///
/// Events sent through the context are queued behind the one being
/// processed, after its `always` chain has settled.
pub struct Ctx<'a, C, E> {
    pub context: &'a mut C,
    queue: &'a mut VecDeque<E>,
}

impl<C, E> Ctx<'_, C, E> {
    pub fn send(&mut self, event: E) {
        self.queue.push_back(event);
    }
}

/// A running state machine.
pub struct Service<S: MachineState, C, E: MachineEvent> {
    table: TransitionTable<S, C, E>,
    state: S,
    context: C,
    queue: VecDeque<E>,
    subscribers: Subscribers<S>,
}

impl<S: MachineState, C, E: MachineEvent> Service<S, C, E> {
    pub fn new(table: TransitionTable<S, C, E>, context: C) -> Self {
        Self {
            state: table.initial(),
            table,
            context,
            queue: VecDeque::new(),
            subscribers: Subscribers::new(),
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn table(&self) -> &TransitionTable<S, C, E> {
        &self.table
    }

    /// Processes `event` and everything hooks queue while it runs, in order.
    pub fn send(&mut self, event: E) {
        self.queue.push_back(event);
        while let Some(event) = self.queue.pop_front() {
            self.process(event);
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(S) + Send + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Resolves the next time the machine enters `target`, or immediately if
    /// it is already there.
    pub fn wait_for(&mut self, target: S) -> StateFuture<S> {
        if self.state == target {
            return StateFuture::ready(target);
        }
        self.subscribers.until(target)
    }

    /// Sends `event` and returns a future for the first entry into `target`.
    ///
    /// The wait is registered before the event runs, so transitions passing
    /// through `target` inside this call are observed.
    pub fn send_until(&mut self, event: E, target: S) -> StateFuture<S> {
        let reached = self.subscribers.until(target);
        self.send(event);
        reached
    }

    /// Drops subscribers and queued events. The current state is left alone.
    pub fn destroy(&mut self) {
        self.subscribers.clear();
        self.queue.clear();
    }

    fn process(&mut self, event: E) {
        let Self {
            table,
            state,
            context,
            queue,
            subscribers,
        } = self;
        let kind = event.kind();
        let Some(mut transition) = table
            .config(*state)
            .and_then(|config| config.on.get(&kind))
        else {
            log::trace!("{state:?} ignores {kind:?}");
            return;
        };

        loop {
            run_action(transition, context, queue, &event);
            let Some(target) = transition.target else {
                return;
            };
            log::debug!("{state:?} -> {target:?} on {kind:?}");
            *state = target;
            let Some(config) = table.config(target) else {
                return;
            };
            if let Some(enter) = &config.enter {
                enter(
                    &mut Ctx {
                        context: &mut *context,
                        queue: &mut *queue,
                    },
                    &event,
                );
            }
            subscribers.notify(target);
            match &config.always {
                Some(always) => transition = always,
                None => return,
            }
        }
    }
}

fn run_action<S, C, E>(
    transition: &Transition<S, C, E>,
    context: &mut C,
    queue: &mut VecDeque<E>,
    event: &E,
) {
    if let Some(action) = &transition.action {
        action(&mut Ctx { context, queue }, event);
    }
}

impl<S: MachineState, C: std::fmt::Debug, E: MachineEvent> std::fmt::Debug for Service<S, C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("queued", &self.queue.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Destroyed, TableBuilder};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Phase {
        Stopped,
        Started,
        Running,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Ev {
        Start,
        Stop,
        Ping,
    }

    impl MachineEvent for Ev {
        type Kind = Ev;

        fn kind(&self) -> Ev {
            *self
        }
    }

    type Log = Vec<&'static str>;

    fn machine(ping_on_start: bool) -> Service<Phase, Log, Ev> {
        let table = TableBuilder::new()
            .on(
                Phase::Stopped,
                Ev::Start,
                Transition::to(Phase::Started).with_action(move |ctx: &mut Ctx<'_, Log, Ev>, _| {
                    ctx.context.push("start");
                    if ping_on_start {
                        ctx.send(Ev::Ping);
                    }
                }),
            )
            .enter(Phase::Started, |ctx, _| ctx.context.push("enter started"))
            .always(Phase::Started, Transition::to(Phase::Running))
            .enter(Phase::Running, |ctx, _| ctx.context.push("enter running"))
            .on(
                Phase::Running,
                Ev::Ping,
                Transition::internal().with_action(|ctx: &mut Ctx<'_, Log, Ev>, _| {
                    ctx.context.push("ping")
                }),
            )
            .on(Phase::Running, Ev::Stop, Transition::to(Phase::Stopped))
            .build(Phase::Stopped)
            .unwrap();
        Service::new(table, Vec::new())
    }

    fn record(service: &mut Service<Phase, Log, Ev>) -> Arc<Mutex<Vec<Phase>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        service.subscribe(move |state| sink.lock().unwrap().push(state));
        seen
    }

    #[test]
    fn start_passes_through_started_into_running() {
        let mut service = machine(false);
        let seen = record(&mut service);
        service.send(Ev::Start);
        assert_eq!(*seen.lock().unwrap(), vec![Phase::Started, Phase::Running]);
        assert_eq!(service.state(), Phase::Running);
        assert_eq!(
            *service.context(),
            vec!["start", "enter started", "enter running"]
        );
    }

    #[test]
    fn events_sent_from_hooks_wait_for_the_chain() {
        let mut service = machine(true);
        service.send(Ev::Start);
        assert_eq!(
            *service.context(),
            vec!["start", "enter started", "enter running", "ping"]
        );
    }

    #[test]
    fn unmatched_events_are_ignored() {
        let mut service = machine(false);
        let seen = record(&mut service);
        service.send(Ev::Stop);
        service.send(Ev::Ping);
        assert_eq!(service.state(), Phase::Stopped);
        assert!(seen.lock().unwrap().is_empty());
        assert!(service.context().is_empty());
    }

    #[test]
    fn internal_transitions_do_not_notify() {
        let mut service = machine(false);
        service.send(Ev::Start);
        let seen = record(&mut service);
        service.send(Ev::Ping);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(service.state(), Phase::Running);
    }

    #[test]
    fn send_until_sees_transient_states() {
        let mut service = machine(false);
        let started = service.send_until(Ev::Start, Phase::Started);
        assert_eq!(started.wait(), Ok(Phase::Started));
        let stopped = service.send_until(Ev::Stop, Phase::Stopped);
        assert_eq!(stopped.wait(), Ok(Phase::Stopped));
        assert_eq!(service.wait_for(Phase::Stopped).wait(), Ok(Phase::Stopped));
    }

    #[test]
    fn destroy_cancels_waits_but_keeps_state() {
        let mut service = machine(false);
        service.send(Ev::Start);
        let stopped = service.wait_for(Phase::Stopped);
        service.destroy();
        assert_eq!(stopped.wait(), Err(Destroyed));
        assert_eq!(service.state(), Phase::Running);
    }
}
