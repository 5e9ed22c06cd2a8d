//! Randomized `always` graphs: valid tables settle, looping ones never build.

use fsm::{MachineEvent, Service, TableBuilder, TableError, Transition};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const STATES: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Go;

impl MachineEvent for Go {
    type Kind = Go;

    fn kind(&self) -> Go {
        Go
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn chain_from(edges: &HashMap<u8, u8>, start: u8) -> Option<Vec<u8>> {
    let mut path = vec![start];
    let mut current = start;
    while let Some(&next) = edges.get(&current) {
        if path.contains(&next) {
            return None;
        }
        path.push(next);
        current = next;
    }
    Some(path)
}

/// Every random graph either builds and settles at the end of its chain, or
/// is rejected because some `always` path loops.
#[test]
fn random_always_graphs_settle_or_are_rejected() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(0xA1_5A_75);

    for _ in 0..500 {
        let mut edges = HashMap::new();
        for state in 1..STATES {
            if rng.gen_bool(0.6) {
                edges.insert(state, rng.gen_range(0..STATES));
            }
        }

        let mut builder = TableBuilder::<u8, (), Go>::new().on(0, Go, Transition::to(1));
        for state in 1..STATES {
            builder = builder.state(state);
        }
        for (&from, &to) in &edges {
            builder = builder.always(from, Transition::to(to));
        }

        let looping = (1..STATES).any(|start| chain_from(&edges, start).is_none());
        match builder.build(0) {
            Err(TableError::AlwaysCycle { path }) => {
                assert!(looping, "rejected an acyclic graph: {edges:?}");
                assert!(path.len() >= 2);
            }
            Err(other) => panic!("unexpected table error {other:?}"),
            Ok(table) => {
                assert!(!looping, "accepted a looping graph: {edges:?}");
                let expected = chain_from(&edges, 1).unwrap_or_default();
                let mut service = Service::new(table, ());
                let seen = Arc::new(Mutex::new(Vec::new()));
                let sink = seen.clone();
                service.subscribe(move |state| sink.lock().unwrap().push(state));
                service.send(Go);
                assert_eq!(*seen.lock().unwrap(), expected);
                assert_eq!(Some(service.state()), expected.last().copied());
            }
        }
    }
}

/// A long acyclic chain runs to the end inside one `send`.
#[test]
fn long_chain_runs_in_one_send() {
    init_logging();
    let mut builder = TableBuilder::<u8, Vec<u8>, Go>::new()
        .on(0, Go, Transition::to(1))
        .state(200);
    for state in 1..200u8 {
        builder = builder
            .always(state, Transition::to(state + 1))
            .enter(state, move |ctx, _| ctx.context.push(state));
    }
    let mut service = Service::new(builder.build(0).unwrap(), Vec::new());
    let done = service.send_until(Go, 200);
    assert_eq!(done.wait(), Ok(200));
    assert_eq!(service.context().len(), 199);
    assert_eq!(service.context().first(), Some(&1));
}
