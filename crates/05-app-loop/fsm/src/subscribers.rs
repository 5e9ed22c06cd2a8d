use futures::channel::oneshot;
use futures::task::{waker, ArcWake};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Handle returned by [`Subscribers::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// The machine went away before the awaited state was reached.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("state machine destroyed before reaching the awaited state")]
pub struct Destroyed;

enum Entry<S> {
    Listener(Box<dyn FnMut(S) + Send>),
    Until {
        target: S,
        tx: Option<oneshot::Sender<S>>,
    },
}

/// Ordered set of state-change observers.
///
/// Listeners stay registered until removed. One-shot waiters registered
/// through [`Subscribers::until`] drop out as soon as their state shows up,
/// or once their future is abandoned.
pub struct Subscribers<S> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Entry<S>)>,
}

impl<S> Default for Subscribers<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<S> std::fmt::Debug for Subscribers<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<S: Copy + PartialEq> Subscribers<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `listener` for every subsequent notification.
    pub fn subscribe(&mut self, listener: impl FnMut(S) + Send + 'static) -> SubscriptionId {
        self.push(Entry::Listener(Box::new(listener)))
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Future resolving on the first notification carrying `target`.
    pub fn until(&mut self, target: S) -> StateFuture<S> {
        let (tx, rx) = oneshot::channel();
        self.push(Entry::Until {
            target,
            tx: Some(tx),
        });
        StateFuture { rx }
    }

    /// Delivers `state` to every observer in registration order.
    pub fn notify(&mut self, state: S) {
        self.entries.retain_mut(|(_, entry)| match entry {
            Entry::Listener(listener) => {
                listener(state);
                true
            }
            Entry::Until { target, tx } => {
                if *target == state {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(state);
                    }
                    return false;
                }
                tx.as_ref().is_some_and(|tx| !tx.is_canceled())
            }
        });
    }

    /// Drops every observer; pending futures resolve to [`Destroyed`].
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, entry: Entry<S>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, entry));
        id
    }
}

/// Resolves once a machine reaches a particular state.
///
/// Dropping the future abandons the wait without affecting the machine.
#[must_use = "a StateFuture does nothing unless awaited or waited on"]
#[derive(Debug)]
pub struct StateFuture<S> {
    rx: oneshot::Receiver<S>,
}

impl<S> StateFuture<S> {
    /// A future that is already satisfied.
    pub fn ready(state: S) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(state);
        Self { rx }
    }

    /// Blocks the current thread until the state is reached.
    pub fn wait(self) -> Result<S, Destroyed> {
        futures::executor::block_on(self)
    }

    /// Blocks for at most `timeout`; `Ok(None)` means the state has not been
    /// reached yet and the future can be waited on again.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<S>, Destroyed> {
        let deadline = Instant::now() + timeout;
        let waker = waker(Arc::new(Unparker(thread::current())));
        let mut cx = Context::from_waker(&waker);
        loop {
            if let Poll::Ready(result) = Pin::new(&mut *self).poll(&mut cx) {
                return result.map(Some);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // Spurious unparks just cost another poll.
            thread::park_timeout(deadline - now);
        }
    }
}

/// Wakes a thread parked in [`StateFuture::wait_timeout`].
struct Unparker(thread::Thread);

impl ArcWake for Unparker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.unpark();
    }
}

impl<S> Future for StateFuture<S> {
    type Output = Result<S, Destroyed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|oneshot::Canceled| Destroyed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn listeners_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscribers::new();
        for tag in ["a", "b"] {
            let seen = seen.clone();
            subs.subscribe(move |state: u8| seen.lock().unwrap().push((tag, state)));
        }
        subs.notify(1);
        subs.notify(2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Arc::new(Mutex::new(0));
        let mut subs = Subscribers::new();
        let id = {
            let count = count.clone();
            subs.subscribe(move |_: u8| *count.lock().unwrap() += 1)
        };
        subs.notify(1);
        assert!(subs.unsubscribe(id));
        assert!(!subs.unsubscribe(id));
        subs.notify(2);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn until_resolves_once_and_is_pruned() {
        let mut subs = Subscribers::new();
        let mut fut = subs.until(3u8);
        subs.notify(1);
        assert_eq!(fut.wait_timeout(Duration::ZERO), Ok(None));
        subs.notify(3);
        assert!(subs.is_empty());
        assert_eq!(fut.wait(), Ok(3));
    }

    #[test]
    fn abandoned_waits_are_pruned_on_next_notify() {
        let mut subs = Subscribers::new();
        drop(subs.until(9u8));
        assert_eq!(subs.len(), 1);
        subs.notify(1);
        assert!(subs.is_empty());
    }

    #[test]
    fn clear_cancels_pending_futures() {
        let mut subs = Subscribers::new();
        let fut = subs.until(5u8);
        subs.clear();
        assert_eq!(fut.wait(), Err(Destroyed));
        assert_eq!(StateFuture::ready(4u8).wait(), Ok(4));
    }

    #[test]
    fn timed_wait_wakes_on_notify_from_another_thread() {
        let subs = Arc::new(Mutex::new(Subscribers::new()));
        let mut fut = subs.lock().unwrap().until(7u8);
        let notifier = {
            let subs = subs.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                subs.lock().unwrap().notify(7);
            })
        };
        let began = Instant::now();
        assert_eq!(fut.wait_timeout(Duration::from_secs(5)), Ok(Some(7)));
        assert!(began.elapsed() < Duration::from_secs(5));
        notifier.join().unwrap();
    }

    #[test]
    fn timed_wait_gives_up_at_the_deadline() {
        let mut subs = Subscribers::new();
        let mut fut = subs.until(1u8);
        let began = Instant::now();
        assert_eq!(fut.wait_timeout(Duration::from_millis(30)), Ok(None));
        assert!(began.elapsed() >= Duration::from_millis(30));
        subs.clear();
        assert_eq!(fut.wait_timeout(Duration::from_secs(1)), Err(Destroyed));
    }
}
