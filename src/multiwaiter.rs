//! Cooperative "wait for the first of several scheduled operations to
//! produce a value" multiplexer.
//!
//! Sources are ordinary in-process futures, not spawned tasks: cancelling a
//! source is simply dropping its pending future, which is the idiomatic
//! cooperative-cancellation story for an `!Send`-free, no-extra-thread
//! multiplexer and matches the reference framework's own
//! `AssertUnwindSafe(..).catch_unwind()` pattern (`src/futures_util.rs`) for
//! turning a panicking future into a reportable outcome instead of
//! propagating the panic.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::{Result, RuntimeError};

pub type PendingFuture = Pin<Box<dyn Future<Output = Box<dyn Any + Send>> + Send>>;
pub type Factory = Arc<dyn Fn() -> PendingFuture + Send + Sync>;

/// The terminal state of one multi-waiter source.
pub enum SourceOutcome {
    Value(Box<dyn Any + Send>),
    Exception(RuntimeError),
}

struct Source {
    factory: Factory,
    in_flight: Option<PendingFuture>,
    last_outcome: Option<SourceOutcome>,
}

/// Sentinel boxed in place of a source's real value when its future panicked
/// mid-poll, so `catch_unwind`'s error arm can still flow through the same
/// `Box<dyn Any + Send>` channel as a normal result.
struct PanicSentinel(String);

fn classify(value: Box<dyn Any + Send>) -> SourceOutcome {
    match value.downcast::<PanicSentinel>() {
        Ok(sentinel) => SourceOutcome::Exception(RuntimeError::HandlerException(sentinel.0)),
        Err(v) => SourceOutcome::Value(v),
    }
}

/// Registers named sources and reports the first (or, within the same
/// scheduling tick, the first several) to complete. Hold one inside a
/// scoped acquisition and guarantee [`MultiWaiter::cancel`] on scope exit.
pub struct MultiWaiter<K: Eq + Hash + Clone + Send + 'static> {
    sources: HashMap<K, Source>,
    order: Vec<K>,
}

impl<K: Eq + Hash + Clone + Send + 'static> Default for MultiWaiter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + Send + 'static> MultiWaiter<K> {
    pub fn new() -> Self {
        MultiWaiter {
            sources: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a source. `factory` is called each time the source is
    /// (re)started by [`MultiWaiter::wait_first`]; it must return a fresh
    /// future each time. Fails [`RuntimeError::DuplicateKey`] on repeat.
    pub fn add(&mut self, key: K, factory: Factory) -> Result<()>
    where
        K: std::fmt::Debug,
    {
        if self.sources.contains_key(&key) {
            return Err(RuntimeError::DuplicateKey(format!("{key:?}")));
        }
        self.order.push(key.clone());
        self.sources.insert(
            key,
            Source {
                factory,
                in_flight: None,
                last_outcome: None,
            },
        );
        Ok(())
    }

    /// (Re)starts every source that is not already running, then blocks
    /// until at least one terminates. Returns the set of keys that became
    /// done during this call; sources that completed in the same
    /// scheduling tick are all reported together. Sources that are still
    /// pending when this call returns remain pending for the next call.
    pub async fn wait_first(&mut self) -> HashSet<K> {
        for key in &self.order {
            let source = self.sources.get_mut(key).expect("key tracked in order");
            if source.in_flight.is_none() && source.last_outcome.is_none() {
                let fut = (source.factory)();
                source.in_flight = Some(Box::pin(AssertUnwindSafe(fut).catch_unwind().map(|r| match r {
                    Ok(v) => v,
                    Err(e) => {
                        let msg = e
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| e.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "panic".to_string());
                        Box::new(PanicSentinel(msg)) as Box<dyn Any + Send>
                    }
                })));
            }
        }

        let keys = self.order.clone();
        let mut pending: Vec<PendingFuture> = keys
            .iter()
            .map(|k| self.sources.get_mut(k).unwrap().in_flight.take().expect("just started"))
            .collect();

        let (value, idx, remaining) = futures::future::select_all(pending.drain(..)).await;

        let mut completed = HashSet::new();
        let completed_key = keys[idx].clone();
        self.sources.get_mut(&completed_key).unwrap().last_outcome = Some(classify(value));
        completed.insert(completed_key);

        // keys aligned with `remaining` are `keys` with the completed index removed
        let mut remaining_keys: Vec<K> = keys.clone();
        remaining_keys.remove(idx);

        let mut still_pending = Vec::with_capacity(remaining.len());
        for (key, mut fut) in remaining_keys.into_iter().zip(remaining.into_iter()) {
            match futures::poll!(fut.as_mut()) {
                std::task::Poll::Ready(value) => {
                    self.sources.get_mut(&key).unwrap().last_outcome = Some(classify(value));
                    completed.insert(key);
                }
                std::task::Poll::Pending => {
                    still_pending.push((key, fut));
                }
            }
        }
        for (key, fut) in still_pending {
            self.sources.get_mut(&key).unwrap().in_flight = Some(fut);
        }

        completed
    }

    pub fn done(&self, key: &K) -> bool {
        self.sources.get(key).map(|s| s.last_outcome.is_some()).unwrap_or(false)
    }

    pub fn exception(&self, key: &K) -> Option<&RuntimeError> {
        match self.sources.get(key)?.last_outcome.as_ref()? {
            SourceOutcome::Exception(e) => Some(e),
            SourceOutcome::Value(_) => None,
        }
    }

    /// Consumes and returns a terminal value. Fails with
    /// [`RuntimeError::NotFound`] if the source has not produced a terminal
    /// outcome yet.
    pub fn result(&mut self, key: &K) -> Result<Box<dyn Any + Send>> {
        let source = self
            .sources
            .get_mut(key)
            .ok_or_else(|| RuntimeError::NotFound("no such multi-waiter key".into()))?;
        match source.last_outcome.take() {
            Some(SourceOutcome::Value(v)) => Ok(v),
            Some(SourceOutcome::Exception(e)) => Err(e),
            None => Err(RuntimeError::NotFound("source not yet done".into())),
        }
    }

    /// Cancels and re-creates the listed sources (or all, if `keys` is empty).
    pub fn reset(&mut self, keys: &[K]) {
        let targets: Vec<K> = if keys.is_empty() { self.order.clone() } else { keys.to_vec() };
        for key in targets {
            if let Some(source) = self.sources.get_mut(&key) {
                source.in_flight = None;
                source.last_outcome = None;
            }
        }
    }

    /// Cancels every pending source and drops all bookkeeping.
    pub fn cancel(&mut self) {
        self.sources.clear();
        self.order.clear();
    }
}
