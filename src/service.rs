//! Reusable `created → started → ready → stopping → done` lifecycle
//! underneath [`crate::actor::Actor`].
//!
//! This implementation commits to a single discipline: stop callbacks fire
//! exactly once, at the moment `stop()` is first called (or the drive loop
//! ends on its own); done callbacks fire exactly once, after `teardown`
//! completes. There is no second, redundant completion path layered on top.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::watch;

use crate::error::{Result, RuntimeError};

pub type Callback = Box<dyn FnOnce() + Send>;

struct Inner {
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    setup_exception_tx: watch::Sender<Option<RuntimeError>>,
    setup_exception_rx: watch::Receiver<Option<RuntimeError>>,
    stopped_once: AtomicBool,
    stop_callbacks: Mutex<Vec<Callback>>,
    done_callbacks: Mutex<Vec<Callback>>,
}

/// A handle to one worker's lifecycle state machine. Cheap to clone; every
/// clone observes the same underlying state.
#[derive(Clone)]
pub struct Service {
    inner: std::sync::Arc<Inner>,
}

impl Default for Service {
    fn default() -> Self {
        Self::new()
    }
}

impl Service {
    pub fn new() -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let (setup_exception_tx, setup_exception_rx) = watch::channel(None);
        Service {
            inner: std::sync::Arc::new(Inner {
                ready_tx,
                ready_rx,
                stop_tx,
                stop_rx,
                done_tx,
                done_rx,
                setup_exception_tx,
                setup_exception_rx,
                stopped_once: AtomicBool::new(false),
                stop_callbacks: Mutex::new(Vec::new()),
                done_callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Drives the `setup → ready → serve → teardown → stop/done` contract.
    /// `serve` is expected to return once stopped.
    pub async fn run<FSetup, FServe, FTeardown>(&self, setup: FSetup, serve: FServe, teardown: FTeardown)
    where
        FSetup: Future<Output = Result<()>>,
        FServe: Future<Output = ()>,
        FTeardown: Future<Output = ()>,
    {
        match setup.await {
            Ok(()) => {
                let _ = self.inner.ready_tx.send(true);
                serve.await;
                teardown.await;
            }
            Err(e) => {
                let _ = self.inner.setup_exception_tx.send(Some(e));
            }
        }
        self.stop();
        let _ = self.inner.done_tx.send(true);
        let callbacks = std::mem::take(&mut *self.inner.done_callbacks.lock().unwrap());
        for cb in callbacks {
            cb();
        }
    }

    /// Sets the stop event and runs every registered stop callback exactly
    /// once. Idempotent: a second call is a no-op.
    pub fn stop(&self) {
        if self.inner.stopped_once.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.stop_tx.send(true);
        let callbacks = std::mem::take(&mut *self.inner.stop_callbacks.lock().unwrap());
        for cb in callbacks {
            cb();
        }
    }

    pub fn add_stop_callback(&self, cb: Callback) {
        if self.stopping() {
            cb();
            return;
        }
        self.inner.stop_callbacks.lock().unwrap().push(cb);
    }

    pub fn add_done_callback(&self, cb: Callback) {
        if self.done() {
            cb();
            return;
        }
        self.inner.done_callbacks.lock().unwrap().push(cb);
    }

    pub fn started(&self) -> bool {
        *self.inner.ready_rx.borrow() || self.stopping()
    }

    pub fn ready(&self) -> bool {
        *self.inner.ready_rx.borrow()
    }

    pub fn stopping(&self) -> bool {
        *self.inner.stop_rx.borrow()
    }

    pub fn done(&self) -> bool {
        *self.inner.done_rx.borrow()
    }

    pub fn exception(&self) -> Option<RuntimeError> {
        self.inner.setup_exception_rx.borrow().clone()
    }

    /// A receiver that becomes `true` once `stop()` fires, suitable as a
    /// [`crate::multiwaiter::MultiWaiter`] source.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.inner.stop_rx.clone()
    }

    /// Blocks until `done_event` is set.
    pub async fn wait(&self) {
        let mut rx = self.inner.done_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Blocks until ready, or returns the setup exception if setup failed
    /// before ever becoming ready.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut ready_rx = self.inner.ready_rx.clone();
        let mut err_rx = self.inner.setup_exception_rx.clone();
        loop {
            if *ready_rx.borrow() {
                return Ok(());
            }
            if let Some(e) = err_rx.borrow().clone() {
                return Err(e);
            }
            tokio::select! {
                _ = ready_rx.changed() => {},
                _ = err_rx.changed() => {},
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn happy_path_reaches_ready_then_done() {
        let service = Service::new();
        let svc = service.clone();
        let handle = tokio::spawn(async move {
            svc.run(
                async { Ok(()) },
                async {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                },
                async {},
            )
            .await;
        });
        service.wait_ready().await.unwrap();
        assert!(service.ready());
        service.wait().await;
        assert!(service.done());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn setup_failure_short_circuits_to_done_without_ready() {
        let service = Service::new();
        let svc = service.clone();
        svc.run(
            async { Err(RuntimeError::InitialisationException("boom".into())) },
            async {},
            async {},
        )
        .await;
        assert!(!service.ready());
        assert!(service.done());
        assert!(matches!(
            service.wait_ready().await,
            Err(RuntimeError::InitialisationException(_))
        ));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let service = Service::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        service.add_stop_callback(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        service.stop();
        service.stop();
        service.stop();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn done_callback_registered_late_runs_immediately() {
        let service = Service::new();
        service.run(async { Ok(()) }, async {}, async {}).await;
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        service.add_done_callback(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
