//! Registry, creation, hierarchical id synthesis, and orderly shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use slog::Logger;
use tokio::sync::Mutex;

use crate::actor::{spawn_actor, Actor};
use crate::context::Context;
use crate::error::{Result, RuntimeError};
use crate::identity::Identity;
use crate::messages::ShutdownMessage;
use crate::proxy::Proxy;

/// Process-wide (by convention: one per runtime) registry of live actors.
/// Lookups that race only with other lookups never take `create_lock`; only
/// creation and shutdown do, which is why the actor map is a concurrent
/// `DashMap` rather than a `Mutex<HashMap<..>>`.
pub struct Core {
    actors: DashMap<Identity, Proxy>,
    actor_types: DashMap<&'static str, ()>,
    running: AtomicBool,
    create_lock: Mutex<()>,
    log: Logger,
}

impl Core {
    pub fn new(log: Logger) -> Arc<Core> {
        Arc::new(Core {
            actors: DashMap::new(),
            actor_types: DashMap::new(),
            running: AtomicBool::new(true),
            create_lock: Mutex::new(()),
            log,
        })
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_actor_type_exists(&self, name: &str) -> bool {
        self.actor_types.contains_key(name)
    }

    /// Creates and starts a new actor of type `A`, addressed relative to
    /// `ctx`'s identity (an absolute `actor_id` overrides it entirely).
    pub async fn create_actor<A: Actor>(
        self: Arc<Self>,
        ctx: &Context,
        actor_id: &str,
        actor: A,
        log_bindings: Vec<(&'static str, String)>,
    ) -> Result<Proxy> {
        let full_id = Identity::join(ctx.identity(), actor_id)?;

        let _guard = self.create_lock.lock().await;
        if !self.is_running() {
            return Err(RuntimeError::NotRunning);
        }
        if self.actors.contains_key(&full_id) {
            return Err(RuntimeError::DuplicateId(full_id.to_string()));
        }

        self.actor_types.entry(std::any::type_name::<A>()).or_insert(());

        let child_ctx = ctx.with_identity(full_id.clone()).bind(log_bindings);
        let proxy = spawn_actor(self.clone(), child_ctx, actor);
        self.actors.insert(full_id, proxy.clone());
        Ok(proxy)
    }

    /// Resolves `actor_id` (relative to `ctx`'s identity, or absolute) to a
    /// [`Proxy`] for an already-running actor.
    pub fn get_proxy(&self, ctx: &Context, actor_id: &str) -> Result<Proxy> {
        let full_id = Identity::join(ctx.identity(), actor_id)?;
        self.actors
            .get(&full_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RuntimeError::NotFound(full_id.to_string()))
    }

    /// Called by an actor's own serve-loop as it exits. Fails if the actor
    /// is still observably live.
    pub fn remove_actor(&self, identity: &Identity) -> Result<()> {
        if let Some((_, proxy)) = self.actors.remove(identity) {
            if !proxy.is_shutdown() {
                self.actors.insert(identity.clone(), proxy);
                return Err(RuntimeError::NotShutdown(identity.to_string()));
            }
        }
        Ok(())
    }

    /// Stops accepting new actors, tells every live actor to shut down, and
    /// waits for all of them to confirm.
    pub async fn shutdown(self: &Arc<Self>) {
        {
            let _guard = self.create_lock.lock().await;
            self.running.store(false, Ordering::SeqCst);
        }

        let root_ctx = Context::root(self.clone(), self.log.clone());
        let proxies: Vec<Proxy> = self.actors.iter().map(|e| e.value().clone()).collect();
        let sends: Vec<_> = proxies
            .iter()
            .map(|p| {
                let tracker = p.tell(&root_ctx, ShutdownMessage, None);
                async move {
                    let _ = tracker.wait().await;
                }
            })
            .collect();
        join_all(sends).await;

        let waits: Vec<_> = proxies.iter().map(|p| p.wait_until_shutdown()).collect();
        join_all(waits).await;
    }
}
