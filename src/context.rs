//! Ambient capability bundle carried into every handler invocation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use slog::{o, Logger};
use tokio::sync::Mutex;

use crate::actlet::Actlet;
use crate::core::Core;
use crate::error::{Result, RuntimeError};
use crate::identity::Identity;
use crate::message::{Envelope, Message};
use crate::messages::TimerConfiguration;
use crate::proxy::Proxy;
use crate::tracker::EnvelopeTracker;

/// A lightweight snapshot of an envelope's delivery metadata, carried by a
/// [`Context`] while a handler is running. Does not carry the message
/// payload itself — the handler already received that as a typed argument.
#[derive(Debug, Clone)]
pub struct EnvelopeMeta {
    pub id: String,
    pub sender: Identity,
    pub receiver: Identity,
    pub reply_to: Option<Identity>,
}

impl From<&Envelope> for EnvelopeMeta {
    fn from(env: &Envelope) -> Self {
        EnvelopeMeta {
            id: env.id.clone(),
            sender: env.sender.clone(),
            receiver: env.receiver.clone(),
            reply_to: env.reply_to.clone(),
        }
    }
}

/// The part of a [`Context`] that only exists when the context belongs to a
/// live actor (as opposed to a root or other free-standing context): a
/// handle back to its own proxy, and the actlets map the actor's serve loop
/// also reads from when an `ActletDoneMessage` arrives.
#[derive(Clone)]
struct ActorLink {
    proxy: Proxy,
    actlets: Arc<Mutex<HashMap<String, Actlet>>>,
}

/// Immutable capability bundle: a reference to [`Core`], a logger, an
/// identity, and the currently-handled envelope's metadata (if any).
///
/// Cheaply derivable: [`Context::with_identity`], [`Context::with_envelope`]
/// and [`Context::bind`] all return a new, independent `Context` rather than
/// mutating in place, since Rust has no implicit dynamic scoping to restore
/// on exit the way a context-manager-based `bind` would.
#[derive(Clone)]
pub struct Context {
    core: Arc<Core>,
    log: Logger,
    identity: Identity,
    envelope: Option<Arc<EnvelopeMeta>>,
    owner: Option<ActorLink>,
}

impl Context {
    pub fn root(core: Arc<Core>, log: Logger) -> Self {
        Context {
            core,
            log,
            identity: Identity::root(),
            envelope: None,
            owner: None,
        }
    }

    /// Builds the base context an actor's own serve loop runs under: one
    /// bound to the actor's identity and carrying the actlet bookkeeping
    /// `create_actlet`/`create_timer` register into.
    pub(crate) fn for_actor(
        core: Arc<Core>,
        log: Logger,
        identity: Identity,
        proxy: Proxy,
        actlets: Arc<Mutex<HashMap<String, Actlet>>>,
    ) -> Self {
        Context {
            core,
            log,
            identity,
            envelope: None,
            owner: Some(ActorLink { proxy, actlets }),
        }
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn envelope(&self) -> Option<&EnvelopeMeta> {
        self.envelope.as_deref()
    }

    /// The sender recorded on the currently-handled envelope, if any.
    pub fn sender(&self) -> Option<&Identity> {
        self.envelope.as_ref().map(|e| &e.sender)
    }

    pub fn with_identity(&self, identity: Identity) -> Context {
        Context {
            core: self.core.clone(),
            log: self.log.clone(),
            identity,
            envelope: self.envelope.clone(),
            owner: self.owner.clone(),
        }
    }

    pub fn with_envelope(&self, meta: EnvelopeMeta) -> Context {
        Context {
            core: self.core.clone(),
            log: self.log.clone(),
            identity: self.identity.clone(),
            envelope: Some(Arc::new(meta)),
            owner: self.owner.clone(),
        }
    }

    /// A scoped logger augmentation: returns a derived context whose logger
    /// carries the extra key/value bindings for as long as the caller holds
    /// the derived value. The original context (and its logger) are
    /// untouched, which is how this crate realises the "restores on scope
    /// exit" behaviour of the reflective original without mutation.
    pub fn bind(&self, bindings: Vec<(&'static str, String)>) -> Context {
        let mut log = self.log.clone();
        for (k, v) in bindings {
            log = log.new(o!(k => v));
        }
        Context {
            core: self.core.clone(),
            log,
            identity: self.identity.clone(),
            envelope: self.envelope.clone(),
            owner: self.owner.clone(),
        }
    }

    pub fn debug(&self, msg: &str) {
        slog::debug!(self.log, "{}", msg);
    }

    pub fn info(&self, msg: &str) {
        slog::info!(self.log, "{}", msg);
    }

    pub fn warning(&self, msg: &str) {
        slog::warn!(self.log, "{}", msg);
    }

    pub fn error(&self, msg: &str) {
        slog::error!(self.log, "{}", msg);
    }

    pub fn fatal(&self, msg: &str) {
        slog::crit!(self.log, "{}", msg);
    }

    pub fn exception(&self, msg: &str, err: &dyn std::fmt::Display) {
        slog::error!(self.log, "{}", msg; "error" => %err);
    }

    /// Delegates to [`Core::create_actor`], passing `self` as the creating
    /// context.
    pub async fn create_actor<A: crate::actor::Actor>(
        &self,
        actor_id: &str,
        actor: A,
        log_bindings: Vec<(&'static str, String)>,
    ) -> Result<Proxy> {
        self.core.clone().create_actor(self, actor_id, actor, log_bindings).await
    }

    /// Delegates to [`Core::get_proxy`], passing `self` as the looking-up
    /// context.
    pub fn get_proxy(&self, actor_id: &str) -> Result<Proxy> {
        self.core.get_proxy(self, actor_id)
    }

    /// The proxy to this context's own actor, if this context is
    /// actor-bound. Used by the `ActletDoneMessage` built-in handler to
    /// `tell_me` a chained-back actlet result.
    pub(crate) fn self_proxy(&self) -> Option<Proxy> {
        self.owner.as_ref().map(|o| o.proxy.clone())
    }

    fn owner(&self) -> Result<&ActorLink> {
        self.owner
            .as_ref()
            .ok_or_else(|| RuntimeError::BadRegistration("operation requires an actor-bound context".into()))
    }

    /// Wraps `message` in a self-addressed envelope and posts it to this
    /// context's own actor.
    pub fn tell_me<M: Message>(&self, message: M) -> Result<EnvelopeTracker> {
        Ok(self.owner()?.proxy.tell(self, message, None))
    }

    /// Spawns a named actlet owned by this context's actor, qualified to
    /// `<identity>/actlet/<name>`. Fails `DuplicateActlet` if that qualified
    /// name is already in use.
    pub async fn create_actlet<C, R, F, Fut>(&self, name: &str, configuration: C, function: F) -> Result<()>
    where
        C: Clone + Send + 'static,
        R: Message,
        F: FnOnce(Context, Proxy, C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let qualified = self.identity.actlet(name)?;
        self.spawn_actlet(qualified, configuration, function).await
    }

    /// Spawns a timer actlet named `name`, qualified to
    /// `<identity>/actlet/timer/<name>`, driving `config`'s repeat protocol.
    pub async fn create_timer<M: Message + Clone>(&self, name: &str, config: TimerConfiguration<M>) -> Result<()> {
        let qualified = self.identity.timer(name)?;
        self.spawn_actlet(qualified, config, |ctx, proxy, cfg| crate::timer::run(ctx, proxy, cfg))
            .await
    }

    async fn spawn_actlet<C, R, F, Fut>(&self, qualified: Identity, configuration: C, function: F) -> Result<()>
    where
        C: Clone + Send + 'static,
        R: Message,
        F: FnOnce(Context, Proxy, C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let owner = self.owner()?;
        let key = qualified.to_string();
        let mut guard = owner.actlets.lock().await;
        if guard.contains_key(&key) {
            return Err(RuntimeError::DuplicateActlet(key));
        }
        let actlet = crate::actlet::spawn(self.clone(), owner.proxy.clone(), key.clone(), configuration, function);
        guard.insert(key, actlet);
        Ok(())
    }

    /// Cancels a named actlet or timer owned by this context's actor,
    /// trying the plain-actlet qualified name first, then the timer one.
    pub async fn cancel_actlet(&self, name: &str) -> Result<()> {
        let owner = self.owner()?;
        let guard = owner.actlets.lock().await;
        if let Ok(actlet_id) = self.identity.actlet(name) {
            if let Some(actlet) = guard.get(actlet_id.as_str()) {
                actlet.cancel();
                return Ok(());
            }
        }
        if let Ok(timer_id) = self.identity.timer(name) {
            if let Some(actlet) = guard.get(timer_id.as_str()) {
                actlet.cancel();
            }
        }
        Ok(())
    }

    pub async fn is_actlet_exists(&self, name: &str) -> bool {
        match (&self.owner, self.identity.actlet(name)) {
            (Some(owner), Ok(qualified)) => owner.actlets.lock().await.contains_key(qualified.as_str()),
            _ => false,
        }
    }

    pub async fn is_timer_exists(&self, name: &str) -> bool {
        match (&self.owner, self.identity.timer(name)) {
            (Some(owner), Ok(qualified)) => owner.actlets.lock().await.contains_key(qualified.as_str()),
            _ => false,
        }
    }
}
