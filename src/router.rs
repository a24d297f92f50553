//! Per-actor-type handler registry: message type → handler.
//!
//! Handler registration takes a type-tag (the registered message type's
//! [`TypeId`]) and a typed function; the router erases the payload type
//! behind a type-erased entry that downcasts internally before calling the
//! typed function back.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Result, RuntimeError};
use crate::message::{downcast_message, Message};
use crate::tracker::Reply;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply>> + Send>>;

type ErasedHandler = Arc<dyn Fn(&mut dyn Any, Context, Box<dyn Message>) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
struct Entry {
    name: &'static str,
    handler: ErasedHandler,
}

/// An immutable, per-actor-type map from message type to handler, built once
/// via [`RouterBuilder`] at actor-spawn time.
pub struct Router {
    by_type: HashMap<TypeId, Entry>,
    by_name: HashMap<&'static str, TypeId>,
}

impl Router {
    /// Look up by *exact* runtime type (no subtype dispatch).
    pub fn dispatch(&self, actor: &mut dyn Any, ctx: Context, msg: Box<dyn Message>) -> Option<HandlerFuture> {
        let type_id = msg.as_any().type_id();
        let entry = self.by_type.get(&type_id)?;
        Some((entry.handler)(actor, ctx, msg))
    }

    pub fn has_handler_for(&self, msg: &dyn Message) -> bool {
        self.by_type.contains_key(&msg.as_any().type_id())
    }

    /// Resolve a message type's short name to its `TypeId`, for callers that
    /// need to confirm a type is registered without dispatching to it.
    pub fn lookup_by_name(&self, name: &str) -> Result<TypeId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::NotFound(format!("no message type registered as {name:?}")))
    }
}

/// Accumulates handler registrations for one concrete actor type `A` before
/// freezing them into a [`Router`].
pub struct RouterBuilder<A: 'static> {
    entries: HashMap<TypeId, Entry>,
    by_name: HashMap<&'static str, TypeId>,
    _actor: PhantomData<fn(&mut A)>,
}

impl<A: 'static> Default for RouterBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> RouterBuilder<A> {
    pub fn new() -> Self {
        RouterBuilder {
            entries: HashMap::new(),
            by_name: HashMap::new(),
            _actor: PhantomData,
        }
    }

    /// Register `handler` for message type `M` under short name `name`.
    /// Overwrites any previously-registered handler for `M` on this builder
    /// (this is how a type's own registrations take precedence over a base's
    /// when later composed via [`RouterBuilder::merge_base`]).
    pub fn add<M, R, F, Fut>(&mut self, name: &'static str, handler: F) -> Result<()>
    where
        M: Message + Clone,
        R: Send + 'static,
        F: Fn(&mut A, Context, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let type_id = TypeId::of::<M>();
        if let Some(existing) = self.by_name.get(name) {
            if *existing != type_id {
                return Err(RuntimeError::BadRegistration(format!(
                    "short name {name:?} already bound to a different message type"
                )));
            }
        }

        let handler = Arc::new(move |actor: &mut dyn Any, ctx: Context, msg: Box<dyn Message>| -> HandlerFuture {
            let actor = actor
                .downcast_mut::<A>()
                .expect("router dispatched to the actor type it was built for");
            let typed = downcast_message::<M>(msg).unwrap_or_else(|_| {
                panic!("router TypeId lookup guarantees the payload downcasts to the registered type")
            });
            let fut = handler(actor, ctx, typed);
            Box::pin(async move {
                let reply = fut.await?;
                Ok(Box::new(reply) as Reply)
            })
        });

        self.entries.insert(type_id, Entry { name, handler });
        self.by_name.insert(name, type_id);
        Ok(())
    }

    /// Extend this builder with a base router's entries, but only for
    /// message types not already bound locally — "child overrides parent".
    pub fn merge_base(&mut self, base: &Router) {
        for (type_id, entry) in base.by_type.iter() {
            if !self.entries.contains_key(type_id) {
                self.entries.insert(*type_id, entry.clone());
                self.by_name.entry(entry.name).or_insert(*type_id);
            }
        }
    }

    pub fn build(self) -> Router {
        Router {
            by_type: self.entries,
            by_name: self.by_name,
        }
    }
}
