//! Actor lifecycle, mailbox dispatch loop, and built-in message handling.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use slog::Logger;
use tokio::sync::Mutex as AsyncMutex;

use crate::actlet::Actlet;
use crate::context::{Context, EnvelopeMeta};
use crate::core::Core;
use crate::error::Result;
use crate::identity::Identity;
use crate::message::downcast_message;
use crate::messages::{ActletDoneMessage, ActletOutcome, ShutdownMessage, TimerDoneMessage};
use crate::multiwaiter::MultiWaiter;
use crate::proxy::{MailboxItem, Proxy};
use crate::router::{Router, RouterBuilder};
use crate::service::Service;
use crate::tracker::{Outcome, OutcomeSender};

/// A type an actor of this kind can be constructed from and driven by.
///
/// `register_handlers` builds the per-type [`Router`] once, at spawn time.
/// `initialize` is the user override that runs before the actor is
/// considered ready; the default is a no-op.
#[async_trait]
pub trait Actor: Send + 'static {
    fn register_handlers(builder: &mut RouterBuilder<Self>)
    where
        Self: Sized;

    async fn initialize(&mut self, ctx: &Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Builds the mailbox, lifecycle signals, and router for a new actor of
/// type `A`, spawns its drive loop, and returns a [`Proxy`] to it. Called
/// by [`Core::create_actor`]; not part of the public API a handler calls
/// directly (handlers go through [`Context::create_actor`]).
///
/// The actor value is wrapped in its own `Arc<Mutex<_>>` rather than moved
/// whole into one future: `Service::run`'s setup/serve/teardown hooks are
/// three independently-constructed futures, and only one of them runs at a
/// time, so sharing the actor behind a lock (instead of threading a single
/// `&mut A` through all three, which the borrow checker can't express
/// across independently-built futures) costs an uncontended lock per
/// envelope in exchange for a signature `Service::run` can actually express.
pub(crate) fn spawn_actor<A: Actor>(core: Arc<Core>, ctx: Context, actor: A) -> Proxy {
    let (mailbox_tx, mailbox_rx) = tokio::sync::mpsc::unbounded_channel::<MailboxItem>();
    let service = Service::new();
    let actlets: Arc<AsyncMutex<HashMap<String, Actlet>>> = Arc::new(AsyncMutex::new(HashMap::new()));

    let proxy = Proxy::new(ctx.identity().clone(), mailbox_tx, service.clone());
    let base_ctx = Context::for_actor(
        core.clone(),
        ctx.log().clone(),
        ctx.identity().clone(),
        proxy.clone(),
        actlets.clone(),
    );

    let mut builder = RouterBuilder::<A>::new();
    A::register_handlers(&mut builder);
    let router = Arc::new(builder.build());

    let actor = Arc::new(AsyncMutex::new(actor));
    let identity = ctx.identity().clone();
    let log = ctx.log().clone();
    let drive_service = service.clone();

    let setup_actor = actor.clone();
    let setup_ctx = base_ctx.clone();
    let serve_actor = actor.clone();
    let serve_ctx = base_ctx;
    let serve_router = router.clone();
    let serve_actlets = actlets.clone();
    let serve_service = service.clone();

    tokio::spawn(async move {
        drive_service
            .run(
                async move {
                    let mut guard = setup_actor.lock().await;
                    guard.initialize(&setup_ctx).await
                },
                serve(serve_actor, serve_ctx, serve_router, serve_actlets, serve_service, mailbox_rx),
                teardown(core, identity, log),
            )
            .await;
    });

    proxy
}

async fn teardown(core: Arc<Core>, identity: Identity, log: Logger) {
    if let Err(e) = core.remove_actor(&identity) {
        slog::warn!(log, "actor teardown could not remove itself from the registry"; "error" => %e);
    }
}

async fn serve<A: Actor>(
    actor: Arc<AsyncMutex<A>>,
    ctx: Context,
    router: Arc<Router>,
    actlets: Arc<AsyncMutex<HashMap<String, Actlet>>>,
    service: Service,
    mailbox_rx: tokio::sync::mpsc::UnboundedReceiver<MailboxItem>,
) {
    let mailbox = Arc::new(AsyncMutex::new(mailbox_rx));
    let mut mw: MultiWaiter<&'static str> = MultiWaiter::new();

    let stop_rx = service.stop_signal();
    mw.add(
        "stop",
        Arc::new(move || {
            let mut rx = stop_rx.clone();
            Box::pin(async move {
                while !*rx.borrow() {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
                Box::new(()) as Box<dyn Any + Send>
            })
        }),
    )
    .expect("fresh multi-waiter, keys cannot collide");

    mw.add(
        "mail",
        Arc::new(move || {
            let mailbox = mailbox.clone();
            Box::pin(async move {
                let mut guard = mailbox.lock().await;
                let item = guard.recv().await;
                Box::new(item) as Box<dyn Any + Send>
            })
        }),
    )
    .expect("fresh multi-waiter, keys cannot collide");

    loop {
        let completed = mw.wait_first().await;
        if completed.contains("stop") {
            break;
        }
        if completed.contains("mail") {
            let boxed = mw.result(&"mail").expect("mail just completed");
            let item = *boxed
                .downcast::<Option<MailboxItem>>()
                .expect("mail source always yields Option<MailboxItem>");
            match item {
                None => break,
                Some((envelope, outcome_tx)) => {
                    let mut guard = actor.lock().await;
                    handle_envelope(&mut *guard, &ctx, &router, &actlets, &service, envelope, outcome_tx).await;
                }
            }
        }
    }
}

async fn handle_envelope<A: Actor>(
    actor: &mut A,
    ctx: &Context,
    router: &Router,
    actlets: &Arc<AsyncMutex<HashMap<String, Actlet>>>,
    service: &Service,
    envelope: crate::message::Envelope,
    outcome_tx: OutcomeSender,
) {
    let type_id = envelope.message.as_any().type_id();

    if type_id == TypeId::of::<ShutdownMessage>() {
        let guard = actlets.lock().await;
        for actlet in guard.values() {
            actlet.cancel();
        }
        drop(guard);
        service.stop();
        outcome_tx.resolve(Outcome::Value(Box::new(())));
        return;
    }

    if type_id == TypeId::of::<ActletDoneMessage>() {
        let done = downcast_message::<ActletDoneMessage>(envelope.message).expect("type id matched above");
        actlets.lock().await.remove(&done.actlet_name);
        if let ActletOutcome::Value(inner) = done.outcome {
            if let Some(owner) = ctx.self_proxy() {
                owner.tell_boxed(ctx, inner, None);
            }
        }
        outcome_tx.resolve(Outcome::Value(Box::new(())));
        return;
    }

    if type_id == TypeId::of::<TimerDoneMessage>() && !router.has_handler_for(&*envelope.message) {
        ctx.debug("timer done");
        outcome_tx.resolve(Outcome::Value(Box::new(())));
        return;
    }

    let derived_ctx = ctx.with_envelope(EnvelopeMeta::from(&envelope));
    match router.dispatch(actor as &mut dyn Any, derived_ctx, envelope.message) {
        None => {
            ctx.warning("message has no registered handler");
            outcome_tx.resolve(Outcome::Unhandled);
        }
        Some(fut) => match fut.await {
            Ok(reply) => outcome_tx.resolve(Outcome::Value(reply)),
            Err(e) => outcome_tx.resolve(Outcome::Exception(e)),
        },
    }
}
