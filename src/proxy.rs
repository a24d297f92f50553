//! Addressed handle to a live actor.

use tokio::sync::mpsc;

use crate::context::Context;
use crate::error::{Result, RuntimeError};
use crate::identity::Identity;
use crate::message::{Envelope, Message};
use crate::service::Service;
use crate::tracker::{EnvelopeTracker, Outcome, OutcomeSender, Reply};

/// One item on an actor's mailbox: the envelope plus the sender half of the
/// tracker its poster is waiting on.
pub type MailboxItem = (Envelope, OutcomeSender);

/// A lightweight, cloneable handle to one actor's mailbox and lifecycle
/// signals. The only sends are `tell` and `ask`; there is no dynamic
/// attribute-sugar surface. Lifecycle queries (`wait_until_initialized`,
/// `wait_until_shutdown`) delegate straight to the actor's own [`Service`],
/// so a failed `initialize` is re-raised rather than hanging a waiter
/// forever.
#[derive(Clone)]
pub struct Proxy {
    identity: Identity,
    mailbox: mpsc::UnboundedSender<MailboxItem>,
    service: Service,
}

impl Proxy {
    pub fn new(identity: Identity, mailbox: mpsc::UnboundedSender<MailboxItem>, service: Service) -> Self {
        Proxy {
            identity,
            mailbox,
            service,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Wraps `message` into an envelope addressed from `ctx`'s identity to
    /// this proxy's actor, posts it, and returns the tracker. Never fails:
    /// the mailbox is unbounded; only a dead receiver (actor already
    /// shut down) produces a pre-resolved `NotFound` tracker.
    pub fn tell<M: Message>(&self, ctx: &Context, message: M, reply_to: Option<Identity>) -> EnvelopeTracker {
        self.tell_boxed(ctx, Box::new(message), reply_to)
    }

    /// As [`Proxy::tell`], for an already type-erased message. Used by the
    /// `ActletDoneMessage` built-in handler, which only has a
    /// `Box<dyn Message>` to forward.
    pub fn tell_boxed(&self, ctx: &Context, message: Box<dyn Message>, reply_to: Option<Identity>) -> EnvelopeTracker {
        let mut envelope = Envelope::new(ctx.identity().clone(), self.identity.clone(), message);
        if let Some(reply_to) = reply_to {
            envelope = envelope.with_reply_to(reply_to);
        }
        self.post_envelope(envelope)
    }

    /// Posts an already-constructed envelope, deep-copying it first so the
    /// sender's subsequent mutation of its own copy can never be observed
    /// by the receiver.
    pub fn post_envelope(&self, envelope: Envelope) -> EnvelopeTracker {
        let envelope = envelope.deep_copy();
        let (tx, tracker) = EnvelopeTracker::pair();
        if self.mailbox.send((envelope, tx)).is_err() {
            let (tx, tracker) = EnvelopeTracker::pair();
            tx.resolve(Outcome::Exception(RuntimeError::NotFound(format!(
                "actor {} is no longer accepting mail",
                self.identity
            ))));
            return tracker;
        }
        tracker
    }

    /// `tell` followed by awaiting the tracker; turns `Unhandled` into
    /// `RuntimeError::Unhandled` and unboxes a successful reply into `R`.
    pub async fn ask<M: Message, R: 'static>(&self, ctx: &Context, message: M) -> Result<R> {
        let tracker = self.tell(ctx, message, None);
        match tracker.wait().await {
            Outcome::Value(v) => downcast_reply::<R>(v, &self.identity),
            Outcome::Exception(e) => Err(e),
            Outcome::Unhandled => Err(RuntimeError::Unhandled(self.identity.to_string())),
        }
    }

    /// Blocks until `initialize` has run, re-raising its exception if it
    /// failed.
    pub async fn wait_until_initialized(&self) -> Result<()> {
        self.service.wait_ready().await
    }

    pub async fn wait_until_shutdown(&self) {
        self.service.wait().await
    }

    pub fn is_shutdown(&self) -> bool {
        self.service.done()
    }
}

fn downcast_reply<R: 'static>(reply: Reply, identity: &Identity) -> Result<R> {
    reply
        .downcast::<R>()
        .map(|b| *b)
        .map_err(|_| RuntimeError::HandlerException(format!("reply from {identity} was not of the expected type")))
}
