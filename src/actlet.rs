//! Named, owned sub-tasks of an actor.
//!
//! Every actlet runs behind two tasks: an inner worker running the user's
//! function, and a supervisor that `.await`s the worker's `JoinHandle` and
//! unconditionally reports the outcome back to the owner. The supervisor is
//! what makes "always post completion, even on cancellation" true: a
//! `tokio::task::AbortHandle::abort()` call terminates the worker task
//! without giving code *inside* it a chance to run further, so the
//! completion report has to come from an external observer instead.

use std::future::Future;

use tokio::task::AbortHandle;

use crate::context::Context;
use crate::error::Result;
use crate::messages::{ActletDoneMessage, ActletOutcome};
use crate::message::Message;
use crate::proxy::Proxy;

/// A handle to one in-flight actlet, held by the owning actor under its name.
pub struct Actlet {
    name: String,
    abort_handle: AbortHandle,
}

impl Actlet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aborts the worker task. Does not itself post anything; the
    /// supervisor task observes the resulting `JoinError` and posts the
    /// `Cancelled` outcome on the owner's behalf.
    pub fn cancel(&self) {
        self.abort_handle.abort();
    }
}

/// Spawns `function(ctx, owner, configuration)` as a new actlet named
/// `name`, owned by `owner`. `R` is the message type posted back on normal
/// completion.
pub fn spawn<C, R, F, Fut>(ctx: Context, owner: Proxy, name: String, configuration: C, function: F) -> Actlet
where
    C: Clone + Send + 'static,
    R: Message,
    F: FnOnce(Context, Proxy, C) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let worker_ctx = ctx.clone();
    let worker_owner = owner.clone();
    let worker = tokio::spawn(async move { function(worker_ctx, worker_owner, configuration).await });
    let abort_handle = worker.abort_handle();

    let supervisor_name = name.clone();
    tokio::spawn(async move {
        let outcome = match worker.await {
            Ok(Ok(value)) => ActletOutcome::Value(Box::new(value)),
            Ok(Err(e)) => ActletOutcome::Failed(e.to_string()),
            Err(join_err) if join_err.is_cancelled() => ActletOutcome::Cancelled,
            Err(join_err) => ActletOutcome::Failed(join_err.to_string()),
        };
        let done = ActletDoneMessage {
            actlet_name: supervisor_name,
            outcome,
        };
        let _ = owner.tell(&ctx, done, None);
    });

    Actlet { name, abort_handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Core;
    use crate::error::RuntimeError;
    use crate::identity::Identity;
    use crate::tracker::Outcome;
    use serde::{Deserialize, Serialize};
    use crate::service::Service;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Done(String);

    fn harness() -> (Context, Proxy, mpsc::UnboundedReceiver<crate::proxy::MailboxItem>) {
        let core = Core::new(slog::Logger::root(slog::Discard, slog::o!()));
        let ctx = Context::root(core, slog::Logger::root(slog::Discard, slog::o!()));
        let (tx, rx) = mpsc::unbounded_channel();
        let owner = Proxy::new(Identity::root(), tx, Service::new());
        (ctx, owner, rx)
    }

    #[tokio::test]
    async fn normal_completion_posts_value_outcome() {
        let (ctx, owner, mut rx) = harness();
        spawn(ctx, owner, "work".into(), (), |_ctx, _owner, _cfg: ()| async {
            Ok(Done("finished".into()))
        });

        let (envelope, tx) = rx.recv().await.expect("actlet posted back");
        let done = crate::message::downcast_message::<ActletDoneMessage>(envelope.message).unwrap();
        assert_eq!(done.actlet_name, "work");
        assert!(matches!(done.outcome, ActletOutcome::Value(_)));
        tx.resolve(Outcome::Unhandled);
    }

    #[tokio::test]
    async fn cancellation_still_posts_completion() {
        let (ctx, owner, mut rx) = harness();
        let actlet = spawn(ctx, owner, "work".into(), (), |_ctx, _owner, _cfg: ()| async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(Done("unreachable".into()))
        });
        actlet.cancel();

        let (envelope, tx) = rx.recv().await.expect("actlet posted back despite cancellation");
        let done = crate::message::downcast_message::<ActletDoneMessage>(envelope.message).unwrap();
        assert!(matches!(done.outcome, ActletOutcome::Cancelled));
        tx.resolve(Outcome::Unhandled);
    }

    #[tokio::test]
    async fn handler_error_posts_failed_outcome() {
        let (ctx, owner, mut rx) = harness();
        spawn(ctx, owner, "work".into(), (), |_ctx, _owner, _cfg: ()| async {
            Err::<Done, _>(RuntimeError::HandlerException("boom".into()))
        });

        let (envelope, tx) = rx.recv().await.expect("actlet posted back");
        let done = crate::message::downcast_message::<ActletDoneMessage>(envelope.message).unwrap();
        assert!(matches!(done.outcome, ActletOutcome::Failed(_)));
        tx.resolve(Outcome::Unhandled);
    }
}
