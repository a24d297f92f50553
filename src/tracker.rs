//! One-shot outcome tracking for a posted envelope.

use std::any::Any;
use std::fmt;

use tokio::sync::oneshot;

use crate::error::RuntimeError;

/// Whatever a handler returned, boxed up so the tracker doesn't need to know
/// the concrete return type ahead of time. The caller of `ask` downcasts to
/// the type it expects.
pub type Reply = Box<dyn Any + Send>;

/// Terminal outcome of dispatching one envelope to a handler: a value, a
/// propagated handler exception, or an explicit unhandled marker.
pub enum Outcome {
    Value(Reply),
    Exception(RuntimeError),
    Unhandled,
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(_) => write!(f, "Outcome::Value(..)"),
            Outcome::Exception(e) => write!(f, "Outcome::Exception({e:?})"),
            Outcome::Unhandled => write!(f, "Outcome::Unhandled"),
        }
    }
}

impl Outcome {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Outcome::Unhandled)
    }
}

/// The sending half held by `Actor::post`; resolved exactly once.
pub struct OutcomeSender(oneshot::Sender<Outcome>);

impl OutcomeSender {
    pub fn resolve(self, outcome: Outcome) {
        // A dropped receiver (caller no longer cares about the tracker) is not
        // an error here; the handler still ran exactly once.
        let _ = self.0.send(outcome);
    }
}

/// A one-shot future for a handler's outcome.
pub struct EnvelopeTracker {
    rx: oneshot::Receiver<Outcome>,
}

impl EnvelopeTracker {
    pub fn pair() -> (OutcomeSender, EnvelopeTracker) {
        let (tx, rx) = oneshot::channel();
        (OutcomeSender(tx), EnvelopeTracker { rx })
    }

    /// Await the terminal outcome. Fails with [`RuntimeError::NotFound`] only
    /// if the sending half was dropped without resolving, which cannot
    /// happen on the path this crate drives (every dispatch resolves its
    /// tracker before the handling task exits).
    pub async fn wait(self) -> Outcome {
        self.rx
            .await
            .unwrap_or(Outcome::Exception(RuntimeError::NotFound(
                "tracker dropped without resolution".into(),
            )))
    }
}
