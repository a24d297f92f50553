//! Built-in message types every [`crate::actor::Actor`] understands.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Sent to an actor to begin orderly shutdown: cancel every actlet, then
/// stop the actor's [`crate::service::Service`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ShutdownMessage;

/// Sent by the timer actlet driver on normal completion of its repeat count.
/// Never emitted on cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TimerDoneMessage;

/// The outcome an actlet reports back to its owner. Every termination path
/// — success, failure, or cancellation — produces one of these, so the
/// owner's actlets map always clears regardless of how the actlet ended.
pub enum ActletOutcome {
    Value(Box<dyn Message>),
    Failed(String),
    Cancelled,
}

impl ActletOutcome {
    fn duplicate(&self) -> ActletOutcome {
        match self {
            ActletOutcome::Value(m) => ActletOutcome::Value(m.clone_message()),
            ActletOutcome::Failed(s) => ActletOutcome::Failed(s.clone()),
            ActletOutcome::Cancelled => ActletOutcome::Cancelled,
        }
    }
}

impl fmt::Debug for ActletOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActletOutcome::Value(m) => write!(f, "ActletOutcome::Value({})", m.type_name()),
            ActletOutcome::Failed(e) => write!(f, "ActletOutcome::Failed({e})"),
            ActletOutcome::Cancelled => write!(f, "ActletOutcome::Cancelled"),
        }
    }
}

/// Posted by the actlet supervisor task to the owning actor once the actlet
/// has terminated, by whatever path. This type implements [`Message`] by
/// hand rather than via the blanket impl, since its `outcome` field holds a
/// type-erased `Box<dyn Message>` that cannot itself derive `Serialize`.
pub struct ActletDoneMessage {
    pub actlet_name: String,
    pub outcome: ActletOutcome,
}

impl Clone for ActletDoneMessage {
    fn clone(&self) -> Self {
        ActletDoneMessage {
            actlet_name: self.actlet_name.clone(),
            outcome: self.outcome.duplicate(),
        }
    }
}

impl fmt::Debug for ActletDoneMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActletDoneMessage")
            .field("actlet_name", &self.actlet_name)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl Message for ActletDoneMessage {
    fn clone_message(&self) -> Box<dyn Message> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        "ActletDoneMessage"
    }
}

/// Configuration for the generic timer actlet driver.
/// `repetitions == 0` means unbounded, regardless of `now`.
#[derive(Debug, Clone)]
pub struct TimerConfiguration<M: Message + Clone> {
    pub message: M,
    pub interval: Duration,
    pub delay: Duration,
    pub now: bool,
    pub repetitions: u64,
}

impl<M: Message + Clone> TimerConfiguration<M> {
    pub fn new(message: M, interval: Duration) -> Self {
        TimerConfiguration {
            message,
            interval,
            delay: Duration::ZERO,
            now: false,
            repetitions: 0,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_now(mut self, now: bool) -> Self {
        self.now = now;
        self
    }

    pub fn with_repetitions(mut self, repetitions: u64) -> Self {
        self.repetitions = repetitions;
        self
    }
}
