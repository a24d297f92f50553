//! Messages and envelopes.
//!
//! A [`Message`] is any owned, cloneable, JSON-round-trippable Rust value.
//! The blanket impl mirrors the reference actor framework's own
//! `Message: Debug + Clone + Send + 'static` blanket (`src/lib.rs`): nothing
//! is special about a message type beyond the bounds it already satisfies.

use std::any::Any;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::Identity;

/// A message that can be posted to an actor.
///
/// `Serialize + DeserializeOwned` gives every message type round-trippable
/// JSON, even though this crate does not ship a wire transport for it.
pub trait Message: Debug + Send + 'static {
    /// Duplicate this message behind a fresh, independently owned box.
    ///
    /// Used by [`Actor::post`](crate::actor::Actor) to deep-copy an envelope
    /// at post time: the sender's subsequent mutation of its own copy must
    /// not be observable by the receiver.
    fn clone_message(&self) -> Box<dyn Message>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Short type name used by the router's name lookup table.
    fn type_name(&self) -> &'static str;
}

impl<T> Message for T
where
    T: Debug + Clone + Send + Serialize + DeserializeOwned + 'static,
{
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
        std::any::type_name::<T>()
    }
}

/// Attempt to downcast a boxed message into a concrete type, consuming the box.
pub fn downcast_message<T: 'static>(msg: Box<dyn Message>) -> Result<T, Box<dyn Message>> {
    if msg.as_any().is::<T>() {
        Ok(*msg.into_any().downcast::<T>().expect("type checked above"))
    } else {
        Err(msg)
    }
}

/// Box up a concrete message value as a type-erased [`Message`].
pub fn box_message<T: Message>(msg: T) -> Box<dyn Message> {
    Box::new(msg)
}

/// Immutable delivery metadata plus payload wrapping one posted [`Message`].
#[derive(Debug)]
pub struct Envelope {
    pub id: String,
    pub sender: Identity,
    pub receiver: Identity,
    pub message: Box<dyn Message>,
    pub reply_to: Option<Identity>,
}

impl Envelope {
    pub fn new(sender: Identity, receiver: Identity, message: Box<dyn Message>) -> Self {
        Envelope {
            id: Uuid::new_v4().to_string(),
            sender,
            receiver,
            message,
            reply_to: None,
        }
    }

    pub fn with_reply_to(mut self, reply_to: Identity) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Deep-copy this envelope, generating a fresh id for the copy but
    /// preserving sender/receiver/reply_to.
    pub fn deep_copy(&self) -> Envelope {
        Envelope {
            id: Uuid::new_v4().to_string(),
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            message: self.message.clone_message(),
            reply_to: self.reply_to.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct DataMessage {
        data: String,
    }

    #[test]
    fn clone_message_is_independent() {
        let original = DataMessage { data: "a".into() };
        let boxed: Box<dyn Message> = box_message(original.clone());
        let mut copy = boxed.clone_message();
        let copy_concrete = downcast_message::<DataMessage>(copy).unwrap();
        assert_eq!(copy_concrete, original);
        copy = box_message(DataMessage { data: "mutated".into() });
        assert_eq!(downcast_message::<DataMessage>(copy).unwrap().data, "mutated");
    }

    #[test]
    fn downcast_wrong_type_fails() {
        let boxed: Box<dyn Message> = box_message(DataMessage { data: "a".into() });
        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Other;
        assert!(downcast_message::<Other>(boxed).is_err());
    }

    #[test]
    fn envelope_deep_copy_has_fresh_id() {
        let sender = Identity::root();
        let receiver = Identity::join(&sender, "a").unwrap();
        let env = Envelope::new(sender, receiver, box_message(DataMessage { data: "a".into() }));
        let copy = env.deep_copy();
        assert_ne!(env.id, copy.id);
        assert_eq!(env.receiver, copy.receiver);
    }
}
