//! A single-process actor runtime: hierarchical identities, typed mailbox
//! dispatch, actlets and timers, and a multi-waiter primitive underneath a
//! `Core` registry.

pub mod actlet;
pub mod actor;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod identity;
pub mod message;
pub mod messages;
pub mod multiwaiter;
pub mod proxy;
pub mod router;
pub mod service;
pub mod timer;
pub mod tracker;

pub use actor::Actor;
pub use context::Context;
pub use core::Core;
pub use error::{Result, RuntimeError};
pub use identity::Identity;
pub use message::{Envelope, Message};
pub use messages::{ActletDoneMessage, ActletOutcome, ShutdownMessage, TimerConfiguration, TimerDoneMessage};
pub use proxy::Proxy;
pub use router::RouterBuilder;
