//! Error taxonomy for the runtime.

use thiserror::Error;

/// All library-internal failure modes the runtime can surface.
///
/// `BadEntryPoint` and `MissingContext` are kept as unit variants for taxonomy
/// parity with the system this runtime's error model is drawn from; nothing
/// in this crate can actually construct them, since actlet entry points are
/// compiler-checked free functions and `Context` is always an explicit
/// parameter rather than something that can be "missing".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("bad registration: {0}")]
    BadRegistration(String),

    #[error("bad entry point: {0}")]
    BadEntryPoint(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("duplicate actlet: {0}")]
    DuplicateActlet(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("core is not running")]
    NotRunning,

    #[error("actor is not shut down: {0}")]
    NotShutdown(String),

    #[error("message unhandled by {0}")]
    Unhandled(String),

    #[error("missing context")]
    MissingContext,

    #[error("handler raised: {0}")]
    HandlerException(String),

    #[error("initialisation raised: {0}")]
    InitialisationException(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
