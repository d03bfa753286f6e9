//! Shared types for the Blink project.
//!
//! This library defines the pieces both process roles agree on: how the
//! invocation target is resolved into servable content, the one-shot channel
//! the background server uses to report its address, and the environment
//! marker that tells a process which role it plays.

pub mod error;
pub mod rendezvous;
pub mod role;
pub mod source;
pub mod target;

pub use error::BlinkError;
pub use role::{DEBUG_VAR, EnvSource, MARKER_VAR, ProcessEnv, Role, debug_enabled};
pub use source::{Content, ContentSource, resolve, resolve_with};
pub use target::InvocationTarget;
