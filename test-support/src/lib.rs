//! Test support utilities shared by the workspace crates.
//!
//! - [`env_guard::EnvVarGuard`] scopes environment changes to a test.
//! - [`util`] creates temporary inputs and polls HTTP endpoints.

pub mod env_guard;
pub mod util;

pub use env_guard::EnvVarGuard;
pub use util::{
    POLL_DELAY, POLL_TRIES, http_client, input_file, socket_addr, wait_for_refusal,
};
