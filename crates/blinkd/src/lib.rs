#![cfg_attr(docsrs, feature(doc_cfg))]

//! Server role of Blink.
//!
//! # Overview
//! This crate exposes:
//! - [`config::Config`]: runtime settings loaded from `BLINK_*` variables.
//! - [`logging`]: stderr tracing setup shared by both roles.
//! - [`endpoint::serve`]: the idle-timeout HTTP endpoint.
//! - [`content::Resource`]: conditional, ranged responses for one resource.
//!
//! # Examples
//! ```rust,no_run
//! use blink_lib::{InvocationTarget, resolve, rendezvous};
//! use blinkd::config::Config;
//! use blinkd::endpoint::serve;
//!
//! # async fn docs() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = Config::load()?;
//! let source = resolve(&InvocationTarget::Stdin, true)?;
//! let (tx, rx) = rendezvous::channel();
//! let server = tokio::spawn(async move { serve(source, &cfg, tx).await });
//! let url = rendezvous::RendezvousReceiver::recv(rx).await?;
//! println!("{url}");
//! server.await??;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod content;
pub mod endpoint;
pub mod idle;
pub mod logging;

pub use config::{Config, LaunchMode};
pub use endpoint::serve;
