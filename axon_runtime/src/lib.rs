//! Assembly layer of the AXON runtime: process registry, named
//! endpoint wiring and logging bootstrap.
//!
//! `axon_core` provides the per-process machinery (frame loop,
//! senders, receivers); this crate puts a whole robot together from
//! declared parts:
//!
//! 1. declare every process in a [`ProcessRegistry`];
//! 2. [`Runtime::build`] instantiates them in registration order;
//! 3. wire endpoints by qualified name, directly via
//!    [`Runtime::connect`] or from a TOML [`WiringConfig`];
//! 4. [`Runtime::start`] spawns one service thread per process.
//!
//! ```no_run
//! use axon_core::prelude::*;
//! use axon_runtime::{ConfigLoader, ProcessRegistry, Runtime, WiringConfig};
//!
//! struct Balance {
//!     request: Receiver<f32>,
//! }
//!
//! impl Process for Balance {
//!     fn run_cycle(&mut self) -> FrameDirective {
//!         FrameDirective::Periodic(std::time::Duration::from_millis(10))
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     axon_runtime::trace::init(axon_runtime::LogLevel::Info);
//!
//!     let mut registry = ProcessRegistry::new();
//!     registry.register("Motion", Priority::Fifo(10), |ctx| {
//!         Box::new(Balance {
//!             request: Receiver::new(ctx.core(), "MotionRequest.I", true),
//!         })
//!     });
//!
//!     let mut runtime = Runtime::build(registry);
//!     let wiring = WiringConfig::load("wiring.toml".as_ref())?;
//!     wiring.validate()?;
//!     runtime.connect_from(&wiring)?;
//!     runtime.start()?;
//!     runtime.join();
//!     Ok(())
//! }
//! ```

pub mod registry;
pub mod trace;
pub mod wiring;

pub use registry::{ProcessContext, ProcessRegistry, Runtime, WiringError};
pub use trace::LogLevel;
pub use wiring::{ConfigError, ConfigLoader, Link, WiringConfig};
