//! AXON Core
//!
//! Frame-synchronized inter-module communication substrate for the
//! AXON robot-control runtime: a small number of concurrently
//! executing processes (one dedicated thread each) exchange typed data
//! packages through named publish/subscribe endpoints, with
//! deterministic per-cycle delivery and optional blocking
//! synchronization between producer and consumer cadence.
//!
//! # Module Structure
//!
//! - [`signal`] - Growable bitset for block/event scheduling masks
//! - [`thread`] - Service thread with cooperative stop and RT priority
//! - [`endpoint`] - Sender/Receiver endpoint family and the package
//!   serialization boundary
//! - [`process`] - Process core: mask handshake, wake timer, cycle
//!   contract
//! - [`runner`] - Per-process frame loop
//! - [`consts`] - System-wide limits and reserved signal ids
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use axon_core::prelude::*;
//! use std::time::Duration;
//!
//! struct Heartbeat {
//!     out: Sender<u32>,
//!     beats: u32,
//! }
//!
//! impl Process for Heartbeat {
//!     fn run_cycle(&mut self) -> FrameDirective {
//!         self.beats += 1;
//!         self.out.set(self.beats);
//!         self.out.send();
//!         FrameDirective::Periodic(Duration::from_millis(10))
//!     }
//! }
//! ```

pub mod consts;
pub mod endpoint;
pub mod prelude;
pub mod process;
pub mod runner;
pub mod signal;
pub mod thread;
