//! Prelude module for common re-exports.
//!
//! Consumers can do `use axon_core::prelude::*;` and get the most
//! important types without listing individual paths.

// ─── Signals & Limits ───────────────────────────────────────────────
pub use crate::consts::{CONTROL_SIGNAL, NAME_LENGTH_MAX, RECEIVERS_MAX, TIMER_SIGNAL};
pub use crate::signal::{SignalId, SignalSet};

// ─── Threads ────────────────────────────────────────────────────────
pub use crate::thread::{Priority, RunFlag, ServiceThread};

// ─── Endpoints ──────────────────────────────────────────────────────
pub use crate::endpoint::{
    CodecError, EndpointInfo, EndpointKind, FrameHook, Package, PackageSink, Payload, Receiver,
    Sender,
};

// ─── Processes ──────────────────────────────────────────────────────
pub use crate::process::{FrameDirective, FrameStats, Process, ProcessCore};
pub use crate::runner::ProcessRunner;
