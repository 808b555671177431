//! System-wide constants for the AXON workspace.
//!
//! Single source of truth for all numeric limits of the process
//! framework. Imported by all crates — no duplication permitted.

use std::time::Duration;

use crate::signal::SignalId;

/// Signal id reserved for the per-process wake timer.
///
/// The id allocator skips this value, so endpoint signals and the timer
/// channel can never collide even though the signal set itself is
/// unbounded.
pub const TIMER_SIGNAL: SignalId = 31;

/// Signal id of the debug/control channel.
///
/// An event on this channel always advances the owning process,
/// regardless of the block mask.
pub const CONTROL_SIGNAL: SignalId = 0;

/// Maximum number of receivers connected to a single sender.
///
/// Hard capacity limit: exceeding it at wiring time is a configuration
/// defect and terminates the process.
pub const RECEIVERS_MAX: usize = 20;

/// Maximum length of a qualified endpoint name (`"Process.Endpoint"`).
pub const NAME_LENGTH_MAX: usize = 80;

/// Courtesy delay between frame-loop iterations, leaving processing
/// time to the other process threads.
pub const COURTESY_SLEEP: Duration = Duration::from_micros(1000);

static_assertions::const_assert!(RECEIVERS_MAX > 0);
static_assertions::const_assert!(NAME_LENGTH_MAX >= 16);
static_assertions::const_assert!(TIMER_SIGNAL != CONTROL_SIGNAL);
