//! Process core: scheduling masks, wake timer and the cycle contract.
//!
//! A *process* is one thread of execution with its own cycle cadence.
//! Its [`ProcessCore`] owns the pair of scheduling masks that implement
//! the bitmask handshake between independently clocked threads:
//!
//! - the **block mask** names the signals whose readiness is required
//!   before the next frame may run;
//! - the **event mask** accumulates the signals that became ready
//!   during the current frame.
//!
//! Becoming ready is what advances the schedule: [`ProcessCore::signal_ready`]
//! reports when the last required signal arrived, and the frame loop
//! (which runs on the owning thread) then executes one frame. There is
//! no separate poll.
//!
//! Application logic plugs in through the [`Process`] trait: one
//! [`Process::run_cycle`] call per frame, returning a [`FrameDirective`]
//! that decides when the next frame is due.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::consts::TIMER_SIGNAL;
use crate::endpoint::{EndpointInfo, EndpointKind, FrameHook};
use crate::signal::{SignalId, SignalSet};
use crate::thread::Priority;

/// Scheduling decision returned by one frame of application logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirective {
    /// Purely reactive: no timer is armed, the process runs again only
    /// when an external signal arrives.
    External,
    /// One-shot minimum delay before the next frame.
    OneShot(Duration),
    /// Fixed-period clock with drift correction: the given duration is
    /// the time between two frame starts, not a delay after the frame.
    Periodic(Duration),
}

/// Application extension point: one process's logic for a single cycle.
///
/// Implementors own their typed senders and receivers; the frame loop
/// calls [`Process::run_cycle`] exactly once per frame, never
/// concurrently and never re-entrantly.
pub trait Process: Send {
    /// Execute one cycle of application logic.
    fn run_cycle(&mut self) -> FrameDirective;

    /// Best-effort cleanup, called exactly once when the frame loop
    /// exits. No delivery guarantees apply afterwards.
    fn terminate(&mut self) {}
}

/// O(1) per-frame timing statistics, updated without allocation.
#[derive(Debug, Clone)]
pub struct FrameStats {
    /// Total frames executed.
    pub frames: u64,
    /// Last frame duration.
    pub last: Duration,
    /// Minimum frame duration.
    pub min: Duration,
    /// Maximum frame duration.
    pub max: Duration,
    /// Running sum for average computation.
    sum: Duration,
    /// Frames that exceeded their periodic budget.
    pub overruns: u64,
}

impl FrameStats {
    const fn new() -> Self {
        Self {
            frames: 0,
            last: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
            sum: Duration::ZERO,
            overruns: 0,
        }
    }

    fn record(&mut self, duration: Duration, overrun: bool) {
        self.frames += 1;
        self.last = duration;
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
        self.sum += duration;
        if overrun {
            self.overruns += 1;
        }
    }

    /// Average frame duration (zero before the first frame).
    pub fn avg(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.sum / self.frames as u32
        }
    }
}

/// Mask pair, id allocator and wake timer, guarded by one mutex.
struct SchedState {
    /// Signals whose readiness gates the next frame.
    block: SignalSet,
    /// Signals that became ready during the current frame.
    event: SignalSet,
    /// Monotonic endpoint signal allocator; skips [`TIMER_SIGNAL`].
    next_signal: SignalId,
    /// Absolute wake deadline, if a timer is armed.
    sleep_until: Option<Instant>,
    /// Drift-correction reference for periodic scheduling.
    cycle_anchor: Instant,
}

/// Type-erased endpoint lists, in registration order. Senders and
/// receivers are kept apart because the frame loop polls all senders
/// before any receiver.
#[derive(Default)]
struct HookLists {
    senders: Vec<Arc<dyn FrameHook>>,
    receivers: Vec<Arc<dyn FrameHook>>,
}

/// Shared core of one process.
///
/// Created once per declared process and shared (`Arc`) between the
/// owning frame loop, the process's own endpoints, and remote senders
/// delivering into its receivers. All mask mutation is lock-guarded;
/// the lock is strictly non-reentrant.
pub struct ProcessCore {
    name: String,
    priority: Priority,
    sched: Mutex<SchedState>,
    hooks: Mutex<HookLists>,
    stats: Mutex<FrameStats>,
    in_cycle: AtomicBool,
}

impl ProcessCore {
    /// Create a core for the process `name` with an advisory priority.
    ///
    /// # Panics
    /// Panics if `name` contains a dot: qualified endpoint names split
    /// at the first dot, so the process part must not carry one.
    pub fn new(name: &str, priority: Priority) -> Arc<Self> {
        if name.contains('.') {
            panic!("process name '{name}' must not contain '.'");
        }
        Arc::new(Self {
            name: name.to_string(),
            priority,
            sched: Mutex::new(SchedState {
                block: SignalSet::new(),
                event: SignalSet::new(),
                next_signal: 0,
                sleep_until: None,
                cycle_anchor: Instant::now(),
            }),
            hooks: Mutex::new(HookLists::default()),
            stats: Mutex::new(FrameStats::new()),
            in_cycle: AtomicBool::new(false),
        })
    }

    /// The process name, unique within one runtime.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The advisory thread priority declared for this process.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Allocate a fresh signal id for an endpoint.
    ///
    /// Ids are handed out in construction order and never reused;
    /// [`TIMER_SIGNAL`] is skipped so the timer channel stays reserved.
    pub fn next_signal_id(&self) -> SignalId {
        let mut s = self.sched.lock();
        if s.next_signal == TIMER_SIGNAL {
            s.next_signal += 1;
        }
        let id = s.next_signal;
        s.next_signal += 1;
        id
    }

    /// Register an endpoint hook. Endpoints are constructed with their
    /// process and never detached afterwards.
    pub(crate) fn register_hook(&self, hook: Arc<dyn FrameHook>) {
        let mut lists = self.hooks.lock();
        match hook.info().kind() {
            EndpointKind::Sender => lists.senders.push(hook),
            EndpointKind::Receiver => lists.receivers.push(hook),
        }
    }

    /// Snapshot of the sender hooks, registration order.
    pub(crate) fn sender_hooks(&self) -> Vec<Arc<dyn FrameHook>> {
        self.hooks.lock().senders.clone()
    }

    /// Snapshot of the receiver hooks, registration order.
    pub(crate) fn receiver_hooks(&self) -> Vec<Arc<dyn FrameHook>> {
        self.hooks.lock().receivers.clone()
    }

    /// Find an endpoint of the given kind by its unqualified name.
    pub fn find_endpoint(&self, kind: EndpointKind, name: &str) -> Option<Arc<dyn FrameHook>> {
        let lists = self.hooks.lock();
        let list = match kind {
            EndpointKind::Sender => &lists.senders,
            EndpointKind::Receiver => &lists.receivers,
        };
        list.iter().find(|h| h.info().name() == name).cloned()
    }

    /// Descriptors of every endpoint attached to this process.
    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        let lists = self.hooks.lock();
        lists
            .senders
            .iter()
            .chain(lists.receivers.iter())
            .map(|h| h.info().clone())
            .collect()
    }

    /// Set or clear bit `id` in the block mask.
    pub fn set_blocking(&self, id: SignalId, block: bool) {
        let mut s = self.sched.lock();
        if block {
            s.block.set(id);
        } else {
            s.block.clear(id);
        }
    }

    /// Record that signal `id` became ready.
    ///
    /// Returns `true` when this readiness advances the schedule: either
    /// `id` is the always-accepted control channel, or the event mask
    /// now covers a non-empty block mask. In that case the block mask
    /// has been cleared atomically and the caller — the frame loop on
    /// the owning thread — must run one frame.
    #[must_use]
    pub fn signal_ready(&self, id: SignalId) -> bool {
        let mut s = self.sched.lock();
        s.event.set(id);
        let fire = id == crate::consts::CONTROL_SIGNAL
            || (!s.block.is_empty() && s.event.covers(&s.block));
        if fire {
            s.block.clear_all();
        }
        fire
    }

    /// Fire the timer signal if a wake deadline was set and has passed.
    ///
    /// Returns `true` when the timer readiness triggered a frame.
    #[must_use]
    pub fn check_timer(&self) -> bool {
        let due = {
            let mut s = self.sched.lock();
            match s.sleep_until {
                Some(deadline) if deadline <= Instant::now() => {
                    s.sleep_until = None;
                    true
                }
                _ => false,
            }
        };
        // signal_ready reacquires the lock; it must not nest.
        due && self.signal_ready(TIMER_SIGNAL)
    }

    /// Whether the process still waits for at least one block condition.
    pub fn is_waiting(&self) -> bool {
        !self.sched.lock().block.is_empty()
    }

    /// The currently armed wake deadline, if any.
    pub fn next_wake(&self) -> Option<Instant> {
        self.sched.lock().sleep_until
    }

    /// Close one frame: reset the event mask, arm the wake timer from
    /// the directive, and gate the next frame on the timer channel
    /// exactly when the directive is non-reactive.
    pub fn finish_frame(&self, directive: FrameDirective) {
        let now = Instant::now();
        let mut s = self.sched.lock();
        s.event.clear_all();
        match directive {
            FrameDirective::External => {
                s.sleep_until = None;
                s.block.clear(TIMER_SIGNAL);
            }
            FrameDirective::OneShot(delay) => {
                s.sleep_until = Some(now + delay);
                s.block.set(TIMER_SIGNAL);
            }
            FrameDirective::Periodic(period) => {
                let target = s.cycle_anchor + period;
                if target <= now {
                    // Fell behind: resynchronize instead of bursting
                    // extra frames to catch up.
                    debug!(process = %self.name, "cycle overran its period, resynchronizing");
                    s.sleep_until = Some(now);
                    s.cycle_anchor = now;
                } else {
                    s.sleep_until = Some(target);
                    s.cycle_anchor = target;
                }
                s.block.set(TIMER_SIGNAL);
            }
        }
    }

    /// Mark the start of a frame. Re-entrant frame execution is a
    /// wiring defect, not a recoverable condition.
    pub(crate) fn begin_cycle(&self) {
        if self.in_cycle.swap(true, Ordering::AcqRel) {
            panic!("re-entrant frame execution on process '{}'", self.name);
        }
    }

    /// Mark the end of a frame and record its duration.
    pub(crate) fn end_cycle(&self, duration: Duration, overrun: bool) {
        self.stats.lock().record(duration, overrun);
        self.in_cycle.store(false, Ordering::Release);
    }

    /// Snapshot of this process's frame statistics.
    pub fn frame_stats(&self) -> FrameStats {
        self.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CONTROL_SIGNAL;

    fn core() -> Arc<ProcessCore> {
        ProcessCore::new("Test", Priority::Normal)
    }

    #[test]
    fn signal_allocator_skips_timer_channel() {
        let c = core();
        let mut seen = Vec::new();
        for _ in 0..40 {
            seen.push(c.next_signal_id());
        }
        assert_eq!(seen[0], 0);
        assert!(!seen.contains(&TIMER_SIGNAL));
        // Still strictly increasing.
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ready_fires_only_when_block_mask_is_covered() {
        let c = core();
        c.set_blocking(3, true);
        c.set_blocking(5, true);
        assert!(!c.signal_ready(3));
        assert!(c.is_waiting());
        assert!(c.signal_ready(5));
        // Block mask was cleared atomically by the trigger.
        assert!(!c.is_waiting());
    }

    #[test]
    fn control_signal_always_fires() {
        let c = core();
        c.set_blocking(7, true);
        assert!(c.signal_ready(CONTROL_SIGNAL));
        assert!(!c.is_waiting());
    }

    #[test]
    fn no_fire_with_empty_block_mask() {
        let c = core();
        assert!(!c.signal_ready(4));
    }

    #[test]
    fn periodic_wakes_are_drift_corrected() {
        let c = core();
        let period = Duration::from_millis(50);
        c.finish_frame(FrameDirective::Periodic(period));
        let w1 = c.next_wake().unwrap();
        c.finish_frame(FrameDirective::Periodic(period));
        let w2 = c.next_wake().unwrap();
        c.finish_frame(FrameDirective::Periodic(period));
        let w3 = c.next_wake().unwrap();
        // Exact spacing: targets accumulate from the anchor, wall time
        // spent between calls does not compound into the schedule.
        assert_eq!(w2 - w1, period);
        assert_eq!(w3 - w2, period);
    }

    #[test]
    fn overrun_resynchronizes_instead_of_bursting() {
        let c = core();
        let period = Duration::from_millis(5);
        c.finish_frame(FrameDirective::Periodic(period));
        std::thread::sleep(Duration::from_millis(20));
        let before = Instant::now();
        c.finish_frame(FrameDirective::Periodic(period));
        let wake = c.next_wake().unwrap();
        // Next wake is immediate, not a burst of missed periods.
        assert!(wake >= before);
        assert!(wake <= Instant::now());
        // And the schedule restarts from "now".
        c.finish_frame(FrameDirective::Periodic(period));
        let next = c.next_wake().unwrap();
        assert!(next > wake);
        assert!(next - wake <= period);
    }

    #[test]
    fn timer_block_bit_tracks_directive() {
        let c = core();
        c.finish_frame(FrameDirective::OneShot(Duration::from_millis(1)));
        assert!(c.is_waiting());
        c.finish_frame(FrameDirective::External);
        assert!(!c.is_waiting());
        assert!(c.next_wake().is_none());
        // A clocked process stays gated on the timer channel after
        // every frame, not just the first one.
        c.finish_frame(FrameDirective::Periodic(Duration::from_millis(10)));
        assert!(c.is_waiting());
        assert!(c.next_wake().is_some());
        c.finish_frame(FrameDirective::Periodic(Duration::from_millis(10)));
        assert!(c.is_waiting());
    }

    #[test]
    fn check_timer_fires_after_deadline() {
        let c = core();
        c.finish_frame(FrameDirective::OneShot(Duration::from_millis(1)));
        assert!(!c.check_timer());
        std::thread::sleep(Duration::from_millis(3));
        assert!(c.check_timer());
        // Deadline is consumed.
        assert!(c.next_wake().is_none());
        assert!(!c.check_timer());
    }

    #[test]
    #[should_panic(expected = "must not contain")]
    fn dotted_process_name_is_rejected() {
        let _ = ProcessCore::new("Cognition.Sub", Priority::Normal);
    }

    #[test]
    #[should_panic(expected = "re-entrant frame")]
    fn nested_frame_is_fatal() {
        let c = core();
        c.begin_cycle();
        c.begin_cycle();
    }

    #[test]
    fn frame_stats_accumulate() {
        let c = core();
        c.begin_cycle();
        c.end_cycle(Duration::from_micros(200), false);
        c.begin_cycle();
        c.end_cycle(Duration::from_micros(400), true);
        let stats = c.frame_stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.min, Duration::from_micros(200));
        assert_eq!(stats.max, Duration::from_micros(400));
        assert_eq!(stats.avg(), Duration::from_micros(300));
        assert_eq!(stats.overruns, 1);
    }
}
