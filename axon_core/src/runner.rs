//! Per-process frame loop.
//!
//! One [`ProcessRunner`] drives one process on its own service thread:
//! each iteration lets the attached endpoints check their readiness,
//! lets the wake timer fire if due, and executes a full frame as soon
//! as the process's block conditions are satisfied. A frame runs to
//! completion without preemption points; stop requests are observed
//! only between iterations.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::consts::{COURTESY_SLEEP, TIMER_SIGNAL};
use crate::process::{FrameDirective, Process, ProcessCore};
use crate::thread::{RunFlag, ServiceThread};

/// Drives one process's application logic and endpoint bookkeeping.
pub struct ProcessRunner {
    core: Arc<ProcessCore>,
    app: Box<dyn Process>,
}

impl ProcessRunner {
    /// Pair a process core with its application logic.
    pub fn new(core: Arc<ProcessCore>, app: Box<dyn Process>) -> Self {
        Self { core, app }
    }

    /// The core this runner drives.
    pub fn core(&self) -> &Arc<ProcessCore> {
        &self.core
    }

    /// Start the frame loop on a dedicated service thread named after
    /// the process.
    pub fn spawn(self) -> std::io::Result<ServiceThread> {
        let name = self.core.name().to_string();
        ServiceThread::spawn(&name, move |flag| self.run(&flag))
    }

    /// The thread body: run the initial frame unconditionally, then
    /// poll endpoints and timer until the thread is asked to stop or
    /// no block condition remains.
    pub fn run(mut self, flag: &RunFlag) {
        debug!(process = %self.core.name(), "frame loop starting");

        self.core.set_blocking(TIMER_SIGNAL, true);
        // The initial frame is unconditional: block bits armed at
        // construction (blocking receivers) gate the second frame
        // onward, never a process that has not run yet.
        let _ = self.core.signal_ready(TIMER_SIGNAL);
        self.run_frame();
        self.core.priority().apply_to_current_thread();

        while flag.is_running() && self.core.is_waiting() {
            for hook in self.core.sender_hooks() {
                if hook.poll() {
                    self.run_frame();
                }
            }
            for hook in self.core.receiver_hooks() {
                if hook.poll() {
                    self.run_frame();
                }
            }
            if self.core.check_timer() {
                self.run_frame();
            }
            // Always leave processing time to the other threads.
            std::thread::sleep(COURTESY_SLEEP);
        }

        self.app.terminate();
        debug!(process = %self.core.name(), "frame loop stopped");
    }

    /// Execute one frame: application logic, then endpoint frame-end
    /// bookkeeping, then the scheduling directive.
    fn run_frame(&mut self) {
        self.core.begin_cycle();
        let started = Instant::now();

        let directive = self.app.run_cycle();

        for hook in self.core.sender_hooks() {
            hook.finish_cycle();
        }
        for hook in self.core.receiver_hooks() {
            hook.finish_cycle();
        }
        self.core.finish_frame(directive);

        let elapsed = started.elapsed();
        let overrun = matches!(directive, FrameDirective::Periodic(p) if elapsed > p);
        if overrun {
            warn!(
                process = %self.core.name(),
                elapsed_us = elapsed.as_micros() as u64,
                "frame exceeded its period"
            );
        }
        self.core.end_cycle(elapsed, overrun);
    }
}
