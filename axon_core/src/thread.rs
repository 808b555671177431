//! Service thread with cooperative stop and advisory RT priority.
//!
//! Each process of the runtime owns one OS thread running its frame
//! loop. Termination is cooperative: `announce_stop` clears a shared
//! run flag that the frame loop re-checks every iteration; nothing is
//! ever killed mid-cycle.
//!
//! Priority uses `SCHED_FIFO` via `sched_setscheduler` on Linux and is
//! purely advisory — a failure (typically missing CAP_SYS_NICE) is
//! logged and ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use tracing::warn;

/// Advisory scheduling priority of a process thread.
///
/// `Normal` keeps the default scheduler. `Fifo(n)` requests
/// `SCHED_FIFO` with priority `n` (reasonable values 1..=99).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Default time-sharing scheduling.
    #[default]
    Normal,
    /// Real-time FIFO scheduling with the given priority.
    Fifo(i32),
}

impl Priority {
    /// Apply this priority to the calling thread.
    ///
    /// Advisory: logs a warning and continues on failure. No-op on
    /// non-Linux targets and for `Priority::Normal`.
    pub fn apply_to_current_thread(self) {
        let Priority::Fifo(priority) = self else {
            return;
        };

        #[cfg(target_os = "linux")]
        {
            let param = libc::sched_param {
                sched_priority: priority,
            };
            let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
            if ret != 0 {
                let err = std::io::Error::last_os_error();
                warn!("sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}");
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            warn!("SCHED_FIFO priority {priority} requested on unsupported platform");
        }
    }
}

/// Shared run flag handed to the thread body.
///
/// The frame loop polls [`RunFlag::is_running`] once per iteration and
/// winds down when it turns false.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// Whether the thread has been asked to continue.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A named worker thread with cooperative shutdown.
pub struct ServiceThread {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ServiceThread {
    /// Start `body` on a new OS thread.
    ///
    /// The body receives a [`RunFlag`] it must poll for cooperative
    /// termination. Scheduling priority is not set here: the frame
    /// loop applies the process priority from inside the thread after
    /// the initial frame, matching the process startup sequence.
    pub fn spawn<F>(name: &str, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(RunFlag) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = RunFlag(running.clone());
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))?;
        Ok(Self {
            name: name.to_string(),
            running,
            handle: Some(handle),
        })
    }

    /// The thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread has been asked to continue.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request cooperative termination. Never forces the thread.
    pub fn announce_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Announce stop and wait for the thread to finish.
    pub fn join(mut self) {
        self.announce_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ServiceThread {
    fn drop(&mut self) {
        self.announce_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
