//! Sender endpoint: publishes one typed payload to attached receivers.

use std::sync::Arc;

use heapless::Vec as FixedVec;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::consts::RECEIVERS_MAX;
use crate::endpoint::{EndpointInfo, EndpointKind, FrameHook, PackageSink, Payload};
use crate::process::ProcessCore;

/// One attached destination plus its delivered-to mark for the
/// current publish.
struct Target {
    sink: Arc<dyn PackageSink>,
    delivered: bool,
}

struct SenderState<T> {
    /// The current value to publish.
    payload: T,
    /// Attached receivers, wiring order. Hard capacity limit.
    targets: FixedVec<Target, RECEIVERS_MAX>,
    /// Whether `send()` has been called at least once.
    armed: bool,
}

impl<T: Payload> SenderState<T> {
    /// Deliver the current payload to every attached receiver that is
    /// free and has not yet been serviced during this publish. Each
    /// receiver gets its own freshly encoded buffer.
    fn deliver(&mut self, info: &EndpointInfo) {
        if !self.armed {
            return;
        }
        let Self {
            payload, targets, ..
        } = self;
        for target in targets.iter_mut() {
            if target.delivered || target.sink.has_pending_package() {
                continue;
            }
            let package = payload.encode().unwrap_or_else(|e| {
                panic!("encoding package on sender '{}' failed: {e}", info.qualified())
            });
            target.sink.set_package(package);
            target.delivered = true;
        }
    }
}

struct SenderShared<T> {
    info: EndpointInfo,
    process: Arc<ProcessCore>,
    state: Mutex<SenderState<T>>,
}

impl<T: Payload> FrameHook for SenderShared<T> {
    fn info(&self) -> &EndpointInfo {
        &self.info
    }

    /// Check-for-request: when no attached receiver holds a pending
    /// package, all destinations are ready for more data and the
    /// sender self-signals so a blocking owner process can proceed.
    fn poll(&self) -> bool {
        let all_free = {
            let state = self.state.lock();
            state
                .targets
                .iter()
                .all(|t| !t.sink.has_pending_package())
        };
        all_free && self.process.signal_ready(self.info.signal())
    }

    /// Flush the pending publish to receivers that have consumed their
    /// previous package since `send()`. The delivered-to set persists,
    /// so no receiver is serviced twice per publish.
    fn finish_cycle(&self) {
        let mut state = self.state.lock();
        state.deliver(&self.info);
    }

    fn attach_sink(&self, sink: Arc<dyn PackageSink>) {
        let mut state = self.state.lock();
        if state
            .targets
            .push(Target {
                sink,
                delivered: false,
            })
            .is_err()
        {
            panic!(
                "sender '{}' exceeds the receiver capacity of {RECEIVERS_MAX}",
                self.info.qualified()
            );
        }
    }

    fn as_sink(self: Arc<Self>) -> Option<Arc<dyn PackageSink>> {
        None
    }
}

/// A named, typed publish endpoint attached to one process.
///
/// Holds the current value of `T`; [`Sender::send`] serializes it once
/// per free receiver and hands each buffer over by move. Receivers that
/// still hold an undelivered package are skipped until they consume it
/// (the frame loop retries at every frame end).
pub struct Sender<T: Payload> {
    shared: Arc<SenderShared<T>>,
}

impl<T: Payload + Default> Sender<T> {
    /// Construct a sender named `name` on `process`.
    ///
    /// Allocates the endpoint's signal id and registers it with the
    /// process; endpoints are never detached afterwards.
    pub fn new(process: &Arc<ProcessCore>, name: &str, blocking: bool) -> Self {
        let info = EndpointInfo::new(
            process.name(),
            name,
            process.next_signal_id(),
            blocking,
            EndpointKind::Sender,
            std::any::type_name::<T>(),
        );
        let shared = Arc::new(SenderShared {
            info,
            process: process.clone(),
            state: Mutex::new(SenderState {
                payload: T::default(),
                targets: FixedVec::new(),
                armed: false,
            }),
        });
        process.register_hook(shared.clone());
        Self { shared }
    }
}

impl<T: Payload> Sender<T> {
    /// Descriptor of this endpoint.
    pub fn info(&self) -> &EndpointInfo {
        &self.shared.info
    }

    /// Mutable access to the value that the next `send()` publishes.
    pub fn payload_mut(&self) -> MappedMutexGuard<'_, T> {
        MutexGuard::map(self.shared.state.lock(), |s| &mut s.payload)
    }

    /// Replace the value that the next `send()` publishes.
    pub fn set(&self, value: T) {
        self.shared.state.lock().payload = value;
    }

    /// Attach a receiver as a destination. Wiring happens once at
    /// startup and never changes afterwards.
    ///
    /// # Panics
    /// Panics past the fixed receiver capacity ([`RECEIVERS_MAX`]).
    pub fn attach(&self, sink: Arc<dyn PackageSink>) {
        self.shared.attach_sink(sink);
    }

    /// Mark the current payload for publishing and transmit it to all
    /// receivers that already requested it.
    ///
    /// Sets the owning process's block bit for this endpoint according
    /// to the `blocking` flag, then delivers at most one serialized
    /// copy per attached receiver. Receivers serviced during this call
    /// are not serviced again until the next `send()`, even if they
    /// free their buffer in the meantime.
    pub fn send(&self) {
        let shared = &self.shared;
        shared
            .process
            .set_blocking(shared.info.signal(), shared.info.blocking());
        let mut state = shared.state.lock();
        state.armed = true;
        for target in state.targets.iter_mut() {
            target.delivered = false;
        }
        state.deliver(&shared.info);
    }

    /// Finish the current frame: flush the pending publish to
    /// receivers that have freed their slot since `send()`. The frame
    /// loop calls this once per frame; it is public for callers that
    /// drive endpoints without a runner.
    pub fn finish_frame(&self) {
        self.shared.finish_cycle();
    }

    /// Whether any attached receiver is ready for a new package.
    pub fn requested_new(&self) -> bool {
        self.shared
            .state
            .lock()
            .targets
            .iter()
            .any(|t| !t.sink.has_pending_package())
    }
}
