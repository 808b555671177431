//! Receiver endpoint: holds at most one pending package and decodes it
//! into a typed payload once per delivery.

use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::endpoint::{EndpointInfo, EndpointKind, FrameHook, Package, PackageSink, Payload};
use crate::process::ProcessCore;

/// Single-slot package buffer plus the per-cycle consumed flag.
///
/// Guarded by its own mutex (not the process lock): a producer thread
/// setting a package and the owning thread consuming it only ever meet
/// here.
struct Inbox {
    package: Option<Package>,
    consumed: bool,
}

struct ReceiverShared<T> {
    info: EndpointInfo,
    process: Arc<ProcessCore>,
    inbox: Mutex<Inbox>,
    value: Mutex<T>,
}

impl<T: Payload> FrameHook for ReceiverShared<T> {
    fn info(&self) -> &EndpointInfo {
        &self.info
    }

    /// Check-for-package: if a package is pending and this receiver
    /// has not already signaled readiness this cycle, decode it into
    /// the typed payload, free the buffer and signal the owner.
    ///
    /// Idempotent within a cycle: a second call with no intervening
    /// package is a no-op.
    fn poll(&self) -> bool {
        let decoded = {
            let mut inbox = self.inbox.lock();
            if inbox.consumed {
                None
            } else {
                inbox.package.take().map(|package| {
                    self.value.lock().decode(package.bytes()).unwrap_or_else(|e| {
                        panic!(
                            "protocol mismatch on receiver '{}': {e}",
                            self.info.qualified()
                        )
                    });
                    inbox.consumed = true;
                })
            }
            // Package buffer dropped here, before the ready signal.
        };
        decoded.is_some() && self.process.signal_ready(self.info.signal())
    }

    /// Reset the per-cycle consumed flag and re-arm the block bit of a
    /// blocking receiver for the next frame.
    fn finish_cycle(&self) {
        self.inbox.lock().consumed = false;
        if self.info.blocking() {
            self.process.set_blocking(self.info.signal(), true);
        }
    }

    fn attach_sink(&self, _sink: Arc<dyn PackageSink>) {
        panic!(
            "'{}' is a receiver endpoint, nothing can attach to it",
            self.info.qualified()
        );
    }

    fn as_sink(self: Arc<Self>) -> Option<Arc<dyn PackageSink>> {
        Some(self)
    }
}

impl<T: Payload> PackageSink for ReceiverShared<T> {
    fn info(&self) -> &EndpointInfo {
        &self.info
    }

    fn has_pending_package(&self) -> bool {
        self.inbox.lock().package.is_some()
    }

    /// Take ownership of a package. A pending, not yet consumed
    /// package is discarded: last write wins, no queuing.
    fn set_package(&self, package: Package) {
        self.inbox.lock().package = Some(package);
    }
}

/// A named, typed consume endpoint attached to one process.
///
/// Between a delivery and its consumption the receiver exclusively
/// owns the serialized buffer; consumption decodes it exactly once and
/// signals the owning process.
pub struct Receiver<T: Payload> {
    shared: Arc<ReceiverShared<T>>,
}

impl<T: Payload + Default> Receiver<T> {
    /// Construct a receiver named `name` on `process`.
    ///
    /// A `blocking` receiver gates the owning process's next cycle on
    /// its readiness; its block bit is armed here and re-armed at
    /// every frame end.
    pub fn new(process: &Arc<ProcessCore>, name: &str, blocking: bool) -> Self {
        let info = EndpointInfo::new(
            process.name(),
            name,
            process.next_signal_id(),
            blocking,
            EndpointKind::Receiver,
            std::any::type_name::<T>(),
        );
        if blocking {
            process.set_blocking(info.signal(), true);
        }
        let shared = Arc::new(ReceiverShared {
            info,
            process: process.clone(),
            inbox: Mutex::new(Inbox {
                package: None,
                consumed: false,
            }),
            value: Mutex::new(T::default()),
        });
        process.register_hook(shared.clone());
        Self { shared }
    }
}

impl<T: Payload> Receiver<T> {
    /// Descriptor of this endpoint.
    pub fn info(&self) -> &EndpointInfo {
        &self.shared.info
    }

    /// The most recently decoded payload value.
    pub fn get(&self) -> MappedMutexGuard<'_, T> {
        MutexGuard::map(self.shared.value.lock(), |v| v)
    }

    /// Whether an unconsumed package is currently held.
    pub fn has_pending_package(&self) -> bool {
        self.shared.has_pending_package()
    }

    /// Consume a pending package now instead of waiting for the next
    /// frame-loop poll. Returns whether the owning process's cycle
    /// trigger fired.
    pub fn check_for_package(&self) -> bool {
        self.shared.poll()
    }

    /// Finish the current frame: reset the per-cycle consumed flag and
    /// re-arm the block bit of a blocking receiver. The frame loop
    /// calls this once per frame; it is public for callers that drive
    /// endpoints without a runner.
    pub fn finish_frame(&self) {
        self.shared.finish_cycle();
    }

    /// Whether a package was consumed during the current cycle.
    /// Always true for a blocking receiver: its readiness is a
    /// precondition for the cycle, not an optional event.
    pub fn updated(&self) -> bool {
        self.shared.info.blocking() || self.shared.inbox.lock().consumed
    }

    /// The package-sink face of this receiver, used at wiring time to
    /// attach it to a sender.
    pub fn sink(&self) -> Arc<dyn PackageSink> {
        self.shared.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Sender;
    use crate::thread::Priority;

    #[derive(serde::Serialize, serde::Deserialize, Default, Clone, PartialEq, Debug)]
    struct Reading {
        seq: u32,
        values: Vec<f32>,
    }

    fn pair() -> (Arc<ProcessCore>, Arc<ProcessCore>) {
        (
            ProcessCore::new("Producer", Priority::Normal),
            ProcessCore::new("Consumer", Priority::Normal),
        )
    }

    /// Drive the consumer-side poll of every receiver hook once.
    fn poll_receivers(core: &Arc<ProcessCore>) -> bool {
        let mut fired = false;
        for hook in core.receiver_hooks() {
            fired |= hook.poll();
        }
        fired
    }

    fn finish_receivers(core: &Arc<ProcessCore>) {
        for hook in core.receiver_hooks() {
            hook.finish_cycle();
        }
    }

    #[test]
    fn single_slot_last_write_wins() {
        let (ptx, prx) = pair();
        let tx = Sender::<Reading>::new(&ptx, "Readings.O", false);
        let rx = Receiver::<Reading>::new(&prx, "Readings.I", false);
        tx.attach(rx.sink());

        tx.set(Reading {
            seq: 1,
            values: vec![1.0],
        });
        tx.send();
        assert!(rx.has_pending_package());

        // A second send while the first is unconsumed: the receiver is
        // skipped (it still holds a package), so the pending buffer
        // remains the first one...
        tx.set(Reading {
            seq: 2,
            values: vec![2.0],
        });
        tx.send();
        assert!(rx.has_pending_package());

        // ...but a direct overwrite of the slot is last-write-wins.
        rx.sink().set_package(
            Reading {
                seq: 3,
                values: vec![3.0],
            }
            .encode()
            .unwrap(),
        );
        assert!(poll_receivers(&prx) || rx.updated());
        assert_eq!(rx.get().seq, 3);
        assert!(!rx.has_pending_package());
    }

    #[test]
    fn round_trip_preserves_value() {
        let (ptx, prx) = pair();
        let tx = Sender::<Reading>::new(&ptx, "Pose.O", false);
        let rx = Receiver::<Reading>::new(&prx, "Pose.I", false);
        tx.attach(rx.sink());

        let sent = Reading {
            seq: 42,
            values: vec![0.25, -1.0, 3.5],
        };
        tx.set(sent.clone());
        tx.send();
        poll_receivers(&prx);
        assert_eq!(*rx.get(), sent);
    }

    #[test]
    fn consume_is_idempotent_within_a_cycle() {
        let (ptx, prx) = pair();
        let tx = Sender::<Reading>::new(&ptx, "Data.O", false);
        let rx = Receiver::<Reading>::new(&prx, "Data.I", false);
        tx.attach(rx.sink());

        tx.send();
        assert!(poll_receivers(&prx) || rx.updated());
        assert!(rx.updated());
        // Second poll in the same cycle: no package, no second signal.
        assert!(!poll_receivers(&prx));

        // Even with a fresh package, consumption waits for the next
        // cycle (the consumed flag gates it).
        rx.sink()
            .set_package(Reading::default().encode().unwrap());
        assert!(!poll_receivers(&prx));
        assert!(rx.has_pending_package());

        finish_receivers(&prx);
        assert!(poll_receivers(&prx) || rx.updated());
        assert!(!rx.has_pending_package());
    }

    #[test]
    fn at_most_one_delivery_per_send() {
        let (ptx, prx) = pair();
        let tx = Sender::<Reading>::new(&ptx, "Data.O", false);
        let rx = Receiver::<Reading>::new(&prx, "Data.I", false);
        tx.attach(rx.sink());

        tx.set(Reading {
            seq: 7,
            values: vec![],
        });
        tx.send();
        poll_receivers(&prx);
        assert_eq!(rx.get().seq, 7);

        // The receiver freed its slot, but it was already serviced
        // during this publish: the frame-end flush must not re-send.
        for hook in ptx.sender_hooks() {
            hook.finish_cycle();
        }
        assert!(!rx.has_pending_package());

        // A new send() starts a new publish and delivers again.
        finish_receivers(&prx);
        tx.set(Reading {
            seq: 8,
            values: vec![],
        });
        tx.send();
        assert!(rx.has_pending_package());
    }

    #[test]
    fn flush_services_late_receivers_once() {
        let (ptx, prx) = pair();
        let tx = Sender::<Reading>::new(&ptx, "Data.O", false);
        let busy = Receiver::<Reading>::new(&prx, "Busy.I", false);
        let free = Receiver::<Reading>::new(&prx, "Free.I", false);
        tx.attach(busy.sink());
        tx.attach(free.sink());

        // Occupy the first receiver before the publish.
        busy.sink()
            .set_package(Reading::default().encode().unwrap());

        tx.set(Reading {
            seq: 9,
            values: vec![],
        });
        tx.send();
        assert!(free.has_pending_package());

        // The busy receiver consumes its stale package; the frame-end
        // flush then delivers the pending publish to it.
        poll_receivers(&prx);
        assert!(!busy.has_pending_package());
        for hook in ptx.sender_hooks() {
            hook.finish_cycle();
        }
        assert!(busy.has_pending_package());
    }

    #[test]
    fn sender_signals_when_all_receivers_are_free() {
        let (ptx, prx) = pair();
        let tx = Sender::<Reading>::new(&ptx, "Data.O", true);
        let rx = Receiver::<Reading>::new(&prx, "Data.I", false);
        tx.attach(rx.sink());

        // Make the sender's signal the only block condition.
        ptx.set_blocking(tx.info().signal(), true);

        tx.send(); // delivers, receiver now busy
        assert!(!ptx.sender_hooks()[0].poll());

        poll_receivers(&prx); // receiver consumes
        assert!(ptx.sender_hooks()[0].poll());
        assert!(tx.requested_new());
    }

    #[test]
    fn blocking_receiver_rearms_its_block_bit() {
        let (_ptx, prx) = pair();
        let rx = Receiver::<Reading>::new(&prx, "Gate.I", true);
        assert!(prx.is_waiting());
        assert!(rx.updated()); // always true for blocking receivers

        // Consuming a package fires the trigger and clears the mask...
        rx.sink()
            .set_package(Reading::default().encode().unwrap());
        assert!(poll_receivers(&prx));
        assert!(!prx.is_waiting());

        // ...and frame end re-arms the gate.
        finish_receivers(&prx);
        assert!(prx.is_waiting());
    }

    #[test]
    #[should_panic(expected = "protocol mismatch")]
    fn decode_failure_is_fatal() {
        let (_ptx, prx) = pair();
        let rx = Receiver::<Reading>::new(&prx, "Bad.I", false);
        rx.sink().set_package(Package::new(vec![0xFF; 2]));
        poll_receivers(&prx);
    }
}
