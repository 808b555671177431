//! Named communication endpoints: the Sender/Receiver family.
//!
//! An endpoint is attached to exactly one process at construction and
//! never detached. It owns a signal id (a bit position in the owning
//! process's scheduling masks) and participates in the per-cycle
//! delivery protocol through the crate-internal [`FrameHook`] trait.
//!
//! Payloads cross the thread boundary as serialized [`Package`] buffers
//! with single-slot, last-write-wins semantics. The byte layout is not
//! defined here: the core consumes serialization only through the
//! opaque [`Payload`] capability.

mod receiver;
mod sender;

pub use receiver::Receiver;
pub use sender::Sender;

use std::sync::Arc;

use thiserror::Error;

use crate::signal::SignalId;

/// Distinguishes the two endpoint families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Publishes packages to attached receivers.
    Sender,
    /// Holds at most one pending package from a sender.
    Receiver,
}

/// Immutable descriptor of one endpoint.
///
/// The qualified name is `"<ProcessName>.<EndpointName>"`; the process
/// name never contains a dot, the endpoint name may.
#[derive(Debug, Clone)]
pub struct EndpointInfo {
    process: String,
    name: String,
    signal: SignalId,
    blocking: bool,
    kind: EndpointKind,
    payload_type: &'static str,
}

impl EndpointInfo {
    pub(crate) fn new(
        process: &str,
        name: &str,
        signal: SignalId,
        blocking: bool,
        kind: EndpointKind,
        payload_type: &'static str,
    ) -> Self {
        Self {
            process: process.to_string(),
            name: name.to_string(),
            signal,
            blocking,
            kind,
            payload_type,
        }
    }

    /// Name of the owning process.
    pub fn process(&self) -> &str {
        &self.process
    }

    /// Endpoint name without the process prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full `"Process.Endpoint"` name.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.process, self.name)
    }

    /// Whether `qualified` refers to this endpoint. Comparison without
    /// allocation; the split point is the first dot.
    pub fn matches(&self, qualified: &str) -> bool {
        qualified
            .strip_prefix(self.process.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|name| name == self.name)
    }

    /// Signal id of this endpoint in the owning process's masks.
    pub fn signal(&self) -> SignalId {
        self.signal
    }

    /// Whether the owning process's next cycle waits for this endpoint.
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    /// Sender or receiver.
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Type name of the payload, used for a wiring-time compatibility
    /// check between sender and receiver.
    pub fn payload_type(&self) -> &'static str {
        self.payload_type
    }
}

/// One serialized payload in transit from a sender to one receiver.
///
/// Move-only owned buffer: handing a package to a receiver transfers
/// ownership by value, so the double-free and use-after-free hazards of
/// a raw-pointer handoff cannot be expressed.
#[derive(Debug)]
pub struct Package(Box<[u8]>);

impl Package {
    /// Wrap a freshly encoded buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }

    /// The serialized bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serialization failure at the package boundary.
///
/// A decode failure on a received package indicates a protocol or
/// version mismatch between two processes and is treated as fatal by
/// the receiver.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Payload could not be encoded into a package.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// Package bytes could not be decoded into the payload type.
    #[error("failed to decode package: {0}")]
    Decode(String),
}

/// Opaque serialization capability consumed by the endpoint family.
///
/// Implemented for every `serde` type via the blanket impl below; the
/// wire format is bincode, but nothing in the core depends on the byte
/// layout.
pub trait Payload: Send + 'static {
    /// Serialize the current value into a fresh package.
    fn encode(&self) -> Result<Package, CodecError>;

    /// Replace the current value with the one decoded from `bytes`.
    fn decode(&mut self, bytes: &[u8]) -> Result<(), CodecError>;
}

impl<T> Payload for T
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
{
    fn encode(&self) -> Result<Package, CodecError> {
        bincode::serialize(self)
            .map(Package::new)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        *self = bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(())
    }
}

/// Per-cycle participation of a type-erased endpoint.
///
/// The frame loop drives every attached endpoint through this trait:
/// `poll` once per loop iteration, `finish_cycle` once per frame.
pub trait FrameHook: Send + Sync {
    /// Descriptor of this endpoint.
    fn info(&self) -> &EndpointInfo;

    /// Check readiness. A sender checks whether all attached receivers
    /// are free; a receiver checks for and consumes a pending package.
    /// Returns whether the owning process's cycle trigger fired.
    fn poll(&self) -> bool;

    /// Close the current frame: a sender flushes its pending publish
    /// to receivers that have freed their slot, a receiver resets its
    /// per-cycle consumed flag and re-arms its block bit.
    fn finish_cycle(&self);

    /// Attach a destination. Only meaningful for senders; calling this
    /// on a receiver is a wiring defect and panics.
    fn attach_sink(&self, sink: Arc<dyn PackageSink>);

    /// The package-sink face of this endpoint, if it is a receiver.
    fn as_sink(self: Arc<Self>) -> Option<Arc<dyn PackageSink>>;
}

/// Type-erased destination a sender delivers packages into.
pub trait PackageSink: Send + Sync {
    /// Descriptor of the receiving endpoint.
    fn info(&self) -> &EndpointInfo;

    /// Whether an unconsumed package is currently held.
    fn has_pending_package(&self) -> bool;

    /// Take ownership of a package, discarding any pending one
    /// (last-write-wins, no queuing).
    fn set_package(&self, package: Package);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_matching() {
        let info = EndpointInfo::new(
            "Cognition",
            "MotionRequest.O",
            2,
            false,
            EndpointKind::Sender,
            "test",
        );
        assert_eq!(info.qualified(), "Cognition.MotionRequest.O");
        assert!(info.matches("Cognition.MotionRequest.O"));
        assert!(!info.matches("Motion.MotionRequest.O"));
        assert!(!info.matches("Cognition.MotionRequest"));
        assert!(!info.matches("CognitionMotionRequest.O"));
    }

    #[test]
    fn package_owns_its_bytes() {
        let pkg = Package::new(vec![1, 2, 3]);
        assert_eq!(pkg.bytes(), &[1, 2, 3]);
        assert_eq!(pkg.len(), 3);
        assert!(!pkg.is_empty());
    }

    #[test]
    fn payload_round_trip_via_blanket_impl() {
        #[derive(serde::Serialize, serde::Deserialize, Default, PartialEq, Debug)]
        struct Pose {
            x: f32,
            y: f32,
        }

        let value = Pose { x: 1.5, y: -2.0 };
        let pkg = value.encode().unwrap();
        let mut decoded = Pose::default();
        decoded.decode(pkg.bytes()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn decode_of_garbage_reports_mismatch() {
        #[derive(serde::Serialize, serde::Deserialize, Default)]
        struct Wide {
            data: Vec<u64>,
        }

        let mut value = Wide::default();
        let err = value.decode(&[0xFF; 3]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
