//! Process registry and runtime assembly.
//!
//! Processes are declared up front in a [`ProcessRegistry`] — an
//! explicit object passed by value, no global state. [`Runtime::build`]
//! instantiates every declared process exactly once, in registration
//! order; endpoints are wired by qualified name afterwards and never
//! change once the runtime is started.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use axon_core::consts::NAME_LENGTH_MAX;
use axon_core::endpoint::{EndpointKind, FrameHook};
use axon_core::process::{Process, ProcessCore};
use axon_core::runner::ProcessRunner;
use axon_core::thread::{Priority, ServiceThread};

/// Wiring failures. All of them are fatal to startup: the caller logs
/// and aborts rather than running a partially connected robot.
#[derive(Debug, Error)]
pub enum WiringError {
    /// No sender endpoint matches the qualified name.
    #[error("no sender endpoint named '{0}'")]
    SenderNotFound(String),

    /// No receiver endpoint matches the qualified name.
    #[error("no receiver endpoint named '{0}'")]
    ReceiverNotFound(String),

    /// Sender and receiver disagree about the payload type.
    #[error("payload type mismatch: '{sender}' carries {sender_type}, '{receiver}' expects {receiver_type}")]
    TypeMismatch {
        sender: String,
        sender_type: &'static str,
        receiver: String,
        receiver_type: &'static str,
    },

    /// A qualified endpoint name exceeds the fixed length bound.
    #[error("endpoint name '{0}' exceeds the {max} character bound", max = NAME_LENGTH_MAX)]
    NameTooLong(String),
}

/// Construction context handed to a process factory.
///
/// Gives the factory the process's shared core so endpoint constructors
/// can attach to it.
pub struct ProcessContext {
    core: Arc<ProcessCore>,
}

impl ProcessContext {
    /// The core of the process being constructed.
    pub fn core(&self) -> &Arc<ProcessCore> {
        &self.core
    }
}

type ProcessFactory = Box<dyn FnOnce(&ProcessContext) -> Box<dyn Process>>;

struct Declaration {
    name: String,
    priority: Priority,
    factory: ProcessFactory,
}

/// Ordered collection of process declarations.
///
/// Constructed at startup, populated via `register()`, and consumed by
/// [`Runtime::build`]. Registration order is instantiation and start
/// order.
pub struct ProcessRegistry {
    declarations: Vec<Declaration>,
}

impl ProcessRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }

    /// Declare a process.
    ///
    /// # Panics
    /// Panics if a process with the same name is already registered.
    pub fn register(
        &mut self,
        name: &str,
        priority: Priority,
        factory: impl FnOnce(&ProcessContext) -> Box<dyn Process> + 'static,
    ) {
        if self.declarations.iter().any(|d| d.name == name) {
            panic!("process '{name}' is already registered");
        }
        self.declarations.push(Declaration {
            name: name.to_string(),
            priority,
            factory: Box::new(factory),
        });
    }

    /// Names of all declared processes, registration order.
    pub fn names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    /// Number of declared processes.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether no process has been declared.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry {
    core: Arc<ProcessCore>,
    runner: Option<ProcessRunner>,
}

/// The assembled set of processes of one robot runtime.
///
/// Lifecycle: [`Runtime::build`] → [`Runtime::connect`] (repeatedly, or
/// [`Runtime::connect_from`] with a wiring config) → [`Runtime::start`]
/// → [`Runtime::announce_stop`] + [`Runtime::join`].
pub struct Runtime {
    entries: Vec<Entry>,
    threads: Vec<ServiceThread>,
}

impl Runtime {
    /// Instantiate every declared process, registration order.
    pub fn build(registry: ProcessRegistry) -> Self {
        let mut entries = Vec::with_capacity(registry.declarations.len());
        for decl in registry.declarations {
            let core = ProcessCore::new(&decl.name, decl.priority);
            let context = ProcessContext { core: core.clone() };
            let app = (decl.factory)(&context);
            debug!(process = %decl.name, endpoints = core.endpoints().len(), "process instantiated");
            entries.push(Entry {
                runner: Some(ProcessRunner::new(core.clone(), app)),
                core,
            });
        }
        Self {
            entries,
            threads: Vec::new(),
        }
    }

    /// The core of the named process, if declared.
    pub fn core(&self, name: &str) -> Option<&Arc<ProcessCore>> {
        self.entries
            .iter()
            .find(|e| e.core.name() == name)
            .map(|e| &e.core)
    }

    fn lookup(&self, kind: EndpointKind, qualified: &str) -> Option<Arc<dyn FrameHook>> {
        self.entries.iter().find_map(|entry| {
            entry
                .core
                .endpoints()
                .iter()
                .find(|info| info.kind() == kind && info.matches(qualified))
                .and_then(|info| entry.core.find_endpoint(kind, info.name()))
        })
    }

    /// Resolve a sender endpoint by its qualified `"Process.Endpoint"`
    /// name.
    pub fn lookup_sender(&self, qualified: &str) -> Result<Arc<dyn FrameHook>, WiringError> {
        self.lookup(EndpointKind::Sender, qualified)
            .ok_or_else(|| WiringError::SenderNotFound(qualified.to_string()))
    }

    /// Resolve a receiver endpoint by its qualified name.
    pub fn lookup_receiver(&self, qualified: &str) -> Result<Arc<dyn FrameHook>, WiringError> {
        self.lookup(EndpointKind::Receiver, qualified)
            .ok_or_else(|| WiringError::ReceiverNotFound(qualified.to_string()))
    }

    /// Wire one sender to one receiver by qualified name.
    ///
    /// Verifies the length bound and that both endpoints carry the same
    /// payload type before attaching. Wiring happens between `build`
    /// and `start` and never changes afterwards.
    pub fn connect(&self, sender: &str, receiver: &str) -> Result<(), WiringError> {
        for name in [sender, receiver] {
            if name.len() > NAME_LENGTH_MAX {
                return Err(WiringError::NameTooLong(name.to_string()));
            }
        }
        let tx = self.lookup_sender(sender)?;
        let rx = self.lookup_receiver(receiver)?;
        if tx.info().payload_type() != rx.info().payload_type() {
            return Err(WiringError::TypeMismatch {
                sender: sender.to_string(),
                sender_type: tx.info().payload_type(),
                receiver: receiver.to_string(),
                receiver_type: rx.info().payload_type(),
            });
        }
        let sink = rx
            .as_sink()
            .unwrap_or_else(|| panic!("'{receiver}' resolved to a non-sink endpoint"));
        tx.attach_sink(sink);
        info!(sender, receiver, "endpoints wired");
        Ok(())
    }

    /// Spawn one service thread per process, registration order.
    pub fn start(&mut self) -> std::io::Result<()> {
        for entry in &mut self.entries {
            if let Some(runner) = entry.runner.take() {
                self.threads.push(runner.spawn()?);
            }
        }
        info!(processes = self.threads.len(), "runtime started");
        Ok(())
    }

    /// Ask every frame loop to stop after its current iteration.
    pub fn announce_stop(&self) {
        for thread in &self.threads {
            thread.announce_stop();
        }
    }

    /// Wait for every frame loop to wind down.
    pub fn join(&mut self) {
        for thread in self.threads.drain(..) {
            thread.join();
        }
        info!("runtime stopped");
    }
}
