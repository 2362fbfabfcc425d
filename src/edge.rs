//! The runtime channel built for one resolved connection.
//!
//! Edges are constructed by the pipeline during setup from a merged
//! configuration block and handed to both endpoint processes, which keep
//! shared references to them. The pipeline remains the owning root; edges
//! only record their endpoint process names, so no ownership cycle exists.
//!
//! The queue itself is a crossbeam channel pair held inside the edge. The
//! scheduling contract an edge exposes to the runtime is the `dependency`
//! flag; its buffering behavior beyond `capacity` is unspecified here.

use crate::config::ConfigBlock;
use crate::port::ProcessName;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::any::Any;
use std::fmt;

/// Config key: whether the edge imposes a scheduling dependency on its
/// downstream process. Forced and frozen by the edge builder.
pub const CONFIG_DEPENDENCY: &str = "dependency";

/// Config key: maximum number of queued data items (0 = unbounded).
pub const CONFIG_CAPACITY: &str = "capacity";

/// Opaque payload handed between processes at runtime.
pub type EdgeDatum = Box<dyn Any + Send>;

/// A data channel between an upstream output port and a downstream input port.
pub struct Edge {
    config: ConfigBlock,
    dependency: bool,
    capacity: usize,
    tx: Sender<EdgeDatum>,
    rx: Receiver<EdgeDatum>,
    upstream: Option<ProcessName>,
    downstream: Option<ProcessName>,
}

impl Edge {
    /// Build an edge from its (already merged) configuration.
    pub fn new(config: ConfigBlock) -> Self {
        let dependency = config.get_bool(CONFIG_DEPENDENCY).unwrap_or(true);
        let capacity = config.get_int(CONFIG_CAPACITY).unwrap_or(0).max(0) as usize;
        let (tx, rx) = if capacity == 0 {
            unbounded()
        } else {
            bounded(capacity)
        };
        Self {
            config,
            dependency,
            capacity,
            tx,
            rx,
            upstream: None,
            downstream: None,
        }
    }

    /// Whether the downstream process must wait on this edge for data.
    /// False for edges feeding `InputNoDep` ports.
    pub fn makes_dependency(&self) -> bool {
        self.dependency
    }

    /// Queue bound, if any.
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    pub fn config(&self) -> &ConfigBlock {
        &self.config
    }

    /// Record the producing process. Set once during assembly.
    pub fn set_upstream_process(&mut self, name: impl Into<ProcessName>) {
        self.upstream = Some(name.into());
    }

    /// Record the consuming process. Set once during assembly.
    pub fn set_downstream_process(&mut self, name: impl Into<ProcessName>) {
        self.downstream = Some(name.into());
    }

    pub fn upstream_process(&self) -> Option<&str> {
        self.upstream.as_deref()
    }

    pub fn downstream_process(&self) -> Option<&str> {
        self.downstream.as_deref()
    }

    /// Enqueue a datum. Returns false when a bounded edge is full.
    pub fn push(&self, datum: EdgeDatum) -> bool {
        self.tx.try_send(datum).is_ok()
    }

    /// Dequeue the oldest datum, if any.
    pub fn try_pop(&self) -> Option<EdgeDatum> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("upstream", &self.upstream)
            .field("downstream", &self.downstream)
            .field("dependency", &self.dependency)
            .field("capacity", &self.capacity)
            .field("queued", &self.rx.len())
            .finish()
    }
}
