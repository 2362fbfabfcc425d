//! External-collaborator contracts: processes and clusters.
//!
//! The pipeline never looks inside a process; everything it needs flows
//! through [`Process`]. Implementations live outside this crate (or in test
//! fixtures). Clusters are composite processes that hand their children over
//! to the pipeline at registration and keep answering mapping queries
//! afterwards.

use crate::edge::Edge;
use crate::port::{Connection, PortFrequency, PortInfo, PortName, PortType};
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by process implementations.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process `{process}` failed to configure: {reason}")]
    Configure { process: String, reason: String },

    #[error("process `{process}` failed to initialize: {reason}")]
    Init { process: String, reason: String },

    #[error("input port `{process}.{port}` is already connected")]
    PortAlreadyConnected { process: String, port: String },

    #[error("process `{process}` has no port `{port}`")]
    NoSuchPort { process: String, port: String },
}

/// A computational node with named, typed input and output ports.
///
/// Mutating methods take `&mut self`; the pipeline is the sole owner during
/// assembly and serializes all calls (see the crate-level concurrency notes).
pub trait Process: Send {
    /// Unique name within the pipeline. An empty name is invalid.
    fn name(&self) -> &str;

    /// Input port names, in declaration order.
    fn input_ports(&self) -> Vec<PortName>;

    /// Output port names, in declaration order.
    fn output_ports(&self) -> Vec<PortName>;

    fn input_port_info(&self, port: &str) -> Option<PortInfo>;

    fn output_port_info(&self, port: &str) -> Option<PortInfo>;

    /// Late configuration. Data-dependent output ports must report a
    /// non-data-dependent type once this returns.
    fn configure(&mut self) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Called after the graph is fully wired, before frequencies are checked.
    fn init(&mut self) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Drop all per-setup state, including connected edges and any port types
    /// assigned by the resolver, restoring the declared port metadata.
    fn reset(&mut self) {}

    /// Pin a flow-dependent input port to `port_type`. All ports on this
    /// process sharing the same flow tag must resolve together. Returns false
    /// when the port rejects the assignment.
    fn set_input_port_type(&mut self, port: &str, port_type: PortType) -> bool;

    /// Output-side counterpart of [`Process::set_input_port_type`].
    fn set_output_port_type(&mut self, port: &str, port_type: PortType) -> bool;

    /// Attach the edge feeding `port`. At most one edge per input port.
    fn connect_input_port(&mut self, port: &str, edge: Arc<Edge>) -> Result<(), ProcessError>;

    /// Attach an edge consuming from `port`. Output ports may fan out.
    fn connect_output_port(&mut self, port: &str, edge: Arc<Edge>) -> Result<(), ProcessError>;

    /// Assign the core rate all of this process's port frequencies are
    /// relative to.
    fn set_core_frequency(&mut self, frequency: PortFrequency);
}

/// A composite process: a named group of child processes plus internal wiring
/// and external port mappings.
pub trait ProcessCluster: Process {
    /// Hand the child processes over to the pipeline. Called exactly once,
    /// during registration; children are registered in the returned order.
    fn take_processes(&mut self) -> Vec<AnyProcess>;

    /// Connections among the children.
    fn internal_connections(&self) -> Vec<Connection>;

    /// Outer-input to inner-input connections; one cluster input port may fan
    /// in to several internal ports.
    fn input_mappings(&self) -> Vec<Connection>;

    /// Inner-output to outer-output connections; each cluster output port has
    /// exactly one.
    fn output_mappings(&self) -> Vec<Connection>;
}

/// A process or a cluster, as handed to [`crate::Pipeline::add_process`].
pub enum AnyProcess {
    Process(Box<dyn Process>),
    Cluster(Box<dyn ProcessCluster>),
}

impl AnyProcess {
    pub fn name(&self) -> &str {
        match self {
            AnyProcess::Process(p) => p.name(),
            AnyProcess::Cluster(c) => c.name(),
        }
    }
}

impl From<Box<dyn Process>> for AnyProcess {
    fn from(process: Box<dyn Process>) -> Self {
        AnyProcess::Process(process)
    }
}

impl From<Box<dyn ProcessCluster>> for AnyProcess {
    fn from(cluster: Box<dyn ProcessCluster>) -> Self {
        AnyProcess::Cluster(cluster)
    }
}
