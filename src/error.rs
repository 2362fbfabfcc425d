//! Error kinds surfaced by pipeline assembly.
//!
//! No error is recovered internally: the first failure aborts setup and
//! leaves the pipeline frozen in its failed state until `reset`.

use crate::config::ConfigError;
use crate::port::{Connection, PortAddress, PortFrequency, PortType};
use crate::process::ProcessError;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A flow-type conflict discovered by the propagation BFS: the named
/// connection's far side rejected the type being spread across it.
#[derive(Debug, Clone)]
pub struct PropagationConflict {
    pub connection: Connection,
    pub port_type: PortType,
    /// True when the type was pushed from the downstream side to the
    /// upstream side.
    pub push_upstream: bool,
}

impl fmt::Display for PropagationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.push_upstream {
            "upstream"
        } else {
            "downstream"
        };
        write!(
            f,
            "`{}` rejected type `{}` pushed {direction}",
            self.connection, self.port_type
        )
    }
}

/// Everything that can go wrong while building, verifying, or querying a
/// pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline constructed without a configuration")]
    NullPipelineConfig,

    #[error("attempted to add an empty process to the pipeline")]
    NullProcess,

    #[error("the name `{name}` is already in use")]
    DuplicateName { name: String },

    #[error("cannot add process `{name}` after the pipeline is set up")]
    AddAfterSetup { name: String },

    #[error("cannot remove process `{name}` after the pipeline is set up")]
    RemoveAfterSetup { name: String },

    #[error("cannot connect `{connection}` after the pipeline is set up")]
    ConnectionAfterSetup { connection: Connection },

    #[error("cannot disconnect `{connection}` after the pipeline is set up")]
    DisconnectionAfterSetup { connection: Connection },

    #[error("connection `{connection}` wires a const output to a mutable input")]
    ConnectionFlagMismatch { connection: Connection },

    #[error(
        "connection `{connection}` has incompatible types: `{upstream_type}` -> `{downstream_type}`"
    )]
    ConnectionTypeMismatch {
        connection: Connection,
        upstream_type: PortType,
        downstream_type: PortType,
    },

    #[error("data-dependent port `{address}` was still untyped after its process configured")]
    UntypedDataDependent { address: PortAddress },

    #[error("connection `{connection}` rejected the pinned type `{port_type}`")]
    ConnectionDependentType {
        connection: Connection,
        port_type: PortType,
        push_upstream: bool,
    },

    #[error("flow-type propagation conflict: {conflict}")]
    Propagation { conflict: PropagationConflict },

    #[error("pinning `{pinned_type}` at `{pinned}` cascaded into a conflict: {conflict}")]
    ConnectionDependentTypeCascade {
        pinned: PortAddress,
        pinned_type: PortType,
        conflict: PropagationConflict,
    },

    #[error("flow-dependent connections remain untyped; no seed ever constrained them")]
    UntypedConnection,

    #[error("no process named `{name}`")]
    NoSuchProcess { name: String },

    #[error("process `{process}` has no port `{port}`")]
    NoSuchPort { process: String, port: String },

    #[error("the pipeline has no processes")]
    NoProcesses,

    #[error("required port `{address}` has no connection: {reason}")]
    MissingConnection {
        address: PortAddress,
        reason: &'static str,
    },

    #[error("processes unreachable from the rest of the pipeline: {names:?}")]
    OrphanedProcesses { names: Vec<String> },

    #[error("the pipeline dependency graph contains a cycle")]
    NotADag,

    #[error(
        "frequency mismatch on `{connection}`: upstream core {upstream_core}, \
         downstream core {downstream_core}"
    )]
    FrequencyMismatch {
        connection: Connection,
        upstream_core: PortFrequency,
        downstream_core: PortFrequency,
    },

    #[error("the pipeline is already set up")]
    DuplicateSetup,

    #[error("the pipeline has not been set up")]
    PipelineNotSetup,

    #[error("pipeline setup did not complete successfully")]
    PipelineNotReady,

    #[error("cannot reset a running pipeline")]
    ResetRunningPipeline,

    #[error("internal invariant violated: {0}")]
    Internal(&'static str),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
