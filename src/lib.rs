//! # pipewright: dataflow pipeline assembly and verification
//!
//! A pipeline is a set of user-declared *processes* (computational nodes with
//! named, typed input and output ports) plus the *connections* between those
//! ports. This crate turns such a declaration into a fully type-checked,
//! cycle-free, frequency-consistent graph in which every connection is bound
//! to a first-class [`Edge`].
//!
//! ## Architecture
//!
//! - **Building**: `add_process` / `connect` / `disconnect` accumulate
//!   processes, clusters, and planned connections. Connections are classified
//!   as they arrive; anything whose types cannot be decided yet is deferred.
//! - **Setup**: `setup_pipeline` expands clusters, resolves data-dependent
//!   and flow-dependent port types, materializes edges with per-type and
//!   per-connection configuration, and verifies required ports, reachability,
//!   acyclicity, and rational port frequencies.
//! - **Queries**: after setup, the resolved graph answers upstream/downstream
//!   and edge lookups; `reset` returns to building and replays the planned
//!   connections.
//!
//! Process implementations, the runtime scheduler, and the configuration
//! loader are external collaborators consumed through the [`Process`],
//! [`ProcessCluster`], and [`ConfigBlock`] interfaces.
//!
//! ## Example
//!
//! ```
//! use pipewright::{ConfigBlock, Pipeline};
//!
//! # fn demo() -> pipewright::Result<()> {
//! let mut pipeline = Pipeline::new(Some(ConfigBlock::new()))?;
//! // pipeline.add_process(...)? for each process, then:
//! // pipeline.connect("src", "out", "snk", "in")?;
//! // pipeline.setup_pipeline()?;
//! # Ok(())
//! # }
//! ```
//!
//! Assembly is single-threaded and cooperative: no method suspends, and the
//! pipeline is not internally synchronized. Processes and edges are handed to
//! the (possibly parallel) runtime only after setup completes.

pub mod config;
pub mod edge;
pub mod error;
pub mod pipeline;
pub mod port;
pub mod process;

pub use config::{ConfigBlock, ConfigError, ConfigValue};
pub use edge::{Edge, EdgeDatum};
pub use error::{PipelineError, PropagationConflict, Result};
pub use pipeline::Pipeline;
pub use port::{
    Connection, PortAddress, PortFlag, PortFlags, PortFrequency, PortInfo, PortName, PortType,
    ProcessName,
};
pub use process::{AnyProcess, Process, ProcessCluster, ProcessError};
