//! Pipeline façade and assembly engine.
//!
//! The [`Pipeline`] accumulates processes, clusters, and planned connections
//! while building; `setup_pipeline` then drives the assembly phases in a
//! fixed order:
//!
//! 1. cluster expansion ([`cluster`])
//! 2. data-dependent type resolution, pinning, and propagation ([`resolve`])
//! 3. edge construction ([`edges`])
//! 4. required-port, orphan, and DAG verification ([`check`])
//! 5. process initialization and frequency reconciliation ([`frequency`])
//!
//! A failure in any phase aborts setup and freezes the pipeline in its failed
//! state; `reset` restores the building state and replays the planned
//! connections verbatim.

mod check;
mod classify;
mod cluster;
mod edges;
mod frequency;
mod resolve;

use crate::config::ConfigBlock;
use crate::edge::Edge;
use crate::error::{PipelineError, Result};
use crate::port::{Connection, PortAddress, PortInfo, ProcessName};
use crate::process::{AnyProcess, Process, ProcessCluster};
use classify::{Classified, ClusterConnection, ClusterEnd, TypePinning};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

pub(crate) const CONFIG_EDGE: &str = "_edge";
pub(crate) const CONFIG_EDGE_TYPE: &str = "_edge_by_type";
pub(crate) const CONFIG_EDGE_CONN: &str = "_edge_by_conn";

/// Connections deferred during building, drained by the setup phases. All
/// four lists are empty after a successful setup.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    /// Upstream port is data-dependent; waits for `configure()`.
    data_dep: Vec<Connection>,
    /// One end is a cluster port; waits for expansion.
    cluster: Vec<ClusterConnection>,
    /// Both ends are flow-dependent; waits for propagation.
    untyped: Vec<Connection>,
    /// Exactly one end is flow-dependent; waits for pinning.
    pinnings: Vec<TypePinning>,
}

impl Pending {
    /// Drop every deferred connection matching the predicate.
    fn purge(&mut self, gone: impl Fn(&Connection) -> bool) {
        self.data_dep.retain(|c| !gone(c));
        self.untyped.retain(|c| !gone(c));
        self.cluster.retain(|c| !gone(&c.connection));
        self.pinnings.retain(|p| !gone(&p.connection));
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("process_order", &self.process_order)
            .field("cluster_order", &self.cluster_order)
            .field("planned_connections", &self.planned_connections)
            .field("connections", &self.connections)
            .field("pending", &self.pending)
            .field("setup", &self.setup)
            .field("setup_in_progress", &self.setup_in_progress)
            .field("setup_successful", &self.setup_successful)
            .field("running", &self.running)
            .finish()
    }
}

/// A dataflow pipeline under assembly, and the resolved graph afterwards.
pub struct Pipeline {
    config: ConfigBlock,

    /// User-visible connection list; append-only while building, replayed
    /// verbatim on reset.
    planned_connections: Vec<Connection>,
    /// Resolved process-to-process connections, indexed by position.
    connections: Vec<Connection>,

    process_map: HashMap<ProcessName, Box<dyn Process>>,
    /// Registration order of `process_map` keys.
    process_order: Vec<ProcessName>,
    cluster_map: HashMap<ProcessName, Box<dyn ProcessCluster>>,
    cluster_order: Vec<ProcessName>,
    /// Enclosing cluster per registered name; `None` for top-level entries.
    process_parent_map: HashMap<ProcessName, Option<ProcessName>>,

    /// Edge per resolved connection index.
    edge_map: BTreeMap<usize, Arc<Edge>>,

    pending: Pending,

    setup: bool,
    setup_in_progress: bool,
    setup_successful: bool,
    running: bool,
}

impl Pipeline {
    /// Create an empty pipeline. `None` stands for an absent configuration
    /// tree and is rejected.
    pub fn new(config: Option<ConfigBlock>) -> Result<Self> {
        let config = config.ok_or(PipelineError::NullPipelineConfig)?;
        Ok(Self {
            config,
            planned_connections: Vec::new(),
            connections: Vec::new(),
            process_map: HashMap::new(),
            process_order: Vec::new(),
            cluster_map: HashMap::new(),
            cluster_order: Vec::new(),
            process_parent_map: HashMap::new(),
            edge_map: BTreeMap::new(),
            pending: Pending::default(),
            setup: false,
            setup_in_progress: false,
            setup_successful: false,
            running: false,
        })
    }

    // ── Structural mutation ──

    /// Register a process or cluster. Cluster children are registered
    /// recursively, then the cluster's internal connections are wired through
    /// the normal `connect` path so flag and type checks apply uniformly.
    pub fn add_process(&mut self, process: impl Into<AnyProcess>) -> Result<()> {
        self.add_entry(process.into(), None)
    }

    fn add_entry(&mut self, entry: AnyProcess, parent: Option<&str>) -> Result<()> {
        let name = entry.name().to_string();
        if name.is_empty() {
            return Err(PipelineError::NullProcess);
        }
        if self.setup {
            return Err(PipelineError::AddAfterSetup { name });
        }
        if self.process_map.contains_key(&name) || self.cluster_map.contains_key(&name) {
            return Err(PipelineError::DuplicateName { name });
        }

        match entry {
            AnyProcess::Cluster(mut cluster) => {
                let children = cluster.take_processes();
                let internal = cluster.internal_connections();

                self.cluster_map.insert(name.clone(), cluster);
                self.cluster_order.push(name.clone());
                self.process_parent_map
                    .insert(name.clone(), parent.map(str::to_string));

                for child in children {
                    self.add_entry(child, Some(&name))?;
                }
                for connection in internal {
                    self.connect(
                        &connection.upstream.process,
                        &connection.upstream.port,
                        &connection.downstream.process,
                        &connection.downstream.port,
                    )?;
                }
                tracing::debug!(cluster = %name, "cluster registered");
            }
            AnyProcess::Process(process) => {
                self.process_map.insert(name.clone(), process);
                self.process_order.push(name.clone());
                self.process_parent_map
                    .insert(name, parent.map(str::to_string));
            }
        }
        Ok(())
    }

    /// Remove a process or cluster (recursively) and forget every planned or
    /// pending connection that mentions it.
    pub fn remove_process(&mut self, name: &str) -> Result<()> {
        if self.setup {
            return Err(PipelineError::RemoveAfterSetup {
                name: name.to_string(),
            });
        }

        if self.cluster_map.contains_key(name) {
            let children: Vec<ProcessName> = self
                .process_parent_map
                .iter()
                .filter(|(_, parent)| parent.as_deref() == Some(name))
                .map(|(child, _)| child.clone())
                .collect();
            for child in children {
                self.remove_process(&child)?;
            }
            self.cluster_map.remove(name);
            self.cluster_order.retain(|n| n != name);
            self.process_parent_map.remove(name);
            self.forget_connections_with(name);
            return Ok(());
        }

        if self.process_map.remove(name).is_none() {
            return Err(PipelineError::NoSuchProcess {
                name: name.to_string(),
            });
        }
        self.process_order.retain(|n| n != name);
        self.process_parent_map.remove(name);
        self.forget_connections_with(name);
        Ok(())
    }

    fn forget_connections_with(&mut self, name: &str) {
        let gone = |c: &Connection| c.mentions(name);
        self.planned_connections.retain(|c| !gone(c));
        self.connections.retain(|c| !gone(c));
        self.pending.purge(gone);
    }

    /// Plan a connection from an output port to an input port.
    ///
    /// While building, the connection is recorded in the planned list and
    /// then classified: compatible connections resolve immediately, anything
    /// involving a cluster, a data-dependent output, or a flow-dependent port
    /// is deferred to the matching pending list. Incompatible flags or
    /// concrete types fail now.
    pub fn connect(
        &mut self,
        upstream_name: &str,
        upstream_port: &str,
        downstream_name: &str,
        downstream_port: &str,
    ) -> Result<()> {
        let connection = Connection::new(
            PortAddress::new(upstream_name, upstream_port),
            PortAddress::new(downstream_name, downstream_port),
        );

        if self.setup && !self.setup_in_progress {
            return Err(PipelineError::ConnectionAfterSetup { connection });
        }
        if !self.setup_in_progress {
            self.planned_connections.push(connection.clone());
        }

        // Cluster endpoints defer until expansion maps them to real processes.
        if self.cluster_map.contains_key(upstream_name) {
            self.pending.cluster.push(ClusterConnection {
                connection,
                end: ClusterEnd::Upstream,
            });
            return Ok(());
        }
        if self.cluster_map.contains_key(downstream_name) {
            self.pending.cluster.push(ClusterConnection {
                connection,
                end: ClusterEnd::Downstream,
            });
            return Ok(());
        }

        let up_info = self.output_port_info(&connection.upstream)?;
        let down_info = self.input_port_info(&connection.downstream)?;

        if !classify::flags_compatible(&up_info.flags, &down_info.flags) {
            return Err(PipelineError::ConnectionFlagMismatch { connection });
        }

        match classify::classify(&up_info.port_type, &down_info.port_type) {
            Classified::DataDependent => self.pending.data_dep.push(connection),
            Classified::Untyped => self.pending.untyped.push(connection),
            Classified::Pinned(direction) => self.pending.pinnings.push(TypePinning {
                connection,
                direction,
            }),
            Classified::Mismatch => {
                return Err(PipelineError::ConnectionTypeMismatch {
                    connection,
                    upstream_type: up_info.port_type,
                    downstream_type: down_info.port_type,
                })
            }
            Classified::Compatible => self.connections.push(connection),
        }
        Ok(())
    }

    /// Retract a planned connection. Only valid before setup.
    pub fn disconnect(
        &mut self,
        upstream_name: &str,
        upstream_port: &str,
        downstream_name: &str,
        downstream_port: &str,
    ) -> Result<()> {
        let connection = Connection::new(
            PortAddress::new(upstream_name, upstream_port),
            PortAddress::new(downstream_name, downstream_port),
        );
        if self.setup {
            return Err(PipelineError::DisconnectionAfterSetup { connection });
        }

        let same = |c: &Connection| *c == connection;
        self.planned_connections.retain(|c| !same(c));
        self.connections.retain(|c| !same(c));
        self.pending.purge(same);
        Ok(())
    }

    // ── Setup orchestration ──

    /// Resolve, verify, and materialize the planned graph. On failure the
    /// pipeline stays set up but unsuccessful; `reset` is the only way back.
    pub fn setup_pipeline(&mut self) -> Result<()> {
        if self.setup {
            return Err(PipelineError::DuplicateSetup);
        }
        self.check_for_processes()?;

        // No turning back: processes are mutated from here on.
        self.setup = true;
        self.setup_in_progress = true;
        self.setup_successful = false;

        let result = self.run_setup_phases();
        self.setup_in_progress = false;

        match &result {
            Ok(()) => {
                self.setup_successful = true;
                tracing::info!(
                    processes = self.process_map.len(),
                    connections = self.connections.len(),
                    "pipeline setup complete"
                );
            }
            Err(error) => {
                tracing::warn!(%error, "pipeline setup failed");
            }
        }
        result
    }

    fn run_setup_phases(&mut self) -> Result<()> {
        self.map_cluster_connections()?;
        self.configure_processes()?;
        self.check_for_data_dep_ports()?;
        self.propagate_pinned_types()?;
        self.check_for_untyped_ports()?;
        self.make_connections()?;
        self.check_for_required_ports()?;
        self.check_for_dag()?;
        self.initialize_processes()?;
        self.check_port_frequencies()?;
        Ok(())
    }

    fn check_for_processes(&self) -> Result<()> {
        if self.process_map.is_empty() {
            return Err(PipelineError::NoProcesses);
        }
        Ok(())
    }

    fn initialize_processes(&mut self) -> Result<()> {
        let names = self.process_order.clone();
        for name in names {
            self.process_mut(&name)?.init()?;
        }
        Ok(())
    }

    // ── Lifecycle ──

    pub fn is_setup(&self) -> bool {
        self.setup
    }

    pub fn setup_successful(&self) -> bool {
        self.setup_successful
    }

    /// Return to the building state: reset every process, clear all resolved
    /// structures, and replay the planned connections verbatim.
    pub fn reset(&mut self) -> Result<()> {
        if self.running {
            return Err(PipelineError::ResetRunningPipeline);
        }

        self.setup = false;
        self.setup_successful = false;

        for process in self.process_map.values_mut() {
            process.reset();
        }

        self.connections.clear();
        self.edge_map.clear();
        self.pending = Pending::default();

        self.setup_in_progress = true;
        let result = self.replay_planned_connections();
        self.setup_in_progress = false;
        result
    }

    fn replay_planned_connections(&mut self) -> Result<()> {
        let planned = self.planned_connections.clone();
        for connection in planned {
            self.connect(
                &connection.upstream.process,
                &connection.upstream.port,
                &connection.downstream.process,
                &connection.downstream.port,
            )?;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure_setup()?;
        if self.running {
            return Err(PipelineError::Internal("pipeline is already running"));
        }
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Err(PipelineError::Internal(
                "start/stop pipeline state tracking failed",
            ));
        }
        self.running = false;
        Ok(())
    }

    // ── Registry queries ──

    /// Registered process names, in registration order. Cluster children are
    /// included; clusters themselves are not.
    pub fn process_names(&self) -> Vec<ProcessName> {
        self.process_order.clone()
    }

    pub fn process_by_name(&self, name: &str) -> Result<&dyn Process> {
        self.process_map
            .get(name)
            .map(|p| p.as_ref() as &dyn Process)
            .ok_or_else(|| PipelineError::NoSuchProcess {
                name: name.to_string(),
            })
    }

    /// The enclosing cluster of a registered name, or `None` for top-level
    /// entries.
    pub fn parent_cluster(&self, name: &str) -> Result<Option<&str>> {
        self.process_parent_map
            .get(name)
            .map(|parent| parent.as_deref())
            .ok_or_else(|| PipelineError::NoSuchProcess {
                name: name.to_string(),
            })
    }

    pub fn cluster_names(&self) -> Vec<ProcessName> {
        self.cluster_order.clone()
    }

    pub fn cluster_by_name(&self, name: &str) -> Result<&dyn ProcessCluster> {
        self.cluster_map
            .get(name)
            .map(|c| c.as_ref() as &dyn ProcessCluster)
            .ok_or_else(|| PipelineError::NoSuchProcess {
                name: name.to_string(),
            })
    }

    // ── Planned-connection queries (usable before setup) ──

    /// Downstream addresses every planned connection from this port reaches.
    pub fn connections_from_addr(&self, name: &str, port: &str) -> Vec<PortAddress> {
        self.planned_connections
            .iter()
            .filter(|c| c.upstream.is_on(name) && c.upstream.port == port)
            .map(|c| c.downstream.clone())
            .collect()
    }

    /// The planned sender feeding this port, if any.
    pub fn connection_to_addr(&self, name: &str, port: &str) -> Option<PortAddress> {
        self.planned_connections
            .iter()
            .find(|c| c.downstream.is_on(name) && c.downstream.port == port)
            .map(|c| c.upstream.clone())
    }

    // ── Resolved-graph queries (require setup) ──

    pub fn upstream_for_process(&self, name: &str) -> Result<Vec<&dyn Process>> {
        self.ensure_setup()?;
        let names: BTreeSet<&ProcessName> = self
            .connections
            .iter()
            .filter(|c| c.downstream.is_on(name))
            .map(|c| &c.upstream.process)
            .collect();
        names
            .into_iter()
            .map(|n| self.process_by_name(n))
            .collect()
    }

    pub fn upstream_for_port(&self, name: &str, port: &str) -> Result<Option<&dyn Process>> {
        self.ensure_setup()?;
        match self
            .connections
            .iter()
            .find(|c| c.downstream.is_on(name) && c.downstream.port == port)
        {
            Some(connection) => Ok(Some(self.process_by_name(&connection.upstream.process)?)),
            None => Ok(None),
        }
    }

    pub fn downstream_for_process(&self, name: &str) -> Result<Vec<&dyn Process>> {
        self.ensure_setup()?;
        let names: BTreeSet<&ProcessName> = self
            .connections
            .iter()
            .filter(|c| c.upstream.is_on(name))
            .map(|c| &c.downstream.process)
            .collect();
        names
            .into_iter()
            .map(|n| self.process_by_name(n))
            .collect()
    }

    pub fn downstream_for_port(&self, name: &str, port: &str) -> Result<Vec<&dyn Process>> {
        self.ensure_setup()?;
        let names: BTreeSet<&ProcessName> = self
            .connections
            .iter()
            .filter(|c| c.upstream.is_on(name) && c.upstream.port == port)
            .map(|c| &c.downstream.process)
            .collect();
        names
            .into_iter()
            .map(|n| self.process_by_name(n))
            .collect()
    }

    /// The resolved address feeding this input port, if any.
    pub fn sender_for_port(&self, name: &str, port: &str) -> Result<Option<PortAddress>> {
        self.ensure_setup()?;
        Ok(self
            .connections
            .iter()
            .find(|c| c.downstream.is_on(name) && c.downstream.port == port)
            .map(|c| c.upstream.clone()))
    }

    /// The resolved addresses this output port feeds.
    pub fn receivers_for_port(&self, name: &str, port: &str) -> Result<Vec<PortAddress>> {
        self.ensure_setup()?;
        Ok(self
            .connections
            .iter()
            .filter(|c| c.upstream.is_on(name) && c.upstream.port == port)
            .map(|c| c.downstream.clone())
            .collect())
    }

    // ── Edge queries (require setup) ──

    pub fn edge_for_connection(
        &self,
        upstream_name: &str,
        upstream_port: &str,
        downstream_name: &str,
        downstream_port: &str,
    ) -> Result<Option<Arc<Edge>>> {
        self.ensure_setup()?;
        for (index, connection) in self.connections.iter().enumerate() {
            if connection.upstream.is_on(upstream_name)
                && connection.upstream.port == upstream_port
                && connection.downstream.is_on(downstream_name)
                && connection.downstream.port == downstream_port
            {
                return Ok(self.edge_map.get(&index).cloned());
            }
        }
        Ok(None)
    }

    pub fn input_edges_for_process(&self, name: &str) -> Result<Vec<Arc<Edge>>> {
        self.ensure_setup()?;
        Ok(self
            .edge_map
            .iter()
            .filter(|(index, _)| self.connections[**index].downstream.is_on(name))
            .map(|(_, edge)| Arc::clone(edge))
            .collect())
    }

    pub fn input_edge_for_port(&self, name: &str, port: &str) -> Result<Option<Arc<Edge>>> {
        self.ensure_setup()?;
        Ok(self
            .edge_map
            .iter()
            .find(|(index, _)| {
                let downstream = &self.connections[**index].downstream;
                downstream.is_on(name) && downstream.port == port
            })
            .map(|(_, edge)| Arc::clone(edge)))
    }

    pub fn output_edges_for_process(&self, name: &str) -> Result<Vec<Arc<Edge>>> {
        self.ensure_setup()?;
        Ok(self
            .edge_map
            .iter()
            .filter(|(index, _)| self.connections[**index].upstream.is_on(name))
            .map(|(_, edge)| Arc::clone(edge))
            .collect())
    }

    pub fn output_edges_for_port(&self, name: &str, port: &str) -> Result<Vec<Arc<Edge>>> {
        self.ensure_setup()?;
        Ok(self
            .edge_map
            .iter()
            .filter(|(index, _)| {
                let upstream = &self.connections[**index].upstream;
                upstream.is_on(name) && upstream.port == port
            })
            .map(|(_, edge)| Arc::clone(edge))
            .collect())
    }

    // ── Internal helpers shared by the phase modules ──

    fn ensure_setup(&self) -> Result<()> {
        if !self.setup {
            return Err(PipelineError::PipelineNotSetup);
        }
        if !self.setup_in_progress && !self.setup_successful {
            return Err(PipelineError::PipelineNotReady);
        }
        Ok(())
    }

    fn process_mut(&mut self, name: &str) -> Result<&mut Box<dyn Process>> {
        self.process_map
            .get_mut(name)
            .ok_or_else(|| PipelineError::NoSuchProcess {
                name: name.to_string(),
            })
    }

    fn input_port_info(&self, address: &PortAddress) -> Result<PortInfo> {
        let process = self.process_by_name(&address.process)?;
        process
            .input_port_info(&address.port)
            .ok_or_else(|| PipelineError::NoSuchPort {
                process: address.process.clone(),
                port: address.port.clone(),
            })
    }

    fn output_port_info(&self, address: &PortAddress) -> Result<PortInfo> {
        let process = self.process_by_name(&address.process)?;
        process
            .output_port_info(&address.port)
            .ok_or_else(|| PipelineError::NoSuchPort {
                process: address.process.clone(),
                port: address.port.clone(),
            })
    }

    /// Re-run `connect` for an already-known connection, letting it
    /// re-classify with the current port types.
    fn reconnect(&mut self, connection: &Connection) -> Result<()> {
        self.connect(
            &connection.upstream.process,
            &connection.upstream.port,
            &connection.downstream.process,
            &connection.downstream.port,
        )
    }
}
