//! Test data builders for processes and clusters.
//!
//! `MockProcess` implements the full `Process` contract over declared port
//! tables. Flow-dependent ports unify by tag: assigning a type to one port
//! retypes every port on the process sharing that tag. A shared `Recorded`
//! handle lets tests observe lifecycle calls after the process has been
//! boxed into the pipeline.

use pipewright::{
    AnyProcess, Connection, Edge, PortAddress, PortFrequency, PortInfo, PortName, PortType,
    Process, ProcessCluster, ProcessError,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub fn addr(process: &str, port: &str) -> PortAddress {
    PortAddress::new(process, port)
}

pub fn conn(up_process: &str, up_port: &str, down_process: &str, down_port: &str) -> Connection {
    Connection::new(addr(up_process, up_port), addr(down_process, down_port))
}

/// Lifecycle observations shared between a test and its boxed process.
#[derive(Debug, Default)]
pub struct Recorded {
    pub configured: bool,
    pub initialized: bool,
    pub resets: usize,
    pub core_frequency: Option<PortFrequency>,
}

pub type Recorder = Arc<Mutex<Recorded>>;

/// A fully scriptable process for pipeline tests.
pub struct MockProcess {
    name: String,
    inputs: Vec<(PortName, PortInfo)>,
    outputs: Vec<(PortName, PortInfo)>,
    declared_inputs: Vec<(PortName, PortInfo)>,
    declared_outputs: Vec<(PortName, PortInfo)>,
    /// Output types applied when `configure()` runs (data-dependent ports).
    configure_types: Vec<(PortName, PortType)>,
    input_edges: BTreeMap<PortName, Arc<Edge>>,
    output_edges: BTreeMap<PortName, Vec<Arc<Edge>>>,
    recorded: Recorder,
}

impl MockProcess {
    pub fn recorder(&self) -> Recorder {
        Arc::clone(&self.recorded)
    }

    pub fn into_any(self) -> AnyProcess {
        AnyProcess::Process(Box::new(self))
    }

    fn port_mut<'a>(
        table: &'a mut [(PortName, PortInfo)],
        port: &str,
    ) -> Option<&'a mut PortInfo> {
        table
            .iter_mut()
            .find(|(name, _)| name == port)
            .map(|(_, info)| info)
    }

    fn port<'a>(table: &'a [(PortName, PortInfo)], port: &str) -> Option<&'a PortInfo> {
        table
            .iter()
            .find(|(name, _)| name == port)
            .map(|(_, info)| info)
    }

    /// Assign `port_type` to `port` in `table`, unifying every port (input or
    /// output) that shares the target's flow tag. Returns false when the port
    /// is missing or already concretely typed to something else.
    fn assign_type(&mut self, input_side: bool, port: &str, port_type: PortType) -> bool {
        let table = if input_side {
            &self.inputs
        } else {
            &self.outputs
        };
        let Some(info) = Self::port(table, port) else {
            return false;
        };

        match info.port_type.clone() {
            current if current == port_type => true,
            PortType::FlowDependent { tag } => {
                for (_, info) in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
                    if info.port_type == (PortType::FlowDependent { tag: tag.clone() }) {
                        info.port_type = port_type.clone();
                    }
                }
                true
            }
            PortType::Any | PortType::DataDependent => {
                let table = if input_side {
                    &mut self.inputs
                } else {
                    &mut self.outputs
                };
                if let Some(info) = Self::port_mut(table, port) {
                    info.port_type = port_type;
                }
                true
            }
            _ => false,
        }
    }
}

impl Process for MockProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_ports(&self) -> Vec<PortName> {
        self.inputs.iter().map(|(name, _)| name.clone()).collect()
    }

    fn output_ports(&self) -> Vec<PortName> {
        self.outputs.iter().map(|(name, _)| name.clone()).collect()
    }

    fn input_port_info(&self, port: &str) -> Option<PortInfo> {
        Self::port(&self.inputs, port).cloned()
    }

    fn output_port_info(&self, port: &str) -> Option<PortInfo> {
        Self::port(&self.outputs, port).cloned()
    }

    fn configure(&mut self) -> Result<(), ProcessError> {
        let resolutions = self.configure_types.clone();
        for (port, port_type) in resolutions {
            if let Some(info) = Self::port_mut(&mut self.outputs, &port) {
                info.port_type = port_type;
            }
        }
        self.recorded.lock().unwrap().configured = true;
        Ok(())
    }

    fn init(&mut self) -> Result<(), ProcessError> {
        self.recorded.lock().unwrap().initialized = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.inputs = self.declared_inputs.clone();
        self.outputs = self.declared_outputs.clone();
        self.input_edges.clear();
        self.output_edges.clear();
        let mut recorded = self.recorded.lock().unwrap();
        recorded.resets += 1;
        recorded.configured = false;
        recorded.initialized = false;
        recorded.core_frequency = None;
    }

    fn set_input_port_type(&mut self, port: &str, port_type: PortType) -> bool {
        self.assign_type(true, port, port_type)
    }

    fn set_output_port_type(&mut self, port: &str, port_type: PortType) -> bool {
        self.assign_type(false, port, port_type)
    }

    fn connect_input_port(&mut self, port: &str, edge: Arc<Edge>) -> Result<(), ProcessError> {
        if Self::port(&self.inputs, port).is_none() {
            return Err(ProcessError::NoSuchPort {
                process: self.name.clone(),
                port: port.to_string(),
            });
        }
        if self.input_edges.contains_key(port) {
            return Err(ProcessError::PortAlreadyConnected {
                process: self.name.clone(),
                port: port.to_string(),
            });
        }
        self.input_edges.insert(port.to_string(), edge);
        Ok(())
    }

    fn connect_output_port(&mut self, port: &str, edge: Arc<Edge>) -> Result<(), ProcessError> {
        if Self::port(&self.outputs, port).is_none() {
            return Err(ProcessError::NoSuchPort {
                process: self.name.clone(),
                port: port.to_string(),
            });
        }
        self.output_edges.entry(port.to_string()).or_default().push(edge);
        Ok(())
    }

    fn set_core_frequency(&mut self, frequency: PortFrequency) {
        self.recorded.lock().unwrap().core_frequency = Some(frequency);
    }
}

/// Builder for [`MockProcess`].
pub struct MockProcessBuilder {
    name: String,
    inputs: Vec<(PortName, PortInfo)>,
    outputs: Vec<(PortName, PortInfo)>,
    configure_types: Vec<(PortName, PortType)>,
}

impl MockProcessBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            configure_types: Vec::new(),
        }
    }

    pub fn input(self, port: &str, port_type: PortType) -> Self {
        self.input_with(port, PortInfo::new(port_type))
    }

    pub fn input_with(mut self, port: &str, info: PortInfo) -> Self {
        self.inputs.push((port.to_string(), info));
        self
    }

    pub fn output(self, port: &str, port_type: PortType) -> Self {
        self.output_with(port, PortInfo::new(port_type))
    }

    pub fn output_with(mut self, port: &str, info: PortInfo) -> Self {
        self.outputs.push((port.to_string(), info));
        self
    }

    /// Resolve a data-dependent output port to `port_type` when `configure()`
    /// runs.
    pub fn resolve_on_configure(mut self, port: &str, port_type: PortType) -> Self {
        self.configure_types.push((port.to_string(), port_type));
        self
    }

    pub fn build(self) -> MockProcess {
        MockProcess {
            name: self.name,
            declared_inputs: self.inputs.clone(),
            declared_outputs: self.outputs.clone(),
            inputs: self.inputs,
            outputs: self.outputs,
            configure_types: self.configure_types,
            input_edges: BTreeMap::new(),
            output_edges: BTreeMap::new(),
            recorded: Recorder::default(),
        }
    }

    pub fn build_any(self) -> AnyProcess {
        self.build().into_any()
    }
}

/// A scriptable cluster: children plus internal wiring and port mappings.
pub struct MockCluster {
    name: String,
    children: Vec<AnyProcess>,
    internal: Vec<Connection>,
    input_maps: Vec<Connection>,
    output_maps: Vec<Connection>,
}

impl Process for MockCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_ports(&self) -> Vec<PortName> {
        let mut ports: Vec<PortName> = self
            .input_maps
            .iter()
            .map(|mapping| mapping.upstream.port.clone())
            .collect();
        ports.dedup();
        ports
    }

    fn output_ports(&self) -> Vec<PortName> {
        self.output_maps
            .iter()
            .map(|mapping| mapping.downstream.port.clone())
            .collect()
    }

    fn input_port_info(&self, port: &str) -> Option<PortInfo> {
        self.input_ports()
            .iter()
            .any(|name| name == port)
            .then(|| PortInfo::new(PortType::Any))
    }

    fn output_port_info(&self, port: &str) -> Option<PortInfo> {
        self.output_ports()
            .iter()
            .any(|name| name == port)
            .then(|| PortInfo::new(PortType::Any))
    }

    fn set_input_port_type(&mut self, _port: &str, _port_type: PortType) -> bool {
        false
    }

    fn set_output_port_type(&mut self, _port: &str, _port_type: PortType) -> bool {
        false
    }

    fn connect_input_port(&mut self, port: &str, _edge: Arc<Edge>) -> Result<(), ProcessError> {
        // Cluster ports are expanded away before edges exist.
        Err(ProcessError::NoSuchPort {
            process: self.name.clone(),
            port: port.to_string(),
        })
    }

    fn connect_output_port(&mut self, port: &str, _edge: Arc<Edge>) -> Result<(), ProcessError> {
        Err(ProcessError::NoSuchPort {
            process: self.name.clone(),
            port: port.to_string(),
        })
    }

    fn set_core_frequency(&mut self, _frequency: PortFrequency) {}
}

impl ProcessCluster for MockCluster {
    fn take_processes(&mut self) -> Vec<AnyProcess> {
        std::mem::take(&mut self.children)
    }

    fn internal_connections(&self) -> Vec<Connection> {
        self.internal.clone()
    }

    fn input_mappings(&self) -> Vec<Connection> {
        self.input_maps.clone()
    }

    fn output_mappings(&self) -> Vec<Connection> {
        self.output_maps.clone()
    }
}

/// Builder for [`MockCluster`].
pub struct MockClusterBuilder {
    name: String,
    children: Vec<AnyProcess>,
    internal: Vec<Connection>,
    input_maps: Vec<Connection>,
    output_maps: Vec<Connection>,
}

impl MockClusterBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            internal: Vec::new(),
            input_maps: Vec::new(),
            output_maps: Vec::new(),
        }
    }

    pub fn child(mut self, child: AnyProcess) -> Self {
        self.children.push(child);
        self
    }

    pub fn internal(mut self, connection: Connection) -> Self {
        self.internal.push(connection);
        self
    }

    /// Map the cluster input port `port` to an inner input port.
    pub fn input_map(mut self, port: &str, inner_process: &str, inner_port: &str) -> Self {
        self.input_maps.push(Connection::new(
            addr(&self.name, port),
            addr(inner_process, inner_port),
        ));
        self
    }

    /// Map an inner output port to the cluster output port `port`.
    pub fn output_map(mut self, inner_process: &str, inner_port: &str, port: &str) -> Self {
        self.output_maps.push(Connection::new(
            addr(inner_process, inner_port),
            addr(&self.name, port),
        ));
        self
    }

    pub fn build_any(self) -> AnyProcess {
        AnyProcess::Cluster(Box::new(MockCluster {
            name: self.name,
            children: self.children,
            internal: self.internal,
            input_maps: self.input_maps,
            output_maps: self.output_maps,
        }))
    }
}
