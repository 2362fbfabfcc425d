//! Port model: names, addresses, types, flags, and per-port metadata.
//!
//! Every process declares its ports through [`PortInfo`]; the pipeline only
//! ever sees ports through this metadata. Addresses and connections are plain
//! value types with structural equality so they can live in the pipeline's
//! planned and pending lists.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Name of a process, unique across processes and clusters in one pipeline.
pub type ProcessName = String;

/// Name of a port, unique per process.
pub type PortName = String;

/// Rational rate of a port relative to its process's core rate.
pub type PortFrequency = Ratio<u64>;

/// Wire/config prefix marking a flow-dependent type variable.
pub const FLOW_DEPENDENT_PREFIX: &str = "_flow_dependent/";

const TYPE_ANY: &str = "_any";
const TYPE_DATA_DEPENDENT: &str = "_data_dependent";

/// The declared type of a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Accepts any concrete type.
    Any,
    /// Output type known only once the owning process has been configured.
    DataDependent,
    /// Type variable; all ports sharing a tag on one process resolve together.
    FlowDependent { tag: String },
    /// A named concrete type.
    Concrete(String),
}

impl PortType {
    pub fn concrete(name: impl Into<String>) -> Self {
        PortType::Concrete(name.into())
    }

    pub fn flow_dependent(tag: impl Into<String>) -> Self {
        PortType::FlowDependent { tag: tag.into() }
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, PortType::Any)
    }

    #[inline]
    pub fn is_data_dependent(&self) -> bool {
        matches!(self, PortType::DataDependent)
    }

    #[inline]
    pub fn is_flow_dependent(&self) -> bool {
        matches!(self, PortType::FlowDependent { .. })
    }

    /// Key under which this type is looked up in `_edge_by_type` config
    /// subblocks, and the encoding used anywhere a type travels as a string.
    pub fn config_key(&self) -> String {
        match self {
            PortType::Any => TYPE_ANY.to_string(),
            PortType::DataDependent => TYPE_DATA_DEPENDENT.to_string(),
            PortType::FlowDependent { tag } => format!("{FLOW_DEPENDENT_PREFIX}{tag}"),
            PortType::Concrete(name) => name.clone(),
        }
    }

    /// Inverse of [`PortType::config_key`].
    pub fn from_config_key(key: &str) -> Self {
        match key {
            TYPE_ANY => PortType::Any,
            TYPE_DATA_DEPENDENT => PortType::DataDependent,
            _ => match key.strip_prefix(FLOW_DEPENDENT_PREFIX) {
                Some(tag) => PortType::flow_dependent(tag),
                None => PortType::concrete(key),
            },
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.config_key())
    }
}

/// Behavioral flags a port may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PortFlag {
    /// The produced data must not be mutated downstream.
    OutputConst,
    /// The consumer intends to mutate the data in place.
    InputMutable,
    /// The input carries data without imposing a scheduling dependency;
    /// feedback loops through such ports are legal.
    InputNoDep,
    /// The port must be wired for setup to succeed.
    Required,
}

/// Flag set for one port.
pub type PortFlags = BTreeSet<PortFlag>;

/// Metadata a process exposes for one of its ports.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_type: PortType,
    pub flags: PortFlags,
    /// Rate relative to the owning process's core rate, if declared.
    /// Frequencies are expected to be positive.
    pub frequency: Option<PortFrequency>,
}

impl PortInfo {
    pub fn new(port_type: PortType) -> Self {
        Self {
            port_type,
            flags: PortFlags::new(),
            frequency: None,
        }
    }

    pub fn with_flag(mut self, flag: PortFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_frequency(mut self, frequency: PortFrequency) -> Self {
        self.frequency = Some(frequency);
        self
    }
}

/// A port on a named process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    pub process: ProcessName,
    pub port: PortName,
}

impl PortAddress {
    pub fn new(process: impl Into<ProcessName>, port: impl Into<PortName>) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
        }
    }

    /// True if the address sits on the named process.
    pub fn is_on(&self, process: &str) -> bool {
        self.process == process
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.process, self.port)
    }
}

/// An ordered pair of port addresses: data flows upstream to downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub upstream: PortAddress,
    pub downstream: PortAddress,
}

impl Connection {
    pub fn new(upstream: PortAddress, downstream: PortAddress) -> Self {
        Self {
            upstream,
            downstream,
        }
    }

    /// True if either end sits on the named process.
    pub fn mentions(&self, process: &str) -> bool {
        self.upstream.is_on(process) || self.downstream.is_on(process)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.upstream, self.downstream)
    }
}
