//! Pure per-connection classification.
//!
//! `connect` decides what to do with a connection from the two port types
//! alone; the bookkeeping (which pending list it lands in) happens in the
//! façade. Keeping the decision side-effect free makes the rules testable in
//! isolation.

use crate::port::{Connection, PortFlag, PortFlags, PortType};

/// Which end of a deferred cluster connection is the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClusterEnd {
    Upstream,
    Downstream,
}

/// A connection deferred until cluster expansion.
#[derive(Debug, Clone)]
pub(crate) struct ClusterConnection {
    pub connection: Connection,
    pub end: ClusterEnd,
}

/// Which side of a pinned connection receives the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PinDirection {
    PushUpstream,
    PushDownstream,
}

/// A deferred connection with exactly one flow-dependent end.
#[derive(Debug, Clone)]
pub(crate) struct TypePinning {
    pub connection: Connection,
    pub direction: PinDirection,
}

/// Outcome of classifying one connection's port types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classified {
    /// Types agree, or one side accepts anything; resolve immediately.
    Compatible,
    /// Upstream is data-dependent; defer until its process configures.
    DataDependent,
    /// Both ends are flow-dependent; defer until propagation reaches one.
    Untyped,
    /// Exactly one end is flow-dependent; the other side's type pins it.
    Pinned(PinDirection),
    /// Concrete types disagree.
    Mismatch,
}

pub(crate) fn classify(up_type: &PortType, down_type: &PortType) -> Classified {
    if up_type.is_data_dependent() {
        return Classified::DataDependent;
    }

    let up_flow = up_type.is_flow_dependent();
    let down_flow = down_type.is_flow_dependent();

    if up_flow && down_flow {
        Classified::Untyped
    } else if up_flow {
        Classified::Pinned(PinDirection::PushUpstream)
    } else if down_flow {
        Classified::Pinned(PinDirection::PushDownstream)
    } else if !up_type.is_any() && !down_type.is_any() && up_type != down_type {
        Classified::Mismatch
    } else {
        Classified::Compatible
    }
}

/// Const outputs may not feed mutable inputs.
pub(crate) fn flags_compatible(up_flags: &PortFlags, down_flags: &PortFlags) -> bool {
    !(up_flags.contains(&PortFlag::OutputConst) && down_flags.contains(&PortFlag::InputMutable))
}
