//! Deferred port-type resolution.
//!
//! Three phases turn every pending connection into a concrete-typed one:
//!
//! - **Phase A** (`configure_processes`): configure each process in
//!   registration order, then re-classify the data-dependent connections its
//!   outputs can now answer for.
//! - **Phase B** (`propagate_pinned_types`): copy the concrete side of each
//!   pinning onto its flow-dependent side, then spread the new type across
//!   the untyped subgraph by BFS. Re-classification may produce new pinnings,
//!   so the phase repeats to a fixpoint.
//! - **Phase C** (`check_for_untyped_ports`): anything still untyped had no
//!   seed and is an error.
//!
//! The BFS reports conflicts as `Propagation` results; the phase boundary
//! wraps them once into the externally visible cascade error.

use super::classify::{PinDirection, TypePinning};
use super::Pipeline;
use crate::error::{PipelineError, PropagationConflict, Result};
use crate::port::{Connection, PortAddress, PortType};
use std::collections::VecDeque;

impl Pipeline {
    // ── Phase A ──

    pub(super) fn configure_processes(&mut self) -> Result<()> {
        let names = self.process_order.clone();
        for name in names {
            self.process_mut(&name)?.configure()?;
            tracing::debug!(process = %name, "process configured");

            let deferred = std::mem::take(&mut self.pending.data_dep);
            for connection in deferred {
                if !connection.upstream.is_on(&name) {
                    self.pending.data_dep.push(connection);
                    continue;
                }
                let info = self.output_port_info(&connection.upstream)?;
                if info.port_type.is_data_dependent() {
                    return Err(PipelineError::UntypedDataDependent {
                        address: connection.upstream,
                    });
                }
                self.reconnect(&connection)?;
            }
        }
        Ok(())
    }

    pub(super) fn check_for_data_dep_ports(&self) -> Result<()> {
        if !self.pending.data_dep.is_empty() {
            return Err(PipelineError::Internal(
                "data-dependent connection tracking failed",
            ));
        }
        Ok(())
    }

    // ── Phase B ──

    pub(super) fn propagate_pinned_types(&mut self) -> Result<()> {
        while !self.pending.pinnings.is_empty() {
            let pinnings = std::mem::take(&mut self.pending.pinnings);
            for TypePinning {
                connection,
                direction,
            } in pinnings
            {
                let (seed, seed_type) = match direction {
                    PinDirection::PushUpstream => {
                        let port_type = self.input_port_info(&connection.downstream)?.port_type;
                        let accepted = self
                            .process_mut(&connection.upstream.process)?
                            .set_output_port_type(&connection.upstream.port, port_type.clone());
                        if !accepted {
                            return Err(PipelineError::ConnectionDependentType {
                                connection,
                                port_type,
                                push_upstream: true,
                            });
                        }
                        (connection.upstream.clone(), port_type)
                    }
                    PinDirection::PushDownstream => {
                        let port_type = self.output_port_info(&connection.upstream)?.port_type;
                        let accepted = self
                            .process_mut(&connection.downstream.process)?
                            .set_input_port_type(&connection.downstream.port, port_type.clone());
                        if !accepted {
                            return Err(PipelineError::ConnectionDependentType {
                                connection,
                                port_type,
                                push_upstream: false,
                            });
                        }
                        (connection.downstream.clone(), port_type)
                    }
                };

                tracing::debug!(address = %seed, port_type = %seed_type, "port type pinned");

                match self.propagate(&seed) {
                    Err(PipelineError::Propagation { conflict }) => {
                        return Err(PipelineError::ConnectionDependentTypeCascade {
                            pinned: seed,
                            pinned_type: seed_type,
                            conflict,
                        });
                    }
                    other => other?,
                }

                // Retry the pinned connection; it re-classifies as concrete.
                self.reconnect(&connection)?;
            }
        }
        Ok(())
    }

    /// Spread resolved types from `root` across the untyped connections.
    ///
    /// BFS over processes, FIFO so the walk terminates. On visiting a
    /// process, every untyped connection touching it on a now-concrete port
    /// pushes that type to its far side, re-classifies, and enqueues the far
    /// process; the rest are put back.
    fn propagate(&mut self, root: &PortAddress) -> Result<()> {
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(root.process.clone());

        while let Some(name) = queue.pop_front() {
            let deferred = std::mem::take(&mut self.pending.untyped);
            for connection in deferred {
                let mut resolved = false;

                if connection.downstream.is_on(&name) {
                    let port_type = self.input_port_info(&connection.downstream)?.port_type;
                    if !port_type.is_flow_dependent() {
                        self.push_type_upstream(&connection, port_type)?;
                        queue.push_back(connection.upstream.process.clone());
                        resolved = true;
                    }
                } else if connection.upstream.is_on(&name) {
                    let port_type = self.output_port_info(&connection.upstream)?.port_type;
                    if !port_type.is_flow_dependent() {
                        self.push_type_downstream(&connection, port_type)?;
                        queue.push_back(connection.downstream.process.clone());
                        resolved = true;
                    }
                }

                if !resolved {
                    self.pending.untyped.push(connection);
                }
            }
        }
        Ok(())
    }

    fn push_type_upstream(&mut self, connection: &Connection, port_type: PortType) -> Result<()> {
        let accepted = self
            .process_mut(&connection.upstream.process)?
            .set_output_port_type(&connection.upstream.port, port_type.clone());
        if !accepted {
            return Err(PipelineError::Propagation {
                conflict: PropagationConflict {
                    connection: connection.clone(),
                    port_type,
                    push_upstream: true,
                },
            });
        }
        self.reconnect(connection)
    }

    fn push_type_downstream(
        &mut self,
        connection: &Connection,
        port_type: PortType,
    ) -> Result<()> {
        let accepted = self
            .process_mut(&connection.downstream.process)?
            .set_input_port_type(&connection.downstream.port, port_type.clone());
        if !accepted {
            return Err(PipelineError::Propagation {
                conflict: PropagationConflict {
                    connection: connection.clone(),
                    port_type,
                    push_upstream: false,
                },
            });
        }
        self.reconnect(connection)
    }

    // ── Phase C ──

    pub(super) fn check_for_untyped_ports(&self) -> Result<()> {
        if !self.pending.untyped.is_empty() {
            return Err(PipelineError::UntypedConnection);
        }
        Ok(())
    }
}
