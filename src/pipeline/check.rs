//! Structural verification: required ports, orphans, and the DAG check.

use super::Pipeline;
use crate::error::{PipelineError, Result};
use crate::port::{PortAddress, PortFlag};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeSet, HashMap, VecDeque};

impl Pipeline {
    /// Walk the pipeline in both directions from the first registered
    /// process, verifying that every `Required` port is wired. Any process
    /// the walk never reaches makes the pipeline disconnected, which is an
    /// error by design: a pipeline of several valid but mutually unreachable
    /// subgraphs is rejected as `OrphanedProcesses`.
    pub(super) fn check_for_required_ports(&self) -> Result<()> {
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut to_visit: VecDeque<String> = VecDeque::new();

        let first = self
            .process_order
            .first()
            .ok_or(PipelineError::NoProcesses)?;
        to_visit.push_back(first.clone());

        while let Some(current) = to_visit.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            let process = self.process_by_name(&current)?;

            for port in process.input_ports() {
                let info = self.input_port_info(&PortAddress::new(&*current, &*port))?;
                if info.flags.contains(&PortFlag::Required)
                    && self.input_edge_for_port(&current, &port)?.is_none()
                {
                    return Err(PipelineError::MissingConnection {
                        address: PortAddress::new(current, port),
                        reason: "the input port has the required flag",
                    });
                }
            }

            for port in process.output_ports() {
                let info = self.output_port_info(&PortAddress::new(&*current, &*port))?;
                if info.flags.contains(&PortFlag::Required)
                    && self.output_edges_for_port(&current, &port)?.is_empty()
                {
                    return Err(PipelineError::MissingConnection {
                        address: PortAddress::new(current, port),
                        reason: "the output port has the required flag",
                    });
                }
            }

            let mut neighbors: Vec<String> = Vec::new();
            for upstream in self.upstream_for_process(&current)? {
                neighbors.push(upstream.name().to_string());
            }
            for downstream in self.downstream_for_process(&current)? {
                neighbors.push(downstream.name().to_string());
            }
            to_visit.extend(neighbors);
        }

        if visited.len() != self.process_map.len() {
            let names: Vec<String> = self
                .process_order
                .iter()
                .filter(|name| !visited.contains(*name))
                .cloned()
                .collect();
            return Err(PipelineError::OrphanedProcesses { names });
        }
        Ok(())
    }

    /// Topologically sort the dependency-bearing subgraph. Edges feeding
    /// `InputNoDep` ports are runtime-only dependencies and are skipped, so
    /// feedback loops annotated that way stay legal.
    pub(super) fn check_for_dag(&self) -> Result<()> {
        let names = self.process_order.clone();
        let index: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..names.len() {
            graph.add_node(i);
        }

        for name in &names {
            let process = self.process_by_name(name)?;
            let target = index[name.as_str()];

            for port in process.input_ports() {
                let Some(sender) = self.sender_for_port(name, &port)? else {
                    continue;
                };
                let info = self.input_port_info(&PortAddress::new(name.clone(), port))?;
                if info.flags.contains(&PortFlag::InputNoDep) {
                    continue;
                }
                let source = index[sender.process.as_str()];
                graph.add_edge(source, target, ());
            }
        }

        if toposort(&graph, None).is_err() {
            return Err(PipelineError::NotADag);
        }
        Ok(())
    }
}
