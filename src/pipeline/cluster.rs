//! Cluster-connection expansion.
//!
//! Connections that touch a cluster port are deferred at `connect` time and
//! translated here, at the start of setup, into connections between real
//! processes via the cluster's port mappings. Because a mapping target may
//! itself be another cluster port, expansion repeats until the pending list
//! drains.

use super::classify::{ClusterConnection, ClusterEnd};
use super::Pipeline;
use crate::error::{PipelineError, Result};
use crate::port::PortAddress;

impl Pipeline {
    pub(super) fn map_cluster_connections(&mut self) -> Result<()> {
        while !self.pending_cluster_is_empty() {
            let deferred = self.take_pending_cluster();
            for ClusterConnection { connection, end } in deferred {
                match end {
                    ClusterEnd::Upstream => {
                        // The cluster's output feeds a consumer: exactly one
                        // output mapping names the inner producer.
                        let cluster_addr = &connection.upstream;
                        let inner = self.upstream_mapping_for(cluster_addr)?;
                        self.connect(
                            &inner.process,
                            &inner.port,
                            &connection.downstream.process,
                            &connection.downstream.port,
                        )?;
                    }
                    ClusterEnd::Downstream => {
                        // A producer feeds the cluster's input: the input
                        // mapping may fan in to several inner consumers.
                        let cluster_addr = &connection.downstream;
                        let inners = self.downstream_mappings_for(cluster_addr)?;
                        for inner in inners {
                            self.connect(
                                &connection.upstream.process,
                                &connection.upstream.port,
                                &inner.process,
                                &inner.port,
                            )?;
                        }
                    }
                }
            }
        }
        tracing::debug!("cluster connections expanded");
        Ok(())
    }

    fn pending_cluster_is_empty(&self) -> bool {
        self.pending.cluster.is_empty()
    }

    fn take_pending_cluster(&mut self) -> Vec<ClusterConnection> {
        std::mem::take(&mut self.pending.cluster)
    }

    /// The inner address a cluster output port maps from.
    fn upstream_mapping_for(&self, cluster_addr: &PortAddress) -> Result<PortAddress> {
        let cluster = self.cluster_by_name(&cluster_addr.process)?;
        let mut matches = cluster
            .output_mappings()
            .into_iter()
            .filter(|mapping| mapping.downstream == *cluster_addr);

        let Some(mapping) = matches.next() else {
            return Err(PipelineError::NoSuchPort {
                process: cluster_addr.process.clone(),
                port: cluster_addr.port.clone(),
            });
        };
        if matches.next().is_some() {
            return Err(PipelineError::Internal(
                "a cluster output port maps to more than one inner port",
            ));
        }
        Ok(mapping.upstream)
    }

    /// The inner addresses a cluster input port maps to.
    fn downstream_mappings_for(&self, cluster_addr: &PortAddress) -> Result<Vec<PortAddress>> {
        let cluster = self.cluster_by_name(&cluster_addr.process)?;
        let inners: Vec<PortAddress> = cluster
            .input_mappings()
            .into_iter()
            .filter(|mapping| mapping.upstream == *cluster_addr)
            .map(|mapping| mapping.downstream)
            .collect();

        if inners.is_empty() {
            return Err(PipelineError::NoSuchPort {
                process: cluster_addr.process.clone(),
                port: cluster_addr.port.clone(),
            });
        }
        Ok(inners)
    }
}
