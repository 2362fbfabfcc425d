//! Edge construction for the resolved connections.
//!
//! Each edge's configuration is layered from the pipeline config: `_edge`
//! defaults, then `_edge_by_type/<downstream port type>`, then
//! `_edge_by_conn/<proc>.<port>` for each endpoint. The `dependency` key is
//! forced from the downstream port's `InputNoDep` flag and frozen.

use super::{Pipeline, CONFIG_EDGE, CONFIG_EDGE_CONN, CONFIG_EDGE_TYPE};
use crate::config::ConfigValue;
use crate::edge::{self, Edge};
use crate::error::Result;
use crate::port::PortFlag;
use std::sync::Arc;

impl Pipeline {
    pub(super) fn make_connections(&mut self) -> Result<()> {
        for index in 0..self.connections.len() {
            let connection = self.connections[index].clone();
            let down_info = self.input_port_info(&connection.downstream)?;

            let mut edge_config = self.config.subblock(CONFIG_EDGE);

            let type_config = self
                .config
                .subblock(CONFIG_EDGE_TYPE)
                .subblock(&down_info.port_type.config_key());
            edge_config.merge(&type_config);

            let conn_config = self.config.subblock(CONFIG_EDGE_CONN);
            edge_config.merge(&conn_config.subblock(&connection.upstream.to_string()));
            edge_config.merge(&conn_config.subblock(&connection.downstream.to_string()));

            let has_nodep = down_info.flags.contains(&PortFlag::InputNoDep);
            edge_config.set_value(edge::CONFIG_DEPENDENCY, ConfigValue::Bool(!has_nodep))?;
            edge_config.mark_read_only(edge::CONFIG_DEPENDENCY);

            let mut new_edge = Edge::new(edge_config);
            new_edge.set_upstream_process(connection.upstream.process.clone());
            new_edge.set_downstream_process(connection.downstream.process.clone());
            let new_edge = Arc::new(new_edge);

            self.edge_map.insert(index, Arc::clone(&new_edge));
            self.process_mut(&connection.upstream.process)?
                .connect_output_port(&connection.upstream.port, Arc::clone(&new_edge))?;
            self.process_mut(&connection.downstream.process)?
                .connect_input_port(&connection.downstream.port, new_edge)?;
        }

        tracing::debug!(edges = self.edge_map.len(), "edges constructed");
        Ok(())
    }
}
