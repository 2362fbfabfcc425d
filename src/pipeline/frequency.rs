//! Port-frequency reconciliation.
//!
//! Every port may declare a rational rate relative to its process's core
//! rate. This pass assigns each constrained process a core frequency such
//! that for every connection with both port rates present,
//! `core(up) * rate(up.out) == core(down) * rate(down.in)` holds exactly,
//! then rescales all cores by the LCM of their denominators so the relative
//! ratios survive as integral multiples.

use super::Pipeline;
use crate::error::{PipelineError, Result};
use crate::port::{Connection, PortFrequency};
use num_rational::Ratio;
use std::collections::{BTreeMap, VecDeque};

impl Pipeline {
    pub(super) fn check_port_frequencies(&mut self) -> Result<()> {
        let base: PortFrequency = Ratio::new(1, 1);

        if self.process_map.len() == 1 {
            let name = self.process_order[0].clone();
            self.process_mut(&name)?.set_core_frequency(base);
            return Ok(());
        }

        let mut freq_map: BTreeMap<String, PortFrequency> = BTreeMap::new();
        let mut queue: VecDeque<Connection> = self.connections.iter().cloned().collect();
        // Consecutive re-enqueues without resolving anything. Once every
        // remaining connection has been requeued, the rest of the queue is a
        // disjoint frequency component and gets its own 1/1 seed.
        let mut stalled = 0usize;

        while let Some(connection) = queue.pop_front() {
            let up_rate = self.output_port_info(&connection.upstream)?.frequency;
            let down_rate = self.input_port_info(&connection.downstream)?.frequency;

            let (Some(up_rate), Some(down_rate)) = (up_rate, down_rate) else {
                tracing::warn!(
                    connection = %connection,
                    "port frequency missing; connection cannot be validated"
                );
                continue;
            };
            if *up_rate.numer() == 0 || *down_rate.numer() == 0 {
                tracing::warn!(
                    connection = %connection,
                    "zero port frequency; connection cannot be validated"
                );
                continue;
            }

            let up_name = &connection.upstream.process;
            let down_name = &connection.downstream.process;

            let mut have_up = freq_map.contains_key(up_name);
            let have_down = freq_map.contains_key(down_name);

            if !have_up && !have_down && (freq_map.is_empty() || stalled > queue.len()) {
                if !freq_map.is_empty() {
                    tracing::debug!(
                        process = %up_name,
                        "seeding disjoint frequency component at 1/1"
                    );
                }
                freq_map.insert(up_name.clone(), base);
                have_up = true;
            }

            if have_up && have_down {
                let up_core = freq_map[up_name];
                let down_core = freq_map[down_name];
                let expected = up_core * up_rate / down_rate;
                if down_core != expected {
                    return Err(PipelineError::FrequencyMismatch {
                        connection,
                        upstream_core: up_core,
                        downstream_core: down_core,
                    });
                }
            } else if have_up {
                let up_core = freq_map[up_name];
                freq_map.insert(down_name.clone(), up_core * up_rate / down_rate);
            } else if have_down {
                let down_core = freq_map[down_name];
                freq_map.insert(up_name.clone(), down_core * down_rate / up_rate);
            } else {
                // Not reachable from the assigned region yet.
                stalled += 1;
                queue.push_back(connection);
                continue;
            }
            stalled = 0;
        }

        let denom_lcm = freq_map
            .values()
            .fold(1u64, |acc, freq| num_integer::lcm(acc, *freq.denom()));

        for (name, freq) in freq_map {
            let core = freq * Ratio::from_integer(denom_lcm);
            tracing::debug!(process = %name, frequency = %core, "core frequency assigned");
            self.process_mut(&name)?.set_core_frequency(core);
        }
        Ok(())
    }
}
