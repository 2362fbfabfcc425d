//! Benchmarks for pipeline assembly.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pipewright::{
    AnyProcess, ConfigBlock, Edge, Pipeline, PortFrequency, PortInfo, PortName, PortType, Process,
    ProcessError,
};
use std::sync::Arc;

// Minimal pass-through process: one input, one output, both int.
struct LinkProcess {
    name: String,
    has_input: bool,
    has_output: bool,
}

impl LinkProcess {
    fn source(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_input: false,
            has_output: true,
        }
    }

    fn link(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_input: true,
            has_output: true,
        }
    }

    fn sink(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_input: true,
            has_output: false,
        }
    }

    fn into_any(self) -> AnyProcess {
        AnyProcess::Process(Box::new(self))
    }
}

impl Process for LinkProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_ports(&self) -> Vec<PortName> {
        if self.has_input {
            vec!["in".to_string()]
        } else {
            Vec::new()
        }
    }

    fn output_ports(&self) -> Vec<PortName> {
        if self.has_output {
            vec!["out".to_string()]
        } else {
            Vec::new()
        }
    }

    fn input_port_info(&self, port: &str) -> Option<PortInfo> {
        (self.has_input && port == "in").then(|| PortInfo::new(PortType::concrete("int")))
    }

    fn output_port_info(&self, port: &str) -> Option<PortInfo> {
        (self.has_output && port == "out").then(|| PortInfo::new(PortType::concrete("int")))
    }

    fn set_input_port_type(&mut self, _port: &str, _port_type: PortType) -> bool {
        false
    }

    fn set_output_port_type(&mut self, _port: &str, _port_type: PortType) -> bool {
        false
    }

    fn connect_input_port(&mut self, _port: &str, _edge: Arc<Edge>) -> Result<(), ProcessError> {
        Ok(())
    }

    fn connect_output_port(&mut self, _port: &str, _edge: Arc<Edge>) -> Result<(), ProcessError> {
        Ok(())
    }

    fn set_core_frequency(&mut self, _frequency: PortFrequency) {}
}

fn build_chain(length: usize) -> Pipeline {
    let mut pipeline = Pipeline::new(Some(ConfigBlock::new())).expect("config was provided");

    pipeline
        .add_process(LinkProcess::source("p0").into_any())
        .unwrap();
    for i in 1..length - 1 {
        pipeline
            .add_process(LinkProcess::link(&format!("p{i}")).into_any())
            .unwrap();
    }
    pipeline
        .add_process(LinkProcess::sink(&format!("p{}", length - 1)).into_any())
        .unwrap();

    for i in 0..length - 1 {
        pipeline
            .connect(&format!("p{i}"), "out", &format!("p{}", i + 1), "in")
            .unwrap();
    }
    pipeline
}

fn bench_chain_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_setup");

    for length in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            b.iter(|| {
                let mut pipeline = build_chain(length);
                pipeline.setup_pipeline().unwrap();
                pipeline
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chain_setup);
criterion_main!(benches);
