//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use pipewright::{ConfigBlock, Pipeline};

/// Create a pipeline with an empty configuration tree.
pub fn new_pipeline() -> Pipeline {
    Pipeline::new(Some(ConfigBlock::new())).expect("config was provided")
}

/// Create a pipeline from a pre-populated configuration tree.
pub fn pipeline_with_config(config: ConfigBlock) -> Pipeline {
    Pipeline::new(Some(config)).expect("config was provided")
}
