//! Shared test utilities for the sync scenario tests.

pub mod mock_node;

pub use mock_node::*;
