//! Adapters layer for the forger.

pub mod local_node;

pub use local_node::LocalNode;
