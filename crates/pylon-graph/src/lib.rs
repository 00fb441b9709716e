//! Pylon Graph
//!
//! This crate provides the flow graph data model for pylon: caller-supplied
//! nodes and edges, an adjacency view for traversal, and the level planner
//! that turns an acyclic graph into execution waves.
//!
//! A level plan assigns every node an integer level such that every edge
//! points from a strictly lower level to a strictly higher one. The engine
//! executes one level at a time, all nodes of a level concurrently.

mod error;
mod graph;
mod level;
mod types;

pub use error::GraphError;
pub use graph::Graph;
pub use level::LevelPlan;
pub use types::{Edge, Node, NodeData};
