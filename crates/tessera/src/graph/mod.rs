mod builder;
mod config;
mod node;

pub use builder::Graph;
pub use config::GraphConfig;
pub use node::{Node, NodeId};
