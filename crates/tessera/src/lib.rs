//! # Tessera
//!
//! Shape validation for tensor computational graphs.
//!
//! This is the top-level facade crate. It re-exports the shape model and
//! operator rules from `tessera-core` and adds the [`graph`] builder, which
//! runs shape inference once per node at construction time and refuses to
//! build a node whose inputs do not fit.
//!
//! ## Usage
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! let mut g = Graph::default();
//! let a = g.add_tensor((5, 2, 3));
//! let b = g.add_tensor((3, 4));
//! let y = g.add_matmul(&a, &b, None, false, false).unwrap();
//! assert_eq!(y.dims(), &[5, 2, 4]);
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|----------|
//! | `tessera-core` | Shape, TensorDesc, Op, MatMul rule, Error |
//! | `tessera` | Graph builder, config, prelude |

/// Re-export core types.
pub use tessera_core::{
    broadcast_dims, BroadcastConflict, BroadcastError, Error, Incompatibility, MatMul, Mnk, Op,
    OpKind, Result, Shape, TensorDesc, TensorId,
};

/// Graph construction with construction-time shape checks.
pub mod graph;

/// Prelude: import this for the most common types.
pub mod prelude {
    pub use crate::graph::{Graph, GraphConfig, Node, NodeId};
    pub use crate::{Error, Incompatibility, MatMul, Op, Result, Shape, TensorDesc};
}
