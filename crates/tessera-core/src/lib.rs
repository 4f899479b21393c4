//! # tessera-core
//!
//! Shape metadata and operator shape inference for Tessera.
//!
//! This crate provides:
//! - [`Shape`] — ordered dimension sizes, plus right-aligned broadcasting
//! - [`TensorDesc`] — shared, immutable tensor identity + shape
//! - [`Op`] — the operator sum type and its shape-inference contract
//! - [`MatMul`] — batched, transposable matrix multiply with optional bias
//! - [`Error`] — failures raised once a rejection is deemed fatal
//
// Nothing in here touches tensor data. Inference is a pure function of the
// input shapes and may run on any thread.

pub mod error;
pub mod matmul;
pub mod op;
pub mod shape;
pub mod tensor;

pub use error::{Error, Result};
pub use matmul::{MatMul, Mnk};
pub use op::{Incompatibility, Op, OpKind};
pub use shape::{broadcast_dims, BroadcastConflict, BroadcastError, Shape};
pub use tensor::{TensorDesc, TensorId};
