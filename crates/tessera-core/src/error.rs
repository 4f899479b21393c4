use crate::op::{Incompatibility, OpKind};
use crate::shape::Shape;
use crate::tensor::TensorId;

/// All errors that can occur within Tessera.
///
/// Shape inference itself never produces one of these: a rule reports an
/// [`Incompatibility`] and leaves it to the graph builder to decide whether
/// that is fatal. Everything that *is* fatal ends up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between an inferred shape and an existing one.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// An operator rejected its inputs while a node was being built.
    #[error("{op} rejected inputs {}: {reason}", fmt_shapes(.inputs))]
    Incompatible {
        op: OpKind,
        inputs: Vec<Shape>,
        #[source]
        reason: Incompatibility,
    },

    /// Caller supplied a different number of outputs than the op produces.
    #[error("{op} produces {expected} outputs, {got} supplied")]
    OutputCount {
        op: OpKind,
        expected: usize,
        got: usize,
    },

    /// A supplied output descriptor is already registered in the graph.
    #[error("tensor {0:?} already exists and cannot be a new output")]
    OutputAlreadyDefined(TensorId),

    /// A tensor id that the graph does not know about.
    #[error("unknown tensor {0:?}")]
    UnknownTensor(TensorId),
}

fn fmt_shapes(shapes: &[Shape]) -> String {
    let parts: Vec<String> = shapes.iter().map(|s| s.to_string()).collect();
    format!("({})", parts.join(", "))
}

/// Convenience Result type used throughout Tessera.
pub type Result<T> = std::result::Result<T, Error>;

