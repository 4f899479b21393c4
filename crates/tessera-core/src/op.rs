// Op — Operator kinds and the shape-inference contract
//
// Every operator kind is one variant of the Op enum, carrying its own
// parameters. The contract every variant implements is:
//
//   infer_shape(inputs) -> Option<Vec<Shape>>
//
//   Some(shapes) — one Shape per declared output; inputs are compatible.
//   None         — inputs are dimensionally incompatible.
//
// "Incompatible" is an ordinary answer, not an error. Graph search and
// speculative construction ask the question constantly and need to branch
// on it cheaply. The richer check() returns the reason instead of None so
// the graph builder can name the failing step when it does decide to fail.
//
// Both calls are pure: the same inputs always give the same answer, nothing
// is cached, and nothing is mutated.

use std::fmt;
use std::ops::RangeInclusive;

use crate::matmul::MatMul;
use crate::shape::Shape;
use crate::tensor::TensorDesc;

/// Discriminant of [`Op`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    MatMul,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::MatMul => write!(f, "MatMul"),
        }
    }
}

/// An operator together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Op {
    /// `Y = op(A) @ op(B) [+ C]`, with batch broadcasting.
    MatMul(MatMul),
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::MatMul(_) => OpKind::MatMul,
        }
    }

    /// Accepted number of inputs.
    pub fn num_inputs(&self) -> RangeInclusive<usize> {
        match self {
            Op::MatMul(_) => 2..=3,
        }
    }

    /// Number of outputs produced on success.
    pub fn num_outputs(&self) -> usize {
        match self {
            Op::MatMul(_) => 1,
        }
    }

    /// Infer output shapes, or report why the inputs are incompatible.
    pub fn check(&self, inputs: &[TensorDesc]) -> Result<Vec<Shape>, Incompatibility> {
        let arity = self.num_inputs();
        if !arity.contains(&inputs.len()) {
            return Err(Incompatibility::Arity {
                min: *arity.start(),
                max: *arity.end(),
                got: inputs.len(),
            });
        }
        match self {
            Op::MatMul(mm) => mm.check(inputs),
        }
    }

    /// Infer output shapes; `None` means the inputs are incompatible.
    pub fn infer_shape(&self, inputs: &[TensorDesc]) -> Option<Vec<Shape>> {
        self.check(inputs).ok()
    }

    /// Human-readable description of a node running this op, for logs.
    pub fn describe(&self, inputs: &[TensorDesc], outputs: &[TensorDesc]) -> String {
        match self {
            Op::MatMul(mm) => mm.describe(inputs, outputs),
        }
    }
}

impl From<MatMul> for Op {
    fn from(mm: MatMul) -> Self {
        Op::MatMul(mm)
    }
}

/// Why an operator rejected its inputs.
///
/// Each variant corresponds to one validation step, so a caller that turns
/// the rejection into a hard error can say exactly which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Incompatibility {
    #[error("expected {min}..={max} inputs, got {got}")]
    Arity { min: usize, max: usize, got: usize },

    #[error("operand {operand} has rank {rank}, need at least 2")]
    OperandRank { operand: char, rank: usize },

    #[error("batch dims do not broadcast: {lhs} vs {rhs} at axis {axis}")]
    BatchBroadcast { axis: usize, lhs: usize, rhs: usize },

    #[error("inner dims differ: {k_a} vs {k_b}")]
    InnerDim { k_a: usize, k_b: usize },

    #[error("bias rank {bias} exceeds result rank {result}")]
    BiasRank { bias: usize, result: usize },

    #[error("bias dim {bias} does not broadcast to {result} at axis {axis}")]
    BiasBroadcast {
        axis: usize,
        bias: usize,
        result: usize,
    },
}

impl Incompatibility {
    /// Short name of the step that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Incompatibility::Arity { .. } => "arity",
            Incompatibility::OperandRank { .. } => "operand rank",
            Incompatibility::BatchBroadcast { .. } => "batch broadcast",
            Incompatibility::InnerDim { .. } => "inner dimension",
            Incompatibility::BiasRank { .. } | Incompatibility::BiasBroadcast { .. } => "bias",
        }
    }
}
