// MatMul — shape rule for batched, optionally transposed matrix multiply
//
// Y = op(A) @ op(B) [+ C], where op() is an optional transpose of the
// trailing two dims.
//
// A: [..batch_a, m, k]      (or [..batch_a, k, m] with trans_a)
// B: [..batch_b, k, n]      (or [..batch_b, n, k] with trans_b)
// C: any shape that broadcasts onto Y without gaining dims
// Y: [..broadcast(batch_a, batch_b), m, n]
//
// The rule runs in four steps and stops at the first failure:
//
//   1. Broadcast the batch dims of A and B, right-aligned. The longer side's
//      extra leading dims are copied through.
//   2. Apply the transpose flags to the matrix dims and require the two inner
//      dims to agree.
//   3. Result = broadcast batch dims followed by (m, n).
//   4. If C is given, it must broadcast onto the result from the right:
//      rank(C) <= rank(Y) and each aligned dim of C equals Y's or is 1.
//      C never changes the result.
//
// Examples:
//   [2, 3]    @ [3, 4]                    → [2, 4]
//   [5, 2, 3] @ [3, 4]                    → [5, 2, 4]
//   [3, 2]^T  @ [3, 4]                    → [2, 4]
//   [1, 2, 3] @ [7, 3, 4] + [4]           → [7, 2, 4]
//   [2, 3]    @ [5, 4]                    → incompatible (3 vs 5)
//   [2, 3]    @ [3, 4]    + [2, 2, 4]     → incompatible (bias rank 3 > 2)

use std::fmt;

use crate::op::Incompatibility;
use crate::shape::{broadcast_dims, BroadcastConflict, BroadcastError, Shape};
use crate::tensor::TensorDesc;

/// Matrix multiplication with optional operand transposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatMul {
    trans_a: bool,
    trans_b: bool,
}

/// The resolved problem size of a matrix multiply, after transposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mnk {
    /// Rows of the result.
    pub m: usize,
    /// Columns of the result.
    pub n: usize,
    /// Shared inner dimension.
    pub k: usize,
}

impl fmt::Display for Mnk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.m, self.n, self.k)
    }
}

impl MatMul {
    pub fn new(trans_a: bool, trans_b: bool) -> Self {
        MatMul { trans_a, trans_b }
    }

    pub fn trans_a(&self) -> bool {
        self.trans_a
    }

    pub fn trans_b(&self) -> bool {
        self.trans_b
    }

    pub fn with_trans_a(self, trans_a: bool) -> Self {
        MatMul { trans_a, ..self }
    }

    pub fn with_trans_b(self, trans_b: bool) -> Self {
        MatMul { trans_b, ..self }
    }

    /// Infer the output shape from bare input shapes.
    pub fn infer(
        &self,
        a: &Shape,
        b: &Shape,
        bias: Option<&Shape>,
    ) -> Result<Shape, Incompatibility> {
        let a_mat = a.matrix_dims().ok_or(Incompatibility::OperandRank {
            operand: 'A',
            rank: a.rank(),
        })?;
        let b_mat = b.matrix_dims().ok_or(Incompatibility::OperandRank {
            operand: 'B',
            rank: b.rank(),
        })?;

        // Step 1: batch broadcast.
        let mut dims = broadcast_dims(a.batch_dims(), b.batch_dims())
            .map_err(|BroadcastConflict { axis, lhs, rhs }| {
                Incompatibility::BatchBroadcast { axis, lhs, rhs }
            })?;

        // Steps 2 and 3: inner dims, then append (m, n).
        let Mnk { m, n, .. } = self.resolve(a_mat, b_mat)?;
        dims.push(m);
        dims.push(n);
        let result = Shape::new(dims);

        // Step 4: bias only gates validity.
        if let Some(c) = bias {
            c.broadcasts_to(&result).map_err(|e| match e {
                BroadcastError::RankTooLarge { rank, target } => Incompatibility::BiasRank {
                    bias: rank,
                    result: target,
                },
                BroadcastError::Conflict(BroadcastConflict { axis, lhs, rhs }) => {
                    Incompatibility::BiasBroadcast {
                        axis,
                        bias: lhs,
                        result: rhs,
                    }
                }
            })?;
        }

        Ok(result)
    }

    /// The resolved `(m, n, k)` of `op(A) @ op(B)`, ignoring batch dims.
    /// `None` if either operand is below rank 2 or the inner dims differ.
    pub fn mnk(&self, a: &Shape, b: &Shape) -> Option<Mnk> {
        self.resolve(a.matrix_dims()?, b.matrix_dims()?).ok()
    }

    fn resolve(&self, a: (usize, usize), b: (usize, usize)) -> Result<Mnk, Incompatibility> {
        let (m, k_a) = if self.trans_a { (a.1, a.0) } else { a };
        let (k_b, n) = if self.trans_b { (b.1, b.0) } else { b };
        if k_a != k_b {
            return Err(Incompatibility::InnerDim { k_a, k_b });
        }
        Ok(Mnk { m, n, k: k_a })
    }

    /// Shape-inference entry point over `[A, B]` or `[A, B, C]`.
    pub fn check(&self, inputs: &[TensorDesc]) -> Result<Vec<Shape>, Incompatibility> {
        match inputs {
            [a, b] => Ok(vec![self.infer(a.shape(), b.shape(), None)?]),
            [a, b, c] => Ok(vec![self.infer(a.shape(), b.shape(), Some(c.shape()))?]),
            _ => Err(Incompatibility::Arity {
                min: 2,
                max: 3,
                got: inputs.len(),
            }),
        }
    }

    /// `Matmul([A^T,B],A=<id>,B=<id>,C=<id>,Y=<id>,mnk=[m,n,k])`
    ///
    /// Unknown parts (no bias, no output yet, incompatible inputs) are left
    /// out or printed as `?`.
    pub fn describe(&self, inputs: &[TensorDesc], outputs: &[TensorDesc]) -> String {
        let operands: String = ["A", "B", "C"]
            .iter()
            .zip(inputs)
            .map(|(name, t)| format!(",{}={}", name, t.id()))
            .collect();
        let y = outputs
            .first()
            .map_or_else(|| "?".to_string(), |t| t.id().to_string());
        let mnk = match inputs {
            [a, b, ..] => self.mnk(a.shape(), b.shape()),
            _ => None,
        };
        let mnk = mnk.map_or_else(|| "?".to_string(), |mnk| mnk.to_string());
        format!(
            "Matmul([{},{}]{},Y={},mnk={})",
            if self.trans_a { "A^T" } else { "A" },
            if self.trans_b { "B^T" } else { "B" },
            operands,
            y,
            mnk
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(
        a: &[usize],
        b: &[usize],
        c: Option<Vec<usize>>,
        ta: bool,
        tb: bool,
    ) -> Option<Vec<usize>> {
        let c = c.map(Shape::new);
        MatMul::new(ta, tb)
            .infer(&Shape::from(a), &Shape::from(b), c.as_ref())
            .ok()
            .map(|s| s.dims().to_vec())
    }

    #[test]
    fn test_plain_2d() {
        assert_eq!(infer(&[2, 3], &[3, 4], None, false, false), Some(vec![2, 4]));
    }

    #[test]
    fn test_missing_batch_dim_on_b() {
        assert_eq!(infer(&[5, 2, 3], &[3, 4], None, false, false), Some(vec![5, 2, 4]));
    }

    #[test]
    fn test_trans_a() {
        assert_eq!(infer(&[3, 2], &[3, 4], None, true, false), Some(vec![2, 4]));
    }

    #[test]
    fn test_trans_b() {
        assert_eq!(infer(&[2, 3], &[4, 3], None, false, true), Some(vec![2, 4]));
        assert_eq!(infer(&[3, 2], &[4, 3], None, true, true), Some(vec![2, 4]));
    }

    #[test]
    fn test_inner_dim_mismatch() {
        let err = MatMul::default()
            .infer(&Shape::from((2, 3)), &Shape::from((5, 4)), None)
            .unwrap_err();
        assert_eq!(err, Incompatibility::InnerDim { k_a: 3, k_b: 5 });
    }

    #[test]
    fn test_batch_broadcast_with_bias() {
        assert_eq!(
            infer(&[1, 2, 3], &[7, 3, 4], Some(vec![4]), false, false),
            Some(vec![7, 2, 4])
        );
    }

    #[test]
    fn test_bias_rank_too_large() {
        let err = MatMul::default()
            .infer(
                &Shape::from((2, 3)),
                &Shape::from((3, 4)),
                Some(&Shape::from((2, 2, 4))),
            )
            .unwrap_err();
        assert_eq!(err, Incompatibility::BiasRank { bias: 3, result: 2 });
    }

    #[test]
    fn test_asymmetric_ranks_copy_leading_dims() {
        assert_eq!(
            infer(&[2, 3], &[6, 5, 3, 4], None, false, false),
            Some(vec![6, 5, 2, 4])
        );
        assert_eq!(
            infer(&[6, 5, 2, 3], &[3, 4], None, false, false),
            Some(vec![6, 5, 2, 4])
        );
        assert_eq!(
            infer(&[9, 1, 2, 3], &[4, 3, 4], None, false, false),
            Some(vec![9, 4, 2, 4])
        );
    }

    #[test]
    fn test_batch_conflict() {
        let err = MatMul::default()
            .infer(&Shape::from((2, 2, 3)), &Shape::from((3, 3, 4)), None)
            .unwrap_err();
        assert_eq!(
            err,
            Incompatibility::BatchBroadcast {
                axis: 0,
                lhs: 2,
                rhs: 3
            }
        );
    }

    #[test]
    fn test_batch_conflict_wins_over_inner_dim() {
        let err = MatMul::default()
            .infer(&Shape::from((2, 2, 3)), &Shape::from((3, 5, 4)), None)
            .unwrap_err();
        assert_eq!(err.stage(), "batch broadcast");
    }

    #[test]
    fn test_rank_below_two() {
        let err = MatMul::default()
            .infer(&Shape::from(3), &Shape::from((3, 4)), None)
            .unwrap_err();
        assert_eq!(err, Incompatibility::OperandRank { operand: 'A', rank: 1 });
        let err = MatMul::default()
            .infer(&Shape::from((2, 3)), &Shape::from(()), None)
            .unwrap_err();
        assert_eq!(err, Incompatibility::OperandRank { operand: 'B', rank: 0 });
    }

    #[test]
    fn test_scalar_bias() {
        assert_eq!(infer(&[2, 3], &[3, 4], Some(vec![]), false, false), Some(vec![2, 4]));
    }

    #[test]
    fn test_bias_ones_broadcast() {
        assert_eq!(
            infer(&[5, 2, 3], &[3, 4], Some(vec![1, 2, 1]), false, false),
            Some(vec![5, 2, 4])
        );
        assert_eq!(
            infer(&[5, 2, 3], &[3, 4], Some(vec![5, 1, 4]), false, false),
            Some(vec![5, 2, 4])
        );
    }

    #[test]
    fn test_bias_dim_conflict() {
        let err = MatMul::default()
            .infer(
                &Shape::from((2, 3)),
                &Shape::from((3, 4)),
                Some(&Shape::from(3)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Incompatibility::BiasBroadcast {
                axis: 1,
                bias: 3,
                result: 4
            }
        );
    }

    #[test]
    fn test_zero_sized_dims() {
        assert_eq!(infer(&[0, 3], &[3, 4], None, false, false), Some(vec![0, 4]));
        assert_eq!(infer(&[2, 0], &[0, 4], None, false, false), Some(vec![2, 4]));
    }

    #[test]
    fn test_mnk() {
        let mm = MatMul::new(true, false);
        assert_eq!(
            mm.mnk(&Shape::from((4, 3, 2)), &Shape::from((3, 5))),
            Some(Mnk { m: 2, n: 5, k: 3 })
        );
        assert_eq!(mm.mnk(&Shape::from((2, 3)), &Shape::from((3, 5))), None);
    }

    #[test]
    fn test_flag_builders() {
        let mm = MatMul::default().with_trans_a(true).with_trans_b(true);
        assert!(mm.trans_a() && mm.trans_b());
        assert!(!mm.with_trans_a(false).trans_a());
    }

    #[test]
    fn test_describe() {
        let a = TensorDesc::new((3, 2));
        let b = TensorDesc::new((3, 4));
        let y = TensorDesc::new((2, 4));
        let s = MatMul::new(true, false).describe(&[a.clone(), b.clone()], &[y.clone()]);
        assert_eq!(
            s,
            format!("Matmul([A^T,B],A={},B={},Y={},mnk=[2,4,3])", a.id(), b.id(), y.id())
        );
        let s = MatMul::default().describe(&[a, b], &[]);
        assert!(s.starts_with("Matmul([A,B]"));
        assert!(s.ends_with(",Y=?,mnk=?)"));
    }

    #[test]
    fn test_describe_with_bias() {
        let a = TensorDesc::new((2, 3));
        let b = TensorDesc::new((4, 3));
        let c = TensorDesc::new(4);
        let y = TensorDesc::new((2, 4));
        let s = MatMul::new(false, true).describe(&[a.clone(), b.clone(), c.clone()], &[y.clone()]);
        assert_eq!(
            s,
            format!(
                "Matmul([A,B^T],A={},B={},C={},Y={},mnk=[2,4,3])",
                a.id(),
                b.id(),
                c.id(),
                y.id()
            )
        );
    }
}
