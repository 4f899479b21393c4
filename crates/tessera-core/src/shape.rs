use std::fmt;

// Shape — N-dimensional shape metadata
//
// A Shape is the only thing shape inference ever looks at. It is an ordered
// list of dimension sizes, outermost first:
//   - Scalar: Shape([])          — rank 0
//   - Vector: Shape([5])         — rank 1
//   - Matrix: Shape([3, 4])      — rank 2 (rows, cols)
//   - Batch:  Shape([2, 3, 4])   — rank 3 (one batch dim + a 3x4 matrix)
//
// Shapes are immutable values. Operators never edit an input's shape; they
// produce a fresh Shape for every output.
//
// BROADCASTING
//
// Two dim lists are aligned from the right. Each aligned pair must either be
// equal or contain a 1, in which case the 1 stretches to the other size.
// Dims that only one side has (the leftmost ones of the longer list) are
// copied through unchanged.
//
//   [5, 1, 3] and [4, 3]  → [5, 4, 3]
//   [7]       and [1]     → [7]
//   [2]       and [3]     → conflict at axis 0 (2 vs 3)

/// N-dimensional shape of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar, 1 for vector, 2 for matrix, etc.).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Leading (batch) dimensions: everything except the trailing two.
    /// Empty for shapes of rank 2 or less.
    pub fn batch_dims(&self) -> &[usize] {
        &self.0[..self.rank().saturating_sub(2)]
    }

    /// Trailing `(rows, cols)` pair, or `None` if the rank is below 2.
    pub fn matrix_dims(&self) -> Option<(usize, usize)> {
        match self.0.as_slice() {
            [.., rows, cols] => Some((*rows, *cols)),
            _ => None,
        }
    }

    /// Check that `self` can be stretched onto `target` without adding dims.
    ///
    /// Unlike [`broadcast_dims`] this is one-directional: `target` is
    /// fixed, `self` must not have more dims than it, and every trailing-aligned
    /// dim of `self` must equal the target's or be 1. A scalar shape broadcasts
    /// to anything.
    pub fn broadcasts_to(&self, target: &Shape) -> Result<(), BroadcastError> {
        let (src, dst) = (self.dims(), target.dims());
        if src.len() > dst.len() {
            return Err(BroadcastError::RankTooLarge {
                rank: src.len(),
                target: dst.len(),
            });
        }
        let offset = dst.len() - src.len();
        for (i, &d) in src.iter().enumerate().rev() {
            let t = dst[i + offset];
            if d != t && d != 1 {
                return Err(BroadcastConflict {
                    axis: i + offset,
                    lhs: d,
                    rhs: t,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Aligned dims that differ with neither being 1. `axis` indexes the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dim {lhs} vs {rhs} at axis {axis}")]
pub struct BroadcastConflict {
    pub axis: usize,
    pub lhs: usize,
    pub rhs: usize,
}

/// Why a one-directional broadcast failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error(transparent)]
    Conflict(#[from] BroadcastConflict),

    #[error("rank {rank} cannot broadcast into rank {target}")]
    RankTooLarge { rank: usize, target: usize },
}

/// Right-aligned broadcast of two dim lists.
///
/// For every aligned pair: equal dims or an `rhs` of 1 keep the `lhs` value,
/// otherwise an `lhs` of 1 takes the `rhs` value. Dims present on only one
/// side are copied verbatim to the same leading positions of the result.
pub fn broadcast_dims(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, BroadcastConflict> {
    let rank = lhs.len().max(rhs.len());
    let mut result = vec![0usize; rank];

    // i counts positions from the right; axis is the matching result index.
    for i in 0..rank {
        let axis = rank - 1 - i;
        let l = lhs.len().checked_sub(i + 1).map(|j| lhs[j]);
        let r = rhs.len().checked_sub(i + 1).map(|j| rhs[j]);
        result[axis] = match (l, r) {
            (Some(l), Some(r)) if l == r || r == 1 => l,
            (Some(1), Some(r)) => r,
            (Some(l), Some(r)) => return Err(BroadcastConflict { axis, lhs: l, rhs: r }),
            (l, r) => l.or(r).unwrap_or(1),
        };
    }
    Ok(result)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// These let you write: Shape::from((3, 4)) instead of Shape::new(vec![3, 4])

impl From<()> for Shape {
    /// Scalar shape (0 dimensions).
    fn from(_: ()) -> Self {
        Shape(vec![])
    }
}

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize,)> for Shape {
    fn from((d0,): (usize,)) -> Self {
        Shape(vec![d0])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(a: [usize; N]) -> Self {
        Shape(a.to_vec())
    }
}
