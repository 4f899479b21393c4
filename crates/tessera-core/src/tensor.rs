// TensorDesc — shared, immutable tensor metadata
//
// Shape inference never touches tensor data, so the only thing an operator
// holds on to is a descriptor: an identity plus a Shape. Several operators
// may read the same descriptor (one produces it, many consume it), so the
// descriptor is an Arc handle. Cloning is a refcount bump, and since nothing
// behind the Arc is mutable, readers on other threads need no locking.
//
// Every operator output gets a brand-new descriptor. An existing descriptor's
// shape is never rewritten in place.

use std::fmt;
use std::sync::Arc;

use crate::shape::Shape;

/// Unique identifier for a tensor descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub(crate) u64);

impl Default for TensorId {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorId {
    /// Generate a new unique tensor ID (uses a global atomic counter).
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        TensorId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct TensorDescInner {
    id: TensorId,
    shape: Shape,
}

/// Handle to a tensor's identity and shape.
#[derive(Clone)]
pub struct TensorDesc {
    inner: Arc<TensorDescInner>,
}

impl TensorDesc {
    /// Create a descriptor with a fresh id.
    pub fn new(shape: impl Into<Shape>) -> Self {
        TensorDesc {
            inner: Arc::new(TensorDescInner {
                id: TensorId::new(),
                shape: shape.into(),
            }),
        }
    }

    pub fn id(&self) -> TensorId {
        self.inner.id
    }

    pub fn shape(&self) -> &Shape {
        &self.inner.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.inner.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.inner.shape.rank()
    }
}

// Identity, not structure: two descriptors with equal shapes are still
// different tensors.
impl PartialEq for TensorDesc {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TensorDesc {}

impl std::hash::Hash for TensorDesc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorDesc(id={}, shape={})", self.id(), self.shape())
    }
}
