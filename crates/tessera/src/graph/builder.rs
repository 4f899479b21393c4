// Graph — construction-time validation of operator nodes
//
// The graph owns the registry of tensor descriptors and the list of nodes.
// Adding a node is the only place shape inference runs:
//
//   1. Every input must be a descriptor this graph knows about.
//   2. The op's rule runs exactly once over the inputs.
//   3. Rejection becomes Error::Incompatible, naming the op, the input
//      shapes, and the step that failed. Nothing is added.
//   4. On success each output gets a fresh descriptor carrying its inferred
//      shape (or a caller-supplied, not yet registered descriptor is checked
//      against it). Every tensor has at most one producer.
//
// Batches of independent nodes can be inferred in parallel; the rule is
// pure and descriptors are immutable, so the parallel phase needs no locks.
// Commit happens afterwards, in job order, on the calling thread.

use std::collections::HashMap;

use rayon::prelude::*;
use tessera_core::{Error, Incompatibility, MatMul, Op, Result, Shape, TensorDesc, TensorId};

use super::config::GraphConfig;
use super::node::{Node, NodeId};

/// A computational graph under construction.
#[derive(Debug, Default)]
pub struct Graph {
    config: GraphConfig,
    tensors: Vec<TensorDesc>,
    index: HashMap<TensorId, usize>,
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new(config: GraphConfig) -> Self {
        Graph {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Register a new tensor with the given shape.
    pub fn add_tensor(&mut self, shape: impl Into<Shape>) -> TensorDesc {
        let t = TensorDesc::new(shape);
        self.register(t.clone());
        t
    }

    /// Add a node running `op` over `inputs`.
    ///
    /// With `outputs` empty, a new descriptor is created for every inferred
    /// shape. Otherwise the caller's descriptors are used: they must not be
    /// registered in the graph yet and must match the inferred shapes one
    /// for one.
    pub fn add_op(
        &mut self,
        op: impl Into<Op>,
        inputs: Vec<TensorDesc>,
        outputs: Vec<TensorDesc>,
    ) -> Result<NodeId> {
        let op = op.into();
        self.ensure_known(&inputs)?;
        let shapes = op.check(&inputs).map_err(|r| self.reject(&op, &inputs, r))?;

        let outputs = if outputs.is_empty() {
            shapes.into_iter().map(TensorDesc::new).collect()
        } else {
            if outputs.len() != shapes.len() {
                return Err(Error::OutputCount {
                    op: op.kind(),
                    expected: shapes.len(),
                    got: outputs.len(),
                });
            }
            for (i, (expected, t)) in shapes.iter().zip(&outputs).enumerate() {
                // A supplied output must be fresh: not an input, not another
                // node's output, and not listed twice.
                if self.index.contains_key(&t.id()) || outputs[..i].contains(t) {
                    return Err(Error::OutputAlreadyDefined(t.id()));
                }
                if expected != t.shape() {
                    return Err(Error::ShapeMismatch {
                        expected: expected.clone(),
                        got: t.shape().clone(),
                    });
                }
            }
            outputs
        };

        Ok(self.commit(op, inputs, outputs))
    }

    /// Add a matrix multiply and return its output descriptor.
    pub fn add_matmul(
        &mut self,
        a: &TensorDesc,
        b: &TensorDesc,
        bias: Option<&TensorDesc>,
        trans_a: bool,
        trans_b: bool,
    ) -> Result<TensorDesc> {
        let mut inputs = vec![a.clone(), b.clone()];
        inputs.extend(bias.cloned());
        let id = self.add_op(MatMul::new(trans_a, trans_b), inputs, Vec::new())?;
        Ok(self.nodes[id.0].outputs[0].clone())
    }

    /// Add a batch of independent nodes, all or nothing.
    ///
    /// Inference runs on the rayon pool once the batch reaches
    /// `parallel_threshold`. If any job is rejected, the first rejection in
    /// job order is returned and none of the batch is added.
    pub fn add_ops(&mut self, jobs: Vec<(Op, Vec<TensorDesc>)>) -> Result<Vec<NodeId>> {
        for (_, inputs) in &jobs {
            self.ensure_known(inputs)?;
        }

        let results: Vec<_> = if jobs.len() >= self.config.parallel_threshold {
            log::trace!(
                "[{}] inferring {} nodes on {} threads",
                self.config.name,
                jobs.len(),
                rayon::current_num_threads()
            );
            jobs.par_iter().map(|(op, inputs)| op.check(inputs)).collect()
        } else {
            jobs.iter().map(|(op, inputs)| op.check(inputs)).collect()
        };

        let mut inferred = Vec::with_capacity(results.len());
        for ((op, inputs), result) in jobs.iter().zip(results) {
            inferred.push(result.map_err(|r| self.reject(op, inputs, r))?);
        }

        let ids = jobs
            .into_iter()
            .zip(inferred)
            .map(|((op, inputs), shapes)| {
                let outputs = shapes.into_iter().map(TensorDesc::new).collect();
                self.commit(op, inputs, outputs)
            })
            .collect();
        Ok(ids)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn tensors(&self) -> &[TensorDesc] {
        &self.tensors
    }

    pub fn tensor(&self, id: TensorId) -> Option<&TensorDesc> {
        self.index.get(&id).map(|&i| &self.tensors[i])
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn register(&mut self, t: TensorDesc) {
        if !self.index.contains_key(&t.id()) {
            self.index.insert(t.id(), self.tensors.len());
            self.tensors.push(t);
        }
    }

    fn ensure_known(&self, inputs: &[TensorDesc]) -> Result<()> {
        match inputs.iter().find(|t| !self.index.contains_key(&t.id())) {
            Some(t) => Err(Error::UnknownTensor(t.id())),
            None => Ok(()),
        }
    }

    fn reject(&self, op: &Op, inputs: &[TensorDesc], reason: Incompatibility) -> Error {
        let shapes = shapes_of(inputs);
        log::warn!(
            "[{}] {} rejected at {} step: {} (inputs: {:?})",
            self.config.name,
            op.kind(),
            reason.stage(),
            reason,
            shapes.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
        Error::Incompatible {
            op: op.kind(),
            inputs: shapes,
            reason,
        }
    }

    fn commit(&mut self, op: Op, inputs: Vec<TensorDesc>, outputs: Vec<TensorDesc>) -> NodeId {
        for t in &outputs {
            self.register(t.clone());
        }
        let node = Node {
            id: NodeId(self.nodes.len()),
            op,
            inputs,
            outputs,
        };
        log::debug!("[{}] {} {}", self.config.name, node.id, node);
        let id = node.id;
        self.nodes.push(node);
        id
    }
}

fn shapes_of(inputs: &[TensorDesc]) -> Vec<Shape> {
    inputs.iter().map(|t| t.shape().clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_matmul_registers_output() {
        let mut g = Graph::default();
        let a = g.add_tensor((2, 3));
        let b = g.add_tensor((3, 4));
        let y = g.add_matmul(&a, &b, None, false, false).unwrap();
        assert_eq!(y.shape(), &Shape::from((2, 4)));
        assert_eq!(g.len(), 1);
        assert_eq!(g.tensors().len(), 3);
        assert_eq!(g.tensor(y.id()), Some(&y));
    }

    #[test]
    fn test_rejection_adds_nothing() {
        let mut g = Graph::default();
        let a = g.add_tensor((2, 3));
        let b = g.add_tensor((5, 4));
        let err = g.add_matmul(&a, &b, None, false, false).unwrap_err();
        assert!(matches!(
            err,
            Error::Incompatible {
                reason: Incompatibility::InnerDim { k_a: 3, k_b: 5 },
                ..
            }
        ));
        assert!(g.is_empty());
        assert_eq!(g.tensors().len(), 2);
    }

    #[test]
    fn test_unknown_input() {
        let mut g = Graph::default();
        let a = g.add_tensor((2, 3));
        let stray = TensorDesc::new((3, 4));
        let err = g.add_matmul(&a, &stray, None, false, false).unwrap_err();
        assert!(matches!(err, Error::UnknownTensor(id) if id == stray.id()));
    }

    #[test]
    fn test_supplied_output_checked() {
        let mut g = Graph::default();
        let a = g.add_tensor((2, 3));
        let b = g.add_tensor((3, 4));
        let good = TensorDesc::new((2, 4));
        let id = g
            .add_op(MatMul::default(), vec![a.clone(), b.clone()], vec![good.clone()])
            .unwrap();
        assert_eq!(g.node(id).unwrap().outputs(), &[good.clone()]);
        assert!(g.tensor(good.id()).is_some());

        let bad = TensorDesc::new((4, 2));
        let err = g
            .add_op(MatMul::default(), vec![a.clone(), b.clone()], vec![bad])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let two = vec![TensorDesc::new((2, 4)), TensorDesc::new((2, 4))];
        let err = g.add_op(MatMul::default(), vec![a, b], two).unwrap_err();
        assert!(matches!(
            err,
            Error::OutputCount {
                expected: 1,
                got: 2,
                ..
            }
        ));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_supplied_output_must_be_fresh() {
        let mut g = Graph::default();
        let a = g.add_tensor((2, 2));
        let b = g.add_tensor((2, 2));

        // An input cannot double as the node's own output.
        let err = g
            .add_op(MatMul::default(), vec![a.clone(), b.clone()], vec![a.clone()])
            .unwrap_err();
        assert!(matches!(err, Error::OutputAlreadyDefined(id) if id == a.id()));
        assert!(g.is_empty());

        // Nor can another node's output get a second producer.
        let y = g.add_matmul(&a, &b, None, false, false).unwrap();
        let err = g
            .add_op(MatMul::default(), vec![b.clone(), a.clone()], vec![y.clone()])
            .unwrap_err();
        assert!(matches!(err, Error::OutputAlreadyDefined(id) if id == y.id()));
        assert_eq!(g.len(), 1);
        let producers = g
            .nodes()
            .iter()
            .filter(|n| n.outputs().contains(&y))
            .count();
        assert_eq!(producers, 1);

        // A fresh descriptor is still accepted.
        let z = TensorDesc::new((2, 2));
        let id = g.add_op(MatMul::default(), vec![b, a], vec![z.clone()]).unwrap();
        assert_eq!(g.node(id).unwrap().outputs(), &[z]);
    }
}
