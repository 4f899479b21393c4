/// Settings for a [`Graph`](super::Graph).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Name used to tag log lines from this graph (default: "graph").
    pub name: String,
    /// Batches passed to `add_ops` with at least this many jobs are inferred
    /// on the rayon pool; smaller ones run inline (default: 64).
    pub parallel_threshold: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            name: "graph".to_string(),
            parallel_threshold: 64,
        }
    }
}

impl GraphConfig {
    /// Set the graph name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the batch size at which inference goes parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}
