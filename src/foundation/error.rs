/// Convenience result type used across fluxgraph.
pub type FluxResult<T> = Result<T, FluxError>;

/// Top-level error taxonomy used by graph and solver APIs.
///
/// Construction-time wiring mistakes and graph-structure errors are reported here. Numeric
/// degeneracies (zero iterations, non-positive time steps, zero radii) are clamped instead and
/// never surface as errors.
#[derive(thiserror::Error, Debug)]
pub enum FluxError {
    /// Invalid node or pass wiring detected while constructing or rewiring a node.
    #[error("validation error: {0}")]
    Validation(String),

    /// A node was reached again while its own dependencies were still being visited.
    #[error("cycle error: node '{node}' depends on itself")]
    Cycle {
        /// Diagnostic name of the offending node.
        node: String,
    },

    /// Errors while evaluating the graph (stale handles, disposed nodes, double release).
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FluxError {
    /// Build a [`FluxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FluxError::Cycle`] value naming the offending node.
    pub fn cycle(node: impl Into<String>) -> Self {
        Self::Cycle { node: node.into() }
    }

    /// Build a [`FluxError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`FluxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
