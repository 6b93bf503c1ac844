//! Node arena, scheduling and kernel binding.

pub(crate) mod kernel;
pub(crate) mod node;
pub(crate) mod render_graph;
pub(crate) mod scheduler;
pub(crate) mod uniform;
