//! Incompressible-flow visualization built on the render graph.

pub(crate) mod config;
pub(crate) mod simulation;
