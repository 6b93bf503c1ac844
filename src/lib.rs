//! fluxgraph schedules shader-style effects as a render graph and runs an iterative
//! incompressible-flow solver on top of it.
//!
//! # Overview
//!
//! 1. **Build**: add nodes to a [`RenderGraph`]. Each node is an effect (one or more kernel
//!    passes), a one-frame [feedback](RenderGraph::add_feedback) adapter, or a
//!    [pressure iterator](RenderGraph::add_pressure_iterator).
//! 2. **Wire**: bind input slots to other nodes, static surfaces or shared canvases with
//!    [`TextureSource`], and set [`Uniform`]s (constants or per-frame producers).
//! 3. **Render**: [`RenderGraph::render_all`] orders the root's dependencies depth-first,
//!    rejects cycles and evaluates each node at most once per [`FrameId`].
//!
//! [`FluidSimulation`] assembles the stable-fluids pipeline (splat, vorticity, pressure
//! projection, advection) from these pieces and exposes a small control surface.
//!
//! Surfaces live on the CPU as `f32` RGBA texel grids and kernels run rows in parallel with
//! `rayon`; the graph itself is single-threaded.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod effects;
mod fluid;
mod foundation;
mod graph;
mod texture;

pub mod kernels;

pub use effects::multipass::{EffectDesc, PassDesc, PassInput};
pub use effects::pressure::PressureDesc;
pub use fluid::config::{FluidConfig, FluidConfigPatch, MIN_SPLAT_RADIUS, MIN_TIME_STEP};
pub use fluid::simulation::{FluidNodes, FluidSimulation};
pub use foundation::core::{
    Filter, FrameId, NodeId, Point, Precision, Sampler, SurfaceDesc, SurfaceId, Vec2, Wrap,
};
pub use foundation::error::{FluxError, FluxResult};
pub use graph::kernel::{BoundTexture, Field, Kernel, KernelIo};
pub use graph::render_graph::RenderGraph;
pub use graph::uniform::{ResolvedUniforms, Uniform, UniformValue, Uniforms};
pub use texture::source::{SharedCanvas, TextureSource, shared_canvas};
pub use texture::store::SurfaceStats;
pub use texture::surface::Surface;
