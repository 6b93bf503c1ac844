use crate::effects::multipass::EffectDesc;
use crate::effects::pressure::{DIVERGENCE_SLOT, PressureDesc};
use crate::fluid::config::{FluidConfig, FluidConfigPatch, clamp_radius, clamp_time_step};
use crate::foundation::core::{FrameId, NodeId, Point, SurfaceDesc, Vec2};
use crate::foundation::error::{FluxError, FluxResult};
use crate::foundation::math::decay_factor;
use crate::graph::render_graph::RenderGraph;
use crate::graph::uniform::Uniform;
use crate::kernels::fluid::splat_uniform;
use crate::kernels::{Advect, Curl, Divergence, GradientSubtract, Splat, Vorticity};
use crate::texture::source::TextureSource;
use crate::texture::surface::Surface;

/// Node handles of the fluid pipeline, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FluidNodes {
    /// Previous frame's velocity.
    pub velocity_feedback: NodeId,
    /// Velocity force injection.
    pub velocity_splat: NodeId,
    /// Curl of the injected velocity.
    pub curl: NodeId,
    /// Vorticity confinement.
    pub vorticity: NodeId,
    /// Divergence of the confined velocity.
    pub divergence: NodeId,
    /// Pressure solve.
    pub pressure: NodeId,
    /// Gradient subtraction.
    pub projection: NodeId,
    /// Velocity self-advection; this frame's velocity field.
    pub velocity_advect: NodeId,
    /// Previous frame's dye.
    pub dye_feedback: NodeId,
    /// Dye color injection.
    pub dye_splat: NodeId,
    /// Dye advection; the visible output and the graph root.
    pub dye_advect: NodeId,
}

impl FluidNodes {
    fn all(&self) -> [NodeId; 11] {
        [
            self.dye_advect,
            self.dye_splat,
            self.dye_feedback,
            self.velocity_advect,
            self.projection,
            self.pressure,
            self.divergence,
            self.vorticity,
            self.curl,
            self.velocity_splat,
            self.velocity_feedback,
        ]
    }
}

/// Stable-fluids solver assembled from graph nodes.
///
/// Per frame: splat, curl, vorticity confinement, divergence, pressure, projection, then
/// self-advection of the velocity. Dye is splatted and advected by that final velocity. Both
/// fields loop back through feedback nodes, so the graph itself stays acyclic.
pub struct FluidSimulation {
    graph: RenderGraph,
    config: FluidConfig,
    nodes: FluidNodes,
    frame: FrameId,
    queued_splats: usize,
    disposed: bool,
}

impl std::fmt::Debug for FluidSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluidSimulation")
            .field("config", &self.config)
            .field("frame", &self.frame)
            .field("queued_splats", &self.queued_splats)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl FluidSimulation {
    /// Build the pipeline for `config` (clamped first).
    pub fn new(config: FluidConfig) -> FluxResult<Self> {
        let config = config.sanitized();
        let desc = SurfaceDesc::new(config.sim_width, config.sim_height, Default::default())?;
        let mut g = RenderGraph::new();

        let velocity_feedback = g.add_feedback("velocity_feedback", TextureSource::Unset, desc)?;
        let velocity_splat = g.add_effect(
            "velocity_splat",
            EffectDesc::single(Splat, desc).src("source", velocity_feedback),
        )?;
        let curl = g.add_effect(
            "curl",
            EffectDesc::single(Curl, desc).src("velocity", velocity_splat),
        )?;
        let vorticity = g.add_effect(
            "vorticity",
            EffectDesc::single(Vorticity, desc)
                .src("velocity", velocity_splat)
                .src("curl", curl),
        )?;
        let divergence = g.add_effect(
            "divergence",
            EffectDesc::single(Divergence, desc).src("velocity", vorticity),
        )?;
        let pressure = g.add_pressure_iterator(
            "pressure",
            PressureDesc::new(config.sim_width, config.sim_height)
                .iterations(config.pressure_iterations)
                .damping(config.pressure),
        )?;
        g.set_src(pressure, DIVERGENCE_SLOT, divergence)?;
        let projection = g.add_effect(
            "projection",
            EffectDesc::single(GradientSubtract, desc)
                .src("pressure", pressure)
                .src("velocity", vorticity),
        )?;
        let velocity_advect = g.add_effect(
            "velocity_advect",
            EffectDesc::single(Advect, desc)
                .src("source", projection)
                .src("velocity", projection),
        )?;
        g.set_feedback_source(velocity_feedback, velocity_advect)?;

        let dye_feedback = g.add_feedback("dye_feedback", TextureSource::Unset, desc)?;
        let dye_splat = g.add_effect(
            "dye_splat",
            EffectDesc::single(Splat, desc).src("source", dye_feedback),
        )?;
        let dye_advect = g.add_effect(
            "dye_advect",
            EffectDesc::single(Advect, desc)
                .src("source", dye_splat)
                .src("velocity", velocity_advect),
        )?;
        g.set_feedback_source(dye_feedback, dye_advect)?;

        let mut sim = Self {
            graph: g,
            config,
            nodes: FluidNodes {
                velocity_feedback,
                velocity_splat,
                curl,
                vorticity,
                divergence,
                pressure,
                projection,
                velocity_advect,
                dye_feedback,
                dye_splat,
                dye_advect,
            },
            frame: FrameId(0),
            queued_splats: 0,
            disposed: false,
        };
        sim.push_time_uniforms()?;
        sim.push_vorticity_uniforms()?;
        sim.reset_splats()?;
        tracing::debug!(
            width = sim.config.sim_width,
            height = sim.config.sim_height,
            "fluid pipeline built"
        );
        Ok(sim)
    }

    fn ensure_live(&self) -> FluxResult<()> {
        if self.disposed {
            return Err(FluxError::evaluation("fluid simulation is disposed"));
        }
        Ok(())
    }

    fn push_time_uniforms(&mut self) -> FluxResult<()> {
        let dt = self.config.time_step;
        let velocity_decay = decay_factor(self.config.velocity_dissipation, dt);
        let dye_decay = decay_factor(self.config.dye_dissipation, dt);
        self.graph.set_uniforms(
            self.nodes.velocity_advect,
            [("dt", Uniform::from(dt)), ("decay", Uniform::from(velocity_decay))],
        )?;
        self.graph.set_uniforms(
            self.nodes.dye_advect,
            [("dt", Uniform::from(dt)), ("decay", Uniform::from(dye_decay))],
        )?;
        self.graph.set_uniform(self.nodes.vorticity, "dt", dt)
    }

    fn push_vorticity_uniforms(&mut self) -> FluxResult<()> {
        self.graph.set_uniforms(
            self.nodes.vorticity,
            [
                ("enabled", Uniform::from(self.config.enable_vorticity)),
                ("strength", Uniform::from(self.config.vorticity_strength)),
            ],
        )
    }

    fn push_pressure_uniforms(&mut self) -> FluxResult<()> {
        let iterations = i32::try_from(self.config.pressure_iterations).unwrap_or(i32::MAX);
        self.graph.set_uniforms(
            self.nodes.pressure,
            [
                ("iterations", Uniform::from(iterations)),
                ("damping", Uniform::from(self.config.pressure)),
            ],
        )
    }

    fn reset_splats(&mut self) -> FluxResult<()> {
        self.queued_splats = 0;
        for node in [self.nodes.velocity_splat, self.nodes.dye_splat] {
            self.graph.set_uniforms(
                node,
                [("additive", Uniform::from(false)), ("count", Uniform::from(0))],
            )?;
        }
        Ok(())
    }

    /// Use `dt` seconds for the following frames and refresh the decay factors.
    pub fn advance_frame(&mut self, dt: f32) -> FluxResult<()> {
        self.ensure_live()?;
        self.config.time_step = clamp_time_step(dt);
        self.push_time_uniforms()
    }

    /// Inject force and dye for exactly the next rendered frame.
    ///
    /// `point` is in normalized `[0, 1]^2` grid coordinates, `velocity_delta` is scaled by
    /// `forceStrength`. `radius` falls back to the configured splat radius. Splats queued
    /// before the same render add up.
    pub fn apply_splat(
        &mut self,
        point: Point,
        velocity_delta: Vec2,
        color: [f32; 3],
        radius: Option<f32>,
    ) -> FluxResult<()> {
        self.ensure_live()?;
        let radius = clamp_radius(radius.unwrap_or(self.config.splat_radius));
        let at = [point.x as f32, point.y as f32];
        let force = self.config.force_strength;
        let impulse = [
            velocity_delta.x as f32 * force,
            velocity_delta.y as f32 * force,
            0.0,
        ];
        let index = self.queued_splats;
        let count = i32::try_from(index + 1).unwrap_or(i32::MAX);
        let (point_key, value_key, radius_key) = (
            splat_uniform("point", index),
            splat_uniform("value", index),
            splat_uniform("radius", index),
        );
        for (node, value) in [
            (self.nodes.velocity_splat, impulse),
            (self.nodes.dye_splat, color),
        ] {
            self.graph.set_uniforms(
                node,
                [
                    ("additive", Uniform::from(true)),
                    ("count", Uniform::from(count)),
                    (point_key.as_str(), Uniform::from(at)),
                    (value_key.as_str(), Uniform::from(value)),
                    (radius_key.as_str(), Uniform::from(radius)),
                ],
            )?;
        }
        self.queued_splats = index + 1;
        tracing::debug!(x = at[0], y = at[1], radius, index, "splat queued");
        Ok(())
    }

    /// Patch the mutable parameters; decay factors are recomputed when needed.
    pub fn set_uniforms(&mut self, patch: &FluidConfigPatch) -> FluxResult<()> {
        self.ensure_live()?;
        self.config.apply(patch);
        if patch.touches_pressure() {
            self.push_pressure_uniforms()?;
        }
        if patch.touches_decay() {
            self.push_time_uniforms()?;
        }
        if patch.touches_vorticity() {
            self.push_vorticity_uniforms()?;
        }
        Ok(())
    }

    /// Evaluate one frame from the dye root, then return both splats to passthrough.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn render_all(&mut self) -> FluxResult<()> {
        self.ensure_live()?;
        self.frame = self.frame.next();
        tracing::trace!(frame = self.frame.0, "rendering fluid frame");
        let rendered = self.graph.render_all(self.nodes.dye_advect, self.frame);
        self.reset_splats()?;
        rendered
    }

    /// `advance_frame(dt)` followed by `render_all()`.
    pub fn step(&mut self, dt: f32) -> FluxResult<()> {
        self.advance_frame(dt)?;
        self.render_all()
    }

    /// Release every node of the pipeline. Later calls are no-ops.
    pub fn dispose(&mut self) -> FluxResult<()> {
        if self.disposed {
            return Ok(());
        }
        for node in self.nodes.all() {
            self.graph.dispose(node)?;
        }
        self.disposed = true;
        tracing::debug!("fluid pipeline disposed");
        Ok(())
    }

    /// Whether [`FluidSimulation::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Velocity after this frame's advection (texels per second in `r`/`g`).
    pub fn velocity(&self) -> FluxResult<&Surface> {
        self.graph.output(self.nodes.velocity_advect)
    }

    /// Dye after this frame's advection.
    pub fn dye(&self) -> FluxResult<&Surface> {
        self.graph.output(self.nodes.dye_advect)
    }

    /// Solved pressure.
    pub fn pressure(&self) -> FluxResult<&Surface> {
        self.graph.output(self.nodes.pressure)
    }

    /// Divergence of the pre-projection velocity.
    pub fn divergence(&self) -> FluxResult<&Surface> {
        self.graph.output(self.nodes.divergence)
    }

    /// Curl of the pre-projection velocity.
    pub fn curl(&self) -> FluxResult<&Surface> {
        self.graph.output(self.nodes.curl)
    }

    /// Dye as an opaque 8-bit image.
    pub fn dye_rgba8(&self) -> FluxResult<image::RgbaImage> {
        self.graph.read_rgba8(self.nodes.dye_advect)
    }

    /// Number of frames rendered so far.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Current, clamped configuration.
    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Node handles of the pipeline.
    pub fn nodes(&self) -> FluidNodes {
        self.nodes
    }

    /// The underlying graph.
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    /// Evaluation order of the whole pipeline.
    pub fn dump_order(&self) -> FluxResult<String> {
        self.graph.dump_order(self.nodes.dye_advect)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fluid/simulation.rs"]
mod tests;
