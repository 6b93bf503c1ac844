use crate::effects::feedback::{Feedback, SEED_SLOT};
use crate::effects::multipass::EffectDesc;
use crate::effects::pressure::{DIVERGENCE_SLOT, INITIAL_SLOT, PressureDesc, PressureIterator};
use crate::foundation::core::{FrameId, NodeId, Precision, SurfaceDesc, SurfaceId};
use crate::foundation::error::{FluxError, FluxResult};
use crate::graph::node::{EvalCx, Inputs, Node, NodeKind};
use crate::graph::scheduler;
use crate::graph::uniform::{Uniform, UniformValue};
use crate::texture::source::TextureSource;
use crate::texture::store::{SurfaceStats, SurfaceStore};
use crate::texture::surface::Surface;
use std::fmt::Write as _;

/// Arena of effect nodes plus the surfaces they render into.
///
/// The graph is the explicit context object: nodes refer to each other by [`NodeId`], the
/// graph owns every surface, and [`RenderGraph::render_all`] evaluates a root's dependency
/// closure once per [`FrameId`].
pub struct RenderGraph {
    nodes: Vec<Option<Node>>,
    store: SurfaceStore,
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("nodes", &self.len())
            .field("surfaces", &self.store.stats())
            .finish()
    }
}

impl RenderGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            store: SurfaceStore::new(),
        }
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        tracing::debug!(node = %node.name, id = id.0, kind = node.kind_label(), "added node");
        self.nodes.push(Some(node));
        id
    }

    fn node(&self, id: NodeId) -> FluxResult<&Node> {
        self.nodes
            .get(id.slot())
            .and_then(Option::as_ref)
            .ok_or_else(|| FluxError::evaluation(format!("node {} is disposed or unknown", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> FluxResult<&mut Node> {
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or_else(|| FluxError::evaluation(format!("node {} is disposed or unknown", id.0)))
    }

    fn check_source(&self, src: &TextureSource) -> FluxResult<()> {
        if let Some(id) = src.node()
            && !self.contains(id)
        {
            return Err(FluxError::validation(format!(
                "source node {} is disposed or unknown",
                id.0
            )));
        }
        Ok(())
    }

    /// Add an effect node (single kernel or multi-pass chain).
    pub fn add_effect(&mut self, name: &str, desc: EffectDesc) -> FluxResult<NodeId> {
        let (effect, inputs, uniforms, surface) = desc.build(name)?;
        let surface = checked_desc(name, surface)?;
        for (_, src) in inputs.iter() {
            self.check_source(src)?;
        }
        let node = Node::new(
            name,
            inputs,
            uniforms,
            surface,
            NodeKind::Effect(effect),
            &mut self.store,
        );
        Ok(self.insert(node))
    }

    /// Add a feedback node seeded from `seed` (zeros when unset).
    pub fn add_feedback(
        &mut self,
        name: &str,
        seed: impl Into<TextureSource>,
        desc: SurfaceDesc,
    ) -> FluxResult<NodeId> {
        let desc = checked_desc(name, desc)?;
        let seed = seed.into();
        self.check_source(&seed)?;
        let mut inputs = Inputs::declared([SEED_SLOT]);
        inputs.set(SEED_SLOT, seed)?;
        let node = Node::new(
            name,
            inputs,
            Default::default(),
            desc,
            NodeKind::Feedback(Feedback::new()),
            &mut self.store,
        );
        Ok(self.insert(node))
    }

    /// Add a pressure iterator with `divergence` and optional `initial` inputs.
    pub fn add_pressure_iterator(&mut self, name: &str, desc: PressureDesc) -> FluxResult<NodeId> {
        let surface = checked_desc(name, desc.surface_desc())?;
        let node = Node::new(
            name,
            Inputs::declared([DIVERGENCE_SLOT, INITIAL_SLOT]),
            desc.uniforms(),
            surface,
            NodeKind::Pressure(PressureIterator::new()),
            &mut self.store,
        );
        Ok(self.insert(node))
    }

    /// Bind one input slot.
    pub fn set_src(
        &mut self,
        node: NodeId,
        key: &str,
        src: impl Into<TextureSource>,
    ) -> FluxResult<()> {
        let src = src.into();
        self.check_source(&src)?;
        let n = self.node_mut(node)?;
        n.inputs
            .set(key, src)
            .map_err(|e| FluxError::validation(format!("node '{}': {e}", n.name)))
    }

    /// Bind several input slots; stops at the first unknown key.
    pub fn set_srcs<'k>(
        &mut self,
        node: NodeId,
        srcs: impl IntoIterator<Item = (&'k str, TextureSource)>,
    ) -> FluxResult<()> {
        for (key, src) in srcs {
            self.set_src(node, key, src)?;
        }
        Ok(())
    }

    /// Current binding of an input slot.
    pub fn src(&self, node: NodeId, key: &str) -> FluxResult<TextureSource> {
        let n = self.node(node)?;
        n.inputs.get(key).cloned().ok_or_else(|| {
            FluxError::validation(format!("node '{}': unknown input key '{key}'", n.name))
        })
    }

    /// Input keys of a node in declaration order.
    pub fn input_keys(&self, node: NodeId) -> FluxResult<Vec<String>> {
        Ok(self.node(node)?.inputs.keys().map(str::to_string).collect())
    }

    /// Insert or replace a node uniform; it is picked up on the next evaluation.
    pub fn set_uniform(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<Uniform>,
    ) -> FluxResult<()> {
        self.node_mut(node)?.uniforms.set(name, value.into());
        Ok(())
    }

    /// Insert or replace several node uniforms.
    pub fn set_uniforms<'k>(
        &mut self,
        node: NodeId,
        values: impl IntoIterator<Item = (&'k str, Uniform)>,
    ) -> FluxResult<()> {
        let n = self.node_mut(node)?;
        for (name, value) in values {
            n.uniforms.set(name, value);
        }
        Ok(())
    }

    /// Value a kernel would see for `name`, including the built-in `resolution`.
    pub fn uniform(&self, node: NodeId, name: &str) -> FluxResult<Option<UniformValue>> {
        let n = self.node(node)?;
        Ok(n.uniforms.get(name).or_else(|| n.resolved.get(name)))
    }

    /// Make a feedback node republish `source`'s previous output, after one more seed frame.
    pub fn set_feedback_source(&mut self, feedback: NodeId, source: NodeId) -> FluxResult<()> {
        if feedback == source {
            return Err(FluxError::validation("a feedback node cannot feed back into itself"));
        }
        if !self.contains(source) {
            return Err(FluxError::validation(format!(
                "feedback source {} is disposed or unknown",
                source.0
            )));
        }
        let n = self.node_mut(feedback)?;
        match &mut n.kind {
            NodeKind::Feedback(f) => {
                f.attach(source);
                Ok(())
            }
            _ => Err(FluxError::validation(format!(
                "node '{}' is not a feedback node",
                n.name
            ))),
        }
    }

    /// Whether a feedback node has switched from its seed to the attached node.
    pub fn feedback_retargeted(&self, feedback: NodeId) -> FluxResult<bool> {
        match &self.node(feedback)?.kind {
            NodeKind::Feedback(f) => Ok(f.is_retargeted()),
            _ => Err(FluxError::validation("not a feedback node")),
        }
    }

    /// Reallocate a node's output at a new size; internal buffers follow on the next render.
    pub fn resize(&mut self, node: NodeId, width: u32, height: u32) -> FluxResult<()> {
        let Self { nodes, store } = self;
        let n = nodes
            .get_mut(node.slot())
            .and_then(Option::as_mut)
            .ok_or_else(|| FluxError::evaluation(format!("node {} is disposed or unknown", node.0)))?;
        n.resize(width, height, store)
    }

    /// Dependency-first evaluation order of everything `root` needs, ending with `root`.
    pub fn topo_order(&self, root: NodeId) -> FluxResult<Vec<NodeId>> {
        scheduler::topo_order(&self.nodes, root)
    }

    /// Human-readable evaluation order, one node per line.
    pub fn dump_order(&self, root: NodeId) -> FluxResult<String> {
        let mut out = String::new();
        for (i, id) in self.topo_order(root)?.into_iter().enumerate() {
            let n = self.node(id)?;
            let passes = match &n.kind {
                NodeKind::Effect(m) => m.pass_count(),
                _ => 1,
            };
            let _ = writeln!(
                out,
                "{i:>3}. {} [{}] {}x{} passes={passes}",
                n.name,
                n.kind_label(),
                n.desc.width,
                n.desc.height
            );
        }
        Ok(out)
    }

    /// Evaluate every node reachable from `root` in dependency order.
    ///
    /// A node already evaluated for `frame` only refreshes its per-visit state; its output is
    /// reused as-is.
    #[tracing::instrument(level = "debug", skip_all, fields(root = root.0, frame = frame.0))]
    pub fn render_all(&mut self, root: NodeId, frame: FrameId) -> FluxResult<()> {
        let order = self.topo_order(root)?;
        for id in order {
            let slot = id.slot();
            let mut node = self.nodes.get_mut(slot).and_then(Option::take).ok_or_else(|| {
                FluxError::evaluation(format!("node {} disappeared during render", id.0))
            })?;

            let result = if node.last_frame == Some(frame) {
                node.refresh_frame_state();
                tracing::trace!(node = %node.name, "already evaluated this frame");
                Ok(())
            } else {
                let mut cx = EvalCx {
                    nodes: &self.nodes,
                    store: &mut self.store,
                };
                let r = node.evaluate(&mut cx);
                if r.is_ok() {
                    node.last_frame = Some(frame);
                    node.eval_count += 1;
                    tracing::trace!(node = %node.name, "evaluated");
                }
                r
            };

            self.nodes[slot] = Some(node);
            result?;
        }
        Ok(())
    }

    /// Release a node's output and internal buffers.
    ///
    /// Nodes still reading from it fail at their next evaluation.
    pub fn dispose(&mut self, node: NodeId) -> FluxResult<()> {
        let mut n = self
            .nodes
            .get_mut(node.slot())
            .and_then(Option::take)
            .ok_or_else(|| {
                FluxError::evaluation(format!("node {} is already disposed or unknown", node.0))
            })?;
        tracing::debug!(node = %n.name, "disposing node");
        n.release(&mut self.store)
    }

    /// Dispose `node` and every upstream node that only nodes being disposed still refer to.
    ///
    /// Feedback attachments count as references, so a feedback loop closed entirely inside the
    /// disposed set is reclaimed, while anything a surviving node reads is kept.
    /// Returns the number of nodes disposed.
    pub fn dispose_cascade(&mut self, node: NodeId) -> FluxResult<usize> {
        let mut doomed = vec![node];
        let mut next = 0;
        while let Some(&id) = doomed.get(next) {
            next += 1;
            for up in self.node(id)?.references() {
                if self.contains(up) && !doomed.contains(&up) {
                    doomed.push(up);
                }
            }
        }

        while let Some(pos) = doomed
            .iter()
            .position(|&id| id != node && self.referenced_outside(id, &doomed))
        {
            doomed.remove(pos);
        }

        for &id in &doomed {
            self.dispose(id)?;
        }
        Ok(doomed.len())
    }

    fn referenced_outside(&self, id: NodeId, set: &[NodeId]) -> bool {
        self.nodes.iter().enumerate().any(|(slot, n)| {
            n.as_ref().is_some_and(|n| {
                !set.contains(&NodeId(slot as u32)) && n.references().contains(&id)
            })
        })
    }

    /// Allocate a free-standing surface owned by the caller.
    ///
    /// Zero dimensions are clamped to one texel.
    pub fn create_surface(&mut self, desc: SurfaceDesc) -> SurfaceId {
        self.store.alloc(desc)
    }

    /// Upload a static image into a new 8-bit surface.
    pub fn upload_image(&mut self, image: &image::RgbaImage) -> FluxResult<SurfaceId> {
        let desc = SurfaceDesc::new(image.width(), image.height(), Precision::Unorm8)?;
        let id = self.store.alloc(desc);
        self.store.get_mut(id)?.upload_rgba8(image.as_raw());
        Ok(id)
    }

    /// Release a surface created with [`RenderGraph::create_surface`] or
    /// [`RenderGraph::upload_image`].
    pub fn release_surface(&mut self, id: SurfaceId) -> FluxResult<()> {
        self.store.release(id)
    }

    /// Read any live surface.
    pub fn surface(&self, id: SurfaceId) -> FluxResult<&Surface> {
        self.store.get(id)
    }

    /// Write into any live surface, e.g. to seed a static input.
    pub fn surface_mut(&mut self, id: SurfaceId) -> FluxResult<&mut Surface> {
        self.store.get_mut(id)
    }

    /// Output surface handle of a node.
    pub fn output_id(&self, node: NodeId) -> FluxResult<SurfaceId> {
        Ok(self.node(node)?.output)
    }

    /// Output surface of a node as of its last evaluation.
    pub fn output(&self, node: NodeId) -> FluxResult<&Surface> {
        self.store.get(self.node(node)?.output)
    }

    /// Output of a node as an opaque 8-bit image.
    pub fn read_rgba8(&self, node: NodeId) -> FluxResult<image::RgbaImage> {
        let s = self.output(node)?;
        image::RgbaImage::from_raw(s.width(), s.height(), s.to_rgba8(true))
            .ok_or_else(|| FluxError::evaluation("output buffer has an unexpected length"))
    }

    /// Diagnostic name of a node.
    pub fn node_name(&self, node: NodeId) -> FluxResult<&str> {
        Ok(self.node(node)?.name.as_str())
    }

    /// Output descriptor of a node.
    pub fn node_desc(&self, node: NodeId) -> FluxResult<SurfaceDesc> {
        Ok(self.node(node)?.desc)
    }

    /// How many times a node actually ran (memoized visits excluded).
    pub fn eval_count(&self, node: NodeId) -> FluxResult<u64> {
        Ok(self.node(node)?.eval_count)
    }

    /// Frame of the node's most recent evaluation.
    pub fn last_frame(&self, node: NodeId) -> FluxResult<Option<FrameId>> {
        Ok(self.node(node)?.last_frame)
    }

    /// Sweeps used by a pressure node's most recent evaluation.
    pub fn pressure_iterations(&self, node: NodeId) -> FluxResult<u32> {
        match &self.node(node)?.kind {
            NodeKind::Pressure(p) => Ok(p.last_iterations()),
            _ => Err(FluxError::validation("not a pressure node")),
        }
    }

    /// Number of internal surfaces a node holds besides its output.
    pub fn internal_surface_count(&self, node: NodeId) -> FluxResult<usize> {
        let n = self.node(node)?;
        let internal = match &n.kind {
            NodeKind::Effect(m) => m.internal_targets().count(),
            NodeKind::Feedback(_) => 0,
            NodeKind::Pressure(p) => p.buffers().map_or(0, |b| b.len()),
        };
        Ok(internal + n.uploads.len())
    }

    /// Return `true` when `node` is live.
    pub fn contains(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(node.slot()), Some(Some(_)))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Return `true` when no node is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Surface allocation counters.
    pub fn surface_stats(&self) -> SurfaceStats {
        self.store.stats()
    }
}

fn checked_desc(name: &str, desc: SurfaceDesc) -> FluxResult<SurfaceDesc> {
    if desc.width == 0 || desc.height == 0 {
        return Err(FluxError::validation(format!(
            "node '{name}': output must be at least 1x1, got {}x{}",
            desc.width, desc.height
        )));
    }
    Ok(desc)
}

#[cfg(test)]
#[path = "../../tests/unit/graph/render_graph.rs"]
mod tests;
