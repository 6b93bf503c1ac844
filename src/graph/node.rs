use crate::effects::feedback::{Feedback, SEED_SLOT};
use crate::effects::multipass::MultiPass;
use crate::effects::pressure::PressureIterator;
use crate::foundation::core::{FrameId, NodeId, SurfaceDesc, SurfaceId};
use crate::foundation::error::{FluxError, FluxResult};
use crate::graph::uniform::{ResolvedUniforms, UniformValue, Uniforms};
use crate::texture::source::{TextureSource, UploadCache};
use crate::texture::store::SurfaceStore;
use smallvec::SmallVec;

/// Insertion-ordered input slots of a node.
///
/// Enumeration order drives the scheduler's traversal order, so it must stay deterministic.
#[derive(Debug, Default)]
pub(crate) struct Inputs {
    entries: SmallVec<[(String, TextureSource); 4]>,
}

impl Inputs {
    pub(crate) fn declared<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Self::default();
        for k in keys {
            out.entries.push((k.to_string(), TextureSource::Unset));
        }
        out
    }

    pub(crate) fn get(&self, key: &str) -> Option<&TextureSource> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Rebind a declared slot. Unknown keys are rejected.
    pub(crate) fn set(&mut self, key: &str, src: TextureSource) -> FluxResult<()> {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => {
                *slot = src;
                Ok(())
            }
            None => Err(FluxError::validation(format!("unknown input key '{key}'"))),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &TextureSource)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Upstream nodes in slot order, without duplicates.
    pub(crate) fn dependencies(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::<[NodeId; 4]>::new();
        for (_, src) in &self.entries {
            if let Some(id) = src.node()
                && !out.contains(&id)
            {
                out.push(id);
            }
        }
        out
    }
}

/// The closed set of node behaviors the scheduler knows about.
pub(crate) enum NodeKind {
    Effect(MultiPass),
    Feedback(Feedback),
    Pressure(PressureIterator),
}

impl NodeKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Effect(_) => "effect",
            Self::Feedback(_) => "feedback",
            Self::Pressure(_) => "pressure",
        }
    }
}

pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) inputs: Inputs,
    pub(crate) uniforms: Uniforms,
    pub(crate) resolved: ResolvedUniforms,
    pub(crate) output: SurfaceId,
    pub(crate) desc: SurfaceDesc,
    pub(crate) last_frame: Option<FrameId>,
    pub(crate) eval_count: u64,
    pub(crate) uploads: UploadCache,
    pub(crate) kind: NodeKind,
}

/// The parts of a node a kind-specific render procedure reads.
pub(crate) struct NodeIo<'n> {
    pub(crate) name: &'n str,
    pub(crate) inputs: &'n Inputs,
    pub(crate) uniforms: &'n ResolvedUniforms,
    pub(crate) uploads: &'n mut UploadCache,
    pub(crate) output: SurfaceId,
    pub(crate) desc: SurfaceDesc,
}

/// Graph state visible while one node is evaluated.
///
/// The node being evaluated is checked out of `nodes`, so it can never resolve itself.
pub(crate) struct EvalCx<'g> {
    pub(crate) nodes: &'g [Option<Node>],
    pub(crate) store: &'g mut SurfaceStore,
}

impl EvalCx<'_> {
    pub(crate) fn node_output(&self, id: NodeId) -> FluxResult<SurfaceId> {
        self.nodes
            .get(id.slot())
            .and_then(Option::as_ref)
            .map(|n| n.output)
            .ok_or_else(|| {
                FluxError::evaluation(format!("input node {} is disposed or unavailable", id.0))
            })
    }

    /// Turn a bound source into a readable surface, uploading canvases as needed.
    pub(crate) fn resolve(
        &mut self,
        slot: &str,
        src: &TextureSource,
        uploads: &mut UploadCache,
    ) -> FluxResult<Option<SurfaceId>> {
        match src {
            TextureSource::Unset => Ok(None),
            TextureSource::Surface(id) => {
                if self.store.desc(*id).is_some() {
                    Ok(Some(*id))
                } else {
                    tracing::debug!(slot, surface = id.0, "bound surface is gone, leaving slot empty");
                    Ok(None)
                }
            }
            TextureSource::Node(id) => self.node_output(*id).map(Some),
            TextureSource::Canvas(canvas) => uploads.upload(slot, canvas, self.store),
        }
    }
}

impl Node {
    pub(crate) fn new(
        name: &str,
        inputs: Inputs,
        uniforms: Uniforms,
        desc: SurfaceDesc,
        kind: NodeKind,
        store: &mut SurfaceStore,
    ) -> Self {
        let mut node = Self {
            name: name.to_string(),
            inputs,
            uniforms,
            resolved: ResolvedUniforms::default(),
            output: store.alloc(desc),
            desc,
            last_frame: None,
            eval_count: 0,
            uploads: UploadCache::default(),
            kind,
        };
        node.refresh_frame_state();
        node
    }

    pub(crate) fn kind_label(&self) -> &'static str {
        self.kind.label()
    }

    /// Nodes that must be evaluated before this one.
    pub(crate) fn dependencies(&self) -> SmallVec<[NodeId; 4]> {
        match &self.kind {
            NodeKind::Feedback(f) => f.dependencies(self.inputs.get(SEED_SLOT)),
            _ => self.inputs.dependencies(),
        }
    }

    /// Every node this one refers to, including non-scheduling feedback references.
    pub(crate) fn references(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = self.dependencies();
        if let NodeKind::Feedback(f) = &self.kind
            && let Some(id) = f.attached()
            && !out.contains(&id)
        {
            out.push(id);
        }
        out
    }

    /// Cheap per-visit state, refreshed even when evaluation is memoized.
    pub(crate) fn refresh_frame_state(&mut self) {
        self.resolved.set(
            "resolution",
            UniformValue::Vec2([self.desc.width as f32, self.desc.height as f32]),
        );
    }

    pub(crate) fn evaluate(&mut self, cx: &mut EvalCx<'_>) -> FluxResult<()> {
        self.uniforms.resolve_into(&mut self.resolved);
        self.refresh_frame_state();

        let Self {
            name,
            inputs,
            resolved,
            output,
            desc,
            uploads,
            kind,
            ..
        } = self;
        let mut io = NodeIo {
            name,
            inputs,
            uniforms: resolved,
            uploads,
            output: *output,
            desc: *desc,
        };
        match kind {
            NodeKind::Effect(m) => m.render(cx, &mut io),
            NodeKind::Feedback(f) => f.render(cx, &mut io),
            NodeKind::Pressure(p) => p.render(cx, &mut io),
        }
    }

    /// Reallocate the output at a new size; internal buffers follow lazily on next render.
    pub(crate) fn resize(&mut self, width: u32, height: u32, store: &mut SurfaceStore) -> FluxResult<()> {
        let desc = SurfaceDesc {
            width: width.max(1),
            height: height.max(1),
            precision: self.desc.precision,
        };
        if desc == self.desc {
            return Ok(());
        }
        store.release(self.output)?;
        self.output = store.alloc(desc);
        self.desc = desc;
        self.last_frame = None;
        if let NodeKind::Pressure(p) = &mut self.kind {
            p.forget_previous();
        }
        self.refresh_frame_state();
        tracing::debug!(node = %self.name, width = desc.width, height = desc.height, "resized node");
        Ok(())
    }

    /// Release the output and every internal buffer exactly once.
    pub(crate) fn release(&mut self, store: &mut SurfaceStore) -> FluxResult<()> {
        match &mut self.kind {
            NodeKind::Effect(m) => m.release(store)?,
            NodeKind::Feedback(_) => {}
            NodeKind::Pressure(p) => p.release(store)?,
        }
        self.uploads.release_all(store)?;
        store.release(self.output)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/node.rs"]
mod tests;
