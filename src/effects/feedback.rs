//! One-frame-latency feedback.
//!
//! A feedback node starts as a passthrough of its seed source. Once a node is attached, the
//! next evaluation still renders the seed and then retargets the node to copy the attached
//! node's output surface. That read is not a scheduling dependency, so each evaluation
//! publishes what the attached node produced on the previous frame.

use crate::foundation::core::{NodeId, Sampler};
use crate::foundation::error::FluxResult;
use crate::graph::kernel::{Binding, run_kernel};
use crate::graph::node::{EvalCx, NodeIo};
use crate::kernels::Passthrough;
use crate::texture::source::TextureSource;
use smallvec::SmallVec;

pub(crate) const SEED_SLOT: &str = "initial";

#[derive(Debug)]
enum Reading {
    Seed,
    Previous(NodeId),
}

#[derive(Debug)]
pub(crate) struct Feedback {
    reading: Reading,
    attached: Option<NodeId>,
    retarget_pending: bool,
}

impl Feedback {
    pub(crate) fn new() -> Self {
        Self {
            reading: Reading::Seed,
            attached: None,
            retarget_pending: false,
        }
    }

    /// Attach the node whose previous output this feedback republishes.
    ///
    /// Takes effect after the next evaluation.
    pub(crate) fn attach(&mut self, source: NodeId) {
        self.attached = Some(source);
        self.retarget_pending = true;
    }

    pub(crate) fn attached(&self) -> Option<NodeId> {
        self.attached
    }

    pub(crate) fn is_retargeted(&self) -> bool {
        matches!(self.reading, Reading::Previous(_))
    }

    /// Only the seed is a scheduling dependency; the attached node never is.
    pub(crate) fn dependencies(&self, seed: Option<&TextureSource>) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        if let Reading::Seed = self.reading
            && let Some(id) = seed.and_then(TextureSource::node)
        {
            out.push(id);
        }
        out
    }

    pub(crate) fn render(&mut self, cx: &mut EvalCx<'_>, io: &mut NodeIo<'_>) -> FluxResult<()> {
        let source = match self.reading {
            Reading::Seed => match io.inputs.get(SEED_SLOT) {
                Some(src) => cx.resolve(SEED_SLOT, src, io.uploads)?,
                None => None,
            },
            Reading::Previous(id) => Some(cx.node_output(id)?),
        };
        let bindings = [Binding {
            slot: "source",
            surface: source,
            sampler: Sampler::NEAREST_CLAMP,
        }];
        run_kernel(cx.store, &Passthrough, io.output, &bindings, io.uniforms)?;

        if self.retarget_pending
            && let Some(id) = self.attached
        {
            self.reading = Reading::Previous(id);
            self.retarget_pending = false;
            tracing::debug!(node = io.name, source = id.0, "feedback now reads previous frame");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/feedback.rs"]
mod tests;
