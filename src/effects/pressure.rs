use crate::foundation::core::{Precision, Sampler, SurfaceDesc, SurfaceId};
use crate::foundation::error::FluxResult;
use crate::graph::kernel::{Binding, Kernel, run_kernel};
use crate::graph::node::{EvalCx, NodeIo};
use crate::graph::uniform::{ResolvedUniforms, Uniforms};
use crate::kernels::{Clear, Jacobi, Passthrough, Scale};
use crate::texture::store::SurfaceStore;

pub(crate) const DIVERGENCE_SLOT: &str = "divergence";
pub(crate) const INITIAL_SLOT: &str = "initial";

/// Pressure node configuration.
///
/// `iterations` and `damping` become the node uniforms of the same names, so they can be
/// patched or driven at runtime like any other parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PressureDesc {
    /// Output shape; pressure is always stored as `f32`.
    pub desc: SurfaceDesc,
    /// Jacobi sweeps per evaluation; clamped to at least one.
    pub iterations: u32,
    /// Warm-start factor applied to the previous result; clamped to `[0, 1]`.
    pub damping: f32,
}

impl PressureDesc {
    /// `iterations = 20`, `damping = 0.8`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            desc: SurfaceDesc::f32(width, height),
            iterations: 20,
            damping: 0.8,
        }
    }

    /// Builder-style iteration count.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder-style damping.
    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub(crate) fn surface_desc(&self) -> SurfaceDesc {
        SurfaceDesc {
            precision: Precision::F32,
            ..self.desc
        }
    }

    pub(crate) fn uniforms(&self) -> Uniforms {
        Uniforms::new()
            .with("iterations", i32::try_from(self.iterations).unwrap_or(i32::MAX))
            .with("damping", self.damping)
    }
}

pub(crate) fn clamp_iterations(raw: f32) -> u32 {
    if raw.is_finite() && raw >= 1.0 {
        raw.min(u32::MAX as f32) as u32
    } else {
        tracing::debug!(requested = raw, "pressure iterations clamped to 1");
        1
    }
}

pub(crate) fn clamp_damping(raw: f32) -> f32 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Warm-started Jacobi relaxation over a private ping-pong pair.
///
/// Each evaluation seeds the pair from the damped previous result, optionally overwrites it
/// with an `initial` pressure input, runs `iterations` sweeps against `divergence`, then
/// copies the converged field into the node output.
#[derive(Debug, Default)]
pub(crate) struct PressureIterator {
    ping: Option<[SurfaceId; 2]>,
    has_previous: bool,
    last_iterations: u32,
}

impl PressureIterator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn last_iterations(&self) -> u32 {
        self.last_iterations
    }

    pub(crate) fn buffers(&self) -> Option<[SurfaceId; 2]> {
        self.ping
    }

    /// The output was reallocated; its content no longer counts as a previous solution.
    pub(crate) fn forget_previous(&mut self) {
        self.has_previous = false;
    }

    fn ensure_buffers(&mut self, store: &mut SurfaceStore, desc: SurfaceDesc) -> FluxResult<[SurfaceId; 2]> {
        if let Some(pair) = self.ping
            && pair.iter().all(|id| store.desc(*id) == Some(desc))
        {
            return Ok(pair);
        }
        self.release(store)?;
        let pair = [store.alloc(desc), store.alloc(desc)];
        self.ping = Some(pair);
        self.has_previous = false;
        Ok(pair)
    }

    pub(crate) fn render(&mut self, cx: &mut EvalCx<'_>, io: &mut NodeIo<'_>) -> FluxResult<()> {
        let [front, back] = self.ensure_buffers(cx.store, io.desc)?;
        let iterations = clamp_iterations(io.uniforms.f32_or("iterations", 20.0));
        let damping = clamp_damping(io.uniforms.f32_or("damping", 0.8));

        let divergence = match io.inputs.get(DIVERGENCE_SLOT) {
            Some(src) => cx.resolve(DIVERGENCE_SLOT, src, io.uploads)?,
            None => None,
        };
        let initial = match io.inputs.get(INITIAL_SLOT) {
            Some(src) => cx.resolve(INITIAL_SLOT, src, io.uploads)?,
            None => None,
        };

        let mut u = ResolvedUniforms::default();
        if self.has_previous && damping > 0.0 {
            u.set("factor", damping.into());
            copy_with(cx, &Scale, Some(io.output), front, &u)?;
        } else {
            copy_with(cx, &Clear, None, front, &u)?;
        }
        copy_with(cx, &Clear, None, back, &u)?;
        if initial.is_some() {
            copy_with(cx, &Passthrough, initial, front, &u)?;
        }

        let (mut read, mut write) = (front, back);
        for _ in 0..iterations {
            let bindings = [
                Binding {
                    slot: "pressure",
                    surface: Some(read),
                    sampler: Sampler::NEAREST_CLAMP,
                },
                Binding {
                    slot: "divergence",
                    surface: divergence,
                    sampler: Sampler::NEAREST_CLAMP,
                },
            ];
            run_kernel(cx.store, &Jacobi, write, &bindings, io.uniforms)?;
            std::mem::swap(&mut read, &mut write);
        }

        copy_with(cx, &Passthrough, Some(read), io.output, &u)?;
        self.has_previous = true;
        self.last_iterations = iterations;
        tracing::trace!(node = io.name, iterations, damping, "pressure solved");
        Ok(())
    }

    pub(crate) fn release(&mut self, store: &mut SurfaceStore) -> FluxResult<()> {
        if let Some(pair) = self.ping.take() {
            for id in pair {
                store.release(id)?;
            }
        }
        Ok(())
    }
}

fn copy_with(
    cx: &mut EvalCx<'_>,
    kernel: &dyn Kernel,
    source: Option<SurfaceId>,
    target: SurfaceId,
    uniforms: &ResolvedUniforms,
) -> FluxResult<()> {
    let bindings = [Binding {
        slot: "source",
        surface: source,
        sampler: Sampler::NEAREST_CLAMP,
    }];
    run_kernel(cx.store, kernel, target, &bindings, uniforms)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/pressure.rs"]
mod tests;
