use crate::foundation::core::{Sampler, SurfaceDesc, SurfaceId};
use crate::foundation::error::FluxResult;
use crate::graph::uniform::ResolvedUniforms;
use crate::texture::store::SurfaceStore;
use crate::texture::surface::Surface;
use smallvec::SmallVec;
use std::fmt;

/// An opaque compute kernel: one "shader" invocation writing a whole target surface.
///
/// The scheduler never looks inside a kernel; it only binds textures and uniforms by name and
/// hands over the target.
pub trait Kernel: fmt::Debug {
    /// Diagnostic label.
    fn label(&self) -> &str;

    /// Texture slots this kernel samples, in binding order.
    fn slots(&self) -> &[&'static str];

    /// Write every texel of `out`.
    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()>;
}

/// A surface bound to a kernel slot together with its sampler state.
#[derive(Clone, Copy, Debug)]
pub struct BoundTexture<'a> {
    /// The bound surface.
    pub surface: &'a Surface,
    /// Sampler used for this slot.
    pub sampler: Sampler,
}

/// Sampling view over a slot that may be unbound.
///
/// An unbound slot samples as all-zero texels, so optional inputs need no special casing in
/// kernels.
#[derive(Clone, Copy, Debug)]
pub struct Field<'a>(Option<BoundTexture<'a>>);

impl Field<'_> {
    /// Return `true` when a surface is bound.
    pub fn is_bound(&self) -> bool {
        self.0.is_some()
    }

    /// Integer fetch in the bound surface's texel grid, using the slot's wrap mode.
    pub fn fetch(&self, x: i64, y: i64) -> [f32; 4] {
        match self.0 {
            Some(t) => t.surface.fetch(x, y, t.sampler.wrap),
            None => [0.0; 4],
        }
    }

    /// Filtered sample at normalized coordinates.
    pub fn sample_uv(&self, u: f32, v: f32) -> [f32; 4] {
        match self.0 {
            Some(t) => t.surface.sample_uv(u, v, t.sampler),
            None => [0.0; 4],
        }
    }

    /// Size of the bound surface, if any.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.0.map(|t| (t.surface.width(), t.surface.height()))
    }
}

/// Everything a kernel may read during one invocation.
pub struct KernelIo<'a> {
    bindings: SmallVec<[(&'a str, Option<BoundTexture<'a>>); 4]>,
    uniforms: &'a ResolvedUniforms,
    target: SurfaceDesc,
}

impl<'a> KernelIo<'a> {
    /// Sampling view for `slot`; unknown or unbound slots sample zeros.
    pub fn field(&self, slot: &str) -> Field<'a> {
        Field(
            self.bindings
                .iter()
                .find(|(s, _)| *s == slot)
                .and_then(|(_, t)| *t),
        )
    }

    /// Uniform values for this invocation.
    pub fn uniforms(&self) -> &'a ResolvedUniforms {
        self.uniforms
    }

    /// Target descriptor.
    pub fn target(&self) -> SurfaceDesc {
        self.target
    }
}

/// One slot binding prepared by a node before invoking its kernel.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Binding<'s> {
    pub(crate) slot: &'s str,
    pub(crate) surface: Option<SurfaceId>,
    pub(crate) sampler: Sampler,
}

/// Bind textures and uniforms, then execute `kernel` into `target`.
///
/// The target is checked out of the store for the duration of the call, so a binding that
/// aliases the target is rejected instead of producing a read-after-write hazard.
pub(crate) fn run_kernel(
    store: &mut SurfaceStore,
    kernel: &dyn Kernel,
    target: SurfaceId,
    bindings: &[Binding<'_>],
    uniforms: &ResolvedUniforms,
) -> FluxResult<()> {
    let mut out = store.take(target)?;
    let result = (|| {
        let mut bound = SmallVec::new();
        for b in bindings {
            let tex = match b.surface {
                Some(id) => Some(BoundTexture {
                    surface: store.get(id)?,
                    sampler: b.sampler,
                }),
                None => None,
            };
            bound.push((b.slot, tex));
        }
        let io = KernelIo {
            bindings: bound,
            uniforms,
            target: out.desc(),
        };
        kernel.run(&io, &mut out)
    })();
    store.restore(target, out);
    result
}

#[cfg(test)]
#[path = "../../tests/unit/graph/kernel.rs"]
mod tests;
