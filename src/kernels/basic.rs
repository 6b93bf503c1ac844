use crate::foundation::error::FluxResult;
use crate::graph::kernel::{Kernel, KernelIo};
use crate::kernels::{map_texels, read_at};
use crate::texture::surface::Surface;

/// `out = source`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Kernel for Passthrough {
    fn label(&self) -> &str {
        "passthrough"
    }

    fn slots(&self) -> &[&'static str] {
        &["source"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let src = io.field("source");
        let (w, h) = (out.width(), out.height());
        map_texels(out, |x, y| read_at(src, x, y, w, h));
        Ok(())
    }
}

/// `out = source * factor`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scale;

impl Kernel for Scale {
    fn label(&self) -> &str {
        "scale"
    }

    fn slots(&self) -> &[&'static str] {
        &["source"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let src = io.field("source");
        let k = io.uniforms().f32_or("factor", 1.0);
        let (w, h) = (out.width(), out.height());
        map_texels(out, |x, y| read_at(src, x, y, w, h).map(|c| c * k));
        Ok(())
    }
}

/// Fill every channel with the scalar `value` (default zero).
#[derive(Clone, Copy, Debug, Default)]
pub struct Clear;

impl Kernel for Clear {
    fn label(&self) -> &str {
        "clear"
    }

    fn slots(&self) -> &[&'static str] {
        &[]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let v = io.uniforms().f32_or("value", 0.0);
        out.fill([v; 4]);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernels/basic.rs"]
mod tests;
