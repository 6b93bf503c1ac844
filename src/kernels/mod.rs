//! Built-in kernels.
//!
//! Each kernel is a fixed per-texel function; scheduling and buffer management live in the
//! graph, never here.

pub(crate) mod basic;
pub(crate) mod fluid;

use crate::graph::kernel::Field;
use crate::texture::surface::Surface;

pub use basic::{Clear, Passthrough, Scale};
pub use fluid::{Advect, Curl, Divergence, GradientSubtract, Jacobi, Splat, Vorticity};

/// Write `f(x, y)` into every texel of `out`, rows in parallel.
pub(crate) fn map_texels<F>(out: &mut Surface, f: F)
where
    F: Fn(i64, i64) -> [f32; 4] + Sync + Send,
{
    out.par_rows_mut(|y, row| {
        for (x, px) in row.iter_mut().enumerate() {
            *px = f(x as i64, i64::from(y));
        }
    });
}

/// Read `field` at output texel `(x, y)`: a direct fetch when sizes match, a filtered sample
/// otherwise.
pub(crate) fn read_at(field: Field<'_>, x: i64, y: i64, w: u32, h: u32) -> [f32; 4] {
    match field.size() {
        Some((fw, fh)) if fw == w && fh == h => field.fetch(x, y),
        Some(_) => field.sample_uv((x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32),
        None => [0.0; 4],
    }
}
