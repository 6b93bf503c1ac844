//! Stencils of the stable-fluids solver.
//!
//! Velocity lives in the `r`/`g` channels in grid texels per second, scalar fields (curl,
//! divergence, pressure) in `r`. The grid origin is the top-left texel with `y` growing
//! downward; all stencils use central differences over that grid.

use crate::foundation::error::FluxResult;
use crate::graph::kernel::{Kernel, KernelIo};
use crate::kernels::{map_texels, read_at};
use crate::texture::surface::Surface;

const VELOCITY_LIMIT: f32 = 1000.0;

/// Name of the `index`-th splat's uniform: `point`, `point1`, `point2`, ...
pub(crate) fn splat_uniform(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{base}{index}")
    }
}

/// Gaussian force/color injection.
///
/// Uniforms: `additive` (bool), `count` (number of queued splats, default 1) and, per splat
/// `i`, `point{i}` (normalized `vec2`), `value{i}` (`vec3` added at the center) and
/// `radius{i}` (Gaussian falloff in normalized squared units). The first splat drops the
/// index: `point`, `value`, `radius`. With `additive = false` the kernel is a plain
/// passthrough.
#[derive(Clone, Copy, Debug, Default)]
pub struct Splat;

impl Kernel for Splat {
    fn label(&self) -> &str {
        "splat"
    }

    fn slots(&self) -> &[&'static str] {
        &["source"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let src = io.field("source");
        let u = io.uniforms();
        let additive = u.bool_or("additive", false);
        let count = if additive {
            u.get("count").map_or(1, |v| v.as_f32().max(0.0) as usize)
        } else {
            0
        };
        let splats: Vec<([f32; 2], [f32; 3], f32)> = (0..count)
            .map(|i| {
                (
                    u.vec2_or(&splat_uniform("point", i), [0.5, 0.5]),
                    u.vec3_or(&splat_uniform("value", i), [0.0; 3]),
                    u.f32_or(&splat_uniform("radius", i), 0.0025).max(1e-5),
                )
            })
            .collect();
        let (w, h) = (out.width(), out.height());
        let aspect = w as f32 / h as f32;

        map_texels(out, |x, y| {
            let mut c = read_at(src, x, y, w, h);
            for (point, value, radius) in &splats {
                let dx = ((x as f32 + 0.5) / w as f32 - point[0]) * aspect;
                let dy = (y as f32 + 0.5) / h as f32 - point[1];
                let g = (-(dx * dx + dy * dy) / radius).exp();
                c[0] += value[0] * g;
                c[1] += value[1] * g;
                c[2] += value[2] * g;
            }
            c
        });
        Ok(())
    }
}

/// Scalar vorticity `dv/dx - du/dy` of the `velocity` field.
#[derive(Clone, Copy, Debug, Default)]
pub struct Curl;

impl Kernel for Curl {
    fn label(&self) -> &str {
        "curl"
    }

    fn slots(&self) -> &[&'static str] {
        &["velocity"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let vel = io.field("velocity");
        map_texels(out, |x, y| {
            let l = vel.fetch(x - 1, y);
            let r = vel.fetch(x + 1, y);
            let t = vel.fetch(x, y - 1);
            let b = vel.fetch(x, y + 1);
            let c = 0.5 * ((r[1] - l[1]) - (b[0] - t[0]));
            [c, 0.0, 0.0, 1.0]
        });
        Ok(())
    }
}

/// Vorticity confinement: pushes `velocity` along `N x curl`, where `N` is the normalized
/// gradient of `|curl|`.
///
/// Uniforms: `strength`, `dt`, `enabled` (when false the velocity passes through).
#[derive(Clone, Copy, Debug, Default)]
pub struct Vorticity;

impl Kernel for Vorticity {
    fn label(&self) -> &str {
        "vorticity"
    }

    fn slots(&self) -> &[&'static str] {
        &["velocity", "curl"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let vel = io.field("velocity");
        let curl = io.field("curl");
        let u = io.uniforms();
        let enabled = u.bool_or("enabled", true);
        let strength = u.f32_or("strength", 0.0);
        let dt = u.f32_or("dt", 0.0);

        map_texels(out, |x, y| {
            let v = vel.fetch(x, y);
            if !enabled || strength == 0.0 {
                return v;
            }
            let l = curl.fetch(x - 1, y)[0].abs();
            let r = curl.fetch(x + 1, y)[0].abs();
            let t = curl.fetch(x, y - 1)[0].abs();
            let b = curl.fetch(x, y + 1)[0].abs();
            let c = curl.fetch(x, y)[0];

            let gx = 0.5 * (r - l);
            let gy = 0.5 * (b - t);
            let len = (gx * gx + gy * gy).sqrt() + 1e-4;
            let (nx, ny) = (gx / len, gy / len);

            let fx = ny * c * strength;
            let fy = -nx * c * strength;
            [
                (v[0] + fx * dt).clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT),
                (v[1] + fy * dt).clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT),
                v[2],
                v[3],
            ]
        });
        Ok(())
    }
}

/// Divergence of `velocity` with free-slip walls: the normal component is mirrored across
/// the domain boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct Divergence;

impl Kernel for Divergence {
    fn label(&self) -> &str {
        "divergence"
    }

    fn slots(&self) -> &[&'static str] {
        &["velocity"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let vel = io.field("velocity");
        let Some((w, h)) = vel.size() else {
            out.fill([0.0; 4]);
            return Ok(());
        };
        let (w, h) = (i64::from(w), i64::from(h));
        map_texels(out, |x, y| {
            let c = vel.fetch(x, y);
            let l = if x == 0 { -c[0] } else { vel.fetch(x - 1, y)[0] };
            let r = if x == w - 1 { -c[0] } else { vel.fetch(x + 1, y)[0] };
            let t = if y == 0 { -c[1] } else { vel.fetch(x, y - 1)[1] };
            let b = if y == h - 1 { -c[1] } else { vel.fetch(x, y + 1)[1] };
            [0.5 * (r - l + b - t), 0.0, 0.0, 1.0]
        });
        Ok(())
    }
}

/// One Jacobi sweep of the pressure Poisson equation: `p' = (pL + pR + pT + pB - div) / 4`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Jacobi;

impl Kernel for Jacobi {
    fn label(&self) -> &str {
        "jacobi"
    }

    fn slots(&self) -> &[&'static str] {
        &["pressure", "divergence"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let p = io.field("pressure");
        let div = io.field("divergence");
        map_texels(out, |x, y| {
            let sum = p.fetch(x - 1, y)[0]
                + p.fetch(x + 1, y)[0]
                + p.fetch(x, y - 1)[0]
                + p.fetch(x, y + 1)[0];
            [(sum - div.fetch(x, y)[0]) * 0.25, 0.0, 0.0, 1.0]
        });
        Ok(())
    }
}

/// Projection: subtracts the `pressure` gradient from `velocity`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradientSubtract;

impl Kernel for GradientSubtract {
    fn label(&self) -> &str {
        "gradient_subtract"
    }

    fn slots(&self) -> &[&'static str] {
        &["pressure", "velocity"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let p = io.field("pressure");
        let vel = io.field("velocity");
        map_texels(out, |x, y| {
            let l = p.fetch(x - 1, y)[0];
            let r = p.fetch(x + 1, y)[0];
            let t = p.fetch(x, y - 1)[0];
            let b = p.fetch(x, y + 1)[0];
            let v = vel.fetch(x, y);
            [v[0] - 0.5 * (r - l), v[1] - 0.5 * (b - t), v[2], v[3]]
        });
        Ok(())
    }
}

/// Semi-Lagrangian advection of `source` along `velocity`, scaled by a decay factor.
///
/// Uniforms: `dt` (seconds), `decay` (multiplier applied after the back-trace).
#[derive(Clone, Copy, Debug, Default)]
pub struct Advect;

impl Kernel for Advect {
    fn label(&self) -> &str {
        "advect"
    }

    fn slots(&self) -> &[&'static str] {
        &["source", "velocity"]
    }

    fn run(&self, io: &KernelIo<'_>, out: &mut Surface) -> FluxResult<()> {
        let src = io.field("source");
        let vel = io.field("velocity");
        let dt = io.uniforms().f32_or("dt", 0.0);
        let decay = io.uniforms().f32_or("decay", 1.0);
        let (w, h) = (out.width(), out.height());
        let (vw, vh) = vel.size().unwrap_or((w, h));

        map_texels(out, |x, y| {
            let v = read_at(vel, x, y, w, h);
            let u = (x as f32 + 0.5) / w as f32 - dt * v[0] / vw as f32;
            let t = (y as f32 + 0.5) / h as f32 - dt * v[1] / vh as f32;
            src.sample_uv(u, t).map(|c| c * decay)
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernels/fluid.rs"]
mod tests;
