use crate::foundation::core::{Filter, Precision, Sampler, SurfaceDesc, Wrap};
use crate::foundation::math::{f32_to_unorm8, lerp4, quantize_unorm8, unorm8_to_f32};
use rayon::prelude::*;

/// A 2D grid of RGBA `f32` texels, row-major, origin at the top-left texel.
///
/// Vector fields store their components in `r`/`g`; scalar fields use `r`.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    desc: SurfaceDesc,
    texels: Vec<[f32; 4]>,
}

impl Surface {
    /// Zero dimensions are clamped to one texel.
    pub(crate) fn new(desc: SurfaceDesc) -> Self {
        let desc = desc.clamped();
        Self {
            desc,
            texels: vec![[0.0; 4]; desc.texel_count()],
        }
    }

    /// Descriptor (size + precision).
    pub fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// All texels, row-major.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Texel at integer coordinates, or `None` when out of range.
    pub fn get(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.desc.width || y >= self.desc.height {
            return None;
        }
        Some(self.texels[self.index(x, y)])
    }

    /// Overwrite a texel, honoring the surface precision. Out-of-range writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, v: [f32; 4]) {
        if x >= self.desc.width || y >= self.desc.height {
            return;
        }
        let i = self.index(x, y);
        self.texels[i] = match self.desc.precision {
            Precision::F32 => v,
            Precision::Unorm8 => v.map(quantize_unorm8),
        };
    }

    /// Fill every texel with `v`.
    pub fn fill(&mut self, v: [f32; 4]) {
        let v = match self.desc.precision {
            Precision::F32 => v,
            Precision::Unorm8 => v.map(quantize_unorm8),
        };
        self.texels.fill(v);
    }

    /// Fetch with integer coordinates; out-of-range coordinates follow `wrap`.
    pub fn fetch(&self, x: i64, y: i64, wrap: Wrap) -> [f32; 4] {
        let w = i64::from(self.desc.width);
        let h = i64::from(self.desc.height);
        let (x, y) = match wrap {
            Wrap::Clamp => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
            Wrap::Repeat => (x.rem_euclid(w), y.rem_euclid(h)),
        };
        self.texels[(y * w + x) as usize]
    }

    /// Sample at texel-space coordinates where texel `(i, j)` has its center at `(i, j)`.
    pub fn sample_texel(&self, x: f32, y: f32, sampler: Sampler) -> [f32; 4] {
        match sampler.filter {
            Filter::Nearest => self.fetch(x.round() as i64, y.round() as i64, sampler.wrap),
            Filter::Linear => {
                let x0 = x.floor();
                let y0 = y.floor();
                let fx = x - x0;
                let fy = y - y0;
                let (ix, iy) = (x0 as i64, y0 as i64);
                let a = self.fetch(ix, iy, sampler.wrap);
                let b = self.fetch(ix + 1, iy, sampler.wrap);
                let c = self.fetch(ix, iy + 1, sampler.wrap);
                let d = self.fetch(ix + 1, iy + 1, sampler.wrap);
                lerp4(lerp4(a, b, fx), lerp4(c, d, fx), fy)
            }
        }
    }

    /// Sample at normalized coordinates in `[0, 1]^2`.
    pub fn sample_uv(&self, u: f32, v: f32, sampler: Sampler) -> [f32; 4] {
        let x = u * self.desc.width as f32 - 0.5;
        let y = v * self.desc.height as f32 - 0.5;
        self.sample_texel(x, y, sampler)
    }

    /// Largest absolute value of channel `c` across the surface.
    pub fn max_abs(&self, c: usize) -> f32 {
        self.texels
            .iter()
            .map(|t| t[c.min(3)].abs())
            .fold(0.0, f32::max)
    }

    /// Sum of channel `c` across the surface.
    pub fn sum(&self, c: usize) -> f64 {
        self.texels.iter().map(|t| f64::from(t[c.min(3)])).sum()
    }

    /// Convert to straight-alpha RGBA8 bytes, forcing alpha to opaque when `opaque` is set.
    pub fn to_rgba8(&self, opaque: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.texels.len() * 4);
        for t in &self.texels {
            out.push(f32_to_unorm8(t[0]));
            out.push(f32_to_unorm8(t[1]));
            out.push(f32_to_unorm8(t[2]));
            out.push(if opaque { 255 } else { f32_to_unorm8(t[3]) });
        }
        out
    }

    /// Overwrite from RGBA8 bytes of matching size.
    pub(crate) fn upload_rgba8(&mut self, data: &[u8]) {
        for (px, chunk) in self.texels.iter_mut().zip(data.chunks_exact(4)) {
            *px = [
                unorm8_to_f32(chunk[0]),
                unorm8_to_f32(chunk[1]),
                unorm8_to_f32(chunk[2]),
                unorm8_to_f32(chunk[3]),
            ];
        }
    }

    /// Run `f(y, row)` for every row, in parallel, then apply precision.
    pub(crate) fn par_rows_mut<F>(&mut self, f: F)
    where
        F: Fn(u32, &mut [[f32; 4]]) + Sync + Send,
    {
        let w = self.desc.width as usize;
        self.texels
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| f(y as u32, row));
        self.apply_precision();
    }

    fn apply_precision(&mut self) {
        if self.desc.precision == Precision::Unorm8 {
            for t in &mut self.texels {
                *t = t.map(quantize_unorm8);
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.desc.width as usize + x as usize
    }
}

#[cfg(test)]
#[path = "../../tests/unit/texture/surface.rs"]
mod tests;
