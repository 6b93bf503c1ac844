use crate::foundation::error::{FluxError, FluxResult};

pub use kurbo::{Point, Vec2};

/// Stable handle of a node inside a [`crate::RenderGraph`].
///
/// Ids are never reused for the lifetime of the graph, so a disposed node's id stays invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw arena index, useful for diagnostics.
    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a surface (texture buffer) inside the graph's surface store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub(crate) u32);

impl SurfaceId {
    /// Raw arena index, useful for diagnostics.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Logical frame identifier used to memoize node evaluation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameId(pub u64);

impl FrameId {
    /// The frame after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Numeric precision of a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Precision {
    /// Full 32-bit float texels.
    #[default]
    F32,
    /// 8-bit normalized texels: values are clamped to `[0, 1]` and quantized to 1/255 on write.
    Unorm8,
}

/// Texture filtering used when a kernel samples between texel centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Pick the closest texel.
    Nearest,
    /// Bilinear interpolation of the four closest texels.
    #[default]
    Linear,
}

/// Edge handling for out-of-range texel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Wrap {
    /// Clamp to the nearest edge texel.
    #[default]
    Clamp,
    /// Wrap around (toroidal addressing).
    Repeat,
}

/// Sampling state bound together with a texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Sampler {
    /// Filter mode.
    pub filter: Filter,
    /// Edge mode.
    pub wrap: Wrap,
}

impl Sampler {
    /// Nearest filtering with clamped edges.
    pub const NEAREST_CLAMP: Self = Self {
        filter: Filter::Nearest,
        wrap: Wrap::Clamp,
    };

    /// Bilinear filtering with clamped edges.
    pub const LINEAR_CLAMP: Self = Self {
        filter: Filter::Linear,
        wrap: Wrap::Clamp,
    };
}

/// Size and precision of a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Storage precision.
    pub precision: Precision,
}

impl SurfaceDesc {
    /// Create a validated descriptor with non-zero dimensions.
    pub fn new(width: u32, height: u32, precision: Precision) -> FluxResult<Self> {
        if width == 0 || height == 0 {
            return Err(FluxError::validation(format!(
                "surface dimensions must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            precision,
        })
    }

    /// Full-float descriptor; dimensions are clamped to at least one texel.
    pub fn f32(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            precision: Precision::F32,
        }
    }

    pub(crate) fn clamped(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
            ..self
        }
    }

    /// Number of texels.
    pub fn texel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Return `true` when both descriptors have the same pixel size.
    pub fn same_size(self, other: Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
