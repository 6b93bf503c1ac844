use crate::foundation::core::{NodeId, Precision, SurfaceDesc, SurfaceId};
use crate::foundation::error::{FluxError, FluxResult};
use crate::texture::store::SurfaceStore;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

/// A mutable 2D drawing surface shared between the caller and the nodes that read it.
///
/// Consuming nodes upload its pixels on every evaluation into a cached surface that is keyed by
/// input slot and reallocated only when the canvas pixel size changes.
pub type SharedCanvas = Rc<RefCell<image::RgbaImage>>;

/// Create a transparent [`SharedCanvas`].
pub fn shared_canvas(width: u32, height: u32) -> SharedCanvas {
    Rc::new(RefCell::new(image::RgbaImage::new(width, height)))
}

/// What a node input slot is bound to.
#[derive(Clone, Debug, Default)]
pub enum TextureSource {
    /// Nothing bound; kernels sample zeros from this slot.
    #[default]
    Unset,
    /// A pre-existing surface (static image or another node's output handle).
    ///
    /// Binding a surface does not create a scheduling dependency.
    Surface(SurfaceId),
    /// The current output of another node; the scheduler evaluates it first.
    Node(NodeId),
    /// A drawing surface uploaded by the consuming node.
    Canvas(SharedCanvas),
}

impl TextureSource {
    /// The upstream node this source depends on, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Return `true` when nothing is bound.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl From<NodeId> for TextureSource {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<SurfaceId> for TextureSource {
    fn from(id: SurfaceId) -> Self {
        Self::Surface(id)
    }
}

impl From<SharedCanvas> for TextureSource {
    fn from(canvas: SharedCanvas) -> Self {
        Self::Canvas(canvas)
    }
}

/// Per-node cache of uploaded canvas textures, keyed by input slot.
#[derive(Default)]
pub(crate) struct UploadCache {
    entries: SmallVec<[(String, SurfaceId); 2]>,
}

impl UploadCache {
    /// Upload `canvas` into the slot's cached surface, reallocating when its size changed.
    ///
    /// Returns `None` for an empty canvas, and an error while the caller holds a mutable
    /// borrow of it.
    pub(crate) fn upload(
        &mut self,
        slot: &str,
        canvas: &SharedCanvas,
        store: &mut SurfaceStore,
    ) -> FluxResult<Option<SurfaceId>> {
        let img = canvas.try_borrow().map_err(|_| {
            FluxError::evaluation(format!("canvas bound to '{slot}' is mutably borrowed"))
        })?;
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Ok(None);
        }
        let want = SurfaceDesc {
            width: w,
            height: h,
            precision: Precision::Unorm8,
        };

        let pos = self.entries.iter().position(|(s, _)| s == slot);
        let id = match pos {
            Some(i) => {
                let id = self.entries[i].1;
                if store.desc(id).is_some_and(|d| d.same_size(want)) {
                    id
                } else {
                    tracing::debug!(slot, width = w, height = h, "canvas resized, reuploading");
                    store.release(id)?;
                    let fresh = store.alloc(want);
                    self.entries[i].1 = fresh;
                    fresh
                }
            }
            None => {
                let fresh = store.alloc(want);
                self.entries.push((slot.to_string(), fresh));
                fresh
            }
        };

        store.get_mut(id)?.upload_rgba8(img.as_raw());
        Ok(Some(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn release_all(&mut self, store: &mut SurfaceStore) -> FluxResult<()> {
        for (_, id) in self.entries.drain(..) {
            store.release(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/texture/source.rs"]
mod tests;
