use crate::foundation::core::{SurfaceDesc, SurfaceId};
use crate::foundation::error::{FluxError, FluxResult};
use crate::texture::surface::Surface;

/// Allocation counters for the surface arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    /// Surfaces currently alive.
    pub live: usize,
    /// Bytes held by live surfaces.
    pub live_bytes: usize,
    /// Total surfaces ever allocated.
    pub allocated: u64,
    /// Total surfaces ever released.
    pub released: u64,
}

enum Slot {
    Live(Surface),
    // Checked out for the duration of a kernel write.
    Borrowed(SurfaceDesc),
    Released,
}

/// Arena owning every surface of a graph.
///
/// Handles are never reused, so a released handle stays invalid instead of aliasing a newer
/// surface.
pub(crate) struct SurfaceStore {
    slots: Vec<Slot>,
    stats: SurfaceStats,
}

fn byte_len(desc: SurfaceDesc) -> usize {
    desc.texel_count().saturating_mul(16)
}

impl SurfaceStore {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            stats: SurfaceStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> SurfaceStats {
        self.stats
    }

    pub(crate) fn alloc(&mut self, desc: SurfaceDesc) -> SurfaceId {
        let desc = desc.clamped();
        let id = SurfaceId(self.slots.len() as u32);
        self.slots.push(Slot::Live(Surface::new(desc)));
        self.stats.live += 1;
        self.stats.live_bytes = self.stats.live_bytes.saturating_add(byte_len(desc));
        self.stats.allocated = self.stats.allocated.saturating_add(1);
        tracing::debug!(
            surface = id.0,
            width = desc.width,
            height = desc.height,
            "allocated surface"
        );
        id
    }

    pub(crate) fn release(&mut self, id: SurfaceId) -> FluxResult<()> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .ok_or_else(|| FluxError::evaluation(format!("unknown surface {}", id.0)))?;
        let desc = match slot {
            Slot::Live(s) => s.desc(),
            Slot::Borrowed(_) => {
                return Err(FluxError::evaluation(format!(
                    "surface {} released while in use",
                    id.0
                )));
            }
            Slot::Released => {
                return Err(FluxError::evaluation(format!(
                    "surface {} released twice",
                    id.0
                )));
            }
        };
        *slot = Slot::Released;
        self.stats.live = self.stats.live.saturating_sub(1);
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(byte_len(desc));
        self.stats.released = self.stats.released.saturating_add(1);
        tracing::debug!(surface = id.0, "released surface");
        Ok(())
    }

    pub(crate) fn get(&self, id: SurfaceId) -> FluxResult<&Surface> {
        match self.slots.get(id.0 as usize) {
            Some(Slot::Live(s)) => Ok(s),
            Some(Slot::Borrowed(_)) => Err(FluxError::evaluation(format!(
                "surface {} is being written",
                id.0
            ))),
            _ => Err(FluxError::evaluation(format!(
                "surface {} is not alive",
                id.0
            ))),
        }
    }

    pub(crate) fn get_mut(&mut self, id: SurfaceId) -> FluxResult<&mut Surface> {
        match self.slots.get_mut(id.0 as usize) {
            Some(Slot::Live(s)) => Ok(s),
            _ => Err(FluxError::evaluation(format!(
                "surface {} is not writable",
                id.0
            ))),
        }
    }

    pub(crate) fn desc(&self, id: SurfaceId) -> Option<SurfaceDesc> {
        match self.slots.get(id.0 as usize)? {
            Slot::Live(s) => Some(s.desc()),
            Slot::Borrowed(d) => Some(*d),
            Slot::Released => None,
        }
    }

    /// Check a surface out for writing while other surfaces stay readable.
    pub(crate) fn take(&mut self, id: SurfaceId) -> FluxResult<Surface> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .ok_or_else(|| FluxError::evaluation(format!("unknown surface {}", id.0)))?;
        match std::mem::replace(slot, Slot::Released) {
            Slot::Live(s) => {
                *slot = Slot::Borrowed(s.desc());
                Ok(s)
            }
            other => {
                *slot = other;
                Err(FluxError::evaluation(format!(
                    "surface {} is not available for writing",
                    id.0
                )))
            }
        }
    }

    pub(crate) fn restore(&mut self, id: SurfaceId, surface: Surface) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize)
            && matches!(slot, Slot::Borrowed(_))
        {
            *slot = Slot::Live(surface);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/texture/store.rs"]
mod tests;
