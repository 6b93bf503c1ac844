use std::path::Path;

use crate::foundation::error::{FluxError, FluxResult};

/// Smallest accepted time step in seconds.
pub const MIN_TIME_STEP: f32 = 1e-4;
/// Smallest accepted splat radius.
pub const MIN_SPLAT_RADIUS: f32 = 1e-5;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Parameters of a [`crate::FluidSimulation`].
///
/// Serialized as camelCase JSON; missing fields take their defaults. Degenerate values are
/// clamped by [`FluidConfig::sanitized`] rather than rejected.
pub struct FluidConfig {
    /// Simulation grid width in texels; fixed after construction.
    pub sim_width: u32,
    /// Simulation grid height in texels; fixed after construction.
    pub sim_height: u32,
    /// Jacobi sweeps per frame (at least 1).
    pub pressure_iterations: u32,
    /// Warm-start damping of the previous pressure solution, in `[0, 1]`.
    pub pressure: f32,
    /// Velocity decay rate per second.
    pub velocity_dissipation: f32,
    /// Dye decay rate per second.
    pub dye_dissipation: f32,
    /// Scale applied to splat velocity deltas.
    pub force_strength: f32,
    /// Default time step in seconds.
    pub time_step: f32,
    /// Enable vorticity confinement. Off by default.
    pub enable_vorticity: bool,
    /// Vorticity confinement strength.
    pub vorticity_strength: f32,
    /// Default Gaussian splat radius in normalized squared units.
    pub splat_radius: f32,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            sim_width: 128,
            sim_height: 128,
            pressure_iterations: 20,
            pressure: 0.8,
            velocity_dissipation: 0.2,
            dye_dissipation: 1.0,
            force_strength: 6000.0,
            time_step: 1.0 / 60.0,
            enable_vorticity: false,
            vorticity_strength: 30.0,
            splat_radius: 0.0025,
        }
    }
}

fn non_negative(v: f32, field: &str) -> f32 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        tracing::debug!(field, value = v, "clamped to 0");
        0.0
    }
}

pub(crate) fn clamp_time_step(dt: f32) -> f32 {
    if dt.is_finite() && dt >= MIN_TIME_STEP {
        dt
    } else {
        tracing::debug!(value = dt, "time step clamped");
        MIN_TIME_STEP
    }
}

pub(crate) fn clamp_radius(radius: f32) -> f32 {
    if radius.is_finite() && radius >= MIN_SPLAT_RADIUS {
        radius
    } else {
        tracing::debug!(value = radius, "splat radius clamped");
        MIN_SPLAT_RADIUS
    }
}

impl FluidConfig {
    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> FluxResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| FluxError::serde(e.to_string()))?;
        Ok(cfg.sanitized())
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> FluxResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            FluxError::serde(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    /// Copy with every field clamped into its accepted range.
    pub fn sanitized(mut self) -> Self {
        self.sim_width = self.sim_width.max(1);
        self.sim_height = self.sim_height.max(1);
        self.pressure_iterations = self.pressure_iterations.max(1);
        self.pressure = if self.pressure.is_finite() {
            self.pressure.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.velocity_dissipation = non_negative(self.velocity_dissipation, "velocityDissipation");
        self.dye_dissipation = non_negative(self.dye_dissipation, "dyeDissipation");
        if !self.force_strength.is_finite() {
            self.force_strength = 0.0;
        }
        self.time_step = clamp_time_step(self.time_step);
        self.vorticity_strength = non_negative(self.vorticity_strength, "vorticityStrength");
        self.splat_radius = clamp_radius(self.splat_radius);
        self
    }

    /// Overlay the fields present in `patch`, then clamp.
    pub fn apply(&mut self, patch: &FluidConfigPatch) {
        let FluidConfigPatch {
            pressure_iterations,
            pressure,
            velocity_dissipation,
            dye_dissipation,
            force_strength,
            time_step,
            enable_vorticity,
            vorticity_strength,
            splat_radius,
        } = *patch;
        if let Some(v) = pressure_iterations {
            self.pressure_iterations = v;
        }
        if let Some(v) = pressure {
            self.pressure = v;
        }
        if let Some(v) = velocity_dissipation {
            self.velocity_dissipation = v;
        }
        if let Some(v) = dye_dissipation {
            self.dye_dissipation = v;
        }
        if let Some(v) = force_strength {
            self.force_strength = v;
        }
        if let Some(v) = time_step {
            self.time_step = v;
        }
        if let Some(v) = enable_vorticity {
            self.enable_vorticity = v;
        }
        if let Some(v) = vorticity_strength {
            self.vorticity_strength = v;
        }
        if let Some(v) = splat_radius {
            self.splat_radius = v;
        }
        *self = std::mem::take(self).sanitized();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
/// Partial update of the mutable [`FluidConfig`] fields.
///
/// The grid size is not patchable; JSON patches naming it are rejected.
pub struct FluidConfigPatch {
    /// New Jacobi sweep count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_iterations: Option<u32>,
    /// New pressure damping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    /// New velocity decay rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_dissipation: Option<f32>,
    /// New dye decay rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dye_dissipation: Option<f32>,
    /// New splat force scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_strength: Option<f32>,
    /// New default time step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_step: Option<f32>,
    /// Toggle vorticity confinement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_vorticity: Option<bool>,
    /// New vorticity strength.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vorticity_strength: Option<f32>,
    /// New default splat radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splat_radius: Option<f32>,
}

impl FluidConfigPatch {
    /// Parse a JSON patch.
    pub fn from_json_str(s: &str) -> FluxResult<Self> {
        serde_json::from_str(s).map_err(|e| FluxError::serde(e.to_string()))
    }

    /// Whether any field the pressure node reads is set.
    pub(crate) fn touches_pressure(&self) -> bool {
        self.pressure_iterations.is_some() || self.pressure.is_some()
    }

    /// Whether the advection decay factors must be recomputed.
    pub(crate) fn touches_decay(&self) -> bool {
        self.velocity_dissipation.is_some()
            || self.dye_dissipation.is_some()
            || self.time_step.is_some()
    }

    /// Whether the vorticity node parameters changed.
    pub(crate) fn touches_vorticity(&self) -> bool {
        self.enable_vorticity.is_some()
            || self.vorticity_strength.is_some()
            || self.time_step.is_some()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fluid/config.rs"]
mod tests;
