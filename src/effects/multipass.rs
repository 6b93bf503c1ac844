use crate::foundation::core::{Sampler, SurfaceDesc, SurfaceId};
use crate::foundation::error::{FluxError, FluxResult};
use crate::graph::kernel::{Binding, Kernel, run_kernel};
use crate::graph::node::{EvalCx, Inputs, NodeIo};
use crate::graph::uniform::{ResolvedUniforms, Uniform, UniformValue, Uniforms};
use crate::kernels::Passthrough;
use crate::texture::source::TextureSource;
use crate::texture::store::SurfaceStore;
use smallvec::SmallVec;
use std::sync::Arc;

/// Where a pass slot reads from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassInput {
    /// A declared input of the effect.
    Input(String),
    /// The target of an earlier pass in the same chain.
    Pass(usize),
}

/// One kernel invocation inside a multi-pass effect.
#[derive(Clone)]
pub struct PassDesc {
    kernel: Arc<dyn Kernel>,
    sources: Vec<(String, PassInput)>,
    uniforms: Vec<(String, UniformValue)>,
}

impl std::fmt::Debug for PassDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassDesc")
            .field("kernel", &self.kernel.label())
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl PassDesc {
    /// A pass running `kernel`; slots left unbound are inferred at build time.
    pub fn new(kernel: impl Kernel + 'static) -> Self {
        Self::shared(Arc::new(kernel))
    }

    /// A pass running a kernel shared with other passes.
    pub fn shared(kernel: Arc<dyn Kernel>) -> Self {
        Self {
            kernel,
            sources: Vec::new(),
            uniforms: Vec::new(),
        }
    }

    /// Bind `slot` to a declared effect input.
    pub fn input(mut self, slot: &str, key: &str) -> Self {
        self.bind(slot, PassInput::Input(key.to_string()));
        self
    }

    /// Bind `slot` to the target of an earlier pass.
    pub fn pass(mut self, slot: &str, index: usize) -> Self {
        self.bind(slot, PassInput::Pass(index));
        self
    }

    /// Constant uniform that overrides the node-level value of the same name for this pass.
    pub fn uniform(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        let value = value.into();
        match self.uniforms.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.uniforms.push((name.to_string(), value)),
        }
        self
    }

    fn bind(&mut self, slot: &str, src: PassInput) {
        match self.sources.iter_mut().find(|(s, _)| s == slot) {
            Some((_, v)) => *v = src,
            None => self.sources.push((slot.to_string(), src)),
        }
    }

    fn source(&self, slot: &str) -> Option<&PassInput> {
        self.sources.iter().find(|(s, _)| s == slot).map(|(_, v)| v)
    }
}

/// Declarative description of an effect node: inputs, passes, sampler state and uniforms.
///
/// A single-pass effect is the one-element case built by [`EffectDesc::single`].
pub struct EffectDesc {
    desc: SurfaceDesc,
    inputs: Vec<String>,
    primary: Option<String>,
    passes: Vec<PassDesc>,
    sampler: Sampler,
    slot_samplers: Vec<(String, Sampler)>,
    copy_to_output: bool,
    uniforms: Uniforms,
    srcs: Vec<(String, TextureSource)>,
    require_inputs: bool,
}

impl EffectDesc {
    /// Empty multi-pass description producing surfaces shaped like `desc`.
    ///
    /// At least one input key and one pass must be added before building.
    pub fn multipass(desc: SurfaceDesc) -> Self {
        Self {
            desc,
            inputs: Vec::new(),
            primary: None,
            passes: Vec::new(),
            sampler: Sampler::LINEAR_CLAMP,
            slot_samplers: Vec::new(),
            copy_to_output: false,
            uniforms: Uniforms::new(),
            srcs: Vec::new(),
            require_inputs: true,
        }
    }

    /// A single kernel writing straight into the node output; its slots become the inputs.
    pub fn single(kernel: impl Kernel + 'static, desc: SurfaceDesc) -> Self {
        let inputs = kernel.slots().iter().map(|s| s.to_string()).collect();
        let mut out = Self::multipass(desc);
        out.inputs = inputs;
        out.passes.push(PassDesc::new(kernel));
        out.require_inputs = false;
        out
    }

    /// Declare an input key.
    pub fn input(mut self, key: &str) -> Self {
        self.inputs.push(key.to_string());
        self
    }

    /// Input that chains through the passes; defaults to the first declared key.
    pub fn primary(mut self, key: &str) -> Self {
        self.primary = Some(key.to_string());
        self
    }

    /// Append a pass.
    pub fn pass(mut self, pass: PassDesc) -> Self {
        self.passes.push(pass);
        self
    }

    /// Sampler used by every slot without an override.
    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Sampler override for one slot name across all passes.
    pub fn slot_sampler(mut self, slot: &str, sampler: Sampler) -> Self {
        self.slot_samplers.retain(|(s, _)| s != slot);
        self.slot_samplers.push((slot.to_string(), sampler));
        self
    }

    /// Render the final pass into an internal target and copy it into the output.
    pub fn copy_to_output(mut self, enabled: bool) -> Self {
        self.copy_to_output = enabled;
        self
    }

    /// Node-level uniform visible to every pass.
    pub fn uniform(mut self, name: &str, value: impl Into<Uniform>) -> Self {
        self.uniforms.set(name, value.into());
        self
    }

    /// Initial binding for an input key.
    pub fn src(mut self, key: &str, src: impl Into<TextureSource>) -> Self {
        self.srcs.push((key.to_string(), src.into()));
        self
    }

    /// Check the wiring and freeze it into a runnable effect.
    pub(crate) fn build(self, name: &str) -> FluxResult<(MultiPass, Inputs, Uniforms, SurfaceDesc)> {
        let invalid = |msg: String| FluxError::validation(format!("effect '{name}': {msg}"));

        if self.passes.is_empty() {
            return Err(invalid("at least one pass is required".to_string()));
        }
        if self.require_inputs && self.inputs.is_empty() {
            return Err(invalid("at least one input key is required".to_string()));
        }
        for (i, key) in self.inputs.iter().enumerate() {
            if self.inputs[..i].contains(key) {
                return Err(invalid(format!("duplicate input key '{key}'")));
            }
        }
        let primary = match self.primary {
            Some(p) if !self.inputs.contains(&p) => {
                return Err(invalid(format!("primary input '{p}' is not declared")));
            }
            Some(p) => Some(p),
            None => self.inputs.first().cloned(),
        };

        let mut passes = Vec::with_capacity(self.passes.len());
        for (i, pass) in self.passes.into_iter().enumerate() {
            let label = pass.kernel.label().to_string();
            for (slot, _) in &pass.sources {
                if !pass.kernel.slots().contains(&slot.as_str()) {
                    return Err(invalid(format!(
                        "pass {i} ({label}) has no slot named '{slot}'"
                    )));
                }
            }

            let mut bindings: SmallVec<[(&'static str, PassInput); 4]> = SmallVec::new();
            for &slot in pass.kernel.slots() {
                let src = match pass.source(slot) {
                    Some(src) => src.clone(),
                    None => infer(slot, i, primary.as_deref(), &self.inputs).ok_or_else(|| {
                        invalid(format!(
                            "pass {i} ({label}) slot '{slot}' has no input source"
                        ))
                    })?,
                };
                match &src {
                    PassInput::Input(key) if !self.inputs.contains(key) => {
                        return Err(invalid(format!(
                            "pass {i} ({label}) slot '{slot}' reads unknown input '{key}'"
                        )));
                    }
                    PassInput::Pass(j) if *j >= i => {
                        return Err(invalid(format!(
                            "pass {i} ({label}) slot '{slot}' reads pass {j}, which has not run yet"
                        )));
                    }
                    _ => {}
                }
                bindings.push((slot, src));
            }

            passes.push(CompiledPass {
                kernel: pass.kernel,
                bindings,
                overrides: pass.uniforms,
            });
        }

        let mut inputs = Inputs::declared(self.inputs.iter().map(String::as_str));
        for (key, src) in self.srcs {
            inputs.set(&key, src).map_err(|_| invalid(format!("unknown input key '{key}'")))?;
        }

        let internal = passes.len() - 1 + usize::from(self.copy_to_output);
        let effect = MultiPass {
            passes,
            sampler: self.sampler,
            slot_samplers: self.slot_samplers,
            copy_to_output: self.copy_to_output,
            targets: vec![None; internal],
        };
        Ok((effect, inputs, self.uniforms, self.desc))
    }
}

/// Default source for an unbound slot: the primary slot chains from the previous pass, any
/// slot named after a declared input reads that input.
fn infer(slot: &str, pass: usize, primary: Option<&str>, inputs: &[String]) -> Option<PassInput> {
    if pass > 0 && primary == Some(slot) {
        return Some(PassInput::Pass(pass - 1));
    }
    inputs
        .iter()
        .any(|k| k == slot)
        .then(|| PassInput::Input(slot.to_string()))
}

struct CompiledPass {
    kernel: Arc<dyn Kernel>,
    bindings: SmallVec<[(&'static str, PassInput); 4]>,
    overrides: Vec<(String, UniformValue)>,
}

/// A chain of kernels rendered in order, each pass into its own target.
pub(crate) struct MultiPass {
    passes: Vec<CompiledPass>,
    sampler: Sampler,
    slot_samplers: Vec<(String, Sampler)>,
    copy_to_output: bool,
    targets: Vec<Option<SurfaceId>>,
}

impl MultiPass {
    pub(crate) fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub(crate) fn internal_targets(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.targets.iter().flatten().copied()
    }

    fn sampler_for(&self, slot: &str) -> Sampler {
        self.slot_samplers
            .iter()
            .find(|(s, _)| s == slot)
            .map_or(self.sampler, |(_, s)| *s)
    }

    fn ensure_targets(&mut self, store: &mut SurfaceStore, desc: SurfaceDesc) -> FluxResult<()> {
        for target in &mut self.targets {
            match *target {
                Some(id) if store.desc(id) == Some(desc) => {}
                Some(id) => {
                    store.release(id)?;
                    *target = Some(store.alloc(desc));
                }
                None => *target = Some(store.alloc(desc)),
            }
        }
        Ok(())
    }

    pub(crate) fn render(&mut self, cx: &mut EvalCx<'_>, io: &mut NodeIo<'_>) -> FluxResult<()> {
        self.ensure_targets(cx.store, io.desc)?;

        let mut external: SmallVec<[(&str, Option<SurfaceId>); 4]> = SmallVec::new();
        for (key, src) in io.inputs.iter() {
            external.push((key, cx.resolve(key, src, io.uploads)?));
        }

        let last = self.passes.len() - 1;
        let mut written: SmallVec<[SurfaceId; 4]> = SmallVec::new();
        for (i, pass) in self.passes.iter().enumerate() {
            let target = match self.targets.get(i).copied().flatten() {
                Some(id) => id,
                None if i == last => io.output,
                None => {
                    return Err(FluxError::evaluation(format!(
                        "effect '{}': pass {i} has no target",
                        io.name
                    )));
                }
            };

            let mut bindings: SmallVec<[Binding<'_>; 4]> = SmallVec::new();
            for (slot, src) in &pass.bindings {
                let surface = match src {
                    PassInput::Input(key) => external
                        .iter()
                        .find(|(k, _)| *k == key.as_str())
                        .and_then(|(_, s)| *s),
                    PassInput::Pass(j) => written.get(*j).copied(),
                };
                bindings.push(Binding {
                    slot: *slot,
                    surface,
                    sampler: self.sampler_for(slot),
                });
            }

            let merged;
            let uniforms = if pass.overrides.is_empty() {
                io.uniforms
            } else {
                let mut u: ResolvedUniforms = io.uniforms.clone();
                for (n, v) in &pass.overrides {
                    u.set(n, *v);
                }
                merged = u;
                &merged
            };

            tracing::trace!(node = io.name, pass = i, kernel = pass.kernel.label(), "running pass");
            run_kernel(cx.store, pass.kernel.as_ref(), target, &bindings, uniforms)?;
            written.push(target);
        }

        if self.copy_to_output
            && let Some(&last_target) = written.last()
        {
            let copy = [Binding {
                slot: "source",
                surface: Some(last_target),
                sampler: Sampler::NEAREST_CLAMP,
            }];
            run_kernel(cx.store, &Passthrough, io.output, &copy, io.uniforms)?;
        }
        Ok(())
    }

    pub(crate) fn release(&mut self, store: &mut SurfaceStore) -> FluxResult<()> {
        for target in &mut self.targets {
            if let Some(id) = target.take() {
                store.release(id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/multipass.rs"]
mod tests;
