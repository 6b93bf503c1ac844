use super::*;
use crate::foundation::core::{Sampler, SurfaceDesc, SurfaceId};
use crate::graph::kernel::{Binding, run_kernel};
use crate::graph::uniform::ResolvedUniforms;
use crate::texture::store::SurfaceStore;

fn run(
    store: &mut SurfaceStore,
    kernel: &dyn Kernel,
    src: Option<SurfaceId>,
    out: SurfaceId,
    uniforms: &ResolvedUniforms,
) {
    let bindings = [Binding {
        slot: "source",
        surface: src,
        sampler: Sampler::LINEAR_CLAMP,
    }];
    run_kernel(store, kernel, out, &bindings, uniforms).unwrap();
}

#[test]
fn scale_multiplies_every_channel() {
    let mut store = SurfaceStore::new();
    let src = store.alloc(SurfaceDesc::f32(3, 3));
    let out = store.alloc(SurfaceDesc::f32(3, 3));
    store.get_mut(src).unwrap().fill([1.0, 2.0, -4.0, 1.0]);

    let mut u = ResolvedUniforms::default();
    u.set("factor", 0.5f32.into());
    run(&mut store, &Scale, Some(src), out, &u);
    assert!(
        store
            .get(out)
            .unwrap()
            .texels()
            .iter()
            .all(|t| *t == [0.5, 1.0, -2.0, 0.5])
    );
}

#[test]
fn clear_fills_scalar_value() {
    let mut store = SurfaceStore::new();
    let out = store.alloc(SurfaceDesc::f32(2, 2));
    store.get_mut(out).unwrap().fill([9.0; 4]);
    run(&mut store, &Clear, None, out, &ResolvedUniforms::default());
    assert_eq!(store.get(out).unwrap().max_abs(0), 0.0);
}

#[test]
fn passthrough_resamples_and_zeroes_unbound() {
    let mut store = SurfaceStore::new();
    let src = store.alloc(SurfaceDesc::f32(2, 2));
    let out = store.alloc(SurfaceDesc::f32(4, 4));
    store.get_mut(src).unwrap().fill([0.25, 0.0, 0.0, 1.0]);
    run(
        &mut store,
        &Passthrough,
        Some(src),
        out,
        &ResolvedUniforms::default(),
    );
    assert!(
        store
            .get(out)
            .unwrap()
            .texels()
            .iter()
            .all(|t| (t[0] - 0.25).abs() < 1e-6)
    );

    run(
        &mut store,
        &Passthrough,
        None,
        out,
        &ResolvedUniforms::default(),
    );
    assert_eq!(store.get(out).unwrap().max_abs(0), 0.0);
}
