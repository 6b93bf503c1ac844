use super::*;
use crate::foundation::core::FrameId;
use crate::graph::render_graph::RenderGraph;
use crate::kernels::{Advect, Passthrough, Scale};

fn desc() -> SurfaceDesc {
    SurfaceDesc::f32(4, 4)
}

fn source(g: &mut RenderGraph, value: f32) -> SurfaceId {
    let id = g.create_surface(desc());
    g.surface_mut(id).unwrap().fill([value, 0.0, 0.0, 1.0]);
    id
}

fn build_err(d: EffectDesc) -> String {
    match d.build("fx") {
        Err(FluxError::Validation(msg)) => msg,
        Err(other) => panic!("expected validation error, got {other}"),
        Ok(_) => panic!("expected validation error"),
    }
}

#[test]
fn construction_rejects_bad_wiring() {
    assert!(build_err(EffectDesc::multipass(desc()).input("source")).contains("pass"));
    assert!(build_err(EffectDesc::multipass(desc()).pass(PassDesc::new(Scale))).contains("input key"));
    assert!(
        build_err(
            EffectDesc::multipass(desc())
                .input("source")
                .input("source")
                .pass(PassDesc::new(Scale))
        )
        .contains("duplicate")
    );
    assert!(
        build_err(
            EffectDesc::multipass(desc())
                .input("source")
                .primary("mask")
                .pass(PassDesc::new(Scale))
        )
        .contains("primary")
    );
    assert!(
        build_err(
            EffectDesc::multipass(desc())
                .input("source")
                .pass(PassDesc::new(Scale).input("source", "mask"))
        )
        .contains("unknown input")
    );
    assert!(
        build_err(
            EffectDesc::multipass(desc())
                .input("source")
                .pass(PassDesc::new(Scale).pass("source", 0))
        )
        .contains("has not run")
    );
    assert!(
        build_err(
            EffectDesc::multipass(desc())
                .input("source")
                .pass(PassDesc::new(Advect))
        )
        .contains("'velocity' has no input source")
    );
    assert!(
        build_err(
            EffectDesc::multipass(desc())
                .input("source")
                .pass(PassDesc::new(Scale).input("mask", "source"))
        )
        .contains("no slot named")
    );
}

#[test]
fn single_pass_effects_may_have_no_inputs() {
    let (effect, inputs, _, _) = EffectDesc::single(crate::kernels::Clear, desc())
        .build("clear")
        .unwrap();
    assert_eq!(effect.pass_count(), 1);
    assert_eq!(inputs.keys().count(), 0);
    assert_eq!(effect.internal_targets().count(), 0);
}

#[test]
fn primary_input_chains_through_passes() {
    for copy in [false, true] {
        let mut g = RenderGraph::new();
        let src = source(&mut g, 1.0);
        let fx = g
            .add_effect(
                "chain",
                EffectDesc::multipass(desc())
                    .input("source")
                    .pass(PassDesc::new(Scale).uniform("factor", 2.0f32))
                    .pass(PassDesc::new(Scale).uniform("factor", 3.0f32))
                    .pass(PassDesc::new(Scale).uniform("factor", 0.5f32))
                    .copy_to_output(copy)
                    .src("source", src),
            )
            .unwrap();
        g.render_all(fx, FrameId(1)).unwrap();
        assert!((g.output(fx).unwrap().get(2, 2).unwrap()[0] - 3.0).abs() < 1e-6);
        assert_eq!(g.internal_surface_count(fx).unwrap(), 2 + usize::from(copy));
    }
}

#[test]
fn passes_can_reread_inputs_and_earlier_targets() {
    let mut g = RenderGraph::new();
    let base = source(&mut g, 2.0);
    let fx = g
        .add_effect(
            "reread",
            EffectDesc::multipass(desc())
                .input("source")
                .uniform("factor", 5.0f32)
                .pass(PassDesc::new(Scale))
                .pass(PassDesc::new(Scale).uniform("factor", 0.0f32))
                .pass(PassDesc::new(Scale).pass("source", 0).uniform("factor", 1.0f32))
                .src("source", base),
        )
        .unwrap();
    g.render_all(fx, FrameId(1)).unwrap();
    // pass 0 uses the node-level factor, pass 2 skips the zeroed pass 1.
    assert!((g.output(fx).unwrap().get(0, 0).unwrap()[0] - 10.0).abs() < 1e-6);

    let fx2 = g
        .add_effect(
            "restart",
            EffectDesc::multipass(desc())
                .input("source")
                .pass(PassDesc::new(Scale).uniform("factor", 0.0f32))
                .pass(PassDesc::new(Passthrough).input("source", "source"))
                .src("source", base),
        )
        .unwrap();
    g.render_all(fx2, FrameId(1)).unwrap();
    assert!((g.output(fx2).unwrap().get(0, 0).unwrap()[0] - 2.0).abs() < 1e-6);
}

#[test]
fn slot_sampler_overrides_filtering() {
    let mut g = RenderGraph::new();
    let src = g.create_surface(SurfaceDesc::f32(2, 1));
    g.surface_mut(src).unwrap().set(1, 0, [1.0, 0.0, 0.0, 1.0]);

    let out = SurfaceDesc::f32(4, 1);
    let linear = g
        .add_effect("linear", EffectDesc::single(Passthrough, out).src("source", src))
        .unwrap();
    let nearest = g
        .add_effect(
            "nearest",
            EffectDesc::single(Passthrough, out)
                .slot_sampler("source", Sampler::NEAREST_CLAMP)
                .src("source", src),
        )
        .unwrap();
    g.render_all(linear, FrameId(1)).unwrap();
    g.render_all(nearest, FrameId(1)).unwrap();

    let lin = g.output(linear).unwrap().get(1, 0).unwrap()[0];
    assert!(lin > 0.0 && lin < 1.0);
    assert!(
        g.output(nearest)
            .unwrap()
            .texels()
            .iter()
            .all(|t| t[0] == 0.0 || t[0] == 1.0)
    );
}

#[test]
fn internal_targets_follow_output_size() {
    let mut g = RenderGraph::new();
    let src = source(&mut g, 1.0);
    let fx = g
        .add_effect(
            "two",
            EffectDesc::multipass(desc())
                .input("source")
                .pass(PassDesc::new(Scale))
                .pass(PassDesc::new(Scale))
                .src("source", src),
        )
        .unwrap();
    g.render_all(fx, FrameId(1)).unwrap();
    let live = g.surface_stats().live;
    g.resize(fx, 8, 8).unwrap();
    g.render_all(fx, FrameId(2)).unwrap();
    assert_eq!(g.surface_stats().live, live);
    assert_eq!(g.output(fx).unwrap().width(), 8);
    assert!((g.output(fx).unwrap().get(7, 7).unwrap()[0] - 1.0).abs() < 1e-6);
}
