use super::*;
use crate::foundation::core::FrameId;
use crate::graph::render_graph::RenderGraph;

const N: u32 = 8;

fn field(g: &mut RenderGraph, value: f32) -> SurfaceId {
    let id = g.create_surface(SurfaceDesc::f32(N, N));
    g.surface_mut(id).unwrap().fill([value, 0.0, 0.0, 1.0]);
    id
}

#[test]
fn iteration_and_damping_clamps() {
    assert_eq!(clamp_iterations(0.0), 1);
    assert_eq!(clamp_iterations(-3.0), 1);
    assert_eq!(clamp_iterations(f32::NAN), 1);
    assert_eq!(clamp_iterations(20.0), 20);
    assert_eq!(clamp_damping(1.5), 1.0);
    assert_eq!(clamp_damping(-0.5), 0.0);
    assert_eq!(clamp_damping(f32::INFINITY), 0.0);
}

#[test]
fn zero_divergence_keeps_a_uniform_initial_field() {
    let mut g = RenderGraph::new();
    let div = field(&mut g, 0.0);
    let init = field(&mut g, 0.6);
    let p = g.add_pressure_iterator("p", PressureDesc::new(N, N)).unwrap();
    g.set_src(p, DIVERGENCE_SLOT, div).unwrap();
    g.set_src(p, INITIAL_SLOT, init).unwrap();

    g.render_all(p, FrameId(1)).unwrap();
    assert!(
        g.output(p)
            .unwrap()
            .texels()
            .iter()
            .all(|t| (t[0] - 0.6).abs() < 1e-5)
    );
    assert_eq!(g.pressure_iterations(p).unwrap(), 20);
}

#[test]
fn zero_iterations_run_one_sweep() {
    let mut g = RenderGraph::new();
    let div = field(&mut g, 0.0);
    let p = g
        .add_pressure_iterator("p", PressureDesc::new(N, N).iterations(0))
        .unwrap();
    g.set_src(p, DIVERGENCE_SLOT, div).unwrap();
    g.render_all(p, FrameId(1)).unwrap();
    assert_eq!(g.pressure_iterations(p).unwrap(), 1);
    assert_eq!(g.output(p).unwrap().max_abs(0), 0.0);

    g.set_uniform(p, "iterations", 7).unwrap();
    g.render_all(p, FrameId(2)).unwrap();
    assert_eq!(g.pressure_iterations(p).unwrap(), 7);
}

#[test]
fn damping_controls_the_warm_start() {
    let mut g = RenderGraph::new();
    let div = g.create_surface(SurfaceDesc::f32(N, N));
    g.surface_mut(div).unwrap().set(3, 3, [1.0, 0.0, 0.0, 1.0]);
    g.surface_mut(div).unwrap().set(5, 4, [-1.0, 0.0, 0.0, 1.0]);

    let cold = g
        .add_pressure_iterator("cold", PressureDesc::new(N, N).iterations(4).damping(0.0))
        .unwrap();
    let warm = g
        .add_pressure_iterator("warm", PressureDesc::new(N, N).iterations(4).damping(1.0))
        .unwrap();
    g.set_src(cold, DIVERGENCE_SLOT, div).unwrap();
    g.set_src(warm, DIVERGENCE_SLOT, div).unwrap();

    g.render_all(cold, FrameId(1)).unwrap();
    g.render_all(warm, FrameId(1)).unwrap();
    let cold1 = g.output(cold).unwrap().clone();
    assert_eq!(&cold1, g.output(warm).unwrap());

    g.render_all(cold, FrameId(2)).unwrap();
    g.render_all(warm, FrameId(2)).unwrap();
    assert_eq!(&cold1, g.output(cold).unwrap());
    assert_ne!(&cold1, g.output(warm).unwrap());
}

#[test]
fn resize_replaces_buffers_exactly_once() {
    let mut g = RenderGraph::new();
    let div = field(&mut g, 0.0);
    let p = g.add_pressure_iterator("p", PressureDesc::new(N, N)).unwrap();
    g.set_src(p, DIVERGENCE_SLOT, div).unwrap();
    g.render_all(p, FrameId(1)).unwrap();
    assert_eq!(g.internal_surface_count(p).unwrap(), 2);

    let before = g.surface_stats();
    g.resize(p, 2 * N, 2 * N).unwrap();
    g.render_all(p, FrameId(2)).unwrap();
    let after = g.surface_stats();
    assert_eq!(after.released, before.released + 3);
    assert_eq!(after.live, before.live);
    assert_eq!(g.output(p).unwrap().width(), 2 * N);

    g.dispose(p).unwrap();
    assert_eq!(g.surface_stats().live, 1);
}
