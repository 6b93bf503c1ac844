use super::*;
use crate::kernels::{Clear, Jacobi, Passthrough, Scale};
use crate::texture::source::shared_canvas;

fn desc(w: u32, h: u32) -> SurfaceDesc {
    SurfaceDesc::f32(w, h)
}

fn constant(g: &mut RenderGraph, name: &str, value: f32) -> NodeId {
    g.add_effect(
        name,
        EffectDesc::single(Clear, desc(2, 2)).uniform("value", value),
    )
    .unwrap()
}

#[test]
fn shared_node_runs_once_per_frame() {
    let mut g = RenderGraph::new();
    let a = constant(&mut g, "a", 1.0);
    let b = g
        .add_effect("b", EffectDesc::single(Scale, desc(2, 2)).src("source", a))
        .unwrap();
    let c = g
        .add_effect("c", EffectDesc::single(Scale, desc(2, 2)).src("source", a))
        .unwrap();
    let d = g
        .add_effect(
            "d",
            EffectDesc::single(Jacobi, desc(2, 2))
                .src("pressure", b)
                .src("divergence", c),
        )
        .unwrap();

    g.render_all(d, FrameId(1)).unwrap();
    g.render_all(d, FrameId(1)).unwrap();
    g.render_all(b, FrameId(1)).unwrap();
    assert_eq!(g.eval_count(a).unwrap(), 1);
    assert_eq!(g.eval_count(d).unwrap(), 1);

    g.render_all(d, FrameId(2)).unwrap();
    assert_eq!(g.eval_count(a).unwrap(), 2);
    assert_eq!(g.last_frame(c).unwrap(), Some(FrameId(2)));
}

#[test]
fn resolution_uniform_tracks_node_size() {
    let mut g = RenderGraph::new();
    let a = constant(&mut g, "a", 0.0);
    assert_eq!(
        g.uniform(a, "resolution").unwrap(),
        Some(UniformValue::Vec2([2.0, 2.0]))
    );
    g.resize(a, 5, 3).unwrap();
    assert_eq!(
        g.uniform(a, "resolution").unwrap(),
        Some(UniformValue::Vec2([5.0, 3.0]))
    );
    g.render_all(a, FrameId(1)).unwrap();
    assert_eq!(g.output(a).unwrap().width(), 5);
}

#[test]
fn driven_uniforms_are_resolved_each_frame() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut g = RenderGraph::new();
    let a = constant(&mut g, "a", 0.0);
    let t = Rc::new(Cell::new(0.25f32));
    let tc = Rc::clone(&t);
    g.set_uniform(a, "value", Uniform::driven(move || tc.get().into()))
        .unwrap();

    g.render_all(a, FrameId(1)).unwrap();
    assert_eq!(g.output(a).unwrap().get(0, 0).unwrap()[0], 0.25);
    t.set(0.75);
    g.render_all(a, FrameId(1)).unwrap();
    assert_eq!(g.output(a).unwrap().get(0, 0).unwrap()[0], 0.25);
    g.render_all(a, FrameId(2)).unwrap();
    assert_eq!(g.output(a).unwrap().get(0, 0).unwrap()[0], 0.75);
}

#[test]
fn rewiring_validates_keys_and_sources() {
    let mut g = RenderGraph::new();
    let a = constant(&mut g, "a", 1.0);
    let b = g
        .add_effect("b", EffectDesc::single(Passthrough, desc(2, 2)))
        .unwrap();

    assert!(matches!(
        g.set_src(b, "velocity", a),
        Err(FluxError::Validation(_))
    ));
    g.set_srcs(b, [("source", TextureSource::Node(a))]).unwrap();
    assert_eq!(g.src(b, "source").unwrap().node(), Some(a));
    assert_eq!(g.input_keys(b).unwrap(), vec!["source".to_string()]);

    g.dispose(a).unwrap();
    assert!(matches!(
        g.set_src(b, "source", a),
        Err(FluxError::Validation(_))
    ));
    assert!(g.render_all(b, FrameId(1)).is_err());
}

#[test]
fn dispose_releases_everything_once() {
    let mut g = RenderGraph::new();
    let a = constant(&mut g, "a", 1.0);
    let before = g.surface_stats();
    g.dispose(a).unwrap();
    let after = g.surface_stats();
    assert_eq!(after.live, before.live - 1);
    assert_eq!(after.released, before.released + 1);
    assert!(g.dispose(a).is_err());
    assert!(!g.contains(a));
    assert!(g.is_empty());
}

#[test]
fn cascade_stops_at_shared_upstream_nodes() {
    let mut g = RenderGraph::new();
    let a = constant(&mut g, "a", 1.0);
    let b = g
        .add_effect("b", EffectDesc::single(Scale, desc(2, 2)).src("source", a))
        .unwrap();
    let c = g
        .add_effect("c", EffectDesc::single(Scale, desc(2, 2)).src("source", b))
        .unwrap();
    let d = g
        .add_effect("d", EffectDesc::single(Scale, desc(2, 2)).src("source", a))
        .unwrap();

    assert_eq!(g.dispose_cascade(c).unwrap(), 2);
    assert!(g.contains(a));
    assert!(g.contains(d));
    assert!(!g.contains(b));

    assert_eq!(g.dispose_cascade(d).unwrap(), 2);
    assert!(g.is_empty());
    assert_eq!(g.surface_stats().live, 0);
}

#[test]
fn canvas_inputs_are_uploaded_and_reallocated_on_resize() {
    let mut g = RenderGraph::new();
    let canvas = shared_canvas(4, 4);
    for px in canvas.borrow_mut().pixels_mut() {
        *px = image::Rgba([255, 0, 0, 255]);
    }
    let n = g
        .add_effect(
            "copy",
            EffectDesc::single(Passthrough, desc(4, 4)).src("source", canvas.clone()),
        )
        .unwrap();

    g.render_all(n, FrameId(1)).unwrap();
    assert_eq!(g.output(n).unwrap().get(1, 1).unwrap()[0], 1.0);
    assert_eq!(g.internal_surface_count(n).unwrap(), 1);

    let released = g.surface_stats().released;
    *canvas.borrow_mut() = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 255, 0, 255]));
    g.render_all(n, FrameId(2)).unwrap();
    assert_eq!(g.surface_stats().released, released + 1);
    assert_eq!(g.internal_surface_count(n).unwrap(), 1);
    assert_eq!(g.output(n).unwrap().get(1, 1).unwrap()[1], 1.0);
}

#[test]
fn static_images_and_readback() {
    let mut g = RenderGraph::new();
    let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([0, 0, 255, 255]));
    let tex = g.upload_image(&img).unwrap();
    let n = g
        .add_effect("copy", EffectDesc::single(Passthrough, desc(3, 2)).src("source", tex))
        .unwrap();
    g.render_all(n, FrameId(1)).unwrap();
    let out = g.read_rgba8(n).unwrap();
    assert_eq!(out.dimensions(), (3, 2));
    assert_eq!(out.get_pixel(2, 1).0, [0, 0, 255, 255]);

    g.release_surface(tex).unwrap();
    assert!(g.surface(tex).is_err());
}

#[test]
fn dump_order_lists_each_node() {
    let mut g = RenderGraph::new();
    let a = constant(&mut g, "seed", 1.0);
    let b = g
        .add_effect("gain", EffectDesc::single(Scale, desc(2, 2)).src("source", a))
        .unwrap();
    let dump = g.dump_order(b).unwrap();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("seed"));
    assert!(lines[1].contains("gain [effect] 2x2"));
}

#[test]
fn zero_sized_outputs_are_rejected() {
    let mut g = RenderGraph::new();
    let flat = SurfaceDesc {
        width: 0,
        height: 4,
        precision: Precision::F32,
    };
    assert!(matches!(
        g.add_effect("flat", EffectDesc::single(Passthrough, flat)),
        Err(FluxError::Validation(_))
    ));
    assert!(matches!(
        g.add_feedback("flat_fb", TextureSource::Unset, flat),
        Err(FluxError::Validation(_))
    ));
    let mut pressure = PressureDesc::new(4, 4);
    pressure.desc.height = 0;
    assert!(matches!(
        g.add_pressure_iterator("flat_p", pressure),
        Err(FluxError::Validation(_))
    ));
    assert!(g.is_empty());
    assert_eq!(g.surface_stats().allocated, 0);

    let tex = g.create_surface(flat);
    assert_eq!(g.surface(tex).unwrap().width(), 1);
    let n = g
        .add_effect("copy", EffectDesc::single(Passthrough, desc(2, 2)).src("source", tex))
        .unwrap();
    g.render_all(n, FrameId(1)).unwrap();
}

#[test]
fn borrowed_canvas_fails_the_frame_instead_of_panicking() {
    let mut g = RenderGraph::new();
    let canvas = shared_canvas(2, 2);
    let n = g
        .add_effect(
            "copy",
            EffectDesc::single(Passthrough, desc(2, 2)).src("source", canvas.clone()),
        )
        .unwrap();
    let guard = canvas.borrow_mut();
    assert!(matches!(
        g.render_all(n, FrameId(1)),
        Err(FluxError::Evaluation(_))
    ));
    drop(guard);
    g.render_all(n, FrameId(1)).unwrap();
}

#[test]
fn cascade_reclaims_closed_feedback_loops() {
    let mut g = RenderGraph::new();
    let fb = g
        .add_feedback("history", TextureSource::Unset, desc(2, 2))
        .unwrap();
    let step = g
        .add_effect("step", EffectDesc::single(Scale, desc(2, 2)).src("source", fb))
        .unwrap();
    g.set_feedback_source(fb, step).unwrap();
    let view = g
        .add_effect("view", EffectDesc::single(Scale, desc(2, 2)).src("source", step))
        .unwrap();
    let other = g
        .add_effect("other", EffectDesc::single(Scale, desc(2, 2)).src("source", step))
        .unwrap();
    g.render_all(view, FrameId(1)).unwrap();
    g.render_all(view, FrameId(2)).unwrap();

    assert_eq!(g.dispose_cascade(view).unwrap(), 1);
    assert!(g.contains(step));
    assert!(g.contains(fb));

    assert_eq!(g.dispose_cascade(other).unwrap(), 3);
    assert!(g.is_empty());
    assert_eq!(g.surface_stats().live, 0);
}
