use super::*;
use crate::effects::multipass::EffectDesc;
use crate::foundation::core::SurfaceDesc;
use crate::graph::render_graph::RenderGraph;
use crate::kernels::{Jacobi, Passthrough};

fn passthrough(g: &mut RenderGraph, name: &str) -> NodeId {
    g.add_effect(name, EffectDesc::single(Passthrough, SurfaceDesc::f32(1, 1)))
        .unwrap()
}

fn join(g: &mut RenderGraph, name: &str, a: NodeId, b: NodeId) -> NodeId {
    g.add_effect(
        name,
        EffectDesc::single(Jacobi, SurfaceDesc::f32(1, 1))
            .src("pressure", a)
            .src("divergence", b),
    )
    .unwrap()
}

#[test]
fn diamond_orders_dependencies_first_in_slot_order() {
    let mut g = RenderGraph::new();
    let a = passthrough(&mut g, "a");
    let b = passthrough(&mut g, "b");
    let c = passthrough(&mut g, "c");
    g.set_src(b, "source", a).unwrap();
    g.set_src(c, "source", a).unwrap();
    let d = join(&mut g, "d", b, c);

    assert_eq!(g.topo_order(d).unwrap(), vec![a, b, c, d]);
    assert_eq!(g.topo_order(b).unwrap(), vec![a, b]);
}

#[test]
fn self_loop_and_two_node_cycle_are_reported() {
    let mut g = RenderGraph::new();
    let x = passthrough(&mut g, "x");
    g.set_src(x, "source", x).unwrap();
    match g.topo_order(x) {
        Err(FluxError::Cycle { node }) => assert_eq!(node, "x"),
        other => panic!("expected cycle, got {other:?}"),
    }

    let p = passthrough(&mut g, "p");
    let q = passthrough(&mut g, "q");
    g.set_src(p, "source", q).unwrap();
    g.set_src(q, "source", p).unwrap();
    assert!(matches!(g.topo_order(p), Err(FluxError::Cycle { .. })));
}

#[test]
fn long_chains_do_not_recurse() {
    let mut g = RenderGraph::new();
    let mut prev = passthrough(&mut g, "n0");
    for i in 1..20_000 {
        let n = passthrough(&mut g, &format!("n{i}"));
        g.set_src(n, "source", prev).unwrap();
        prev = n;
    }
    let order = g.topo_order(prev).unwrap();
    assert_eq!(order.len(), 20_000);
    assert_eq!(order.last(), Some(&prev));
}

#[test]
fn disposed_dependency_is_an_evaluation_error() {
    let mut g = RenderGraph::new();
    let a = passthrough(&mut g, "a");
    let b = passthrough(&mut g, "b");
    g.set_src(b, "source", a).unwrap();
    g.dispose(a).unwrap();
    assert!(matches!(g.topo_order(b), Err(FluxError::Evaluation(_))));
}
