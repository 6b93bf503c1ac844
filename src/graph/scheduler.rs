use crate::foundation::core::NodeId;
use crate::foundation::error::{FluxError, FluxResult};
use crate::graph::node::Node;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

struct Frame {
    id: NodeId,
    deps: SmallVec<[NodeId; 4]>,
    next: usize,
}

fn live(nodes: &[Option<Node>], id: NodeId) -> FluxResult<&Node> {
    nodes
        .get(id.slot())
        .and_then(Option::as_ref)
        .ok_or_else(|| FluxError::evaluation(format!("node {} is disposed or unknown", id.0)))
}

/// Dependency-first order of every node reachable from `root`, ending with `root`.
///
/// Depth-first over each node's inputs in declaration order; an explicit stack keeps deep
/// chains off the call stack. A node met again while still on the stack is a cycle.
pub(crate) fn topo_order(nodes: &[Option<Node>], root: NodeId) -> FluxResult<Vec<NodeId>> {
    let mut state = vec![Visit::Unvisited; nodes.len()];
    let mut order = Vec::new();
    let mut stack = vec![Frame {
        id: root,
        deps: live(nodes, root)?.dependencies(),
        next: 0,
    }];
    state[root.slot()] = Visit::InProgress;

    while let Some(top) = stack.last_mut() {
        if let Some(&dep) = top.deps.get(top.next) {
            top.next += 1;
            let node = live(nodes, dep)?;
            match state[dep.slot()] {
                Visit::Done => {}
                Visit::InProgress => return Err(FluxError::cycle(node.name.clone())),
                Visit::Unvisited => {
                    state[dep.slot()] = Visit::InProgress;
                    stack.push(Frame {
                        id: dep,
                        deps: node.dependencies(),
                        next: 0,
                    });
                }
            }
        } else {
            let id = top.id;
            state[id.slot()] = Visit::Done;
            order.push(id);
            stack.pop();
        }
    }
    Ok(order)
}

#[cfg(test)]
#[path = "../../tests/unit/graph/scheduler.rs"]
mod tests;
