use rustc_hash::FxHashMap;

use super::{IrExprKind, IrGraph, NodeId};

/// Whether the graph rooted at `left_root` and the graph rooted at
/// `right_root` have the same shape, payloads, effect order and sharing.
///
/// Node handles are matched one-to-one: a node shared by two parents in one
/// graph must be a single shared node in the other.
pub fn structurally_equal(
    left: &IrGraph,
    left_root: NodeId,
    right: &IrGraph,
    right_root: NodeId,
) -> bool {
    let mut forward: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut backward: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut pending = vec![(left_root, right_root)];

    while let Some((l, r)) = pending.pop() {
        match (forward.get(&l), backward.get(&r)) {
            (Some(&mapped), _) => {
                if mapped != r {
                    return false;
                }
                continue;
            }
            (None, Some(_)) => return false,
            (None, None) => {}
        }
        forward.insert(l, r);
        backward.insert(r, l);

        let left_node = left.node(l);
        let right_node = right.node(r);
        if erased(&left_node.kind) != erased(&right_node.kind) {
            return false;
        }
        match (left_node.previous, right_node.previous) {
            (Some(lp), Some(rp)) => pending.push((lp, rp)),
            (None, None) => {}
            _ => return false,
        }
        let left_handles = handles(&left_node.kind);
        let right_handles = handles(&right_node.kind);
        if left_handles.len() != right_handles.len() {
            return false;
        }
        pending.extend(left_handles.into_iter().zip(right_handles));
    }
    true
}

fn erased(kind: &IrExprKind) -> IrExprKind {
    kind.clone().map_nodes(&mut |_| NodeId::new(0))
}

fn handles(kind: &IrExprKind) -> Vec<NodeId> {
    let mut out = Vec::new();
    let _ = kind.clone().map_nodes(&mut |id| {
        out.push(id);
        id
    });
    out
}
