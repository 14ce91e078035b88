use std::collections::HashSet;

use super::tree::{Document, NodeId};

/// Deepest node shared by the parent chains of all `nodes`.
///
/// Chains start at each node's parent, so a single node resolves to its parent.
/// The intersection of all chains is re-scanned along the first chain, nearest
/// first, which yields the deepest common member.
pub fn lowest_common_ancestor(doc: &Document, nodes: &[NodeId]) -> Option<NodeId> {
    let (first, rest) = nodes.split_first()?;
    let chain: Vec<NodeId> = doc.ancestors(*first).collect();

    let mut common: HashSet<NodeId> = chain.iter().copied().collect();
    for &node in rest {
        let other: HashSet<NodeId> = doc.ancestors(node).collect();
        common.retain(|id| other.contains(id));
    }

    chain.into_iter().find(|id| common.contains(id))
}
