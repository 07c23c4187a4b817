//! Component flattener

use crate::types::FieldComponent;

/// Collect the leaf components of a tree, depth-first and left to right.
///
/// Containers are never returned themselves; their children are visited in
/// declaration order. Leaves are cloned so the result can outlive the tree.
pub fn flatten(tree: &[FieldComponent]) -> Vec<FieldComponent> {
    let mut leaves = Vec::new();
    collect_leaves(tree.iter(), &mut leaves);
    leaves
}

fn collect_leaves<'a>(
    nodes: impl Iterator<Item = &'a FieldComponent>,
    leaves: &mut Vec<FieldComponent>,
) {
    for node in nodes {
        if node.is_container() {
            collect_leaves(node.children(), leaves);
        } else {
            leaves.push(node.clone());
        }
    }
}
