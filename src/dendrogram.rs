// src/dendrogram.rs
use serde::Serialize;

use crate::linkage::LinkageTree;

/// Horizontal spacing between adjacent leaves
const LEAF_SPACING: f64 = 10.0;

/// One U-shaped link: x and y coordinates of its four corners
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DendrogramLink {
    pub icoord: [f64; 4],
    pub dcoord: [f64; 4],
}

/// Geometry a renderer needs to draw the merge tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DendrogramData {
    /// Leaf (record) indices from left to right
    pub leaves: Vec<usize>,
    /// One link per merge, in merge order
    pub links: Vec<DendrogramLink>,
}

/// Lays out the tree: leaf `i` in display order sits at `x = 5 + 10 * i`,
/// a merge sits at the midpoint of its children at its merge distance,
/// and leaves have height 0. Left children are drawn first.
pub fn layout(tree: &LinkageTree) -> DendrogramData {
    let n = tree.leaf_count;
    if tree.steps.is_empty() {
        return DendrogramData {
            leaves: (0..n).collect(),
            links: Vec::new(),
        };
    }

    let mut leaves = Vec::with_capacity(n);
    let mut stack = vec![tree.node_id(tree.steps.len() - 1)];
    while let Some(node) = stack.pop() {
        if node < n {
            leaves.push(node);
        } else {
            let step = &tree.steps[node - n];
            stack.push(step.right);
            stack.push(step.left);
        }
    }

    let mut xs = vec![0.0; n + tree.steps.len()];
    let mut heights = vec![0.0; n + tree.steps.len()];
    for (pos, leaf) in leaves.iter().enumerate() {
        xs[*leaf] = LEAF_SPACING / 2.0 + LEAF_SPACING * pos as f64;
    }

    let links = tree
        .steps
        .iter()
        .enumerate()
        .map(|(idx, step)| {
            let node = tree.node_id(idx);
            let (x_left, x_right) = (xs[step.left], xs[step.right]);
            xs[node] = (x_left + x_right) / 2.0;
            heights[node] = step.distance;
            DendrogramLink {
                icoord: [x_left, x_left, x_right, x_right],
                dcoord: [
                    heights[step.left],
                    step.distance,
                    step.distance,
                    heights[step.right],
                ],
            }
        })
        .collect();

    DendrogramData { leaves, links }
}
