//! Structure-agnostic search for the first polygon boundary.

use super::tree::Node;

/// Element path from a `Polygon`'s parent down to its outer ring text.
const BOUNDARY_PATH: [&str; 4] = ["Polygon", "outerBoundaryIs", "LinearRing", "coordinates"];

/// Find the coordinate text of the first polygon outer boundary.
///
/// Walks the whole tree depth-first in document order with an explicit work
/// stack. At each map node the `Polygon/outerBoundaryIs/LinearRing/coordinates`
/// path is tried before descending into the children, so an enclosing polygon
/// wins over anything nested deeper. Inner boundaries are never consulted.
#[must_use]
pub fn locate_outer_boundary(root: &Node) -> Option<&str> {
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        match node {
            Node::Map(entries) => {
                if let Some(text) = resolve_path(node, &BOUNDARY_PATH) {
                    return Some(text);
                }
                pending.extend(entries.iter().rev().map(|(_, child)| child));
            }
            Node::List(items) => pending.extend(items.iter().rev()),
            Node::Text(_) | Node::Number(_) | Node::Bool(_) => {}
        }
    }

    None
}

/// Follow `path` from `node`, stepping through lists by taking the first
/// element that completes the path. The final step must carry non-empty text.
fn resolve_path<'a>(node: &'a Node, path: &[&str]) -> Option<&'a str> {
    match node {
        Node::List(items) => items.iter().find_map(|item| resolve_path(item, path)),
        _ => match path.split_first() {
            None => node.text().filter(|text| !text.is_empty()),
            Some((head, rest)) => resolve_path(node.get(head)?, rest),
        },
    }
}
