use std::collections::HashSet;

use crate::lore::LoreGraph;

use super::Focus;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct RelatedSet {
    pub nodes: HashSet<usize>,
    pub edges: HashSet<usize>,
}

pub(super) fn collect_neighborhood(graph: &LoreGraph, node: usize) -> RelatedSet {
    let mut related = RelatedSet::default();
    if graph.node(node).is_none() {
        return related;
    }

    related.nodes.insert(node);
    for &edge_index in graph.incident_edges(node) {
        let Some(edge) = graph.edge(edge_index) else {
            continue;
        };
        related.edges.insert(edge_index);
        related.nodes.insert(edge.other_end(node));
    }
    related
}

pub(super) fn collect_related(graph: &LoreGraph, focus: Focus) -> RelatedSet {
    match focus {
        Focus::None => RelatedSet::default(),
        Focus::Node(node) => collect_neighborhood(graph, node),
        Focus::Link(edge_index) => {
            let mut related = RelatedSet::default();
            if let Some(edge) = graph.edge(edge_index) {
                related.edges.insert(edge_index);
                related.nodes.insert(edge.source);
                related.nodes.insert(edge.target);
            }
            related
        }
    }
}
