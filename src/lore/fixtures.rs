use super::model::{LoreEdge, LoreGraph, LoreNode, NodeAttributes, classify_by_prefix};

pub(crate) fn node(id: &str, label: &str) -> LoreNode {
    LoreNode {
        id: id.to_owned(),
        label: label.to_owned(),
        kind: classify_by_prefix(id),
        color: "#666666".to_owned(),
        importance: 1.0,
        attributes: NodeAttributes::default(),
    }
}

pub(crate) fn edge(source: usize, target: usize, relation_types: &[&str]) -> LoreEdge {
    let mut edge = LoreEdge::new(source, target);
    for relation_type in relation_types {
        edge.add_relation_type(relation_type);
    }
    edge.weight = 1;
    edge.confidence_sum = 1.0;
    edge
}

/// Nodes labelled after their ids, joined by single-relation `knows` edges.
pub(crate) fn graph(ids: &[&str], links: &[(usize, usize)]) -> LoreGraph {
    LoreGraph::from_parts(
        ids.iter().map(|id| node(id, id)).collect(),
        links
            .iter()
            .map(|&(source, target)| edge(source, target, &["knows"]))
            .collect(),
    )
}

pub(crate) fn from_parts(nodes: Vec<LoreNode>, edges: Vec<LoreEdge>) -> LoreGraph {
    LoreGraph::from_parts(nodes, edges)
}
