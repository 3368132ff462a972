use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::util::round2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Hour,
    Faction,
    Location,
    Book,
    Event,
    Person,
    #[default]
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hour" => Self::Hour,
            "faction" => Self::Faction,
            "location" => Self::Location,
            "book" => Self::Book,
            "event" => Self::Event,
            "person" => Self::Person,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Faction => "faction",
            Self::Location => "location",
            Self::Book => "book",
            Self::Event => "event",
            Self::Person => "person",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_hub(self) -> bool {
        matches!(self, Self::Hour | Self::Faction)
    }
}

/// Best-effort kind for ids nobody described: the namespace before the first
/// `.`. Only used for placeholder nodes, never to override curated data.
pub fn classify_by_prefix(id: &str) -> NodeKind {
    match id.split_once('.') {
        Some((prefix, _)) => NodeKind::parse(prefix),
        None => NodeKind::Unknown,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeAttributes {
    pub aliases: Vec<String>,
    pub origin: Option<String>,
    pub factions: Vec<String>,
    pub description: Option<String>,
    pub mentions: Vec<Mention>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoreNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub color: String,
    pub importance: f32,
    pub attributes: NodeAttributes,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoreEdge {
    pub source: usize,
    pub target: usize,
    pub relation_types: Vec<String>,
    pub descriptions: Vec<String>,
    pub weight: u32,
    pub confidence_sum: f64,
}

pub const MAX_EDGE_DESCRIPTIONS: usize = 5;

impl LoreEdge {
    pub(crate) fn new(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            relation_types: Vec::new(),
            descriptions: Vec::new(),
            weight: 0,
            confidence_sum: 0.0,
        }
    }

    pub(crate) fn add_relation_type(&mut self, relation_type: &str) {
        if !self.relation_types.iter().any(|known| known == relation_type) {
            self.relation_types.push(relation_type.to_owned());
        }
    }

    pub(crate) fn add_description(&mut self, description: &str) {
        let description = description.trim();
        if description.is_empty()
            || self.descriptions.len() >= MAX_EDGE_DESCRIPTIONS
            || self.descriptions.iter().any(|known| known == description)
        {
            return;
        }
        self.descriptions.push(description.to_owned());
    }

    pub fn confidence_avg(&self) -> f64 {
        if self.weight == 0 {
            return 0.0;
        }
        round2(self.confidence_sum / f64::from(self.weight)).clamp(0.0, 1.0)
    }

    pub fn relation_label(&self) -> String {
        self.relation_types.join(", ")
    }

    pub fn other_end(&self, node: usize) -> usize {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// Frozen knowledge graph. Nodes and edges keep insertion order; every edge
/// endpoint indexes into `nodes`.
#[derive(Clone, Debug, Default)]
pub struct LoreGraph {
    nodes: Vec<LoreNode>,
    edges: Vec<LoreEdge>,
    index_by_id: HashMap<String, usize>,
    edge_by_pair: HashMap<(usize, usize), usize>,
    adjacency: Vec<Vec<usize>>,
    alias_index: HashMap<String, usize>,
}

impl LoreGraph {
    pub(crate) fn from_parts(nodes: Vec<LoreNode>, edges: Vec<LoreEdge>) -> Self {
        let mut index_by_id = HashMap::with_capacity(nodes.len());
        let mut alias_index = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            index_by_id.entry(node.id.clone()).or_insert(index);
            for alias in &node.attributes.aliases {
                alias_index.entry(alias.to_lowercase()).or_insert(index);
            }
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut edge_by_pair = HashMap::with_capacity(edges.len());
        for (edge_index, edge) in edges.iter().enumerate() {
            edge_by_pair.insert((edge.source, edge.target), edge_index);
            adjacency[edge.source].push(edge_index);
            adjacency[edge.target].push(edge_index);
        }

        Self {
            nodes,
            edges,
            index_by_id,
            edge_by_pair,
            adjacency,
            alias_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[LoreNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LoreEdge] {
        &self.edges
    }

    pub fn node(&self, index: usize) -> Option<&LoreNode> {
        self.nodes.get(index)
    }

    pub fn edge(&self, index: usize) -> Option<&LoreEdge> {
        self.edges.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    #[cfg(test)]
    pub fn node_by_id(&self, id: &str) -> Option<&LoreNode> {
        self.index_of(id).and_then(|index| self.nodes.get(index))
    }

    pub fn edge_between(&self, source: usize, target: usize) -> Option<usize> {
        self.edge_by_pair.get(&(source, target)).copied()
    }

    /// Edge joining `a` and `b` in either direction, preferring `a → b`.
    pub fn connecting_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_between(a, b).or_else(|| self.edge_between(b, a))
    }

    pub fn incident_edges(&self, node: usize) -> &[usize] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn resolve_alias(&self, alias: &str) -> Option<usize> {
        self.alias_index.get(&alias.trim().to_lowercase()).copied()
    }
}
