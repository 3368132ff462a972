use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{LoreEdge, LoreGraph, LoreNode, Mention, NodeAttributes, NodeKind};

#[derive(Clone, Debug, Deserialize)]
pub struct SeedEntity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub factions: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Curated entities in file order, plus how many entries could not be read.
#[derive(Clone, Debug, Default)]
pub struct SeedSet {
    pub entities: Vec<SeedEntity>,
    pub malformed_entries: usize,
}

impl From<Vec<SeedEntity>> for SeedSet {
    fn from(entities: Vec<SeedEntity>) -> Self {
        Self {
            entities,
            malformed_entries: 0,
        }
    }
}

/// Seeds must be a JSON array; a bad entry is counted and skipped.
pub fn parse_seeds(raw: &str) -> Result<SeedSet> {
    let parsed: Value = serde_json::from_str(raw)?;
    let entries = parsed
        .as_array()
        .ok_or_else(|| anyhow!("seed entities must be an array"))?;

    let mut seeds = SeedSet::default();
    for entry in entries {
        match SeedEntity::deserialize(entry) {
            Ok(seed) => seeds.entities.push(seed),
            Err(_) => seeds.malformed_entries += 1,
        }
    }
    Ok(seeds)
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRelationship {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default, rename = "type")]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source_item_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProposedEntity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// One language-model response: the relationships and entity proposals it
/// returned, plus how many entries could not be read at all.
#[derive(Clone, Debug, Default)]
pub struct ExtractionBatch {
    pub relationships: Vec<RawRelationship>,
    pub new_entities: Vec<ProposedEntity>,
    pub malformed_entries: usize,
}

impl ExtractionBatch {
    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut batch = Self::default();

        if let Some(entries) = object.get("relationships").and_then(Value::as_array) {
            for entry in entries {
                match RawRelationship::deserialize(entry) {
                    Ok(relationship) => batch.relationships.push(relationship),
                    Err(_) => batch.malformed_entries += 1,
                }
            }
        }

        if let Some(entries) = object.get("new_entities").and_then(Value::as_array) {
            for entry in entries {
                match ProposedEntity::deserialize(entry) {
                    Ok(entity) => batch.new_entities.push(entity),
                    Err(_) => batch.malformed_entries += 1,
                }
            }
        }

        batch
    }
}

/// Accepts either a single extraction document or an array of them, one per
/// model call. Only a wrong top-level shape is an error.
pub fn parse_extraction(raw: &str) -> Result<Vec<ExtractionBatch>> {
    let parsed: Value = serde_json::from_str(raw)?;

    match &parsed {
        Value::Object(object) => Ok(vec![ExtractionBatch::from_object(object)]),
        Value::Array(documents) => Ok(documents
            .iter()
            .map(|document| match document.as_object() {
                Some(object) => ExtractionBatch::from_object(object),
                None => ExtractionBatch {
                    malformed_entries: 1,
                    ..ExtractionBatch::default()
                },
            })
            .collect()),
        _ => Err(anyhow!("extraction output must be an object or an array of objects")),
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CorpusItem {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Evidence id → display name, read from the catalogue corpus. Entries
/// without an id are skipped.
pub fn parse_corpus(raw: &str) -> Result<HashMap<String, String>> {
    let parsed: Value = serde_json::from_str(raw)?;
    let items = match &parsed {
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => object
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("corpus object has no `items` array"))?,
        _ => return Err(anyhow!("corpus must be an array of items")),
    };

    let mut lookup = HashMap::with_capacity(items.len());
    for item in items {
        if let Ok(item) = CorpusItem::deserialize(item)
            && let Some(name) = item.name
        {
            lookup.entry(item.id).or_insert(name);
        }
    }
    Ok(lookup)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ArtifactNodeData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_importance")]
    pub val: f32,
    #[serde(default)]
    pub data: ArtifactNodeData,
}

fn default_importance() -> f32 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

/// The persisted graph consumed by the viewer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphArtifact {
    pub nodes: Vec<ArtifactNode>,
    pub links: Vec<ArtifactLink>,
}

impl GraphArtifact {
    pub fn from_graph(graph: &LoreGraph) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| ArtifactNode {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind,
                color: node.color.clone(),
                val: node.importance,
                data: ArtifactNodeData {
                    aliases: node.attributes.aliases.clone(),
                    origin: node.attributes.origin.clone(),
                    factions: node.attributes.factions.clone(),
                    description: node.attributes.description.clone(),
                    mentions: node.attributes.mentions.clone(),
                },
            })
            .collect();

        let links = graph
            .edges()
            .iter()
            .map(|edge| ArtifactLink {
                source: graph.nodes()[edge.source].id.clone(),
                target: graph.nodes()[edge.target].id.clone(),
                label: edge.relation_label(),
                weight: edge.weight,
                confidence: edge.confidence_avg(),
                descriptions: edge.descriptions.clone(),
            })
            .collect();

        Self { nodes, links }
    }

    /// Rebuilds the frozen graph, re-applying the graph invariants to
    /// hand-edited or foreign artifacts. Returns the graph and the number of
    /// links that had to be dropped.
    pub fn into_graph(self) -> (LoreGraph, usize) {
        let mut nodes: Vec<LoreNode> = Vec::with_capacity(self.nodes.len());
        let mut index_by_id: HashMap<String, usize> = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            if node.id.is_empty() || index_by_id.contains_key(&node.id) {
                continue;
            }
            index_by_id.insert(node.id.clone(), nodes.len());
            nodes.push(LoreNode {
                label: if node.label.is_empty() {
                    node.id.clone()
                } else {
                    node.label
                },
                id: node.id,
                kind: node.kind,
                color: node.color,
                importance: node.val,
                attributes: NodeAttributes {
                    aliases: node.data.aliases,
                    origin: node.data.origin,
                    factions: node.data.factions,
                    description: node.data.description,
                    mentions: node.data.mentions,
                },
            });
        }

        let mut dropped = 0usize;
        let mut edges: Vec<LoreEdge> = Vec::with_capacity(self.links.len());
        let mut edge_by_pair: HashMap<(usize, usize), usize> = HashMap::new();
        for link in self.links {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&link.source), index_by_id.get(&link.target))
            else {
                dropped += 1;
                continue;
            };
            if source == target {
                dropped += 1;
                continue;
            }

            let weight = link.weight.max(1);
            let confidence = if link.confidence.is_finite() {
                link.confidence.clamp(0.0, 1.0)
            } else {
                1.0
            };

            let edge_index = *edge_by_pair.entry((source, target)).or_insert_with(|| {
                edges.push(LoreEdge::new(source, target));
                edges.len() - 1
            });
            let edge = &mut edges[edge_index];
            for relation_type in link
                .label
                .split([',', '|'])
                .map(str::trim)
                .filter(|relation_type| !relation_type.is_empty())
            {
                edge.add_relation_type(relation_type);
            }
            for description in &link.descriptions {
                edge.add_description(description);
            }
            edge.weight += weight;
            edge.confidence_sum += confidence * f64::from(weight);
        }

        (LoreGraph::from_parts(nodes, edges), dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_tolerate_missing_names_and_bad_entries() {
        let raw = r#"[
            {"id": "hour.moth", "type": "hour"},
            {"id": "hour.velvet", "name": 7},
            {"name": "No id"},
            {"id": "hour.lantern", "name": "Lantern", "type": "hour"}
        ]"#;

        let seeds = parse_seeds(raw).expect("valid seed file");
        let ids = seeds
            .entities
            .iter()
            .map(|seed| seed.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["hour.moth", "hour.lantern"]);
        assert_eq!(seeds.entities[0].name, "");
        assert_eq!(seeds.malformed_entries, 2);
        assert!(parse_seeds(r#"{"id": "hour.moth"}"#).is_err());
    }

    #[test]
    fn extraction_tolerates_malformed_entries() {
        let raw = r#"{
            "relationships": [
                {"source": "hour.moth", "target": "hour.velvet", "type": "allied_with", "confidence": 0.8},
                {"source": 42, "target": "hour.velvet"},
                "not an object"
            ],
            "new_entities": [{"id": "person.sulochana", "name": "Sulochana", "type": "person"}]
        }"#;

        let batches = parse_extraction(raw).expect("valid document");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].relationships.len(), 1);
        assert_eq!(batches[0].new_entities.len(), 1);
        assert_eq!(batches[0].malformed_entries, 2);
    }

    #[test]
    fn extraction_accepts_batch_arrays() {
        let raw = r#"[{"relationships": []}, {"new_entities": [{"id": "event.fall"}]}, 7]"#;
        let batches = parse_extraction(raw).expect("valid document");

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].new_entities[0].id.as_deref(), Some("event.fall"));
        assert_eq!(batches[2].malformed_entries, 1);
        assert!(parse_extraction("12").is_err());
    }

    #[test]
    fn corpus_lookup_keeps_first_name() {
        let raw = r#"[{"id": "book.a", "name": "First"}, {"id": "book.a", "name": "Second"}, {"name": "anonymous"}]"#;
        let lookup = parse_corpus(raw).expect("valid corpus");

        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["book.a"], "First");
    }

    #[test]
    fn loading_an_artifact_reapplies_graph_invariants() {
        let raw = r##"{
            "nodes": [
                {"id": "hour.moth", "label": "Moth", "type": "hour", "color": "#fff", "val": 2.0, "data": {"mentions": []}},
                {"id": "hour.velvet", "label": "Velvet", "type": "hour", "color": "#fff", "val": 1.5},
                {"id": "hour.moth", "label": "Duplicate", "type": "hour"},
                {"id": "organization.hush_house", "label": "Hush House", "type": "organization"}
            ],
            "links": [
                {"source": "hour.moth", "target": "hour.velvet", "label": "allied_with", "weight": 2, "confidence": 0.7},
                {"source": "hour.moth", "target": "hour.velvet", "label": "loved | allied_with", "weight": 1, "confidence": 1.0},
                {"source": "hour.moth", "target": "hour.moth", "label": "is", "weight": 1, "confidence": 1.0},
                {"source": "hour.moth", "target": "hour.missing", "label": "knows", "weight": 1, "confidence": 1.0}
            ]
        }"##;

        let artifact: GraphArtifact = serde_json::from_str(raw).expect("valid artifact");
        let (graph, dropped) = artifact.into_graph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node(0).map(|node| node.label.as_str()), Some("Moth"));
        assert_eq!(graph.node(2).map(|node| node.kind), Some(NodeKind::Unknown));
        assert_eq!(dropped, 2);
        assert_eq!(graph.edge_count(), 1);

        let edge = &graph.edges()[0];
        assert_eq!(edge.weight, 3);
        assert_eq!(edge.relation_types, vec!["allied_with", "loved"]);
        assert_eq!(edge.confidence_avg(), 0.8);
    }
}
