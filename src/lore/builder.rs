use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::util::faction_id;

use super::artifact::{ExtractionBatch, ProposedEntity, RawRelationship, SeedSet};
use super::glossary::FactionGlossary;
use super::model::{
    LoreEdge, LoreGraph, LoreNode, Mention, NodeAttributes, NodeKind, classify_by_prefix,
};

const BASE_IMPORTANCE: f32 = 1.0;
const FACTION_IMPORTANCE: f32 = 5.0;
const IMPORTANCE_PER_TUPLE: f32 = 0.5;
pub const SEED_DEFAULT_COLOR: &str = "#999999";
const EXTRACTED_COLOR: &str = "#666666";
const FACTION_COLOR: &str = "#E6C229";
const MEMBERSHIP_RELATION: &str = "belongs_to";

/// Diagnostics for one build. Nothing counted here stops the build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub seed_nodes: usize,
    pub faction_nodes: usize,
    pub proposed_nodes: usize,
    pub placeholder_nodes: usize,
    pub accepted_relationships: usize,
    pub dropped_missing_endpoint: usize,
    pub dropped_self_loop: usize,
    pub dropped_missing_type: usize,
    pub dropped_malformed_entry: usize,
    pub ignored_duplicate_seeds: usize,
    pub ignored_duplicate_entities: usize,
    pub clamped_confidence: usize,
}

impl BuildReport {
    pub fn dropped_total(&self) -> usize {
        self.dropped_missing_endpoint
            + self.dropped_self_loop
            + self.dropped_missing_type
            + self.dropped_malformed_entry
    }
}

struct DraftNode {
    node: LoreNode,
    mention_ids: Vec<String>,
    seen_mentions: HashSet<String>,
}

impl DraftNode {
    fn new(node: LoreNode) -> Self {
        Self {
            node,
            mention_ids: Vec::new(),
            seen_mentions: HashSet::new(),
        }
    }

    fn mention(&mut self, evidence_id: &str) {
        if self.seen_mentions.insert(evidence_id.to_owned()) {
            self.mention_ids.push(evidence_id.to_owned());
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<DraftNode>,
    index_by_id: HashMap<String, usize>,
    edges: Vec<LoreEdge>,
    edge_by_pair: HashMap<(usize, usize), usize>,
    report: BuildReport,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_node(&mut self, node: LoreNode) -> Option<usize> {
        if self.index_by_id.contains_key(&node.id) {
            return None;
        }
        let index = self.nodes.len();
        self.index_by_id.insert(node.id.clone(), index);
        self.nodes.push(DraftNode::new(node));
        Some(index)
    }

    fn ensure_placeholder(&mut self, id: &str) -> usize {
        if let Some(&index) = self.index_by_id.get(id) {
            return index;
        }

        self.report.placeholder_nodes += 1;
        debug!(id, "materializing placeholder node");
        let index = self.nodes.len();
        self.index_by_id.insert(id.to_owned(), index);
        self.nodes.push(DraftNode::new(LoreNode {
            id: id.to_owned(),
            label: id.to_owned(),
            kind: classify_by_prefix(id),
            color: EXTRACTED_COLOR.to_owned(),
            importance: BASE_IMPORTANCE,
            attributes: NodeAttributes::default(),
        }));
        index
    }

    fn upsert_edge(
        &mut self,
        source: usize,
        target: usize,
        relation_type: &str,
        description: Option<&str>,
        confidence: f64,
    ) {
        let edge_index = match self.edge_by_pair.get(&(source, target)) {
            Some(&index) => index,
            None => {
                self.edges.push(LoreEdge::new(source, target));
                let index = self.edges.len() - 1;
                self.edge_by_pair.insert((source, target), index);
                index
            }
        };

        let edge = &mut self.edges[edge_index];
        edge.add_relation_type(relation_type);
        if let Some(description) = description {
            edge.add_description(description);
        }
        edge.weight += 1;
        edge.confidence_sum += confidence;

        self.nodes[source].node.importance += IMPORTANCE_PER_TUPLE;
        self.nodes[target].node.importance += IMPORTANCE_PER_TUPLE;
    }

    /// Registers curated entities, then their faction hubs and `belongs_to`
    /// links. A repeated seed id keeps the first definition.
    pub fn add_seeds(&mut self, seeds: &SeedSet, factions: &FactionGlossary) {
        self.report.dropped_malformed_entry += seeds.malformed_entries;
        let mut inserted = Vec::with_capacity(seeds.entities.len());
        for seed in &seeds.entities {
            let id = seed.id.trim();
            if id.is_empty() {
                self.report.dropped_malformed_entry += 1;
                continue;
            }

            let node = LoreNode {
                id: id.to_owned(),
                label: if seed.name.trim().is_empty() {
                    id.to_owned()
                } else {
                    seed.name.clone()
                },
                kind: NodeKind::parse(&seed.kind),
                color: non_empty(seed.color.as_deref())
                    .unwrap_or(SEED_DEFAULT_COLOR)
                    .to_owned(),
                importance: BASE_IMPORTANCE,
                attributes: NodeAttributes {
                    aliases: seed.aliases.clone(),
                    origin: seed.origin.clone(),
                    factions: seed.factions.clone(),
                    description: seed.description.clone(),
                    mentions: Vec::new(),
                },
            };

            match self.insert_node(node) {
                Some(index) => {
                    self.report.seed_nodes += 1;
                    inserted.push(index);
                }
                None => {
                    self.report.ignored_duplicate_seeds += 1;
                    debug!(id, "ignoring duplicate seed entity");
                }
            }
        }

        for index in inserted {
            let member_label = self.nodes[index].node.label.clone();
            let member_factions = self.nodes[index].node.attributes.factions.clone();
            for faction in member_factions {
                let faction = faction.trim();
                if faction.is_empty() {
                    continue;
                }

                let hub_id = faction_id(faction);
                let hub_label = factions.label_for(faction);
                let hub_index = match self.index_by_id.get(&hub_id) {
                    Some(&existing) => existing,
                    None => {
                        self.report.faction_nodes += 1;
                        let index = self.nodes.len();
                        self.index_by_id.insert(hub_id.clone(), index);
                        self.nodes.push(DraftNode::new(LoreNode {
                            id: hub_id,
                            label: hub_label.clone(),
                            kind: NodeKind::Faction,
                            color: FACTION_COLOR.to_owned(),
                            importance: FACTION_IMPORTANCE,
                            attributes: NodeAttributes::default(),
                        }));
                        index
                    }
                };

                if hub_index == index {
                    continue;
                }
                let description = format!("{member_label} belongs to {hub_label}");
                self.upsert_edge(
                    index,
                    hub_index,
                    MEMBERSHIP_RELATION,
                    Some(&description),
                    1.0,
                );
            }
        }
    }

    fn add_proposed_entity(&mut self, entity: &ProposedEntity) {
        let Some(id) = non_empty(entity.id.as_deref()) else {
            self.report.dropped_malformed_entry += 1;
            return;
        };

        let node = LoreNode {
            id: id.to_owned(),
            label: non_empty(entity.name.as_deref()).unwrap_or(id).to_owned(),
            kind: entity
                .kind
                .as_deref()
                .map(NodeKind::parse)
                .unwrap_or_default(),
            color: EXTRACTED_COLOR.to_owned(),
            importance: BASE_IMPORTANCE,
            attributes: NodeAttributes::default(),
        };

        if self.insert_node(node).is_some() {
            self.report.proposed_nodes += 1;
        } else {
            self.report.ignored_duplicate_entities += 1;
        }
    }

    fn add_relationship(&mut self, relationship: &RawRelationship) {
        let (Some(source_id), Some(target_id)) = (
            non_empty(relationship.source.as_deref()),
            non_empty(relationship.target.as_deref()),
        ) else {
            self.report.dropped_missing_endpoint += 1;
            return;
        };
        if source_id == target_id {
            self.report.dropped_self_loop += 1;
            return;
        }
        let Some(relation_type) = non_empty(relationship.relation_type.as_deref()) else {
            self.report.dropped_missing_type += 1;
            return;
        };

        let confidence = match relationship.confidence {
            Some(value) if value.is_finite() => {
                if !(0.0..=1.0).contains(&value) {
                    self.report.clamped_confidence += 1;
                }
                value.clamp(0.0, 1.0)
            }
            _ => 1.0,
        };

        let source = self.ensure_placeholder(source_id);
        let target = self.ensure_placeholder(target_id);

        if let Some(evidence_id) = non_empty(relationship.source_item_id.as_deref()) {
            self.nodes[source].mention(evidence_id);
            self.nodes[target].mention(evidence_id);
        }

        self.upsert_edge(
            source,
            target,
            relation_type,
            relationship.description.as_deref(),
            confidence,
        );
        self.report.accepted_relationships += 1;
    }

    /// Entity proposals first (first writer wins), then relationships.
    pub fn apply_batch(&mut self, batch: &ExtractionBatch) {
        self.report.dropped_malformed_entry += batch.malformed_entries;

        for entity in &batch.new_entities {
            self.add_proposed_entity(entity);
        }
        for relationship in &batch.relationships {
            self.add_relationship(relationship);
        }
    }

    pub fn finish(self, evidence: &HashMap<String, String>) -> (LoreGraph, BuildReport) {
        let nodes = self
            .nodes
            .into_iter()
            .map(|draft| {
                let mut node = draft.node;
                node.attributes.mentions = draft
                    .mention_ids
                    .into_iter()
                    .map(|id| Mention {
                        name: evidence.get(&id).cloned().unwrap_or_else(|| id.clone()),
                        id,
                    })
                    .collect();
                node
            })
            .collect();

        let graph = LoreGraph::from_parts(nodes, self.edges);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            accepted = self.report.accepted_relationships,
            dropped = self.report.dropped_total(),
            placeholders = self.report.placeholder_nodes,
            "knowledge graph built"
        );
        (graph, self.report)
    }
}

pub fn build_graph(
    seeds: &SeedSet,
    batches: &[ExtractionBatch],
    evidence: &HashMap<String, String>,
    factions: &FactionGlossary,
) -> (LoreGraph, BuildReport) {
    let mut builder = GraphBuilder::new();
    builder.add_seeds(seeds, factions);
    for batch in batches {
        builder.apply_batch(batch);
    }
    builder.finish(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lore::artifact::SeedEntity;

    fn seed(id: &str, name: &str, factions: &[&str]) -> SeedEntity {
        SeedEntity {
            id: id.to_owned(),
            name: name.to_owned(),
            kind: "hour".to_owned(),
            aliases: Vec::new(),
            color: Some("#8B4513".to_owned()),
            origin: None,
            factions: factions.iter().map(|faction| (*faction).to_owned()).collect(),
            description: None,
        }
    }

    fn relationship(
        source: &str,
        target: &str,
        relation_type: &str,
        confidence: Option<f64>,
    ) -> RawRelationship {
        RawRelationship {
            source: Some(source.to_owned()),
            target: Some(target.to_owned()),
            relation_type: Some(relation_type.to_owned()),
            description: None,
            confidence,
            source_item_id: None,
        }
    }

    fn batch(relationships: Vec<RawRelationship>) -> ExtractionBatch {
        ExtractionBatch {
            relationships,
            ..ExtractionBatch::default()
        }
    }

    fn build(seeds: &[SeedEntity], batches: &[ExtractionBatch]) -> (LoreGraph, BuildReport) {
        build_graph(
            &SeedSet::from(seeds.to_vec()),
            batches,
            &HashMap::new(),
            &FactionGlossary::default(),
        )
    }

    fn edge_for<'a>(graph: &'a LoreGraph, source: &str, target: &str) -> Option<&'a LoreEdge> {
        let source = graph.index_of(source)?;
        let target = graph.index_of(target)?;
        graph
            .edge_between(source, target)
            .and_then(|index| graph.edge(index))
    }

    #[test]
    fn shared_faction_scenario() {
        let seeds = [
            seed("hour.moth", "Moth", &["Wood"]),
            seed("hour.velvet", "Velvet", &["Wood"]),
        ];
        let batches = [batch(vec![
            relationship("hour.moth", "hour.velvet", "allied_with", Some(0.8)),
            relationship("hour.moth", "hour.velvet", "allied_with", Some(0.6)),
        ])];

        let (graph, report) = build(&seeds, &batches);

        let factions = graph
            .nodes()
            .iter()
            .filter(|node| node.kind == NodeKind::Faction)
            .collect::<Vec<_>>();
        assert_eq!(factions.len(), 1);
        assert_eq!(factions[0].id, "faction.wood");
        assert_eq!(report.faction_nodes, 1);

        let moth_membership = edge_for(&graph, "hour.moth", "faction.wood").expect("membership");
        assert_eq!(moth_membership.relation_types, vec!["belongs_to"]);
        assert_eq!(moth_membership.descriptions, vec!["Moth belongs to Wood"]);
        assert!(edge_for(&graph, "hour.velvet", "faction.wood").is_some());

        let alliance = edge_for(&graph, "hour.moth", "hour.velvet").expect("alliance");
        assert_eq!(alliance.weight, 2);
        assert_eq!(alliance.confidence_avg(), 0.70);
        assert_eq!(alliance.relation_label(), "allied_with");
        assert_eq!(graph.edge_count(), 3);

        let moth = graph.node_by_id("hour.moth").expect("moth");
        assert_eq!(moth.importance, 1.0 + 0.5 * 3.0);
    }

    #[test]
    fn proposed_entities_keep_first_definition() {
        let first = ExtractionBatch {
            new_entities: vec![ProposedEntity {
                id: Some("person.sulochana".to_owned()),
                name: Some("Sulochana".to_owned()),
                kind: Some("person".to_owned()),
            }],
            ..ExtractionBatch::default()
        };
        let second = ExtractionBatch {
            new_entities: vec![ProposedEntity {
                id: Some("person.sulochana".to_owned()),
                name: Some("Someone Else".to_owned()),
                kind: Some("location".to_owned()),
            }],
            ..ExtractionBatch::default()
        };

        let (graph, report) = build(&[], &[first, second]);

        assert_eq!(graph.node_count(), 1);
        let node = graph.node_by_id("person.sulochana").expect("node");
        assert_eq!(node.label, "Sulochana");
        assert_eq!(node.kind, NodeKind::Person);
        assert_eq!(report.ignored_duplicate_entities, 1);
    }

    #[test]
    fn proposals_never_override_seeds() {
        let seeds = [seed("hour.moth", "Moth", &[])];
        let proposal = ExtractionBatch {
            new_entities: vec![ProposedEntity {
                id: Some("hour.moth".to_owned()),
                name: Some("moth?".to_owned()),
                kind: None,
            }],
            ..ExtractionBatch::default()
        };

        let (graph, _) = build(&seeds, &[proposal]);
        let moth = graph.node_by_id("hour.moth").expect("moth");
        assert_eq!(moth.label, "Moth");
        assert_eq!(moth.color, "#8B4513");
    }

    #[test]
    fn aggregation_is_order_independent() {
        let tuples = vec![
            relationship("hour.moth", "hour.velvet", "allied_with", Some(0.75)),
            relationship("hour.moth", "hour.velvet", "loved", Some(0.5)),
            relationship("hour.moth", "hour.velvet", "allied_with", None),
            relationship("hour.moth", "hour.velvet", "betrayed", Some(0.25)),
        ];
        let mut reversed = tuples.clone();
        reversed.reverse();
        let mut rotated = tuples.clone();
        rotated.rotate_left(2);

        let summaries = [tuples, reversed, rotated]
            .into_iter()
            .map(|order| {
                let (graph, _) = build(&[], &[batch(order)]);
                let edge = edge_for(&graph, "hour.moth", "hour.velvet").expect("edge").clone();
                let mut types = edge.relation_types.clone();
                types.sort();
                (edge.weight, edge.confidence_avg(), types)
            })
            .collect::<Vec<_>>();

        assert_eq!(summaries[0], summaries[1]);
        assert_eq!(summaries[0], summaries[2]);
        assert_eq!(summaries[0].0, 4);
        assert_eq!(summaries[0].1, 0.63);
    }

    #[test]
    fn self_loops_and_missing_fields_are_dropped() {
        let mut missing_target = relationship("hour.moth", "", "knows", None);
        missing_target.target = None;
        let batches = [batch(vec![
            relationship("hour.moth", "hour.moth", "is", None),
            relationship("hour.moth", " ", "knows", None),
            missing_target,
            relationship("hour.moth", "hour.velvet", "", None),
        ])];

        let (graph, report) = build(&[], &batches);

        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(report.dropped_self_loop, 1);
        assert_eq!(report.dropped_missing_endpoint, 2);
        assert_eq!(report.dropped_missing_type, 1);
        assert_eq!(report.dropped_total(), 4);
    }

    #[test]
    fn reverse_pairs_stay_distinct() {
        let batches = [batch(vec![
            relationship("hour.moth", "hour.velvet", "allied_with", None),
            relationship("hour.velvet", "hour.moth", "allied_with", None),
            relationship("hour.moth", "hour.velvet", "loved", None),
        ])];

        let (graph, _) = build(&[], &batches);

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(edge_for(&graph, "hour.moth", "hour.velvet").map(|e| e.weight), Some(2));
        assert_eq!(edge_for(&graph, "hour.velvet", "hour.moth").map(|e| e.weight), Some(1));
    }

    #[test]
    fn confidence_stays_within_unit_interval() {
        let batches = [batch(vec![
            relationship("a.one", "a.two", "knows", Some(80.0)),
            relationship("a.one", "a.two", "knows", Some(-3.0)),
            relationship("a.two", "a.three", "knows", Some(f64::NAN)),
        ])];

        let (graph, report) = build(&[], &batches);

        assert_eq!(report.clamped_confidence, 2);
        for edge in graph.edges() {
            let average = edge.confidence_avg();
            assert!((0.0..=1.0).contains(&average), "{average}");
        }
        assert_eq!(edge_for(&graph, "a.two", "a.three").map(|e| e.confidence_avg()), Some(1.0));
    }

    #[test]
    fn descriptions_cap_at_five_but_weight_keeps_counting() {
        let tuples = (0..7)
            .map(|index| {
                let mut tuple = relationship("hour.moth", "hour.velvet", "knows", None);
                tuple.description = Some(format!("account {index}"));
                tuple
            })
            .chain(std::iter::once({
                let mut tuple = relationship("hour.moth", "hour.velvet", "knows", None);
                tuple.description = Some("account 0".to_owned());
                tuple
            }))
            .collect();

        let (graph, _) = build(&[], &[batch(tuples)]);
        let edge = edge_for(&graph, "hour.moth", "hour.velvet").expect("edge");

        assert_eq!(edge.descriptions.len(), 5);
        assert_eq!(edge.descriptions[0], "account 0");
        assert_eq!(edge.weight, 8);
    }

    #[test]
    fn placeholders_and_mentions_are_materialized() {
        let mut tuple = relationship("location.wood", "person.unknown_guest", "visited", None);
        tuple.source_item_id = Some("book.wood_notes".to_owned());
        let mut second = relationship("location.wood", "event.intrusion", "hosted", None);
        second.source_item_id = Some("book.lost_page".to_owned());
        let mut repeat = relationship("location.wood", "event.intrusion", "hosted", None);
        repeat.source_item_id = Some("book.wood_notes".to_owned());

        let evidence = HashMap::from([("book.wood_notes".to_owned(), "Notes on the Wood".to_owned())]);
        let (graph, report) = build_graph(
            &SeedSet::default(),
            &[batch(vec![tuple, second, repeat])],
            &evidence,
            &FactionGlossary::default(),
        );

        assert_eq!(report.placeholder_nodes, 3);
        let wood = graph.node_by_id("location.wood").expect("wood");
        assert_eq!(wood.kind, NodeKind::Location);
        assert_eq!(wood.label, "location.wood");
        assert_eq!(
            wood.attributes.mentions,
            vec![
                Mention {
                    id: "book.wood_notes".to_owned(),
                    name: "Notes on the Wood".to_owned(),
                },
                Mention {
                    id: "book.lost_page".to_owned(),
                    name: "book.lost_page".to_owned(),
                },
            ]
        );
        assert_eq!(
            graph.node_by_id("event.intrusion").map(|node| node.kind),
            Some(NodeKind::Event)
        );
    }

    #[test]
    fn faction_labels_use_glossary() {
        let seeds = [seed("hour.moth", "Moth", &["Secret Histories"])];
        let glossary = FactionGlossary::from_entries([(
            "Secret Histories".to_owned(),
            "秘史".to_owned(),
        )]);

        let (graph, _) = build_graph(
            &SeedSet::from(seeds.to_vec()),
            &[],
            &HashMap::new(),
            &glossary,
        );
        let hub = graph.node_by_id("faction.secret_histories").expect("hub");

        assert_eq!(hub.label, "秘史");
        assert_eq!(hub.importance, FACTION_IMPORTANCE + IMPORTANCE_PER_TUPLE);
    }

    #[test]
    fn duplicate_seeds_keep_first_definition() {
        let seeds = [seed("hour.moth", "Moth", &[]), seed("hour.moth", "Imposter", &["Wood"])];
        let (graph, report) = build(&seeds, &[]);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(report.ignored_duplicate_seeds, 1);
        assert_eq!(graph.node_by_id("hour.moth").map(|node| node.label.as_str()), Some("Moth"));
    }
}
