use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::artifact::{
    ExtractionBatch, GraphArtifact, SeedSet, parse_corpus, parse_extraction, parse_seeds,
};
use super::builder::{BuildReport, build_graph};
use super::glossary::{FactionGlossary, RelationGlossary};
use super::model::LoreGraph;

#[derive(Clone, Debug, Default)]
pub struct BuildPaths {
    pub seeds: PathBuf,
    pub extraction: Vec<PathBuf>,
    pub corpus: Option<PathBuf>,
    pub faction_glossary: Option<PathBuf>,
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {what} {}", path.display()))
}

pub fn load_seeds(path: &Path) -> Result<SeedSet> {
    let raw = read_text(path, "seed entities")?;
    let seeds = parse_seeds(&raw)
        .with_context(|| format!("failed to parse seed entities in {}", path.display()))?;
    if seeds.malformed_entries > 0 {
        warn!(
            skipped = seeds.malformed_entries,
            path = %path.display(),
            "skipped unreadable seed entries"
        );
    }
    Ok(seeds)
}

pub fn load_extraction(paths: &[PathBuf]) -> Result<Vec<ExtractionBatch>> {
    let mut batches = Vec::new();
    for path in paths {
        let raw = read_text(path, "extraction output")?;
        let parsed = parse_extraction(&raw)
            .with_context(|| format!("failed to parse extraction output in {}", path.display()))?;
        batches.extend(parsed);
    }
    Ok(batches)
}

pub fn load_corpus(path: &Path) -> Result<HashMap<String, String>> {
    let raw = read_text(path, "corpus")?;
    parse_corpus(&raw).with_context(|| format!("failed to parse corpus in {}", path.display()))
}

pub fn load_faction_glossary(path: &Path) -> Result<FactionGlossary> {
    let raw = read_text(path, "faction glossary")?;
    FactionGlossary::parse(&raw)
        .with_context(|| format!("failed to parse faction glossary in {}", path.display()))
}

pub fn load_relation_glossary(path: &Path) -> Result<RelationGlossary> {
    let raw = read_text(path, "relation glossary")?;
    let glossary = RelationGlossary::parse(&raw)
        .with_context(|| format!("failed to parse relation glossary in {}", path.display()))?;
    info!(entries = glossary.len(), "relation glossary loaded");
    Ok(glossary)
}

pub fn build_from_files(paths: &BuildPaths) -> Result<(LoreGraph, BuildReport)> {
    let seeds = load_seeds(&paths.seeds)?;
    let batches = load_extraction(&paths.extraction)?;
    let evidence = match &paths.corpus {
        Some(path) => load_corpus(path)?,
        None => HashMap::new(),
    };
    let factions = match &paths.faction_glossary {
        Some(path) => load_faction_glossary(path)?,
        None => FactionGlossary::default(),
    };

    info!(
        seeds = seeds.entities.len(),
        batches = batches.len(),
        evidence = evidence.len(),
        "building knowledge graph"
    );
    Ok(build_graph(&seeds, &batches, &evidence, &factions))
}

pub fn load_artifact(path: &Path) -> Result<LoreGraph> {
    let raw = read_text(path, "graph artifact")?;
    let artifact: GraphArtifact = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse graph artifact in {}", path.display()))?;

    let (graph, dropped) = artifact.into_graph();
    if dropped > 0 {
        warn!(dropped, path = %path.display(), "dropped links with unknown endpoints or self-loops");
    }
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph artifact loaded"
    );
    Ok(graph)
}

pub fn write_artifact(path: &Path, graph: &LoreGraph) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let encoded = serde_json::to_string_pretty(&GraphArtifact::from_graph(graph))
        .context("failed to encode graph artifact")?;
    fs::write(path, encoded).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn build_write_and_reload_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let seeds = write(
            dir.path(),
            "seeds.json",
            r##"[
                {"id": "hour.moth", "name": "Moth", "type": "hour", "aliases": ["The Moth"], "factions": ["Wood"]},
                {"id": "hour.velvet", "name": "Velvet", "type": "hour", "color": "#4B0082", "factions": ["Wood"]},
                {"id": "hour.lantern", "type": "hour"},
                {"id": ["not", "a", "string"], "name": "Broken"}
            ]"##,
        );
        let first = write(
            dir.path(),
            "batch-1.json",
            r#"{"relationships": [
                {"source": "hour.moth", "target": "hour.velvet", "type": "allied_with", "confidence": 0.8, "source_item_id": "book.wood"}
            ]}"#,
        );
        let second = write(
            dir.path(),
            "batch-2.json",
            r#"[{"relationships": [
                {"source": "hour.moth", "target": "hour.velvet", "type": "allied_with", "confidence": 0.6},
                {"source": "hour.moth", "target": "hour.moth", "type": "is"}
            ]}]"#,
        );
        let corpus = write(dir.path(), "corpus.json", r#"{"items": [{"id": "book.wood", "name": "The Wood"}]}"#);
        let glossary = write(dir.path(), "factions.json", r#"{"Wood": "林地"}"#);

        let (graph, report) = build_from_files(&BuildPaths {
            seeds,
            extraction: vec![first, second],
            corpus: Some(corpus),
            faction_glossary: Some(glossary),
        })
        .expect("build succeeds");
        assert_eq!(report.dropped_self_loop, 1);
        assert_eq!(report.dropped_malformed_entry, 1);
        assert_eq!(
            graph.node_by_id("hour.lantern").map(|node| node.label.as_str()),
            Some("hour.lantern")
        );
        assert_eq!(graph.node_by_id("faction.wood").map(|node| node.label.as_str()), Some("林地"));

        let output = dir.path().join("out").join("graph.json");
        write_artifact(&output, &graph).expect("artifact written");
        let reloaded = load_artifact(&output).expect("artifact reloads");

        assert_eq!(reloaded.node_count(), graph.node_count());
        assert_eq!(reloaded.edge_count(), graph.edge_count());
        let moth = reloaded.index_of("hour.moth").expect("moth");
        let velvet = reloaded.index_of("hour.velvet").expect("velvet");
        let edge = reloaded
            .edge_between(moth, velvet)
            .and_then(|index| reloaded.edge(index))
            .expect("alliance");
        assert_eq!(edge.weight, 2);
        assert_eq!(edge.confidence_avg(), 0.7);
        assert_eq!(reloaded.resolve_alias("the moth"), Some(moth));
        assert_eq!(
            reloaded.node(moth).map(|node| node.attributes.mentions[0].name.as_str()),
            Some("The Wood")
        );
    }

    #[test]
    fn missing_files_report_their_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");

        let error = load_seeds(&missing).expect_err("missing seeds");
        assert!(format!("{error:#}").contains("absent.json"));
    }

    #[test]
    fn invalid_top_level_extraction_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "bad.json", "\"just a string\"");

        assert!(load_extraction(&[path]).is_err());
    }
}
