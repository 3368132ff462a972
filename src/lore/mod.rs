mod artifact;
mod builder;
mod collect;
#[cfg(test)]
pub(crate) mod fixtures;
mod glossary;
mod model;

pub use builder::SEED_DEFAULT_COLOR;
pub use collect::{BuildPaths, build_from_files, load_artifact, load_relation_glossary, write_artifact};
pub use glossary::RelationGlossary;
pub use model::{LoreGraph, LoreNode, NodeKind};
