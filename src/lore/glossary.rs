use std::collections::BTreeMap;

use anyhow::Result;

/// Display names for relation types, keyed by the upper snake form
/// (`ALLIED_WITH`).
#[derive(Clone, Debug, Default)]
pub struct RelationGlossary {
    entries: BTreeMap<String, String>,
}

fn relation_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

impl RelationGlossary {
    pub fn parse(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (relation_key(&key), value))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Exact key first, then the first known key contained in the relation
    /// (`WAS_LOVED_BY` picks up `LOVED`), else the raw text.
    pub fn translate(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }

        let key = relation_key(raw);
        if let Some(label) = self.entries.get(&key) {
            return label.clone();
        }

        self.entries
            .iter()
            .find(|(known, _)| key.contains(known.as_str()))
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| raw.to_owned())
    }

    /// Splits an aggregated edge label and translates each part.
    pub fn chip_texts(&self, label: &str) -> Vec<String> {
        label
            .split([',', '|'])
            .map(|part| self.translate(part))
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Display names for faction hubs, keyed by the faction name as seeds spell it.
#[derive(Clone, Debug, Default)]
pub struct FactionGlossary {
    entries: BTreeMap<String, String>,
}

impl FactionGlossary {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self {
            entries: serde_json::from_str(raw)?,
        })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn label_for(&self, faction: &str) -> String {
        self.entries
            .get(faction)
            .cloned()
            .unwrap_or_else(|| faction.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glossary() -> RelationGlossary {
        RelationGlossary::from_entries([
            ("ALLIED_WITH".to_owned(), "结盟".to_owned()),
            ("loved".to_owned(), "爱慕".to_owned()),
        ])
    }

    #[test]
    fn translate_matches_exact_then_contained_keys() {
        let glossary = glossary();

        assert_eq!(glossary.translate("allied with"), "结盟");
        assert_eq!(glossary.translate("was_loved_by"), "爱慕");
        assert_eq!(glossary.translate("betrayed"), "betrayed");
        assert_eq!(glossary.translate("  "), "");
    }

    #[test]
    fn chip_texts_split_on_separators() {
        let glossary = glossary();

        assert_eq!(
            glossary.chip_texts("allied_with, loved | betrayed,"),
            vec!["结盟", "爱慕", "betrayed"]
        );
    }

    #[test]
    fn faction_labels_fall_back_to_name() {
        let glossary = FactionGlossary::parse(r#"{"Wood": "林地"}"#).expect("valid glossary");

        assert_eq!(glossary.label_for("Wood"), "林地");
        assert_eq!(glossary.label_for("Moth"), "Moth");
    }
}
