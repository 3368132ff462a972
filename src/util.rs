use std::collections::hash_map::DefaultHasher;
use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};

pub fn stable_phase(id: &str) -> f64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) * TAU
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn faction_id(faction: &str) -> String {
    let slug = faction
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    format!("faction.{slug}")
}

fn contains_cjk(text: &str) -> bool {
    text.chars().any(|ch| ('\u{4e00}'..='\u{9fa5}').contains(&ch))
}

/// Display form of a node label. Curated labels pass through; raw ids such
/// as `person.arthur_cousins` become `Arthur Cousins`.
pub fn format_label(label: &str, id: &str) -> String {
    if contains_cjk(label) || (!label.contains('.') && !label.contains('_') && !label.is_empty()) {
        return label.to_owned();
    }

    let text = if label.is_empty() { id } else { label };
    let last = text.rsplit('.').next().unwrap_or(text);
    let formatted = last
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if formatted.is_empty() {
        text.to_owned()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faction_ids_are_lowercase_slugs() {
        assert_eq!(faction_id("Wood"), "faction.wood");
        assert_eq!(faction_id("Secret  Histories"), "faction.secret_histories");
    }

    #[test]
    fn phase_is_stable_per_id() {
        assert_eq!(stable_phase("hour.moth"), stable_phase("hour.moth"));
        assert!((0.0..=TAU).contains(&stable_phase("hour.velvet")));
    }

    #[test]
    fn format_label_handles_ids_and_curated_names() {
        assert_eq!(format_label("person.arthur_cousins", "person.arthur_cousins"), "Arthur Cousins");
        assert_eq!(format_label("The Moth", "hour.moth"), "The Moth");
        assert_eq!(format_label("飞蛾", "hour.moth"), "飞蛾");
        assert_eq!(format_label("", "location.wood"), "Wood");
    }

    #[test]
    fn round2_rounds_half_away() {
        assert_eq!(round2(0.7), 0.7);
        assert_eq!(round2(2.0 / 3.0), 0.67);
    }
}
