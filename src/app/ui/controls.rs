use eframe::egui::{Color32, Key, RichText, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::lore::{LoreGraph, NodeKind};
use crate::util::format_label;

use super::super::ViewModel;
use super::super::render::paint_shape;
use super::super::render::style::{
    BOOK_COLOR, DEFAULT_COLOR, EVENT_COLOR, FACTION_COLOR, HOUR_COLOR, LOCATION_COLOR,
    PERSON_COLOR, shape_for,
};
use super::super::simulation::Mode;

const MAX_SUGGESTIONS: usize = 8;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Best fuzzy matches over label, id and aliases; ties keep graph order.
fn search_suggestions(graph: &LoreGraph, query: &str, limit: usize) -> Vec<(usize, String)> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = graph
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let score = std::iter::once(node.label.as_str())
                .chain(std::iter::once(node.id.as_str()))
                .chain(node.attributes.aliases.iter().map(String::as_str))
                .filter_map(|text| fuzzy_match_score(&matcher, text, query))
                .max()?;
            Some((score, index, format_label(&node.label, &node.id)))
        })
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, index, label)| (index, label))
        .collect()
}

/// Suggestions for the last query seen, recomputed only when it changes.
#[derive(Debug, Default)]
pub(in crate::app) struct SuggestionCache {
    query: String,
    entries: Vec<(usize, String)>,
}

impl SuggestionCache {
    fn refresh(&mut self, graph: &LoreGraph, query: &str) -> &[(usize, String)] {
        if self.query != query {
            self.entries = search_suggestions(graph, query, MAX_SUGGESTIONS);
            self.query.clear();
            self.query.push_str(query);
        }
        &self.entries
    }
}

const LEGEND: [(NodeKind, Color32); 7] = [
    (NodeKind::Hour, HOUR_COLOR),
    (NodeKind::Faction, FACTION_COLOR),
    (NodeKind::Location, LOCATION_COLOR),
    (NodeKind::Book, BOOK_COLOR),
    (NodeKind::Event, EVENT_COLOR),
    (NodeKind::Person, PERSON_COLOR),
    (NodeKind::Unknown, DEFAULT_COLOR),
];

impl ViewModel {
    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.ambient_drift = mode == Mode::Galaxy;
    }

    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        let now = ui.input(|input| input.time);

        let mut research = self.mode == Mode::Research;
        if ui
            .checkbox(&mut research, "Research mode")
            .on_hover_text("Stiff springs and strong repulsion for a settled, readable layout.")
            .changed()
        {
            self.set_mode(if research {
                Mode::Research
            } else {
                Mode::Galaxy
            });
        }

        ui.add_enabled_ui(self.mode == Mode::Galaxy, |ui| {
            ui.checkbox(&mut self.ambient_drift, "Ambient drift")
                .on_hover_text("Keep the galaxy slowly turning once the layout has settled.");
        });

        ui.separator();

        ui.label("Search (name, id or alias)")
            .on_hover_text("Press Enter to focus the first node whose name or id contains it.");
        let search_response = ui.text_edit_singleline(&mut self.search);
        let submitted =
            search_response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
        if search_response.changed() {
            self.search_miss = None;
        }

        ui.horizontal(|ui| {
            if ui.button("Find").clicked() || submitted {
                self.run_search(now);
            }
            if ui.button("Clear").clicked() {
                self.search.clear();
                self.search_miss = None;
            }
        });

        if let Some(miss) = &self.search_miss {
            ui.colored_label(
                Color32::from_rgb(248, 113, 113),
                format!("No node matches \"{miss}\"."),
            );
        }

        let suggestions = self.suggestions.refresh(&self.graph, &self.search);
        let mut picked = None;
        for (index, label) in suggestions {
            if ui.link(label.as_str()).clicked() {
                picked = Some(*index);
            }
        }
        if let Some(index) = picked {
            self.search_miss = None;
            self.focus_node(index, now);
        }

        ui.separator();
        ui.label(RichText::new("Legend").strong());
        for (kind, color) in LEGEND {
            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(vec2(14.0, 14.0), Sense::hover());
                let shape = shape_for(kind);
                paint_shape(ui.painter(), shape, swatch.center(), 5.0, color, Stroke::NONE);
                ui.label(kind.as_str());
            });
        }

        ui.separator();
        ui.small("Click a node to focus it, then click a neighbour to focus the link between them.");
        ui.small("Drag nodes to pin them while held. Drag the background to pan, scroll to zoom.");
    }
}
