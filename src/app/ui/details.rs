use eframe::egui::{self, RichText, Ui};

use crate::lore::LoreNode;
use crate::util::format_label;

use super::super::ViewModel;
use super::super::focus::Focus;

const NEIGHBOUR_ROWS: usize = 40;

struct Neighbour {
    index: usize,
    label: String,
    relation: String,
}

fn node_title(node: &LoreNode) -> String {
    format_label(&node.label, &node.id)
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let now = ui.input(|input| input.time);
        let mut focus_next = None;

        match self.selection.focus() {
            Focus::None => {
                ui.label("Select a node from the graph or the search box.");
                return;
            }
            Focus::Node(index) => self.draw_node_details(ui, index, &mut focus_next),
            Focus::Link(index) => self.draw_link_details(ui, index, &mut focus_next),
        }

        ui.add_space(8.0);
        let clear = ui.button("Clear focus").clicked();

        if clear {
            self.clear_focus();
        } else if let Some(index) = focus_next {
            self.focus_node(index, now);
        }
    }

    fn neighbours(&self, node: usize) -> Vec<Neighbour> {
        self.graph
            .incident_edges(node)
            .iter()
            .filter_map(|&edge_index| {
                let edge = self.graph.edge(edge_index)?;
                let other = edge.other_end(node);
                let other_node = self.graph.node(other)?;
                let arrow = if edge.source == node { "→" } else { "←" };
                let relation = self.glossary.chip_texts(&edge.relation_label()).join(", ");
                Some(Neighbour {
                    index: other,
                    label: node_title(other_node),
                    relation: format!("{arrow} {relation}"),
                })
            })
            .collect()
    }

    fn draw_node_details(&self, ui: &mut Ui, index: usize, focus_next: &mut Option<usize>) {
        let Some(node) = self.graph.node(index) else {
            ui.label("Focused node no longer exists in the graph.");
            return;
        };

        ui.label(RichText::new(node_title(node)).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Type: {}", node.kind.as_str()));
        ui.label(format!("Importance: {:.1}", node.importance));

        let attributes = &node.attributes;
        if let Some(description) = &attributes.description {
            ui.add_space(4.0);
            ui.label(description.as_str());
        }
        if let Some(origin) = &attributes.origin {
            ui.label(format!("Origin: {origin}"));
        }
        if !attributes.factions.is_empty() {
            ui.label(format!("Factions: {}", attributes.factions.join(", ")));
        }
        if !attributes.aliases.is_empty() {
            ui.label(format!("Aliases: {}", attributes.aliases.join(", ")));
        }

        if !attributes.mentions.is_empty() {
            ui.separator();
            let heading = format!("Mentioned in ({})", attributes.mentions.len());
            ui.label(RichText::new(heading).strong());
            egui::ScrollArea::vertical()
                .id_salt("mentions_scroll")
                .max_height(160.0)
                .show(ui, |ui| {
                    for mention in &attributes.mentions {
                        ui.label(mention.name.as_str()).on_hover_text(mention.id.as_str());
                    }
                });
        }

        ui.separator();
        let neighbours = self.neighbours(index);
        ui.label(RichText::new(format!("Connections ({})", neighbours.len())).strong());
        if neighbours.is_empty() {
            ui.label("No links touch this node.");
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("neighbours_scroll")
            .max_height(320.0)
            .show(ui, |ui| {
                for neighbour in neighbours.iter().take(NEIGHBOUR_ROWS) {
                    ui.horizontal_wrapped(|ui| {
                        if ui.link(neighbour.label.as_str()).clicked() {
                            *focus_next = Some(neighbour.index);
                        }
                        ui.small(neighbour.relation.as_str());
                    });
                }
                if neighbours.len() > NEIGHBOUR_ROWS {
                    ui.small(format!("… and {} more", neighbours.len() - NEIGHBOUR_ROWS));
                }
            });
    }

    fn draw_link_details(&self, ui: &mut Ui, index: usize, focus_next: &mut Option<usize>) {
        let Some(edge) = self.graph.edge(index) else {
            ui.label("Focused link no longer exists in the graph.");
            return;
        };
        let (Some(source), Some(target)) =
            (self.graph.node(edge.source), self.graph.node(edge.target))
        else {
            ui.label("Focused link points at a missing node.");
            return;
        };

        ui.horizontal_wrapped(|ui| {
            if ui.link(RichText::new(node_title(source)).strong()).clicked() {
                *focus_next = Some(edge.source);
            }
            ui.label("→");
            if ui.link(RichText::new(node_title(target)).strong()).clicked() {
                *focus_next = Some(edge.target);
            }
        });
        ui.add_space(6.0);

        ui.label(format!(
            "Relation: {}",
            self.glossary.chip_texts(&edge.relation_label()).join(", ")
        ));
        ui.label(format!("Mentions: {}", edge.weight));
        ui.label(format!("Confidence: {:.2}", edge.confidence_avg()));

        if let Some(reverse) = self.graph.edge_between(edge.target, edge.source)
            && let Some(reverse_edge) = self.graph.edge(reverse)
        {
            ui.small(format!(
                "Reverse link: {}",
                self.glossary.chip_texts(&reverse_edge.relation_label()).join(", ")
            ));
        }

        if !edge.descriptions.is_empty() {
            ui.separator();
            ui.label(RichText::new("Evidence").strong());
            for description in &edge.descriptions {
                ui.label(format!("• {description}"));
            }
        }
    }
}
