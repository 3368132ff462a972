use eframe::egui::{self, Align, Context, Layout};

use super::super::camera::Camera;
use super::super::focus::SelectionState;
use super::super::simulation::{Mode, Simulation};
use super::super::{LoadedGraph, ViewModel, ViewerOptions};
use super::SuggestionCache;

impl ViewModel {
    pub(in crate::app) fn new(loaded: LoadedGraph, options: &ViewerOptions) -> Self {
        let LoadedGraph { graph, glossary } = loaded;
        let mode = if options.research {
            Mode::Research
        } else {
            Mode::Galaxy
        };

        Self {
            simulation: Simulation::new(&graph),
            graph,
            glossary,
            selection: SelectionState::default(),
            camera: Camera::default(),
            mode,
            ambient_drift: mode == Mode::Galaxy && !options.no_drift,
            search: String::new(),
            search_miss: None,
            suggestions: SuggestionCache::default(),
            dragging: None,
            visible_edge_count: 0,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("lore-atlas");
                    ui.separator();
                    ui.label(format!("nodes: {}", self.graph.node_count()));
                    ui.label(format!("links: {}", self.graph.edge_count()));
                    ui.label(format!("mode: {}", self.mode.label()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Reheat layout").clicked() {
                        self.simulation.reheat();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status = if self.simulation.is_running() {
                            "layout: moving"
                        } else {
                            "layout: settled"
                        };
                        ui.label(status);
                        ui.label(format!("drawn links: {}", self.visible_edge_count));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading lore graph...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }
}
