use eframe::egui::{Align2, Color32, FontId, Sense, Ui, vec2};

use crate::util::format_label;

use super::super::ViewModel;
use super::super::render::{draw_background, draw_edges, draw_nodes};
use super::super::simulation::ForceInputs;

impl ViewModel {
    fn step_simulation(&mut self, now: f64) -> bool {
        let inputs = ForceInputs {
            mode: self.mode,
            ambient_drift: self.ambient_drift,
            focus: self.selection.focus(),
            related_edges: &self.selection.related().edges,
        };
        self.simulation.step(&inputs, now * 1000.0)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let now = ui.input(|input| input.time);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_drag(ui, rect, &response);
        self.handle_graph_hover(ui, rect, &response);
        self.handle_graph_click(rect, &response, now);

        let moving = self.step_simulation(now);
        self.camera.update(now);

        draw_background(&painter, rect, &self.camera);
        let scene = self.scene(rect);
        let drawn_edges = draw_edges(&painter, &scene);
        draw_nodes(&painter, &scene);
        self.visible_edge_count = drawn_edges;

        if let Some(index) = self.selection.hover()
            && let Some(node) = self.graph.node(index)
        {
            let panel_text = format!(
                "{}  |  {}  |  links {}",
                format_label(&node.label, &node.id),
                node.kind.as_str(),
                self.graph.incident_edges(index).len()
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if moving || self.camera.is_animating() || self.dragging.is_some() {
            ui.ctx().request_repaint();
        }
    }
}
