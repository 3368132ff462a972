use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;
use super::super::focus::CameraTarget;
use super::super::render::Scene;

const MIN_HIT_RADIUS: f32 = 6.0;

impl ViewModel {
    pub(in crate::app) fn scene(&self, rect: Rect) -> Scene<'_> {
        Scene {
            rect,
            graph: &self.graph,
            simulation: &self.simulation,
            selection: &self.selection,
            camera: &self.camera,
            glossary: &self.glossary,
        }
    }

    fn node_at(&self, rect: Rect, pointer: Pos2) -> Option<usize> {
        self.scene(rect).node_at(pointer, MIN_HIT_RADIUS)
    }

    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        self.camera.zoom_about(rect, pointer, scroll);
    }

    pub(in crate::app) fn handle_graph_hover(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let hovered = if let Some(dragged) = self.dragging {
            Some(dragged)
        } else if response.hovered() {
            ui.input(|input| input.pointer.hover_pos())
                .and_then(|pointer| self.node_at(rect, pointer))
        } else {
            None
        };

        self.selection.set_hover(&self.graph, hovered);
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }
    }

    /// Primary drag moves the node under the press point, or pans when it
    /// started on empty canvas. Secondary and middle drags always pan.
    pub(in crate::app) fn handle_graph_drag(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin());
            self.dragging = origin.and_then(|origin| self.node_at(rect, origin));
            if let (Some(node), Some(pointer)) = (self.dragging, response.interact_pointer_pos()) {
                let world = self.camera.screen_to_world(rect, pointer);
                self.simulation.begin_drag(node, world);
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            match (self.dragging, response.interact_pointer_pos()) {
                (Some(node), Some(pointer)) => {
                    let world = self.camera.screen_to_world(rect, pointer);
                    self.simulation.drag_to(node, world);
                }
                (None, _) => self.camera.pan_by(response.drag_delta()),
                _ => {}
            }
        }

        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.camera.pan_by(response.drag_delta());
        }

        if response.drag_stopped()
            && let Some(node) = self.dragging.take()
        {
            self.simulation.end_drag(node);
        }
    }

    pub(in crate::app) fn handle_graph_click(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        now: f64,
    ) {
        if !response.clicked_by(egui::PointerButton::Primary) {
            return;
        }

        match response
            .interact_pointer_pos()
            .and_then(|pointer| self.node_at(rect, pointer))
        {
            Some(node) => self.click_node(node, now),
            None => self.clear_focus(),
        }
    }

    fn move_camera(&mut self, target: Option<CameraTarget>, now: f64) {
        if let Some(target) = target {
            self.camera.animate_to(target, now);
        }
    }

    pub(in crate::app) fn click_node(&mut self, node: usize, now: f64) {
        let target = self
            .selection
            .click_node(&self.graph, node, |index| self.simulation.position(index));
        self.move_camera(target, now);
    }

    pub(in crate::app) fn focus_node(&mut self, node: usize, now: f64) {
        let target = self
            .selection
            .focus_node(&self.graph, node, |index| self.simulation.position(index));
        self.move_camera(target, now);
    }

    pub(in crate::app) fn clear_focus(&mut self) {
        self.selection.click_background();
    }

    pub(in crate::app) fn run_search(&mut self, now: f64) {
        let hit = self
            .selection
            .search(&self.graph, &self.search, |index| self.simulation.position(index));
        match hit {
            Some(hit) => {
                self.search_miss = None;
                self.move_camera(hit.camera, now);
            }
            None if self.search.trim().is_empty() => self.search_miss = None,
            None => self.search_miss = Some(self.search.trim().to_owned()),
        }
    }
}
