use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_6, TAU};

use eframe::egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind, Vec2, pos2, vec2,
};

use crate::lore::{LoreGraph, RelationGlossary};
use crate::util::format_label;

use super::camera::Camera;
use super::focus::SelectionState;
use super::simulation::Simulation;

pub(in crate::app) mod style;

use self::style::{
    EdgeStyle, FACTION_SHAPE_SCALE, HALO_SCALE, HIGHLIGHT_COLOR, NodeEmphasis, NodeShape,
    SELECTION_COLOR, chip_layout, edge_style, has_halo, label_visible, node_color, node_opacity,
    node_radius, shape_for,
};

const EDGE_RGB: (u8, u8, u8) = (200, 230, 255);
const LABEL_FONT_SIZE: f32 = 12.0;
const CHIP_FONT_SIZE: f32 = 10.0;
const LABEL_GAP: f32 = 4.0;

/// Everything one frame paints from. Borrowed, never mutated.
pub(in crate::app) struct Scene<'a> {
    pub rect: Rect,
    pub graph: &'a LoreGraph,
    pub simulation: &'a Simulation,
    pub selection: &'a SelectionState,
    pub camera: &'a Camera,
    pub glossary: &'a RelationGlossary,
}

impl Scene<'_> {
    fn screen_position(&self, node: usize) -> Option<Pos2> {
        self.simulation
            .position(node)
            .map(|world| self.camera.world_to_screen(self.rect, world))
    }

    fn emphasis(&self, node: usize) -> NodeEmphasis {
        let focus = self.selection.focus();
        NodeEmphasis {
            selected: focus.node() == Some(node),
            hovered: self.selection.hover() == Some(node),
            related: self.selection.related().nodes.contains(&node),
            focus_active: focus.is_active(),
        }
    }

    /// Screen-space radius the node is drawn with.
    fn screen_radius(&self, node: usize) -> f32 {
        let Some(lore_node) = self.graph.node(node) else {
            return 0.0;
        };
        let mut radius = node_radius(lore_node.importance, self.emphasis(node));
        if shape_for(lore_node.kind) == NodeShape::Diamond {
            radius *= FACTION_SHAPE_SCALE;
        }
        radius * self.camera.zoom()
    }

    /// Nearest placed node whose drawn disc contains `pointer`.
    pub(in crate::app) fn node_at(&self, pointer: Pos2, min_radius: f32) -> Option<usize> {
        (0..self.graph.node_count())
            .filter_map(|index| {
                let position = self.screen_position(index)?;
                let distance = position.distance(pointer);
                (distance <= self.screen_radius(index).max(min_radius)).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}

pub(in crate::app) fn draw_background(painter: &Painter, rect: Rect, camera: &Camera) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(9, 12, 20));

    let zoom = camera.zoom();
    let step = (80.0 * zoom.clamp(0.6, 1.8)).max(24.0);
    let origin = camera.world_to_screen(rect, Vec2::ZERO);
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 90, 40));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

pub(in crate::app) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Cheap bounding-box test; edges that merely cross a corner are still drawn.
pub(in crate::app) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

fn edge_color(style: EdgeStyle) -> Color32 {
    let (r, g, b) = EDGE_RGB;
    Color32::from_rgba_unmultiplied(r, g, b, (style.alpha * 255.0).round() as u8)
}

pub(in crate::app) fn draw_edges(painter: &Painter, scene: &Scene<'_>) -> usize {
    let focus_active = scene.selection.focus().is_active();
    let related = &scene.selection.related().edges;
    let hover_related = &scene.selection.hover_related().edges;
    let mut chips = Vec::new();
    let mut drawn = 0usize;

    for (edge_index, edge) in scene.graph.edges().iter().enumerate() {
        let (Some(start), Some(end)) = (
            scene.screen_position(edge.source),
            scene.screen_position(edge.target),
        ) else {
            continue;
        };
        if !edge_visible(scene.rect, start, end, 2.0) {
            continue;
        }

        let style = edge_style(
            focus_active,
            related.contains(&edge_index),
            hover_related.contains(&edge_index),
        );
        painter.line_segment([start, end], Stroke::new(style.width, edge_color(style)));
        drawn += 1;

        if style.show_chips {
            let texts = scene.glossary.chip_texts(&edge.relation_label());
            chips.extend(chip_layout(&texts, start, end));
        }
    }

    // After every line, never under one.
    for chip in chips {
        draw_chip(painter, chip.position, &chip.text);
    }
    drawn
}

fn draw_chip(painter: &Painter, position: Pos2, text: &str) {
    let galley = painter.layout_no_wrap(
        text.to_owned(),
        FontId::proportional(CHIP_FONT_SIZE),
        Color32::from_gray(235),
    );
    let size = galley.size() + vec2(8.0, 4.0);
    let chip_rect = Rect::from_center_size(position, size);
    painter.rect_filled(chip_rect, 3.0, Color32::from_rgba_unmultiplied(15, 23, 42, 220));
    painter.rect_stroke(
        chip_rect,
        3.0,
        Stroke::new(0.5, Color32::from_rgba_unmultiplied(200, 230, 255, 90)),
        StrokeKind::Inside,
    );
    painter.galley(chip_rect.min + vec2(4.0, 2.0), galley, Color32::from_gray(235));
}

fn regular_polygon(center: Pos2, radius: f32, sides: usize, rotation: f32) -> Vec<Pos2> {
    (0..sides)
        .map(|side| {
            let angle = rotation + side as f32 * TAU / sides as f32;
            center + vec2(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

fn shape_points(shape: NodeShape, center: Pos2, radius: f32) -> Vec<Pos2> {
    match shape {
        NodeShape::Circle => Vec::new(),
        NodeShape::Diamond => regular_polygon(center, radius, 4, -FRAC_PI_2),
        NodeShape::Triangle => regular_polygon(center, radius, 3, -FRAC_PI_2),
        NodeShape::Square => {
            let half = radius * FRAC_1_SQRT_2;
            vec![
                center + vec2(-half, -half),
                center + vec2(half, -half),
                center + vec2(half, half),
                center + vec2(-half, half),
            ]
        }
        NodeShape::Hexagon => regular_polygon(center, radius, 6, FRAC_PI_6),
    }
}

pub(in crate::app) fn paint_shape(
    painter: &Painter,
    shape: NodeShape,
    center: Pos2,
    radius: f32,
    fill: Color32,
    stroke: Stroke,
) {
    if shape == NodeShape::Circle {
        painter.circle_filled(center, radius, fill);
        painter.circle_stroke(center, radius, stroke);
    } else {
        painter.add(Shape::convex_polygon(shape_points(shape, center, radius), fill, stroke));
    }
}

fn node_stroke(emphasis: NodeEmphasis, opacity: f32) -> Stroke {
    if emphasis.selected {
        Stroke::new(2.0, SELECTION_COLOR)
    } else if emphasis.hovered || (emphasis.focus_active && emphasis.related) {
        Stroke::new(1.5, HIGHLIGHT_COLOR)
    } else {
        Stroke::new(0.5, Color32::WHITE.gamma_multiply(0.8 * opacity))
    }
}

pub(in crate::app) fn draw_nodes(painter: &Painter, scene: &Scene<'_>) {
    let zoom = scene.camera.zoom();
    let mut labels = Vec::new();

    for (index, node) in scene.graph.nodes().iter().enumerate() {
        let Some(center) = scene.screen_position(index) else {
            continue;
        };
        let emphasis = scene.emphasis(index);
        let radius = scene.screen_radius(index);
        let halo = has_halo(node.kind, emphasis);
        let reach = if halo { radius * HALO_SCALE } else { radius };
        if !circle_visible(scene.rect, center, reach) {
            continue;
        }

        let opacity = node_opacity(emphasis);
        let color = node_color(node);

        if halo {
            let halo_color = if emphasis.selected {
                SELECTION_COLOR.gamma_multiply(0.2)
            } else {
                color.gamma_multiply(0.15 * opacity)
            };
            painter.circle_filled(center, radius * HALO_SCALE, halo_color);
            painter.circle_filled(center, radius * (HALO_SCALE + 1.0) * 0.5, halo_color);
        }

        paint_shape(
            painter,
            shape_for(node.kind),
            center,
            radius,
            color.gamma_multiply(opacity),
            node_stroke(emphasis, opacity),
        );

        if label_visible(node.kind, emphasis, zoom) {
            labels.push((
                center + vec2(0.0, radius + LABEL_GAP),
                format_label(&node.label, &node.id),
                opacity,
            ));
        }
    }

    for (position, text, opacity) in labels {
        painter.text(
            position,
            Align2::CENTER_TOP,
            text,
            FontId::proportional(LABEL_FONT_SIZE),
            Color32::from_gray(238).gamma_multiply(opacity),
        );
    }
}
