use eframe::egui::Vec2;
use tracing::debug;

use crate::lore::LoreGraph;

mod related;

use self::related::{RelatedSet, collect_neighborhood, collect_related};

const FOCUS_ZOOM: f32 = 4.0;
const LINK_ZOOM_DISTANCE: f32 = 400.0;
const LINK_ZOOM_MIN: f32 = 1.0;
const LINK_ZOOM_MAX: f32 = 6.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) enum Focus {
    #[default]
    None,
    Node(usize),
    Link(usize),
}

impl Focus {
    pub(in crate::app) fn is_active(self) -> bool {
        self != Self::None
    }

    pub(in crate::app) fn node(self) -> Option<usize> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// Where the camera should move after a focus change. `zoom: None` keeps the
/// current zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct CameraTarget {
    pub center: Vec2,
    pub zoom: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SearchHit {
    pub node: usize,
    pub camera: Option<CameraTarget>,
}

pub(in crate::app) fn link_zoom(length: f32) -> f32 {
    (LINK_ZOOM_DISTANCE / length.max(1.0)).clamp(LINK_ZOOM_MIN, LINK_ZOOM_MAX)
}

#[derive(Default)]
pub(in crate::app) struct SelectionState {
    focus: Focus,
    related: RelatedSet,
    hover: Option<usize>,
    hover_related: RelatedSet,
}

impl SelectionState {
    pub(in crate::app) fn focus(&self) -> Focus {
        self.focus
    }

    pub(in crate::app) fn related(&self) -> &RelatedSet {
        &self.related
    }

    pub(in crate::app) fn hover(&self) -> Option<usize> {
        self.hover
    }

    pub(in crate::app) fn hover_related(&self) -> &RelatedSet {
        &self.hover_related
    }

    fn set_focus(&mut self, graph: &LoreGraph, focus: Focus) {
        if self.focus != focus {
            debug!(from = ?self.focus, to = ?focus, "focus changed");
        }
        self.focus = focus;
        self.related = collect_related(graph, focus);
    }

    /// Focuses `node` and frames it at the standard zoom.
    pub(in crate::app) fn focus_node(
        &mut self,
        graph: &LoreGraph,
        node: usize,
        position_of: impl Fn(usize) -> Option<Vec2>,
    ) -> Option<CameraTarget> {
        self.set_focus(graph, Focus::Node(node));
        position_of(node).map(|center| CameraTarget {
            center,
            zoom: Some(FOCUS_ZOOM),
        })
    }

    pub(in crate::app) fn click_node(
        &mut self,
        graph: &LoreGraph,
        node: usize,
        position_of: impl Fn(usize) -> Option<Vec2>,
    ) -> Option<CameraTarget> {
        if graph.node(node).is_none() {
            return None;
        }

        if let Focus::Node(current) = self.focus {
            if current == node {
                return position_of(node).map(|center| CameraTarget { center, zoom: None });
            }

            if let Some(edge_index) = graph.connecting_edge(current, node) {
                self.set_focus(graph, Focus::Link(edge_index));
                let (Some(from), Some(to)) = (position_of(current), position_of(node)) else {
                    return None;
                };
                return Some(CameraTarget {
                    center: (from + to) * 0.5,
                    zoom: Some(link_zoom((to - from).length())),
                });
            }
        }

        self.focus_node(graph, node, position_of)
    }

    pub(in crate::app) fn click_background(&mut self) {
        if self.focus.is_active() {
            debug!(from = ?self.focus, "focus cleared");
        }
        self.focus = Focus::None;
        self.related = RelatedSet::default();
    }

    pub(in crate::app) fn set_hover(&mut self, graph: &LoreGraph, hover: Option<usize>) {
        if self.hover == hover {
            return;
        }
        self.hover = hover;
        self.hover_related = match hover {
            Some(node) => collect_neighborhood(graph, node),
            None => RelatedSet::default(),
        };
    }

    /// Case-insensitive substring match on label or id, first node in graph
    /// order wins. Falls back to an exact alias lookup.
    pub(in crate::app) fn search(
        &mut self,
        graph: &LoreGraph,
        term: &str,
        position_of: impl Fn(usize) -> Option<Vec2>,
    ) -> Option<SearchHit> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }

        let needle = term.to_lowercase();
        let node = graph
            .nodes()
            .iter()
            .position(|node| {
                node.label.to_lowercase().contains(&needle)
                    || node.id.to_lowercase().contains(&needle)
            })
            .or_else(|| graph.resolve_alias(term))?;

        let camera = self.focus_node(graph, node, position_of);
        Some(SearchHit { node, camera })
    }
}
