use eframe::egui::{Color32, Pos2};

use crate::lore::{LoreNode, NodeKind, SEED_DEFAULT_COLOR};

pub(in crate::app) const HOUR_COLOR: Color32 = Color32::from_rgb(0xfb, 0xbf, 0x24);
pub(in crate::app) const FACTION_COLOR: Color32 = Color32::from_rgb(0xfa, 0xcc, 0x15);
pub(in crate::app) const LOCATION_COLOR: Color32 = Color32::from_rgb(0x22, 0xd3, 0xee);
pub(in crate::app) const BOOK_COLOR: Color32 = Color32::from_rgb(0xa7, 0x8b, 0xfa);
pub(in crate::app) const EVENT_COLOR: Color32 = Color32::from_rgb(0xf8, 0x71, 0x71);
pub(in crate::app) const PERSON_COLOR: Color32 = Color32::from_rgb(0x94, 0xa3, 0xb8);
pub(in crate::app) const DEFAULT_COLOR: Color32 = Color32::from_rgb(0x64, 0x74, 0x8b);
pub(in crate::app) const SELECTION_COLOR: Color32 = Color32::from_rgb(0xf4, 0x72, 0xb6);
pub(in crate::app) const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(0x38, 0xbd, 0xf8);

const MIN_RADIUS: f32 = 2.0;
const MAX_RADIUS: f32 = 10.0;
const FALLBACK_RADIUS: f32 = 4.0;
const EMPHASIS_SCALE: f32 = 1.5;
pub(in crate::app) const HALO_SCALE: f32 = 2.5;
pub(in crate::app) const FACTION_SHAPE_SCALE: f32 = 1.2;
const LABEL_ZOOM_THRESHOLD: f32 = 2.5;
const DIMMED_OPACITY: f32 = 0.1;
const CHIP_START: f32 = 0.35;
const CHIP_END: f32 = 0.65;
const CHIP_COLLAPSE_DISTANCE: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum NodeShape {
    Circle,
    Diamond,
    Triangle,
    Square,
    Hexagon,
}

pub(in crate::app) fn shape_for(kind: NodeKind) -> NodeShape {
    match kind {
        NodeKind::Faction => NodeShape::Diamond,
        NodeKind::Location => NodeShape::Triangle,
        NodeKind::Book => NodeShape::Square,
        NodeKind::Event => NodeShape::Hexagon,
        _ => NodeShape::Circle,
    }
}

/// How a node relates to the current selection, hover and focus.
#[derive(Clone, Copy, Debug, Default)]
pub(in crate::app) struct NodeEmphasis {
    pub selected: bool,
    pub hovered: bool,
    pub related: bool,
    pub focus_active: bool,
}

impl NodeEmphasis {
    fn enlarged(self) -> bool {
        self.selected || self.hovered
    }
}

/// World-space radius.
pub(in crate::app) fn node_radius(importance: f32, emphasis: NodeEmphasis) -> f32 {
    let base = if importance > 0.0 && importance.is_finite() {
        importance.clamp(MIN_RADIUS, MAX_RADIUS)
    } else {
        FALLBACK_RADIUS
    };
    if emphasis.enlarged() {
        base * EMPHASIS_SCALE
    } else {
        base
    }
}

pub(in crate::app) fn has_halo(kind: NodeKind, emphasis: NodeEmphasis) -> bool {
    kind.is_hub() || emphasis.enlarged()
}

pub(in crate::app) fn label_visible(kind: NodeKind, emphasis: NodeEmphasis, zoom: f32) -> bool {
    if emphasis.enlarged() {
        return true;
    }
    if emphasis.focus_active {
        return emphasis.related;
    }
    kind.is_hub() || zoom > LABEL_ZOOM_THRESHOLD
}

pub(in crate::app) fn node_opacity(emphasis: NodeEmphasis) -> f32 {
    if emphasis.focus_active && !emphasis.selected && !emphasis.related {
        DIMMED_OPACITY
    } else {
        1.0
    }
}

/// Accepts `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`.
pub(in crate::app) fn parse_hex(text: &str) -> Option<Color32> {
    Color32::from_hex(text.trim()).ok()
}

fn is_seed_default(color: &str) -> bool {
    let color = color.trim();
    color.eq_ignore_ascii_case(SEED_DEFAULT_COLOR) || color.eq_ignore_ascii_case("#999")
}

/// Hours keep their curated color; everything else follows the palette.
pub(in crate::app) fn node_color(node: &LoreNode) -> Color32 {
    if node.kind == NodeKind::Hour
        && !is_seed_default(&node.color)
        && let Some(color) = parse_hex(&node.color)
    {
        return color;
    }

    match node.kind {
        NodeKind::Hour => HOUR_COLOR,
        NodeKind::Faction => FACTION_COLOR,
        NodeKind::Location => LOCATION_COLOR,
        NodeKind::Book => BOOK_COLOR,
        NodeKind::Event => EVENT_COLOR,
        NodeKind::Person => PERSON_COLOR,
        NodeKind::Unknown => DEFAULT_COLOR,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct EdgeStyle {
    pub alpha: f32,
    pub width: f32,
    pub show_chips: bool,
}

/// Related edges carry chips under a focus; hovered edges always do.
pub(in crate::app) fn edge_style(
    focus_active: bool,
    related: bool,
    hover_highlighted: bool,
) -> EdgeStyle {
    let (alpha, width) = match (focus_active, related, hover_highlighted) {
        (true, true, _) => (0.4, 1.5),
        (true, false, _) => (0.02, 0.2),
        (false, _, true) => (0.6, 1.5),
        (false, _, false) => (0.1, 0.5),
    };
    EdgeStyle {
        alpha,
        width,
        show_chips: (focus_active && related) || hover_highlighted,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct Chip {
    pub position: Pos2,
    pub text: String,
}

/// Places relation chips between two screen points. Short edges get a single
/// centered chip with the first text.
pub(in crate::app) fn chip_layout(texts: &[String], start: Pos2, end: Pos2) -> Vec<Chip> {
    let Some(first) = texts.first() else {
        return Vec::new();
    };

    let delta = end - start;
    if delta.length() < CHIP_COLLAPSE_DISTANCE {
        return vec![Chip {
            position: start + delta * 0.5,
            text: first.clone(),
        }];
    }

    let step = if texts.len() > 1 {
        (CHIP_END - CHIP_START) / (texts.len() - 1) as f32
    } else {
        0.0
    };
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let t = if texts.len() > 1 {
                CHIP_START + index as f32 * step
            } else {
                0.5
            };
            Chip {
                position: start + delta * t,
                text: text.clone(),
            }
        })
        .collect()
}
