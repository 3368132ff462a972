use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::{Body, ForceInputs, Link, Mode};

const RESEARCH_LINK_STRENGTH: f32 = 0.3;
const GALAXY_LINK_STRENGTH: f32 = 0.01;
const GALAXY_FOCUS_LINK_STRENGTH: f32 = 0.5;

const RESEARCH_CHARGE: f32 = -120.0;
const GALAXY_CHARGE: f32 = -30.0;
const GALAXY_FOCUS_CHARGE: f32 = -100.0;
const CHARGE_MIN_DISTANCE_SQ: f32 = 1.0;

const SPIN_STRENGTH: f32 = 0.05;
const SPIN_DEAD_ZONE: f32 = 10.0;
const NOISE_AMPLITUDE: f32 = 0.3;
const NOISE_PERIOD_MS: f64 = 3000.0;

struct Gravity {
    inner: f32,
    outer: f32,
    radius: f32,
}

fn gravity(mode: Mode) -> Gravity {
    match mode {
        Mode::Galaxy => Gravity {
            inner: 0.005,
            outer: 0.02,
            radius: 300.0,
        },
        Mode::Research => Gravity {
            inner: 0.01,
            outer: 0.05,
            radius: 500.0,
        },
    }
}

pub(super) fn link_strength(inputs: &ForceInputs<'_>, edge_index: usize) -> f32 {
    match inputs.mode {
        Mode::Research => RESEARCH_LINK_STRENGTH,
        Mode::Galaxy => {
            if inputs.focus.is_active() && inputs.related_edges.contains(&edge_index) {
                GALAXY_FOCUS_LINK_STRENGTH
            } else {
                GALAXY_LINK_STRENGTH
            }
        }
    }
}

pub(super) fn charge_strength(inputs: &ForceInputs<'_>, node: usize) -> f32 {
    match inputs.mode {
        Mode::Research => RESEARCH_CHARGE,
        Mode::Galaxy => {
            if inputs.focus.node() == Some(node) {
                GALAXY_FOCUS_CHARGE
            } else {
                GALAXY_CHARGE
            }
        }
    }
}

/// Gravity plus, in drifting Galaxy mode, spin and per-body oscillation. A
/// pure function of its arguments.
pub(super) fn field_velocity(
    position: Vec2,
    phase: f64,
    mode: Mode,
    ambient_drift: bool,
    alpha: f32,
    now_ms: f64,
) -> Vec2 {
    let distance = position.length();
    let gravity = gravity(mode);
    let pull = if distance > gravity.radius {
        gravity.outer
    } else {
        gravity.inner
    };
    let mut delta = -position * pull * alpha;

    if mode == Mode::Galaxy && ambient_drift {
        if distance > SPIN_DEAD_ZONE {
            delta += vec2(-position.y, position.x) / distance * SPIN_STRENGTH * alpha;
        }

        let t = now_ms / NOISE_PERIOD_MS;
        let wobble = vec2((t + phase).sin() as f32, (t + 1.1 * phase).cos() as f32);
        delta += wobble * NOISE_AMPLITUDE * alpha;
    }

    delta
}

/// Stand-in direction for coincident bodies; flips with argument order so the
/// pair separates.
fn separation_direction(from: usize, to: usize) -> Vec2 {
    let (low, high) = if from < to { (from, to) } else { (to, from) };
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if from < to { direction } else { -direction }
}

pub(super) fn apply_links(links: &[Link], strengths: &[f32], bodies: &mut [Body], alpha: f32) {
    for (edge_index, link) in links.iter().enumerate() {
        let (Some(source), Some(target)) =
            (bodies[link.source].position, bodies[link.target].position)
        else {
            continue;
        };

        let predicted_source = source + bodies[link.source].velocity;
        let predicted_target = target + bodies[link.target].velocity;
        let mut delta = predicted_target - predicted_source;
        let mut length = delta.length();
        if length < 1e-6 {
            delta = separation_direction(link.source, link.target) * 1e-3;
            length = 1e-3;
        }

        let stretch = (length - link.distance) / length * alpha * strengths[edge_index];
        let correction = delta * stretch;
        bodies[link.target].velocity -= correction * link.bias;
        bodies[link.source].velocity += correction * (1.0 - link.bias);
    }
}

fn pair_velocity(
    point: Vec2,
    other: Vec2,
    strength: f32,
    alpha: f32,
    index: usize,
    other_index: usize,
) -> Vec2 {
    let delta = other - point;
    let mut distance_sq = delta.length_sq();
    if distance_sq < 1e-12 {
        return separation_direction(index, other_index) * strength * alpha;
    }
    if distance_sq < CHARGE_MIN_DISTANCE_SQ {
        distance_sq = (CHARGE_MIN_DISTANCE_SQ * distance_sq).sqrt();
    }
    delta * (strength * alpha / distance_sq)
}

pub(super) fn accumulate_charge(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strengths: &[f32],
    theta: f32,
    alpha: f32,
    velocity: &mut Vec2,
) {
    if node.count == 0 || node.strength == 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            *velocity += pair_velocity(
                point,
                positions[other_index],
                strengths[other_index],
                alpha,
                index,
                other_index,
            );
        }
        return;
    }

    let delta = node.center - point;
    let distance_sq = delta.length_sq().max(CHARGE_MIN_DISTANCE_SQ);
    let side = node.bounds.side_length();
    let can_approximate =
        !node.bounds.contains(point) && (side * side) / (theta * theta) < distance_sq;

    if can_approximate {
        *velocity += delta * (node.strength * alpha / distance_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge(child, index, positions, strengths, theta, alpha, velocity);
    }
}
