mod forces;
mod quadtree;

use std::collections::HashSet;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use super::focus::Focus;
use crate::lore::LoreGraph;
use crate::util::stable_phase;
use forces::{accumulate_charge, apply_links, charge_strength, field_velocity, link_strength};
use quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.9;
const LINK_DISTANCE: f32 = 30.0;
const ALPHA_MIN: f32 = 0.001;
const DEFAULT_ALPHA_DECAY: f32 = 0.0228;
const DEFAULT_VELOCITY_DECAY: f32 = 0.4;
const DRIFT_VELOCITY_DECAY: f32 = 0.6;
const COOLDOWN_TICKS: u32 = 100;
const MAX_SPEED: f32 = 40.0;
const INITIAL_RADIUS: f32 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) enum Mode {
    #[default]
    Galaxy,
    Research,
}

impl Mode {
    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Galaxy => "Galaxy",
            Self::Research => "Research",
        }
    }
}

/// Everything the force terms read, handed over fresh every tick.
pub(in crate::app) struct ForceInputs<'a> {
    pub mode: Mode,
    pub ambient_drift: bool,
    pub focus: Focus,
    pub related_edges: &'a HashSet<usize>,
}

impl ForceInputs<'_> {
    fn drifting(&self) -> bool {
        self.mode == Mode::Galaxy && self.ambient_drift
    }
}

struct Body {
    position: Option<Vec2>,
    velocity: Vec2,
    pinned: bool,
    phase: f64,
}

struct Link {
    source: usize,
    target: usize,
    distance: f32,
    bias: f32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct Regime {
    mode: Mode,
    ambient_drift: bool,
    focus: Focus,
}

/// Position and velocity for every graph node, plus the cooling schedule.
/// Indices match the graph's node and edge indices.
pub(in crate::app) struct Simulation {
    bodies: Vec<Body>,
    links: Vec<Link>,
    alpha: f32,
    alpha_decay: f32,
    velocity_decay: f32,
    ticks_since_reheat: u32,
    running: bool,
    regime: Option<Regime>,
    positions: Vec<Vec2>,
    charge_strengths: Vec<f32>,
    link_strengths: Vec<f32>,
}

impl Simulation {
    pub(in crate::app) fn new(graph: &LoreGraph) -> Self {
        let bodies = graph
            .nodes()
            .iter()
            .map(|node| Body {
                position: None,
                velocity: Vec2::ZERO,
                pinned: false,
                phase: stable_phase(&node.id),
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0usize; bodies.len()];
        for edge in graph.edges() {
            degree[edge.source] += 1;
            degree[edge.target] += 1;
        }

        let links = graph
            .edges()
            .iter()
            .map(|edge| {
                let source_degree = degree[edge.source] as f32;
                let target_degree = degree[edge.target] as f32;
                Link {
                    source: edge.source,
                    target: edge.target,
                    distance: LINK_DISTANCE,
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        Self {
            bodies,
            links,
            alpha: 1.0,
            alpha_decay: DEFAULT_ALPHA_DECAY,
            velocity_decay: DEFAULT_VELOCITY_DECAY,
            ticks_since_reheat: 0,
            running: true,
            regime: None,
            positions: Vec::new(),
            charge_strengths: Vec::new(),
            link_strengths: Vec::new(),
        }
    }

    pub(in crate::app) fn position(&self, index: usize) -> Option<Vec2> {
        self.bodies.get(index).and_then(|body| body.position)
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.running
    }

    pub(in crate::app) fn reheat(&mut self) {
        self.alpha = 1.0;
        self.ticks_since_reheat = 0;
        self.running = true;
    }

    pub(in crate::app) fn begin_drag(&mut self, index: usize, world: Vec2) {
        let Some(body) = self.bodies.get_mut(index) else {
            return;
        };
        body.pinned = true;
        body.position = Some(world);
        body.velocity = Vec2::ZERO;
        self.reheat();
    }

    pub(in crate::app) fn drag_to(&mut self, index: usize, world: Vec2) {
        if let Some(body) = self.bodies.get_mut(index)
            && body.pinned
        {
            body.position = Some(world);
        }
    }

    pub(in crate::app) fn end_drag(&mut self, index: usize) {
        let Some(body) = self.bodies.get_mut(index) else {
            return;
        };
        if body.pinned {
            body.pinned = false;
            self.reheat();
        }
    }

    fn any_pinned(&self) -> bool {
        self.bodies.iter().any(|body| body.pinned)
    }

    fn place_unplaced(&mut self) {
        let initial_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        for (index, body) in self.bodies.iter_mut().enumerate() {
            if body.position.is_some() {
                continue;
            }
            let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
            let angle = index as f32 * initial_angle;
            body.position = Some(vec2(radius * angle.cos(), radius * angle.sin()));
            body.velocity = Vec2::ZERO;
        }
    }

    fn observe(&mut self, inputs: &ForceInputs<'_>) {
        let regime = Regime {
            mode: inputs.mode,
            ambient_drift: inputs.drifting(),
            focus: inputs.focus,
        };

        if let Some(previous) = self.regime
            && previous != regime
        {
            if previous.ambient_drift && !regime.ambient_drift {
                self.alpha_decay = DEFAULT_ALPHA_DECAY;
                self.velocity_decay = DEFAULT_VELOCITY_DECAY;
            }
            self.reheat();
        }
        self.regime = Some(regime);
    }

    fn on_quiescence(&mut self, drifting: bool) {
        if drifting {
            self.alpha_decay = 0.0;
            self.velocity_decay = DRIFT_VELOCITY_DECAY;
            self.reheat();
        } else {
            self.running = false;
            debug!(alpha = self.alpha, "layout settled");
        }
    }

    /// Advances one tick. Returns whether the layout is still moving.
    pub(in crate::app) fn step(&mut self, inputs: &ForceInputs<'_>, now_ms: f64) -> bool {
        self.place_unplaced();
        self.observe(inputs);
        if !self.running || self.bodies.is_empty() {
            return false;
        }

        self.alpha -= self.alpha * self.alpha_decay;
        let alpha = self.alpha;

        self.link_strengths.clear();
        self.link_strengths
            .extend((0..self.links.len()).map(|edge_index| link_strength(inputs, edge_index)));
        apply_links(&self.links, &self.link_strengths, &mut self.bodies, alpha);

        self.positions.clear();
        self.positions.extend(
            self.bodies
                .iter()
                .map(|body| body.position.unwrap_or(Vec2::ZERO)),
        );
        self.charge_strengths.clear();
        self.charge_strengths
            .extend((0..self.bodies.len()).map(|index| charge_strength(inputs, index)));
        let members = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| body.position.is_some())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if let Some(tree) = QuadNode::build(&self.positions, &self.charge_strengths, members.clone()) {
            for &index in &members {
                let mut delta = Vec2::ZERO;
                accumulate_charge(
                    &tree,
                    index,
                    &self.positions,
                    &self.charge_strengths,
                    BARNES_HUT_THETA,
                    alpha,
                    &mut delta,
                );
                self.bodies[index].velocity += delta;
            }
        }

        let drifting = inputs.drifting();
        for body in &mut self.bodies {
            if let Some(position) = body.position {
                body.velocity +=
                    field_velocity(position, body.phase, inputs.mode, drifting, alpha, now_ms);
            }
        }

        let retained = 1.0 - self.velocity_decay;
        for body in &mut self.bodies {
            if body.pinned {
                body.velocity = Vec2::ZERO;
                continue;
            }
            let Some(position) = body.position.as_mut() else {
                continue;
            };

            let mut velocity = body.velocity * retained;
            let speed_sq = velocity.length_sq();
            if !speed_sq.is_finite() {
                velocity = Vec2::ZERO;
            } else if speed_sq > MAX_SPEED * MAX_SPEED {
                velocity *= MAX_SPEED / speed_sq.sqrt();
            }
            body.velocity = velocity;
            *position += velocity;
        }

        self.ticks_since_reheat += 1;
        // A held body keeps its neighbours live for the whole drag.
        if self.any_pinned() {
            return true;
        }
        if self.alpha < ALPHA_MIN || self.ticks_since_reheat >= COOLDOWN_TICKS {
            self.on_quiescence(drifting);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lore::fixtures;

    const FRAME_MS: f64 = 16.0;

    fn ring(size: usize) -> LoreGraph {
        let ids = (0..size).map(|index| format!("hour.h{index}")).collect::<Vec<_>>();
        let id_refs = ids.iter().map(String::as_str).collect::<Vec<_>>();
        let mut links = (0..size)
            .map(|index| (index, (index + 1) % size))
            .collect::<Vec<_>>();
        links.push((0, size / 2));
        fixtures::graph(&id_refs, &links)
    }

    fn run(
        simulation: &mut Simulation,
        inputs: &ForceInputs<'_>,
        ticks: usize,
        start_ms: f64,
    ) -> f64 {
        let mut now = start_ms;
        for _ in 0..ticks {
            simulation.step(inputs, now);
            now += FRAME_MS;
        }
        now
    }

    fn galaxy(related: &HashSet<usize>, drift: bool) -> ForceInputs<'_> {
        ForceInputs {
            mode: Mode::Galaxy,
            ambient_drift: drift,
            focus: Focus::None,
            related_edges: related,
        }
    }

    fn research(related: &HashSet<usize>) -> ForceInputs<'_> {
        ForceInputs {
            mode: Mode::Research,
            ambient_drift: false,
            focus: Focus::None,
            related_edges: related,
        }
    }

    #[test]
    fn first_step_places_every_body() {
        let graph = ring(6);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();
        assert!((0..6).all(|index| simulation.position(index).is_none()));

        simulation.step(&galaxy(&related, true), 0.0);

        let placed = (0..6)
            .filter_map(|index| simulation.position(index))
            .collect::<Vec<_>>();
        assert_eq!(placed.len(), 6);
        assert!(placed.iter().all(|position| position.x.is_finite() && position.y.is_finite()));
        assert_ne!(placed[0], placed[1]);
        assert_eq!(simulation.position(6), None);
    }

    #[test]
    fn drifting_galaxy_stays_bounded() {
        let graph = ring(12);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();

        run(&mut simulation, &galaxy(&related, true), 4000, 0.0);

        assert!(simulation.is_running());
        for index in 0..12 {
            let position = simulation.position(index).expect("placed");
            assert!(position.x.is_finite() && position.y.is_finite());
            assert!(position.length() < 1500.0, "body {index} escaped to {position:?}");
        }
    }

    #[test]
    fn research_settles_and_stays_stopped() {
        let graph = ring(8);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();
        let inputs = research(&related);

        let now = run(&mut simulation, &inputs, COOLDOWN_TICKS as usize, 0.0);
        assert!(!simulation.is_running());

        let frozen = (0..8)
            .map(|index| simulation.position(index))
            .collect::<Vec<_>>();
        assert!(!simulation.step(&inputs, now));
        assert_eq!(
            (0..8).map(|index| simulation.position(index)).collect::<Vec<_>>(),
            frozen
        );
    }

    #[test]
    fn drift_keeps_the_layout_alive_past_quiescence() {
        let graph = ring(8);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();

        run(&mut simulation, &galaxy(&related, true), 250, 0.0);

        assert!(simulation.is_running());
        assert_eq!(simulation.alpha_decay, 0.0);
        assert_eq!(simulation.velocity_decay, DRIFT_VELOCITY_DECAY);
        assert_eq!(simulation.alpha, 1.0);
    }

    #[test]
    fn disabling_drift_restores_cooling() {
        let graph = ring(8);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();
        let now = run(&mut simulation, &galaxy(&related, true), 150, 0.0);

        assert!(simulation.step(&galaxy(&related, false), now));

        assert_eq!(simulation.alpha_decay, DEFAULT_ALPHA_DECAY);
        assert_eq!(simulation.velocity_decay, DEFAULT_VELOCITY_DECAY);
        run(
            &mut simulation,
            &galaxy(&related, false),
            COOLDOWN_TICKS as usize,
            now,
        );
        assert!(!simulation.is_running());
    }

    #[test]
    fn focus_change_reheats_a_settled_layout() {
        let graph = ring(8);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::from([0]);
        let now = run(&mut simulation, &research(&related), COOLDOWN_TICKS as usize, 0.0);
        assert!(!simulation.is_running());

        let focused = ForceInputs {
            focus: Focus::Node(0),
            ..research(&related)
        };

        assert!(simulation.step(&focused, now));
    }

    #[test]
    fn identical_inputs_give_identical_layouts() {
        let graph = ring(10);
        let related = HashSet::new();
        let mut first = Simulation::new(&graph);
        let mut second = Simulation::new(&graph);

        run(&mut first, &galaxy(&related, true), 300, 1_000.0);
        run(&mut second, &galaxy(&related, true), 300, 1_000.0);

        for index in 0..10 {
            assert_eq!(first.position(index), second.position(index));
        }
    }

    #[test]
    fn dragged_bodies_are_pinned_until_released() {
        let graph = ring(6);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();
        let inputs = research(&related);
        let now = run(&mut simulation, &inputs, COOLDOWN_TICKS as usize, 0.0);
        assert!(!simulation.is_running());

        simulation.begin_drag(0, vec2(500.0, 500.0));
        assert!(simulation.is_running());
        let now = run(&mut simulation, &inputs, 10, now);
        assert_eq!(simulation.position(0), Some(vec2(500.0, 500.0)));

        simulation.drag_to(0, vec2(520.0, 500.0));
        let now = run(&mut simulation, &inputs, 3, now);
        assert_eq!(simulation.position(0), Some(vec2(520.0, 500.0)));

        simulation.end_drag(0);
        simulation.drag_to(0, vec2(0.0, 0.0));
        run(&mut simulation, &inputs, 1, now);
        let released = simulation.position(0).expect("placed");
        assert_ne!(released, vec2(520.0, 500.0));
        assert_ne!(released, vec2(0.0, 0.0));
    }

    #[test]
    fn long_drags_keep_forces_running_and_resume_on_release() {
        let graph = ring(6);
        let mut simulation = Simulation::new(&graph);
        let related = HashSet::new();
        let inputs = research(&related);
        let mut now = run(&mut simulation, &inputs, COOLDOWN_TICKS as usize, 0.0);
        assert!(!simulation.is_running());

        simulation.begin_drag(0, vec2(400.0, 0.0));
        for tick in 0..(COOLDOWN_TICKS as usize + 50) {
            simulation.drag_to(0, vec2(400.0 + tick as f32, 0.0));
            assert!(simulation.step(&inputs, now), "stopped at tick {tick}");
            now += FRAME_MS;
        }
        assert!(simulation.is_running());

        simulation.end_drag(0);
        assert!(simulation.is_running());
        let before = simulation.position(1);
        assert!(simulation.step(&inputs, now));
        assert_ne!(simulation.position(1), before);

        run(&mut simulation, &inputs, COOLDOWN_TICKS as usize, now);
        assert!(!simulation.is_running());
    }
}
