use eframe::egui::{Pos2, Rect, Vec2};
use tracing::warn;

use super::focus::CameraTarget;

const CENTER_TRANSITION_SECS: f64 = 1.0;
const ZOOM_TRANSITION_SECS: f64 = 2.0;
const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 12.0;

#[derive(Clone, Copy, Debug)]
struct Transition<T> {
    from: T,
    to: T,
    started_at: f64,
    duration: f64,
}

impl<T> Transition<T> {
    fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        let t = ((now - self.started_at) / self.duration).clamp(0.0, 1.0) as f32;
        if t < 0.5 {
            2.0 * t * t
        } else {
            1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
        }
    }

    fn finished(&self, now: f64) -> bool {
        now - self.started_at >= self.duration
    }
}

/// World point shown at the middle of the canvas, and the scale applied
/// around it.
#[derive(Clone, Debug)]
pub(super) struct Camera {
    center: Vec2,
    zoom: f32,
    center_transition: Option<Transition<Vec2>>,
    zoom_transition: Option<Transition<f32>>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            zoom: 1.0,
            center_transition: None,
            zoom_transition: None,
        }
    }
}

impl Camera {
    pub(super) fn zoom(&self) -> f32 {
        self.zoom
    }

    pub(super) fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.center() + (world - self.center) * self.zoom
    }

    pub(super) fn screen_to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        self.center + (screen - rect.center()) / self.zoom
    }

    pub(super) fn is_animating(&self) -> bool {
        self.center_transition.is_some() || self.zoom_transition.is_some()
    }

    pub(super) fn animate_to(&mut self, target: CameraTarget, now: f64) {
        if !target.center.x.is_finite() || !target.center.y.is_finite() {
            warn!(?target, "ignoring camera target without a finite center");
            return;
        }

        self.center_transition = Some(Transition {
            from: self.center,
            to: target.center,
            started_at: now,
            duration: CENTER_TRANSITION_SECS,
        });

        if let Some(zoom) = target.zoom {
            self.zoom_transition = Some(Transition {
                from: self.zoom,
                to: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
                started_at: now,
                duration: ZOOM_TRANSITION_SECS,
            });
        }
    }

    pub(super) fn update(&mut self, now: f64) {
        if let Some(transition) = self.center_transition {
            let t = transition.progress(now);
            self.center = transition.from + (transition.to - transition.from) * t;
            if transition.finished(now) {
                self.center = transition.to;
                self.center_transition = None;
            }
        }

        if let Some(transition) = self.zoom_transition {
            let t = transition.progress(now);
            self.zoom = transition.from + (transition.to - transition.from) * t;
            if transition.finished(now) {
                self.zoom = transition.to;
                self.zoom_transition = None;
            }
        }
    }

    /// Zooms about `pointer`, keeping the world point under it fixed.
    pub(super) fn zoom_about(&mut self, rect: Rect, pointer: Pos2, scroll: f32) {
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        self.zoom_transition = None;
        self.center_transition = None;
        let world_before = self.screen_to_world(rect, pointer);
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.center = world_before - (pointer - rect.center()) / self.zoom;
    }

    pub(super) fn pan_by(&mut self, screen_delta: Vec2) {
        self.center_transition = None;
        self.center -= screen_delta / self.zoom;
    }
}
