// viewer.rs — camera state per scene, viewport cache and hotspot projection

use crate::scene::{SceneRegistry, ViewLimiter, ViewParams};
use egui::{pos2, Pos2, Rect};
use glam::{Mat3, Vec3};
use std::collections::HashMap;

/// Wheel notch → fov change, same feel as a 2.5° step.
const ZOOM_STEP_RAD: f32 = 2.5 * std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, Copy)]
struct SceneView {
    params: ViewParams,
    initial: ViewParams,
    limiter: ViewLimiter,
}

/// The panorama viewer the UI drives.
///
/// The viewport is cached: it only changes through [`Viewer::update_size`],
/// so a layout change is invisible to projection and rendering until the
/// owner asks for a recompute.
pub struct Viewer {
    viewport: Rect,
    views: HashMap<String, SceneView>,
    active: Option<String>,
    pub sensitivity_scale: f32,
}

impl Viewer {
    pub fn new(registry: &SceneRegistry, viewport: Rect) -> Self {
        let views = registry
            .iter()
            .map(|scene| {
                let view = SceneView {
                    params: scene.limiter.apply(
                        scene.initial_view,
                        viewport.width(),
                        viewport.height(),
                    ),
                    initial: scene.initial_view,
                    limiter: scene.limiter,
                };
                (scene.id.clone(), view)
            })
            .collect();

        Self {
            viewport,
            views,
            active: None,
            sensitivity_scale: 1.0,
        }
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Make a built scene the active one. Unknown ids leave the viewer untouched.
    pub fn switch_to(&mut self, id: &str) -> bool {
        if !self.views.contains_key(id) {
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    pub fn view(&self) -> Option<ViewParams> {
        let id = self.active.as_ref()?;
        self.views.get(id).map(|v| v.params)
    }

    /// Recompute the cached viewport and push every scene's view back through
    /// its limiter, since the fov bounds depend on the viewport size.
    pub fn update_size(&mut self, viewport: Rect) {
        self.viewport = viewport;
        let (w, h) = (viewport.width(), viewport.height());
        for view in self.views.values_mut() {
            view.params = view.limiter.apply(view.params, w, h);
        }
        log::debug!("viewer size recomputed: {:.0}x{:.0}", w, h);
    }

    pub fn reset_view(&mut self) {
        let viewport = self.viewport;
        if let Some(view) = self.active_view_mut() {
            view.params = view
                .limiter
                .apply(view.initial, viewport.width(), viewport.height());
        }
    }

    /// Grab-style pan: the panorama follows the pointer.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        let viewport = self.viewport;
        let (width, height) = (viewport.width(), viewport.height());
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let sensitivity = self.sensitivity_scale;
        if let Some(view) = self.active_view_mut() {
            let v_f = view.params.fov;
            let aspect = width / height;
            let h_f = 2.0 * ((v_f / 2.0).tan() * aspect).atan();

            let mut next = view.params;
            next.yaw -= dx * (h_f / width) * sensitivity;
            next.pitch -= dy * (v_f / height) * sensitivity;
            view.params = view.limiter.apply(next, width, height);
        }
    }

    /// Positive `scroll` zooms in.
    pub fn zoom(&mut self, scroll: f32) {
        self.update_fov(|fov| fov - scroll * ZOOM_STEP_RAD);
    }

    /// Pinch zoom; `factor` > 1 zooms in.
    pub fn pinch(&mut self, factor: f32) {
        if factor > 0.0 {
            self.update_fov(|fov| fov / factor);
        }
    }

    fn update_fov(&mut self, f: impl FnOnce(f32) -> f32) {
        let viewport = self.viewport;
        if let Some(view) = self.active_view_mut() {
            let mut next = view.params;
            next.fov = f(next.fov);
            view.params = view.limiter.apply(next, viewport.width(), viewport.height());
        }
    }

    fn active_view_mut(&mut self) -> Option<&mut SceneView> {
        let id = self.active.as_ref()?;
        self.views.get_mut(id)
    }

    /// Screen position of a (yaw, pitch) direction in the active scene, or
    /// `None` when it lies behind the camera or outside the viewport.
    pub fn project(&self, yaw: f32, pitch: f32) -> Option<Pos2> {
        let view = self.view()?;
        let pos = project(view, self.viewport, yaw, pitch)?;
        self.viewport.contains(pos).then_some(pos)
    }
}

/// World direction for a (yaw, pitch) pair: yaw 0 looks down -Z, positive yaw
/// turns right, positive pitch looks down.
pub fn direction(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        pitch.cos() * yaw.sin(),
        -pitch.sin(),
        -pitch.cos() * yaw.cos(),
    )
}

/// Rectilinear projection matching `shader_equirect.wgsl`.
pub fn project(view: ViewParams, viewport: Rect, yaw: f32, pitch: f32) -> Option<Pos2> {
    let (w, h) = (viewport.width(), viewport.height());
    if w <= 0.0 || h <= 0.0 {
        return None;
    }

    let cam = Mat3::from_rotation_x(view.pitch) * Mat3::from_rotation_y(view.yaw) * direction(yaw, pitch);
    if cam.z > -1e-4 {
        return None;
    }

    let tan_v = (view.fov / 2.0).tan();
    let tan_h = tan_v * (w / h);
    let nx = (cam.x / -cam.z) / tan_h;
    let ny = (cam.y / -cam.z) / tan_v;

    let c = viewport.center();
    Some(pos2(c.x + nx * w / 2.0, c.y - ny * h / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use egui::vec2;

    fn viewport() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(1200.0, 800.0))
    }

    fn viewer() -> Viewer {
        let registry = SceneRegistry::build(&Catalog::builtin().unwrap());
        Viewer::new(&registry, viewport())
    }

    #[test]
    fn view_centre_projects_to_viewport_centre() {
        let view = ViewParams {
            yaw: 0.3,
            pitch: 0.2,
            fov: 1.0,
        };
        let p = project(view, viewport(), 0.3, 0.2).unwrap();
        assert!((p - viewport().center()).length() < 1e-2);
    }

    #[test]
    fn positive_yaw_is_right_and_positive_pitch_is_down() {
        let view = ViewParams::default();
        let c = viewport().center();
        let right = project(view, viewport(), 0.2, 0.0).unwrap();
        assert!(right.x > c.x);
        assert!((right.y - c.y).abs() < 1e-2);
        let down = project(view, viewport(), 0.0, 0.2).unwrap();
        assert!(down.y > c.y);
    }

    #[test]
    fn points_behind_the_camera_are_hidden() {
        let view = ViewParams::default();
        assert!(project(view, viewport(), std::f32::consts::PI, 0.0).is_none());
    }

    #[test]
    fn unknown_scene_is_not_activated() {
        let mut viewer = viewer();
        assert!(viewer.switch_to("2-0"));
        assert!(!viewer.switch_to("0-0"));
        assert_eq!(viewer.active_id(), Some("2-0"));
    }

    #[test]
    fn views_are_kept_per_scene() {
        let mut viewer = viewer();
        viewer.switch_to("2-0");
        viewer.drag(-100.0, 0.0);
        let turned = viewer.view().unwrap();
        assert!(turned.yaw > 0.0);

        viewer.switch_to("2-1");
        assert_eq!(viewer.view().unwrap().yaw, 0.0);
        viewer.switch_to("2-0");
        assert_eq!(viewer.view().unwrap(), turned);
    }

    #[test]
    fn zoom_stays_within_limits() {
        let mut viewer = viewer();
        viewer.switch_to("3-0");
        viewer.zoom(-1000.0);
        let fov = viewer.view().unwrap().fov;
        assert!(crate::scene::vtoh(fov, 1.5) <= crate::scene::MAX_FOV + 1e-4);
        viewer.pinch(1000.0);
        let fov = viewer.view().unwrap().fov;
        assert!(fov >= 2.0 * (800.0f32 / 4096.0).atan() - 1e-4);
    }

    #[test]
    fn shrinking_the_viewport_reapplies_limits() {
        let mut viewer = viewer();
        viewer.switch_to("2-0");
        viewer.zoom(-1000.0);
        let before = viewer.view().unwrap().fov;
        // Ultra-wide frame: the horizontal cap tightens the vertical fov.
        viewer.update_size(Rect::from_min_size(pos2(0.0, 0.0), vec2(2000.0, 400.0)));
        assert!(viewer.view().unwrap().fov < before);
    }

    #[test]
    fn lantai_4_marker_is_visible_from_default_view() {
        let mut viewer = viewer();
        viewer.switch_to("3-0");
        let p = viewer.project(-0.5, -0.1).unwrap();
        let c = viewport().center();
        assert!(p.x < c.x);
        assert!(p.y < c.y);
    }
}
