// scene.rs — scenes built from the catalog and the registry that owns them

use crate::catalog::{Catalog, SceneKey};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Level width every scene's equirectangular geometry is declared with.
pub const GEOMETRY_WIDTH: u32 = 4096;
/// Field-of-view cap of the traditional limiter, in radians (100°).
pub const MAX_FOV: f32 = 100.0 * PI / 180.0;

/// Camera parameters of one scene. Angles in radians, pitch positive looks down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view.
    pub fov: f32,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            fov: FRAC_PI_4,
        }
    }
}

/// Vertical fov from a horizontal one for a given aspect (width / height).
pub fn htov(hfov: f32, aspect: f32) -> f32 {
    2.0 * ((hfov / 2.0).tan() / aspect).atan()
}

/// Horizontal fov from a vertical one for a given aspect (width / height).
pub fn vtoh(vfov: f32, aspect: f32) -> f32 {
    2.0 * ((vfov / 2.0).tan() * aspect).atan()
}

/// Rectilinear view limiter.
///
/// `traditional` combines a resolution limit (`max_resolution` is read as a
/// cube-face width: never more than one texel per screen pixel at the view
/// centre), caps on the vertical and horizontal field of view,
/// and a pitch range of ±90°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLimiter {
    pub max_resolution: u32,
    pub max_vfov: f32,
    pub max_hfov: f32,
}

impl ViewLimiter {
    pub fn traditional(max_resolution: u32, max_vfov: f32) -> Self {
        Self {
            max_resolution,
            max_vfov,
            max_hfov: max_vfov,
        }
    }

    /// Clamp `params` for a viewport of `width` × `height` pixels.
    pub fn apply(&self, params: ViewParams, width: f32, height: f32) -> ViewParams {
        let mut out = params;

        let mut max_v = self.max_vfov;
        let mut min_v = 0.0;
        if width > 0.0 && height > 0.0 {
            let aspect = width / height;
            max_v = max_v.min(htov(self.max_hfov, aspect));
            min_v = 2.0 * (height / self.max_resolution as f32).atan();
        }
        // On huge viewports the resolution floor can exceed the caps; the caps win.
        out.fov = out.fov.max(min_v).min(max_v);

        out.pitch = out.pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
        out.yaw = wrap_angle(out.yaw);
        out
    }
}

/// Wrap an angle into [-π, π).
pub fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(2.0 * PI) - PI
}

/// Equirectangular geometry with a single resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquirectGeometry {
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HotspotKind {
    Info { label: String, description: String },
    Nav { target: String, target_label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub yaw: f32,
    pub pitch: f32,
    pub kind: HotspotKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Text form of `key`; the switcher matches on this.
    pub id: String,
    pub key: SceneKey,
    pub label: String,
    pub source: String,
    pub geometry: EquirectGeometry,
    pub initial_view: ViewParams,
    pub limiter: ViewLimiter,
    pub hotspots: Vec<Hotspot>,
}

/// Built scenes in catalog order.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: Vec<Scene>,
}

impl SceneRegistry {
    /// Build one scene for every room that has a panorama.
    pub fn build(catalog: &Catalog) -> Self {
        let mut scenes = Vec::new();

        for (key, room) in catalog.rooms() {
            if !room.has_panorama() {
                continue;
            }

            let mut hotspots = Vec::with_capacity(room.hotspots.len() + room.nav.len());
            hotspots.extend(room.hotspots.iter().map(|spot| Hotspot {
                yaw: spot.yaw,
                pitch: spot.pitch,
                kind: HotspotKind::Info {
                    label: spot.label.clone(),
                    description: spot.description.clone(),
                },
            }));
            hotspots.extend(room.nav.iter().map(|nav| Hotspot {
                yaw: nav.yaw,
                pitch: nav.pitch,
                kind: HotspotKind::Nav {
                    target: nav.goto.clone(),
                    target_label: catalog.target_label(&nav.goto).to_string(),
                },
            }));

            scenes.push(Scene {
                id: key.to_string(),
                key,
                label: room.loc.clone(),
                source: room.url.clone(),
                geometry: EquirectGeometry {
                    width: GEOMETRY_WIDTH,
                },
                initial_view: ViewParams::default(),
                limiter: ViewLimiter::traditional(GEOMETRY_WIDTH, MAX_FOV),
                hotspots,
            });
        }

        log::info!("built {} scenes from {} floors", scenes.len(), catalog.floors.len());
        Self { scenes }
    }

    pub fn find(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn first(&self) -> Option<&Scene> {
        self.scenes.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn one_scene_per_room_with_panorama() {
        let catalog = Catalog::builtin().unwrap();
        let registry = SceneRegistry::build(&catalog);

        let expected: Vec<_> = catalog
            .rooms()
            .filter(|(_, room)| room.has_panorama())
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(registry.len(), expected.len());
        for id in &expected {
            assert_eq!(registry.iter().filter(|s| &s.id == id).count(), 1);
            assert!(registry.find(id).is_some());
        }
        assert_eq!(registry.first().unwrap().id, "2-0");
    }

    #[test]
    fn placeholder_rooms_get_no_scene() {
        let catalog = Catalog::builtin().unwrap();
        let registry = SceneRegistry::build(&catalog);
        for (key, room) in catalog.rooms() {
            if !room.has_panorama() {
                assert!(registry.find(&key.to_string()).is_none());
            }
        }
    }

    #[test]
    fn lantai_4_info_marker_is_attached() {
        let registry = SceneRegistry::build(&Catalog::builtin().unwrap());
        let scene = registry.find("3-0").unwrap();
        assert_eq!(scene.label, "lokasi 1");
        assert_eq!(scene.hotspots.len(), 1);
        let spot = &scene.hotspots[0];
        assert_eq!(spot.yaw, -0.5);
        assert_eq!(spot.pitch, -0.1);
        match &spot.kind {
            HotspotKind::Info { label, .. } => assert_eq!(label, "Rumah Sakit Mata Makassar"),
            other => panic!("expected info marker, got {other:?}"),
        }
    }

    #[test]
    fn nav_labels_resolve_against_catalog() {
        let catalog = Catalog::from_json(
            r#"[{ "id": 0, "name": "A", "denahUrl": "", "ruangan": [
                { "loc": "One", "url": "/1.jpg", "hotspotNav": [
                    { "yaw": 0.0, "pitch": 0.0, "goto": "0-1" },
                    { "yaw": 0.5, "pitch": 0.0, "goto": "0-9" }
                ] },
                { "loc": "Two", "url": "/2.jpg" }
            ] }]"#,
        )
        .unwrap();
        let registry = SceneRegistry::build(&catalog);
        let labels: Vec<_> = registry
            .find("0-0")
            .unwrap()
            .hotspots
            .iter()
            .filter_map(|h| match &h.kind {
                HotspotKind::Nav { target_label, .. } => Some(target_label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["Two", "Unknown"]);
    }

    #[test]
    fn limiter_caps_fov_at_100_degrees() {
        let limiter = ViewLimiter::traditional(GEOMETRY_WIDTH, MAX_FOV);
        let wide = ViewParams {
            fov: 3.0,
            ..Default::default()
        };
        // Square viewport: both caps coincide.
        let out = limiter.apply(wide, 800.0, 800.0);
        assert!(approx(out.fov, MAX_FOV));
        // Wide viewport: the horizontal cap is the tighter one.
        let out = limiter.apply(wide, 1600.0, 800.0);
        assert!(approx(vtoh(out.fov, 2.0), MAX_FOV));
    }

    #[test]
    fn limiter_respects_texture_resolution() {
        let limiter = ViewLimiter::traditional(GEOMETRY_WIDTH, MAX_FOV);
        let narrow = ViewParams {
            fov: 0.001,
            ..Default::default()
        };
        let out = limiter.apply(narrow, 1024.0, 768.0);
        let expected = 2.0 * (768.0f32 / 4096.0).atan();
        assert!(approx(out.fov, expected));
    }

    #[test]
    fn limiter_clamps_pitch_and_wraps_yaw() {
        let limiter = ViewLimiter::traditional(GEOMETRY_WIDTH, MAX_FOV);
        let params = ViewParams {
            yaw: 3.0 * PI,
            pitch: 2.0,
            fov: 1.0,
        };
        let out = limiter.apply(params, 800.0, 600.0);
        assert!(approx(out.pitch, FRAC_PI_2));
        assert!(approx(out.yaw.abs(), PI));
    }

    #[test]
    fn fov_conversions_are_inverse() {
        let v = 0.9;
        assert!(approx(htov(vtoh(v, 1.7), 1.7), v));
    }
}
