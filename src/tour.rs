// tour.rs — catalog, built scenes, viewer and picker state in one place

use crate::catalog::Catalog;
use crate::picker::PickerState;
use crate::scene::{Scene, SceneRegistry};
use crate::viewer::Viewer;
use egui::Rect;

pub struct Tour {
    pub catalog: Catalog,
    pub registry: SceneRegistry,
    pub viewer: Viewer,
    pub picker: PickerState,
    selected: Option<String>,
}

impl Tour {
    /// Build every scene and activate the first one. The picker starts open
    /// on the floor of that scene.
    pub fn new(catalog: Catalog, viewport: Rect) -> Self {
        let registry = SceneRegistry::build(&catalog);
        let mut viewer = Viewer::new(&registry, viewport);

        let first = registry.first();
        if let Some(scene) = first {
            viewer.switch_to(&scene.id);
            log::info!("initial scene {} ({})", scene.id, scene.label);
        } else {
            log::warn!("catalog has no room with a panorama");
        }
        let picker = PickerState::new(first.map(|s| s.key.floor).unwrap_or(0));

        Self {
            catalog,
            registry,
            viewer,
            picker,
            selected: None,
        }
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.registry.find(self.viewer.active_id()?)
    }

    /// Label of the room last chosen through the picker or a nav marker.
    pub fn selected_label(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Activate the scene with this exact id, close the picker and remember
    /// the room label. Unknown ids change nothing.
    pub fn switch_scene(&mut self, id: &str) -> Option<&Scene> {
        let Some(scene) = self.registry.find(id) else {
            log::warn!("no scene built for {:?}, ignoring switch", id);
            return None;
        };

        self.viewer.switch_to(&scene.id);
        self.picker.open = false;
        self.selected = Some(scene.label.clone());
        log::info!("switched to {} ({})", scene.id, scene.label);
        Some(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn tour() -> Tour {
        Tour::new(
            Catalog::builtin().unwrap(),
            Rect::from_min_size(pos2(0.0, 0.0), vec2(1280.0, 720.0)),
        )
    }

    #[test]
    fn starts_on_first_built_scene_with_picker_open() {
        let tour = tour();
        assert_eq!(tour.active_scene().unwrap().id, "2-0");
        assert!(tour.picker.open);
        assert_eq!(tour.picker.floor, 2);
        assert_eq!(tour.selected_label(), None);
    }

    #[test]
    fn switching_to_bernabeu_1() {
        let mut tour = tour();
        tour.switch_scene("3-1");
        tour.picker.open = true;

        let scene = tour.switch_scene("2-0").unwrap();
        assert_eq!(scene.label, "Bernabeu 1");
        assert_eq!(tour.active_scene().unwrap().id, "2-0");
        assert_eq!(tour.selected_label(), Some("Bernabeu 1"));
        assert!(!tour.picker.open);
    }

    #[test]
    fn unbuilt_keys_are_no_ops() {
        let mut tour = tour();
        tour.switch_scene("3-2");
        for id in ["0-0", "1-3", "9-9", "2-00", "nonsense"] {
            assert!(tour.switch_scene(id).is_none());
            assert_eq!(tour.active_scene().unwrap().id, "3-2");
            assert_eq!(tour.selected_label(), Some("lokasi 3"));
        }
    }

    #[test]
    fn every_built_scene_is_reachable() {
        let mut tour = tour();
        let ids: Vec<_> = tour.registry.iter().map(|s| s.id.clone()).collect();
        for id in ids {
            tour.picker.open = true;
            assert!(tour.switch_scene(&id).is_some());
            assert_eq!(tour.viewer.active_id(), Some(id.as_str()));
            assert!(!tour.picker.open);
        }
    }

    #[test]
    fn empty_catalog_has_no_active_scene() {
        let tour = Tour::new(
            Catalog::from_json("[]").unwrap(),
            Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0)),
        );
        assert!(tour.active_scene().is_none());
        assert_eq!(tour.picker.floor, 0);
    }
}
