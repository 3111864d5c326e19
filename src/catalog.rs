// catalog.rs — floors, rooms and hotspot data

use serde::Deserialize;
use std::{fmt, path::Path, str::FromStr};

/// Tooltip text for navigation markers whose target room does not exist.
pub const UNKNOWN_LABEL: &str = "Unknown";

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scene key {0:?}, expected \"<floor>-<room>\"")]
    InvalidKey(String),
    #[error("room {from} links to {target}, which is not in the catalog")]
    UnresolvedTarget { from: SceneKey, target: String },
}

/// Position of a room (floor index, room index) inside the catalog.
///
/// The text form `"<floor>-<room>"` is what navigation markers store and what
/// the scene switcher accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneKey {
    pub floor: usize,
    pub room: usize,
}

impl SceneKey {
    pub fn new(floor: usize, room: usize) -> Self {
        Self { floor, room }
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.floor, self.room)
    }
}

impl FromStr for SceneKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidKey(s.to_string());
        let (floor, room) = s.split_once('-').ok_or_else(invalid)?;
        let floor = floor.trim().parse().map_err(|_| invalid())?;
        let room = room.trim().parse().map_err(|_| invalid())?;
        Ok(Self { floor, room })
    }
}

/// Percentage coordinates on the floor-plan image (0..100 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlanPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InfoMarker {
    pub yaw: f32,
    pub pitch: f32,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NavMarker {
    pub yaw: f32,
    pub pitch: f32,
    pub goto: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Room {
    pub loc: String,
    /// Panorama image; empty for floor-plan-only placeholders.
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "hotspot")]
    pub hotspots: Vec<InfoMarker>,
    #[serde(default, rename = "hotspotNav")]
    pub nav: Vec<NavMarker>,
    #[serde(default)]
    pub position: Option<PlanPosition>,
}

impl Room {
    pub fn has_panorama(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Floor {
    pub id: u32,
    pub name: String,
    #[serde(rename = "denahUrl")]
    pub denah_url: String,
    #[serde(rename = "ruangan")]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub floors: Vec<Floor>,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn floor(&self, index: usize) -> Option<&Floor> {
        self.floors.get(index)
    }

    pub fn room(&self, key: SceneKey) -> Option<&Room> {
        self.floors.get(key.floor)?.rooms.get(key.room)
    }

    /// Rooms in catalog order together with their keys.
    pub fn rooms(&self) -> impl Iterator<Item = (SceneKey, &Room)> {
        self.floors.iter().enumerate().flat_map(|(f, floor)| {
            floor
                .rooms
                .iter()
                .enumerate()
                .map(move |(r, room)| (SceneKey::new(f, r), room))
        })
    }

    /// Label of the room a `goto` string points at, or [`UNKNOWN_LABEL`].
    pub fn target_label(&self, goto: &str) -> &str {
        goto.parse::<SceneKey>()
            .ok()
            .and_then(|key| self.room(key))
            .map(|room| room.loc.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Every navigation marker whose target is malformed or missing.
    pub fn validate(&self) -> Vec<CatalogError> {
        let mut problems = Vec::new();
        for (key, room) in self.rooms() {
            for nav in &room.nav {
                match nav.goto.parse::<SceneKey>() {
                    Ok(target) if self.room(target).is_some() => {}
                    Ok(_) => problems.push(CatalogError::UnresolvedTarget {
                        from: key,
                        target: nav.goto.clone(),
                    }),
                    Err(e) => problems.push(e),
                }
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINKED: &str = r#"[
        { "id": 0, "name": "Ground", "denahUrl": "/plan0.png", "ruangan": [
            { "loc": "Hall", "url": "/hall.jpg", "hotspot": [],
              "hotspotNav": [
                { "yaw": 0.2, "pitch": 0.0, "goto": "0-1" },
                { "yaw": 1.0, "pitch": 0.0, "goto": "4-0" }
              ],
              "position": { "x": 10.0, "y": 20.0 } },
            { "loc": "Desk", "url": "" }
        ] }
    ]"#;

    #[test]
    fn builtin_catalog_loads_and_validates() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.floors.len(), 4);
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn first_floor_lists_nine_placeholder_rooms() {
        let catalog = Catalog::builtin().unwrap();
        let floor = catalog.floor(0).unwrap();
        assert_eq!(floor.name, "Lantai 1");
        assert_eq!(floor.rooms.len(), 9);
        assert!(floor.rooms.iter().all(|r| !r.has_panorama()));
    }

    #[test]
    fn info_marker_fields_survive_parsing() {
        let catalog = Catalog::builtin().unwrap();
        let room = catalog.room(SceneKey::new(3, 0)).unwrap();
        assert_eq!(room.loc, "lokasi 1");
        assert_eq!(
            room.hotspots,
            vec![InfoMarker {
                yaw: -0.5,
                pitch: -0.1,
                label: "Rumah Sakit Mata Makassar".to_string(),
                description: "Rumah Sakit Makassar Tallasa City".to_string(),
            }]
        );
    }

    #[test]
    fn scene_key_text_form() {
        let key: SceneKey = "2-0".parse().unwrap();
        assert_eq!(key, SceneKey::new(2, 0));
        assert_eq!(key.to_string(), "2-0");
        assert!("2".parse::<SceneKey>().is_err());
        assert!("a-1".parse::<SceneKey>().is_err());
        assert!("1-".parse::<SceneKey>().is_err());
        assert!("-1-2".parse::<SceneKey>().is_err());
    }

    #[test]
    fn target_label_falls_back_to_unknown() {
        let catalog = Catalog::from_json(LINKED).unwrap();
        assert_eq!(catalog.target_label("0-1"), "Desk");
        assert_eq!(catalog.target_label("0-7"), UNKNOWN_LABEL);
        assert_eq!(catalog.target_label("4-0"), UNKNOWN_LABEL);
        assert_eq!(catalog.target_label("garbage"), UNKNOWN_LABEL);
    }

    #[test]
    fn validate_reports_dangling_links() {
        let catalog = Catalog::from_json(LINKED).unwrap();
        let problems = catalog.validate();
        assert_eq!(problems.len(), 1);
        match &problems[0] {
            CatalogError::UnresolvedTarget { from, target } => {
                assert_eq!(*from, SceneKey::new(0, 0));
                assert_eq!(target, "4-0");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn optional_fields_default() {
        let catalog = Catalog::from_json(LINKED).unwrap();
        let desk = catalog.room(SceneKey::new(0, 1)).unwrap();
        assert!(desk.hotspots.is_empty());
        assert!(desk.nav.is_empty());
        assert_eq!(desk.position, None);
        let hall = catalog.room(SceneKey::new(0, 0)).unwrap();
        assert_eq!(hall.position, Some(PlanPosition { x: 10.0, y: 20.0 }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Catalog::from_json("{ not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
