//! Static map configuration and the collision geometry built from it

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::geometry::Aabb;

/// Default arena half-extent used when a map does not override it
pub const DEFAULT_ARENA_HALF_EXTENT: f32 = 49.0;

/// Height of the ground plane
pub const GROUND_HEIGHT: f32 = 0.0;

/// Box volume as authored in map files: centre position and full size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeDef {
    pub position: [f32; 3],
    pub size: [f32; 3],
}

impl VolumeDef {
    /// Author a volume from its corner bounds
    pub fn from_bounds(min: [f32; 3], max: [f32; 3]) -> Self {
        let aabb = Aabb::new(Vec3::from(min), Vec3::from(max));
        Self {
            position: aabb.center().to_array(),
            size: aabb.size().to_array(),
        }
    }

    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_size(Vec3::from(self.position), Vec3::from(self.size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetDef {
    pub position: [f32; 3],
}

/// A named map layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<VolumeDef>,
    #[serde(default)]
    pub walls: Vec<VolumeDef>,
    #[serde(default)]
    pub targets: Vec<TargetDef>,
    #[serde(default = "default_half_extent")]
    pub arena_half_extent: f32,
}

fn default_half_extent() -> f32 {
    DEFAULT_ARENA_HALF_EXTENT
}

/// Map loading errors
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid map file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Map has non-positive arena half-extent: {0}")]
    InvalidBounds(f32),
}

impl MapConfig {
    /// Built-in map by identifier. Unknown ids fall back to map 1.
    pub fn builtin(map_id: u32) -> Self {
        match map_id {
            1 => steve(),
            2 => bob(),
            other => {
                warn!(map_id = other, "Unknown map id, falling back to map 1");
                steve()
            }
        }
    }

    /// Load a map from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let map = Self::from_json(&text)?;
        info!(
            map = %map.name,
            path = %path.as_ref().display(),
            platforms = map.platforms.len(),
            "Loaded map file"
        );
        Ok(map)
    }

    pub fn from_json(text: &str) -> Result<Self, MapError> {
        let map: Self = serde_json::from_str(text)?;
        if !(map.arena_half_extent > 0.0) {
            return Err(MapError::InvalidBounds(map.arena_half_extent));
        }
        Ok(map)
    }
}

/// Immutable collision and hit-scan geometry for a session
#[derive(Debug, Clone, PartialEq)]
pub struct StaticGeometry {
    /// Walkable volumes, in map definition order
    pub platforms: Vec<Aabb>,
    pub walls: Vec<Aabb>,
    /// Shootable target boxes, index matches the map's target list
    pub targets: Vec<Aabb>,
    pub arena_half_extent: f32,
    pub ground_height: f32,
}

/// Size of the box used to hit-test a target marker
pub const TARGET_SIZE: Vec3 = Vec3::new(1.0, 1.0, 0.2);

impl StaticGeometry {
    pub fn from_map(map: &MapConfig) -> Self {
        Self {
            platforms: map.platforms.iter().map(VolumeDef::to_aabb).collect(),
            walls: map.walls.iter().map(VolumeDef::to_aabb).collect(),
            targets: map
                .targets
                .iter()
                .map(|t| Aabb::from_center_size(Vec3::from(t.position), TARGET_SIZE))
                .collect(),
            arena_half_extent: map.arena_half_extent,
            ground_height: GROUND_HEIGHT,
        }
    }

    /// Flat arena with no platforms, walls or targets
    pub fn empty() -> Self {
        Self {
            platforms: Vec::new(),
            walls: Vec::new(),
            targets: Vec::new(),
            arena_half_extent: DEFAULT_ARENA_HALF_EXTENT,
            ground_height: GROUND_HEIGHT,
        }
    }
}

fn perimeter_walls(half: f32, height: f32) -> Vec<VolumeDef> {
    let span = half * 2.0 + 2.0;
    vec![
        VolumeDef { position: [0.0, height / 2.0, -half - 1.0], size: [span, height, 1.0] },
        VolumeDef { position: [0.0, height / 2.0, half + 1.0], size: [span, height, 1.0] },
        VolumeDef { position: [-half - 1.0, height / 2.0, 0.0], size: [1.0, height, span] },
        VolumeDef { position: [half + 1.0, height / 2.0, 0.0], size: [1.0, height, span] },
    ]
}

/// Map 1: staggered platform course north of spawn
fn steve() -> MapConfig {
    MapConfig {
        name: "steve".to_string(),
        platforms: vec![
            VolumeDef::from_bounds([-7.0, 1.5, -12.0], [-3.0, 2.0, -8.0]),
            VolumeDef::from_bounds([3.0, 2.0, -17.0], [7.0, 2.5, -13.0]),
            VolumeDef::from_bounds([-10.0, 3.0, -22.0], [-6.0, 3.5, -18.0]),
            VolumeDef::from_bounds([6.0, 2.0, -27.0], [10.0, 2.5, -23.0]),
            VolumeDef::from_bounds([-2.0, 2.5, -32.0], [2.0, 3.0, -28.0]),
            VolumeDef::from_bounds([-3.0, 1.75, -14.0], [-1.0, 2.05, -10.0]),
            VolumeDef::from_bounds([1.0, 2.0, -19.0], [3.0, 2.3, -15.0]),
            VolumeDef::from_bounds([-5.0, 2.25, -24.0], [-3.0, 2.55, -20.0]),
            VolumeDef::from_bounds([3.0, 2.25, -29.0], [5.0, 2.55, -25.0]),
        ],
        walls: perimeter_walls(DEFAULT_ARENA_HALF_EXTENT, 5.0),
        targets: vec![
            TargetDef { position: [0.0, 2.0, -40.0] },
            TargetDef { position: [-15.0, 2.0, -30.0] },
            TargetDef { position: [15.0, 2.0, -30.0] },
        ],
        arena_half_extent: DEFAULT_ARENA_HALF_EXTENT,
    }
}

/// Map 2: open yard with cover walls and two towers
fn bob() -> MapConfig {
    let mut walls = perimeter_walls(DEFAULT_ARENA_HALF_EXTENT, 5.0);
    walls.extend([
        VolumeDef { position: [-10.0, 1.5, 0.0], size: [1.0, 3.0, 8.0] },
        VolumeDef { position: [10.0, 1.5, 0.0], size: [1.0, 3.0, 8.0] },
        VolumeDef { position: [0.0, 1.0, 15.0], size: [12.0, 2.0, 1.0] },
    ]);

    MapConfig {
        name: "bob".to_string(),
        platforms: vec![
            VolumeDef::from_bounds([-24.0, 1.5, -24.0], [-18.0, 2.0, -18.0]),
            VolumeDef::from_bounds([18.0, 1.5, 18.0], [24.0, 2.0, 24.0]),
            VolumeDef::from_bounds([-2.0, 0.5, -6.0], [2.0, 1.0, -2.0]),
        ],
        walls,
        targets: vec![
            TargetDef { position: [0.0, 2.0, -45.0] },
            TargetDef { position: [30.0, 2.0, 0.0] },
        ],
        arena_half_extent: DEFAULT_ARENA_HALF_EXTENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_map_one_keeps_platform_order() {
        let map = MapConfig::builtin(1);
        assert_eq!(map.name, "steve");
        assert_eq!(map.platforms.len(), 9);

        let geometry = StaticGeometry::from_map(&map);
        assert_eq!(geometry.platforms[0].min, Vec3::new(-7.0, 1.5, -12.0));
        assert_eq!(geometry.platforms[0].max, Vec3::new(-3.0, 2.0, -8.0));
        assert_eq!(geometry.targets.len(), 3);
    }

    #[test]
    fn unknown_map_id_falls_back_to_map_one() {
        assert_eq!(MapConfig::builtin(99), MapConfig::builtin(1));
        assert_eq!(MapConfig::builtin(2).name, "bob");
    }

    #[test]
    fn parses_map_json_with_defaults() {
        let map = MapConfig::from_json(
            r#"{
                "name": "tiny",
                "platforms": [{ "position": [0, 1, -5], "size": [2, 0.5, 2] }],
                "targets": [{ "position": [0, 2, -10] }]
            }"#,
        )
        .unwrap();

        assert_eq!(map.name, "tiny");
        assert!(map.walls.is_empty());
        assert_eq!(map.arena_half_extent, DEFAULT_ARENA_HALF_EXTENT);

        let geometry = StaticGeometry::from_map(&map);
        assert_eq!(geometry.platforms[0].max, Vec3::new(1.0, 1.25, -4.0));
    }

    #[test]
    fn rejects_bad_map_json() {
        assert!(matches!(MapConfig::from_json("{"), Err(MapError::Parse(_))));
        assert!(matches!(
            MapConfig::from_json(r#"{ "name": "x", "arena_half_extent": 0 }"#),
            Err(MapError::InvalidBounds(_))
        ));
    }
}
