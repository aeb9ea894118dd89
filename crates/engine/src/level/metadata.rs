use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::app::Tilemap;
use crate::occlusion::{OcclusionConfig, OcclusionRule, OcclusionTable, SceneryCategory};

pub const DEFAULT_HAZARD_LAYER: &str = "hazards";
pub const DEFAULT_SCENERY_LAYER: &str = "scenery";

/// Optional `<level>.level.json` next to the map. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelMetadata {
    #[serde(default)]
    pub blocking_tile: Option<u32>,
    #[serde(default)]
    pub collision_resolution: Option<f32>,
    #[serde(default)]
    pub depth_band_height: Option<f32>,
    #[serde(default)]
    pub hazard_layer: Option<String>,
    #[serde(default)]
    pub scenery_layer: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<SceneryCategory, OcclusionRule>,
}

impl LevelMetadata {
    pub fn hazard_layer(&self) -> &str {
        self.hazard_layer.as_deref().unwrap_or(DEFAULT_HAZARD_LAYER)
    }

    pub fn scenery_layer(&self) -> &str {
        self.scenery_layer.as_deref().unwrap_or(DEFAULT_SCENERY_LAYER)
    }

    /// Fills unset or invalid values from the tile size of `tilemap`.
    pub fn resolve(&self, tilemap: &Tilemap) -> LevelSettings {
        let tile_width = tilemap.tile_width() as f32;
        let tile_height = tilemap.tile_height() as f32;
        LevelSettings {
            blocking_tile: self.blocking_tile.unwrap_or(0),
            collision_resolution: positive_or(
                "collision_resolution",
                self.collision_resolution,
                tile_width,
            ),
            depth_band_height: positive_or(
                "depth_band_height",
                self.depth_band_height,
                tile_height,
            ),
            category_rules: self.categories.clone(),
        }
    }
}

fn positive_or(field: &'static str, value: Option<f32>, fallback: f32) -> f32 {
    match value {
        None => fallback,
        Some(value) if value.is_finite() && value > 0.0 => value,
        Some(value) => {
            warn!(field, value, fallback, "level_metadata_value_invalid");
            fallback
        }
    }
}

/// Metadata after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSettings {
    pub blocking_tile: u32,
    pub collision_resolution: f32,
    pub depth_band_height: f32,
    pub category_rules: BTreeMap<SceneryCategory, OcclusionRule>,
}

impl LevelSettings {
    pub fn occlusion_table(&self) -> OcclusionTable {
        OcclusionTable::new(
            OcclusionConfig {
                band_height: self.depth_band_height,
                ..OcclusionConfig::default()
            },
            &self.category_rules,
        )
    }
}

/// A missing sidecar is normal; an unreadable or malformed one is logged and ignored.
pub fn load_metadata(path: &Path) -> LevelMetadata {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return LevelMetadata::default();
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "level_metadata_unreadable");
            return LevelMetadata::default();
        }
    };
    match serde_json::from_str::<LevelMetadata>(&raw) {
        Ok(metadata) => {
            info!(
                path = %path.display(),
                category_overrides = metadata.categories.len(),
                "level_metadata_loaded"
            );
            metadata
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "level_metadata_malformed");
            LevelMetadata::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn tilemap() -> Tilemap {
        Tilemap::new(2, 2, 16, 8, vec![0; 4]).expect("tilemap")
    }

    #[test]
    fn missing_sidecar_yields_defaults() {
        let temp = TempDir::new().expect("temp");
        let metadata = load_metadata(&temp.path().join("nope.level.json"));
        assert_eq!(metadata, LevelMetadata::default());
        assert_eq!(metadata.hazard_layer(), DEFAULT_HAZARD_LAYER);

        let settings = metadata.resolve(&tilemap());
        assert_eq!(settings.blocking_tile, 0);
        assert_eq!(settings.collision_resolution, 16.0);
        assert_eq!(settings.depth_band_height, 8.0);
    }

    #[test]
    fn sidecar_overrides_fields_and_categories() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("yard.level.json");
        fs::write(
            &path,
            r#"{
                "blocking_tile": 3,
                "collision_resolution": 8,
                "hazard_layer": "walls",
                "categories": {
                    "bush": { "rule": "split", "split_fraction": 0.5, "reduced_alpha": 0.7 }
                }
            }"#,
        )
        .expect("write");

        let metadata = load_metadata(&path);
        assert_eq!(metadata.hazard_layer(), "walls");
        assert_eq!(metadata.scenery_layer(), DEFAULT_SCENERY_LAYER);
        let settings = metadata.resolve(&tilemap());
        assert_eq!(settings.blocking_tile, 3);
        assert_eq!(settings.collision_resolution, 8.0);
        assert_eq!(
            settings.occlusion_table().rule_for(SceneryCategory::Bush),
            OcclusionRule::Split {
                split_fraction: 0.5,
                reduced_alpha: 0.7
            }
        );
    }

    #[test]
    fn malformed_sidecar_falls_back_to_defaults() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("bad.level.json");
        fs::write(&path, r#"{ "blocking_tile": "three" "#).expect("write");
        assert_eq!(load_metadata(&path), LevelMetadata::default());

        fs::write(&path, r#"{ "categories": { "rock": { "rule": "generic" } } }"#).expect("write");
        assert_eq!(load_metadata(&path), LevelMetadata::default());
    }

    #[test]
    fn non_positive_values_fall_back_to_tile_size() {
        let metadata = LevelMetadata {
            collision_resolution: Some(0.0),
            depth_band_height: Some(f32::INFINITY),
            ..LevelMetadata::default()
        };
        let settings = metadata.resolve(&tilemap());
        assert_eq!(settings.collision_resolution, 16.0);
        assert_eq!(settings.depth_band_height, 8.0);
    }
}
