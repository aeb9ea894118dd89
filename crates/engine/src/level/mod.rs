mod metadata;
mod tmx;
mod types;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

pub use metadata::{
    load_metadata, LevelMetadata, LevelSettings, DEFAULT_HAZARD_LAYER, DEFAULT_SCENERY_LAYER,
};
pub use types::{LevelData, LevelErrorCode, LevelLoadError, SourceLocation, SpawnSource};

pub fn level_map_path(levels_dir: &Path, name: &str) -> PathBuf {
    levels_dir.join(format!("{name}.tmx"))
}

pub fn level_metadata_path(levels_dir: &Path, name: &str) -> PathBuf {
    levels_dir.join(format!("{name}.level.json"))
}

/// Reads `<name>.tmx` plus its optional `<name>.level.json` sidecar.
pub fn load_level(levels_dir: &Path, name: &str) -> Result<LevelData, LevelLoadError> {
    let map_path = level_map_path(levels_dir, name);
    let raw = fs::read_to_string(&map_path).map_err(|error| LevelLoadError {
        code: LevelErrorCode::ReadFile,
        message: format!("failed to read level map: {error}"),
        file_path: map_path.clone(),
        location: None,
    })?;
    let metadata = load_metadata(&level_metadata_path(levels_dir, name));
    parse_level(name, &map_path, &raw, &metadata)
}

pub fn parse_level(
    name: &str,
    map_path: &Path,
    raw: &str,
    metadata: &LevelMetadata,
) -> Result<LevelData, LevelLoadError> {
    let parsed = tmx::parse_tmx(
        map_path,
        raw,
        &tmx::LayerNames {
            hazards: metadata.hazard_layer(),
            scenery: metadata.scenery_layer(),
        },
    )?;
    let settings = metadata.resolve(&parsed.tilemap);

    let level = LevelData {
        name: name.to_string(),
        tilemap: parsed.tilemap,
        polygons: parsed.polygons,
        scenery: parsed.scenery,
        spawn: parsed.spawn,
        spawn_source: parsed.spawn_source,
        settings,
    };
    info!(
        level = %level.name,
        width = level.tilemap.width(),
        height = level.tilemap.height(),
        polygons = level.polygons.len(),
        collidable_polygons = level.collidable_polygon_count(),
        scenery = level.scenery.len(),
        spawn_x = level.spawn.x,
        spawn_y = level.spawn.y,
        "level_loaded"
    );
    Ok(level)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::app::Vec2;
    use crate::occlusion::{OcclusionRule, SceneryCategory};

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map orientation="orthogonal" width="3" height="3" tilewidth="16" tileheight="16">
 <layer id="1" name="ground" width="3" height="3">
  <data encoding="csv">
2,2,2,
2,1,2,
2,2,2
</data>
 </layer>
 <objectgroup id="2" name="walls">
  <object id="1" name="crate" x="16" y="16" width="16" height="16">
   <properties><property name="collides" type="bool" value="true"/></properties>
  </object>
 </objectgroup>
 <objectgroup id="3" name="scenery">
  <object id="2" name="spawn" x="24" y="24"/>
  <object id="4" name="pine" type="tree" x="0" y="0" width="16" height="32"/>
 </objectgroup>
</map>"#;

    #[test]
    fn load_level_applies_sidecar_layer_names_and_settings() {
        let temp = TempDir::new().expect("temp");
        fs::write(level_map_path(temp.path(), "yard"), MAP).expect("map");
        fs::write(
            level_metadata_path(temp.path(), "yard"),
            r#"{ "blocking_tile": 2, "hazard_layer": "walls",
                 "categories": { "tree": { "rule": "generic" } } }"#,
        )
        .expect("sidecar");

        let level = load_level(temp.path(), "yard").expect("level");
        assert_eq!(level.name, "yard");
        assert_eq!(level.polygons.len(), 1);
        assert_eq!(level.collidable_polygon_count(), 1);
        assert_eq!(level.scenery.len(), 1);
        assert_eq!(level.spawn, Vec2::new(24.0, 24.0));
        assert_eq!(level.settings.blocking_tile, 2);
        assert_eq!(level.settings.collision_resolution, 16.0);
        assert_eq!(
            level.settings.occlusion_table().rule_for(SceneryCategory::Tree),
            OcclusionRule::Generic
        );
    }

    #[test]
    fn load_level_without_sidecar_uses_default_layers() {
        let temp = TempDir::new().expect("temp");
        fs::write(level_map_path(temp.path(), "yard"), MAP).expect("map");

        let level = load_level(temp.path(), "yard").expect("level");
        assert!(level.polygons.is_empty());
        assert_eq!(level.settings.blocking_tile, 0);
    }

    #[test]
    fn missing_map_is_a_read_error() {
        let temp = TempDir::new().expect("temp");
        let err = load_level(temp.path(), "absent").expect_err("err");
        assert_eq!(err.code, LevelErrorCode::ReadFile);
        assert!(err.to_string().contains("absent.tmx"));
    }
}
