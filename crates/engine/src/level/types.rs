use std::fmt;
use std::path::PathBuf;

use crate::app::{Tilemap, Vec2};
use crate::collision::Polygon;
use crate::occlusion::SceneryObject;

use super::metadata::LevelSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnsupportedOrientation,
    MissingAttribute,
    InvalidValue,
    MissingTileLayer,
    UnsupportedEncoding,
    TileCountMismatch,
}

#[derive(Debug, Clone)]
pub struct LevelLoadError {
    pub code: LevelErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for LevelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for LevelLoadError {}

/// Where the actor spawn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSource {
    Object,
    MapCenter,
}

/// Normalized level contents, ready to be installed into a scene world.
#[derive(Debug, Clone)]
pub struct LevelData {
    pub name: String,
    pub tilemap: Tilemap,
    pub polygons: Vec<Polygon>,
    pub scenery: Vec<SceneryObject>,
    pub spawn: Vec2,
    pub spawn_source: SpawnSource,
    pub settings: LevelSettings,
}

impl LevelData {
    pub fn collidable_polygon_count(&self) -> usize {
        self.polygons.iter().filter(|polygon| polygon.collidable).count()
    }
}
