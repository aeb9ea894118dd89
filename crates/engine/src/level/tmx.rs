use std::path::Path;

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::app::{Rect, Tilemap, TilemapError, Vec2};
use crate::collision::Polygon;
use crate::occlusion::{SceneryCategory, SceneryObject};

use super::types::{LevelErrorCode, LevelLoadError, SourceLocation, SpawnSource};

/// Tiled stores flip and rotation flags in the top four gid bits.
const GID_FLAG_MASK: u32 = 0x0FFF_FFFF;
const SPAWN_OBJECT_NAME: &str = "spawn";

#[derive(Debug, Clone)]
pub(crate) struct ParsedMap {
    pub(crate) tilemap: Tilemap,
    pub(crate) polygons: Vec<Polygon>,
    pub(crate) scenery: Vec<SceneryObject>,
    pub(crate) spawn: Vec2,
    pub(crate) spawn_source: SpawnSource,
}

pub(crate) struct LayerNames<'a> {
    pub(crate) hazards: &'a str,
    pub(crate) scenery: &'a str,
}

pub(crate) fn parse_tmx(
    file_path: &Path,
    raw: &str,
    layers: &LayerNames<'_>,
) -> Result<ParsedMap, LevelLoadError> {
    let doc = Document::parse(raw).map_err(|error| LevelLoadError {
        code: LevelErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = Ctx {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(ctx.error_at(
            LevelErrorCode::InvalidRoot,
            "root element must be <map>".to_string(),
            root,
        ));
    }
    if let Some(orientation) = root.attribute("orientation") {
        if orientation != "orthogonal" {
            return Err(ctx.error_at(
                LevelErrorCode::UnsupportedOrientation,
                format!("only orthogonal maps are supported, got '{orientation}'"),
                root,
            ));
        }
    }

    let width = ctx.required_u32(root, "width")?;
    let height = ctx.required_u32(root, "height")?;
    let tile_width = ctx.required_u32(root, "tilewidth")?;
    let tile_height = ctx.required_u32(root, "tileheight")?;

    let layer = root
        .children()
        .find(|node| node.has_tag_name("layer"))
        .ok_or_else(|| {
            ctx.error_at(
                LevelErrorCode::MissingTileLayer,
                "map has no <layer> element".to_string(),
                root,
            )
        })?;
    let tiles = ctx.parse_tile_data(layer)?;
    let tilemap = Tilemap::new(width, height, tile_width, tile_height, tiles).map_err(|error| {
        let code = match error {
            TilemapError::TileCountMismatch { .. } => LevelErrorCode::TileCountMismatch,
            TilemapError::ZeroTileSize { .. } => LevelErrorCode::InvalidValue,
        };
        ctx.error_at(code, error.to_string(), layer)
    })?;

    let groups: Vec<Node<'_, '_>> = root
        .descendants()
        .filter(|node| node.has_tag_name("objectgroup"))
        .collect();

    let polygons = match groups
        .iter()
        .find(|group| group.attribute("name") == Some(layers.hazards))
    {
        Some(group) => parse_hazards(&ctx, *group),
        None => {
            warn!(
                layer = layers.hazards,
                file = %file_path.display(),
                "level_hazard_layer_missing"
            );
            Vec::new()
        }
    };
    let scenery = match groups
        .iter()
        .find(|group| group.attribute("name") == Some(layers.scenery))
    {
        Some(group) => parse_scenery(&ctx, *group),
        None => {
            debug!(layer = layers.scenery, "level_scenery_layer_missing");
            Vec::new()
        }
    };

    let (spawn, spawn_source) = match find_spawn(&groups) {
        Some(spawn) => (spawn, SpawnSource::Object),
        None => {
            let size = tilemap.pixel_size();
            warn!(file = %file_path.display(), "level_spawn_missing_using_map_center");
            (Vec2::new(size.x * 0.5, size.y * 0.5), SpawnSource::MapCenter)
        }
    };

    Ok(ParsedMap {
        tilemap,
        polygons,
        scenery,
        spawn,
        spawn_source,
    })
}

struct Ctx<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl Ctx<'_, '_> {
    fn error_at(
        &self,
        code: LevelErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> LevelLoadError {
        let pos = self.doc.text_pos_at(node.range().start);
        LevelLoadError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_u32(&self, node: Node<'_, '_>, name: &str) -> Result<u32, LevelLoadError> {
        let raw = node.attribute(name).ok_or_else(|| {
            self.error_at(
                LevelErrorCode::MissingAttribute,
                format!("<{}> is missing attribute '{name}'", node.tag_name().name()),
                node,
            )
        })?;
        raw.trim().parse::<u32>().map_err(|_| {
            self.error_at(
                LevelErrorCode::InvalidValue,
                format!("attribute '{name}' must be a non-negative integer, got '{raw}'"),
                node,
            )
        })
    }

    fn parse_tile_data(&self, layer: Node<'_, '_>) -> Result<Vec<u32>, LevelLoadError> {
        let data = layer
            .children()
            .find(|node| node.has_tag_name("data"))
            .ok_or_else(|| {
                self.error_at(
                    LevelErrorCode::MissingTileLayer,
                    "tile layer has no <data> element".to_string(),
                    layer,
                )
            })?;
        match data.attribute("encoding") {
            Some("csv") => {}
            other => {
                return Err(self.error_at(
                    LevelErrorCode::UnsupportedEncoding,
                    format!(
                        "tile data encoding must be 'csv', got '{}'",
                        other.unwrap_or("xml")
                    ),
                    data,
                ))
            }
        }
        if data.attribute("compression").is_some() {
            return Err(self.error_at(
                LevelErrorCode::UnsupportedEncoding,
                "compressed tile data is not supported".to_string(),
                data,
            ));
        }

        data.text()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                cell.parse::<u32>()
                    .map(|gid| gid & GID_FLAG_MASK)
                    .map_err(|_| {
                        self.error_at(
                            LevelErrorCode::InvalidValue,
                            format!("invalid tile gid '{cell}'"),
                            data,
                        )
                    })
            })
            .collect()
    }
}

fn parse_hazards(ctx: &Ctx<'_, '_>, group: Node<'_, '_>) -> Vec<Polygon> {
    let mut polygons = Vec::new();
    for object in group.children().filter(|node| node.has_tag_name("object")) {
        let name = object_label(object);
        let origin = match object_origin(object) {
            Some(origin) => origin,
            None => {
                warn_object(ctx, object, &name, "hazard_object_position_invalid");
                continue;
            }
        };
        let collidable = bool_property(object, "collides").unwrap_or(false);

        let polygon_node = object
            .children()
            .find(|node| node.has_tag_name("polygon"));
        let points = if let Some(shape) = polygon_node {
            match shape.attribute("points").and_then(parse_points) {
                Some(points) => points
                    .into_iter()
                    .map(|point| Vec2::new(origin.x + point.x, origin.y + point.y))
                    .collect::<Vec<_>>(),
                None => {
                    warn_object(ctx, object, &name, "hazard_polygon_points_malformed");
                    continue;
                }
            }
        } else if object
            .children()
            .any(|node| node.is_element() && !node.has_tag_name("properties"))
        {
            warn_object(ctx, object, &name, "hazard_shape_unsupported");
            continue;
        } else {
            match object_size(object) {
                Some((width, height)) if width > 0.0 && height > 0.0 => vec![
                    origin,
                    Vec2::new(origin.x + width, origin.y),
                    Vec2::new(origin.x + width, origin.y + height),
                    Vec2::new(origin.x, origin.y + height),
                ],
                _ => {
                    warn_object(ctx, object, &name, "hazard_rectangle_size_invalid");
                    continue;
                }
            }
        };

        if points.len() < 3 {
            warn_object(ctx, object, &name, "hazard_polygon_too_few_points");
            continue;
        }
        polygons.push(Polygon::new(name, points, collidable));
    }
    polygons
}

fn parse_scenery(ctx: &Ctx<'_, '_>, group: Node<'_, '_>) -> Vec<SceneryObject> {
    let mut scenery = Vec::new();
    for (index, object) in group
        .children()
        .filter(|node| node.has_tag_name("object"))
        .enumerate()
    {
        let name = object_label(object);
        let Some(code) = object.attribute("type").or_else(|| object.attribute("class")) else {
            warn_object(ctx, object, &name, "scenery_category_missing");
            continue;
        };
        let Some(category) = SceneryCategory::from_code(code) else {
            let pos = ctx.doc.text_pos_at(object.range().start);
            warn!(object = %name, code, line = pos.row, "scenery_category_unknown");
            continue;
        };
        let (Some(origin), Some((width, height))) = (object_origin(object), object_size(object))
        else {
            warn_object(ctx, object, &name, "scenery_rect_invalid");
            continue;
        };
        if width <= 0.0 || height <= 0.0 {
            warn_object(ctx, object, &name, "scenery_rect_invalid");
            continue;
        }
        // Tile objects are anchored at their bottom-left corner.
        let top = if object.attribute("gid").is_some() {
            origin.y - height
        } else {
            origin.y
        };
        let id = object
            .attribute("id")
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(index as u32);
        scenery.push(SceneryObject::from_footprint(
            id,
            name,
            Rect::new(origin.x, top, width, height),
            category,
        ));
    }
    scenery
}

fn find_spawn(groups: &[Node<'_, '_>]) -> Option<Vec2> {
    let object = groups
        .iter()
        .flat_map(|group| group.children())
        .filter(|node| node.has_tag_name("object"))
        .find(|node| node.attribute("name") == Some(SPAWN_OBJECT_NAME))?;
    let origin = object_origin(object)?;
    let (width, height) = object_size(object).unwrap_or((0.0, 0.0));
    Some(Vec2::new(origin.x + width * 0.5, origin.y + height * 0.5))
}

fn object_label(object: Node<'_, '_>) -> String {
    match (object.attribute("name"), object.attribute("id")) {
        (Some(name), _) if !name.is_empty() => name.to_string(),
        (_, Some(id)) => format!("object#{id}"),
        _ => "object".to_string(),
    }
}

fn object_origin(object: Node<'_, '_>) -> Option<Vec2> {
    let x = optional_f32(object, "x")?;
    let y = optional_f32(object, "y")?;
    let origin = Vec2::new(x, y);
    origin.is_finite().then_some(origin)
}

fn object_size(object: Node<'_, '_>) -> Option<(f32, f32)> {
    let width = optional_f32(object, "width")?;
    let height = optional_f32(object, "height")?;
    (width.is_finite() && height.is_finite()).then_some((width, height))
}

/// Missing attributes read as 0 like Tiled writes them; unparsable ones are `None`.
fn optional_f32(node: Node<'_, '_>, name: &str) -> Option<f32> {
    match node.attribute(name) {
        None => Some(0.0),
        Some(raw) => raw.trim().parse::<f32>().ok(),
    }
}

fn parse_points(raw: &str) -> Option<Vec<Vec2>> {
    raw.split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',')?;
            let point = Vec2::new(x.trim().parse().ok()?, y.trim().parse().ok()?);
            point.is_finite().then_some(point)
        })
        .collect()
}

fn bool_property(object: Node<'_, '_>, name: &str) -> Option<bool> {
    let property = object
        .children()
        .filter(|node| node.has_tag_name("properties"))
        .flat_map(|node| node.children())
        .find(|node| node.has_tag_name("property") && node.attribute("name") == Some(name))?;
    let raw = property.attribute("value").or_else(|| property.text())?;
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn warn_object(ctx: &Ctx<'_, '_>, object: Node<'_, '_>, name: &str, event: &'static str) {
    let pos = ctx.doc.text_pos_at(object.range().start);
    warn!(
        object = %name,
        file = %ctx.file_path.display(),
        line = pos.row,
        column = pos.col,
        "{event}"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const LAYERS: LayerNames<'static> = LayerNames {
        hazards: "hazards",
        scenery: "scenery",
    };

    fn parse(raw: &str) -> Result<ParsedMap, LevelLoadError> {
        parse_tmx(&PathBuf::from("test.tmx"), raw, &LAYERS)
    }

    fn map_with_groups(groups: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="4" height="2" tilewidth="16" tileheight="16">
 <layer id="1" name="ground" width="4" height="2">
  <data encoding="csv">
1,1,2,1,
2147483649,1,1,1
</data>
 </layer>
{groups}
</map>"#
        )
    }

    #[test]
    fn parses_tiles_and_strips_flip_flags() {
        let parsed = parse(&map_with_groups("")).expect("parse");
        assert_eq!(parsed.tilemap.width(), 4);
        assert_eq!(parsed.tilemap.tiles(), &[1, 1, 2, 1, 1, 1, 1, 1]);
        assert!(parsed.polygons.is_empty());
        assert_eq!(parsed.spawn, Vec2::new(32.0, 16.0));
        assert_eq!(parsed.spawn_source, SpawnSource::MapCenter);
    }

    #[test]
    fn hazard_polygons_are_offset_by_object_position() {
        let parsed = parse(&map_with_groups(
            r#"<objectgroup id="2" name="hazards">
  <object id="3" name="pond" x="10" y="20">
   <properties><property name="collides" type="bool" value="true"/></properties>
   <polygon points="0,0 16,0 16,8"/>
  </object>
  <object id="4" name="wall" x="0" y="0" width="32" height="16"/>
  <object id="5" name="broken" x="0" y="0"><polygon points="0,0 1"/></object>
  <object id="6" name="line" x="0" y="0"><polyline points="0,0 4,4"/></object>
  <object id="7" name="sliver" x="0" y="0"><polygon points="0,0 4,4"/></object>
 </objectgroup>"#,
        ))
        .expect("parse");

        assert_eq!(parsed.polygons.len(), 2);
        let pond = &parsed.polygons[0];
        assert_eq!(pond.name, "pond");
        assert!(pond.collidable);
        assert_eq!(
            pond.points,
            vec![Vec2::new(10.0, 20.0), Vec2::new(26.0, 20.0), Vec2::new(26.0, 28.0)]
        );
        let wall = &parsed.polygons[1];
        assert!(!wall.collidable);
        assert_eq!(wall.points.len(), 4);
        assert_eq!(wall.points[2], Vec2::new(32.0, 16.0));
    }

    #[test]
    fn scenery_uses_type_or_class_and_skips_unknown_categories() {
        let parsed = parse(&map_with_groups(
            r#"<objectgroup id="2" name="scenery">
  <object id="10" name="oak" type="tree" x="16" y="0" width="32" height="48"/>
  <object id="11" name="arch" class="canopy" x="0" y="0" width="16" height="16"/>
  <object id="12" name="boulder" type="rock" x="0" y="0" width="16" height="16"/>
  <object id="13" name="stump" type="decoration" gid="5" x="0" y="32" width="16" height="16"/>
  <object id="14" name="spawn" x="40" y="12"/>
 </objectgroup>"#,
        ))
        .expect("parse");

        let ids: Vec<u32> = parsed.scenery.iter().map(|object| object.id).collect();
        assert_eq!(ids, vec![10, 11, 13]);
        let oak = &parsed.scenery[0];
        assert_eq!(oak.category, SceneryCategory::Tree);
        assert_eq!(oak.anchor, Vec2::new(32.0, 48.0));
        assert_eq!(parsed.scenery[2].footprint, Rect::new(0.0, 16.0, 16.0, 16.0));
        assert_eq!(parsed.spawn, Vec2::new(40.0, 12.0));
        assert_eq!(parsed.spawn_source, SpawnSource::Object);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse("<map width=\"1\"").expect_err("err");
        assert_eq!(err.code, LevelErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn structural_errors_are_coded() {
        let err = parse("<level/>").expect_err("err");
        assert_eq!(err.code, LevelErrorCode::InvalidRoot);

        let err = parse(r#"<map width="1" height="1" tilewidth="16" tileheight="16"/>"#)
            .expect_err("err");
        assert_eq!(err.code, LevelErrorCode::MissingTileLayer);

        let err = parse(r#"<map width="1" height="1" tilewidth="16"><layer/></map>"#)
            .expect_err("err");
        assert_eq!(err.code, LevelErrorCode::MissingAttribute);

        let err = parse(
            r#"<map orientation="isometric" width="1" height="1" tilewidth="16" tileheight="16"/>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, LevelErrorCode::UnsupportedOrientation);
    }

    #[test]
    fn non_csv_and_miscounted_tiles_are_rejected() {
        let base64 = r#"<map width="1" height="1" tilewidth="16" tileheight="16">
<layer><data encoding="base64">AQAAAA==</data></layer></map>"#;
        assert_eq!(
            parse(base64).expect_err("err").code,
            LevelErrorCode::UnsupportedEncoding
        );

        let short = r#"<map width="2" height="2" tilewidth="16" tileheight="16">
<layer><data encoding="csv">1,1,1</data></layer></map>"#;
        let err = parse(short).expect_err("err");
        assert_eq!(err.code, LevelErrorCode::TileCountMismatch);
        assert_eq!(err.location.map(|loc| loc.line), Some(2));
    }
}
