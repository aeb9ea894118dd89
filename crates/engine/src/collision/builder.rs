use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use super::polygon::{point_in_polygon, signed_area, Polygon};
use crate::app::{Rect, Vec2};

const MAX_CELLS_PER_POLYGON: i64 = 4_000_000;
const DEGENERATE_AREA_EPSILON: f32 = 1.0e-6;

/// Immutable square approximating part of a polygon's interior. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderCell {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl ColliderCell {
    pub const fn new(x: f32, y: f32, size: f32) -> Self {
        Self { x, y, size }
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.size * 0.5,
            y: self.y + self.size * 0.5,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }
}

/// Cells of `polygon` on the world grid of `resolution`, row-major.
/// Invalid input yields no cells and a warning; this never fails.
pub fn build_collider_cells(polygon: &Polygon, resolution: f32) -> Vec<ColliderCell> {
    cell_indices_for_polygon(polygon, resolution)
        .into_iter()
        .map(|(row, col)| cell_at(col, row, resolution))
        .collect()
}

fn cell_at(col: i32, row: i32, resolution: f32) -> ColliderCell {
    ColliderCell::new(col as f32 * resolution, row as f32 * resolution, resolution)
}

fn cell_indices_for_polygon(polygon: &Polygon, resolution: f32) -> Vec<(i32, i32)> {
    if !resolution.is_finite() || resolution <= 0.0 {
        warn!(
            polygon = polygon.name.as_str(),
            resolution, "collider_resolution_invalid"
        );
        return Vec::new();
    }
    if polygon.points.len() < 3 {
        warn!(
            polygon = polygon.name.as_str(),
            point_count = polygon.points.len(),
            "polygon_skipped_too_few_points"
        );
        return Vec::new();
    }
    if polygon.points.iter().any(|point| !point.is_finite()) {
        warn!(
            polygon = polygon.name.as_str(),
            "polygon_skipped_non_finite_point"
        );
        return Vec::new();
    }
    if signed_area(&polygon.points).abs() <= DEGENERATE_AREA_EPSILON {
        debug!(polygon = polygon.name.as_str(), "polygon_degenerate_no_cells");
        return Vec::new();
    }
    let Some(bbox) = polygon.bounding_box() else {
        return Vec::new();
    };

    let col_min = (bbox.left() / resolution).floor() as i64;
    let col_max = (bbox.right() / resolution).ceil() as i64;
    let row_min = (bbox.top() / resolution).floor() as i64;
    let row_max = (bbox.bottom() / resolution).ceil() as i64;
    let in_grid_range = [col_min, col_max, row_min, row_max]
        .iter()
        .all(|index| (i32::MIN as i64..=i32::MAX as i64).contains(index));
    let candidate_count = if in_grid_range {
        (col_max - col_min).saturating_mul(row_max - row_min)
    } else {
        i64::MAX
    };
    if candidate_count > MAX_CELLS_PER_POLYGON {
        warn!(
            polygon = polygon.name.as_str(),
            candidate_count,
            resolution,
            "polygon_skipped_grid_too_large"
        );
        return Vec::new();
    }

    let mut indices = Vec::new();
    for row in row_min..row_max {
        let center_y = (row as f32 + 0.5) * resolution;
        for col in col_min..col_max {
            let center = Vec2 {
                x: (col as f32 + 0.5) * resolution,
                y: center_y,
            };
            if point_in_polygon(&polygon.points, center) {
                indices.push((row as i32, col as i32));
            }
        }
    }
    indices
}

/// Build-once, read-many set of static collider cells for one level.
/// Cells from overlapping polygons are merged; there is no mutation API.
#[derive(Debug, Clone, Default)]
pub struct StaticColliderRegistry {
    resolution: f32,
    cells: Vec<ColliderCell>,
    index_by_grid: HashMap<(i32, i32), usize>,
}

impl StaticColliderRegistry {
    pub fn build(polygons: &[Polygon], resolution: f32) -> Self {
        let mut occupied = BTreeSet::<(i32, i32)>::new();
        let mut used_polygons = 0usize;
        let mut skipped_non_collidable = 0usize;
        for polygon in polygons {
            if !polygon.collidable {
                skipped_non_collidable += 1;
                continue;
            }
            let indices = cell_indices_for_polygon(polygon, resolution);
            debug!(
                polygon = polygon.name.as_str(),
                cell_count = indices.len(),
                "polygon_cells_built"
            );
            if !indices.is_empty() {
                used_polygons += 1;
            }
            occupied.extend(indices);
        }

        let cells = occupied
            .into_iter()
            .map(|(row, col)| cell_at(col, row, resolution))
            .collect::<Vec<_>>();
        info!(
            polygon_count = polygons.len(),
            used_polygons,
            skipped_non_collidable,
            cell_count = cells.len(),
            resolution,
            "collider_registry_built"
        );
        Self::indexed(resolution, cells)
    }

    /// Cells must share one size and sit on multiples of it; mismatched cells are dropped.
    pub fn from_cells(cells: Vec<ColliderCell>) -> Self {
        let Some(resolution) = cells.first().map(|cell| cell.size) else {
            return Self::default();
        };
        let before = cells.len();
        let kept = cells
            .into_iter()
            .filter(|cell| cell.size == resolution)
            .collect::<Vec<_>>();
        if kept.len() != before {
            warn!(
                dropped = before - kept.len(),
                resolution, "collider_cells_size_mismatch"
            );
        }
        Self::indexed(resolution, kept)
    }

    fn indexed(resolution: f32, cells: Vec<ColliderCell>) -> Self {
        let mut index_by_grid = HashMap::with_capacity(cells.len());
        let mut unique = Vec::with_capacity(cells.len());
        for cell in cells {
            let key = grid_key(cell, resolution);
            if index_by_grid.contains_key(&key) {
                continue;
            }
            index_by_grid.insert(key, unique.len());
            unique.push(cell);
        }
        Self {
            resolution,
            cells: unique,
            index_by_grid,
        }
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn cells(&self) -> &[ColliderCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells whose square overlaps `rect` (touching edges excluded).
    pub fn overlapping(&self, rect: &Rect) -> Vec<ColliderCell> {
        if self.cells.is_empty() || self.resolution <= 0.0 {
            return Vec::new();
        }
        let col_min = (rect.left() / self.resolution).floor() as i64;
        let col_max = (rect.right() / self.resolution).ceil() as i64;
        let row_min = (rect.top() / self.resolution).floor() as i64;
        let row_max = (rect.bottom() / self.resolution).ceil() as i64;
        let span = col_max
            .saturating_sub(col_min)
            .max(0)
            .saturating_mul(row_max.saturating_sub(row_min).max(0));

        // Wide queries scan the cell list instead of the grid window.
        if span > self.cells.len() as i64 {
            return self
                .cells
                .iter()
                .copied()
                .filter(|cell| cell.rect().overlaps(rect))
                .collect();
        }

        let mut out = Vec::new();
        for row in row_min..row_max {
            for col in col_min..col_max {
                let (Ok(row), Ok(col)) = (i32::try_from(row), i32::try_from(col)) else {
                    continue;
                };
                let Some(&index) = self.index_by_grid.get(&(row, col)) else {
                    continue;
                };
                let cell = self.cells[index];
                if cell.rect().overlaps(rect) {
                    out.push(cell);
                }
            }
        }
        out
    }
}

fn grid_key(cell: ColliderCell, resolution: f32) -> (i32, i32) {
    (
        (cell.y / resolution).round() as i32,
        (cell.x / resolution).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(points: &[(f32, f32)]) -> Polygon {
        Polygon::new(
            "test",
            points.iter().map(|&(x, y)| Vec2::new(x, y)).collect(),
            true,
        )
    }

    fn perimeter(points: &[Vec2]) -> f32 {
        let mut total = 0.0;
        for (i, pi) in points.iter().enumerate() {
            let pj = points[(i + 1) % points.len()];
            total += ((pj.x - pi.x).powi(2) + (pj.y - pi.y).powi(2)).sqrt();
        }
        total
    }

    #[test]
    fn square_at_resolution_16_yields_four_cells() {
        let square = polygon(&[(0.0, 0.0), (32.0, 0.0), (32.0, 32.0), (0.0, 32.0)]);
        let cells = build_collider_cells(&square, 16.0);
        let centers = cells.iter().map(ColliderCell::center).collect::<Vec<_>>();
        assert_eq!(
            centers,
            vec![
                Vec2::new(8.0, 8.0),
                Vec2::new(24.0, 8.0),
                Vec2::new(8.0, 24.0),
                Vec2::new(24.0, 24.0),
            ]
        );
        assert!(cells.iter().all(|cell| cell.size == 16.0));
    }

    #[test]
    fn every_cell_center_is_inside_source_polygon() {
        let shapes = [
            polygon(&[(5.0, 3.0), (90.0, 12.0), (70.0, 80.0), (12.0, 60.0)]),
            polygon(&[
                (0.0, 0.0),
                (40.0, 0.0),
                (40.0, 40.0),
                (25.0, 40.0),
                (25.0, 12.0),
                (15.0, 12.0),
                (15.0, 40.0),
                (0.0, 40.0),
            ]),
            polygon(&[(-30.0, -30.0), (10.0, -50.0), (35.0, 20.0)]),
        ];
        for shape in &shapes {
            for resolution in [1.0, 3.0, 4.0, 8.0, 16.0] {
                let cells = build_collider_cells(shape, resolution);
                assert!(!cells.is_empty() || resolution > 8.0);
                for cell in cells {
                    assert!(
                        shape.contains_point(cell.center()),
                        "cell {:?} at r={resolution}",
                        cell
                    );
                }
            }
        }
    }

    #[test]
    fn convex_cell_area_converges_toward_polygon_area() {
        let diamond = polygon(&[(0.0, -100.0), (100.0, 0.0), (0.0, 100.0), (-100.0, 0.0)]);
        let area = diamond.area();
        let edge_length = perimeter(&diamond.points);
        for resolution in [16.0f32, 8.0, 4.0, 2.0, 1.0] {
            let count = build_collider_cells(&diamond, resolution).len() as f32;
            let error = (count * resolution * resolution - area).abs();
            assert!(
                error <= 2.0 * edge_length * resolution,
                "r={resolution} error={error}"
            );
        }
        let fine = build_collider_cells(&diamond, 1.0).len() as f32;
        assert!(((fine - area) / area).abs() < 0.05);
    }

    #[test]
    fn build_is_deterministic() {
        let shape = polygon(&[(3.5, 1.25), (77.0, 9.0), (60.5, 51.0), (-4.0, 40.0)]);
        let first = build_collider_cells(&shape, 4.0);
        let second = build_collider_cells(&shape, 4.0);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
            assert_eq!(a.size.to_bits(), b.size.to_bits());
        }
    }

    #[test]
    fn too_few_points_and_degenerate_polygons_emit_nothing() {
        assert!(build_collider_cells(&polygon(&[(0.0, 0.0), (32.0, 32.0)]), 16.0).is_empty());
        assert!(build_collider_cells(
            &polygon(&[(0.0, 0.0), (16.0, 16.0), (32.0, 32.0)]),
            16.0
        )
        .is_empty());
        assert!(build_collider_cells(
            &polygon(&[(0.0, 0.0), (f32::NAN, 0.0), (32.0, 32.0)]),
            16.0
        )
        .is_empty());
    }

    #[test]
    fn invalid_resolution_emits_nothing() {
        let square = polygon(&[(0.0, 0.0), (32.0, 0.0), (32.0, 32.0), (0.0, 32.0)]);
        assert!(build_collider_cells(&square, 0.0).is_empty());
        assert!(build_collider_cells(&square, -4.0).is_empty());
        assert!(build_collider_cells(&square, f32::INFINITY).is_empty());
    }

    #[test]
    fn huge_finite_bbox_is_skipped_without_overflow() {
        let huge = polygon(&[
            (-3.0e38, -3.0e38),
            (3.0e38, -3.0e38),
            (3.0e38, 3.0e38),
            (-3.0e38, 3.0e38),
        ]);
        assert!(build_collider_cells(&huge, 16.0).is_empty());

        let wide = polygon(&[(0.0, 0.0), (1.0e12, 0.0), (1.0e12, 16.0), (0.0, 16.0)]);
        assert!(build_collider_cells(&wide, 16.0).is_empty());
    }

    #[test]
    fn cells_align_to_world_grid_not_polygon_corner() {
        let offset = polygon(&[(10.0, 10.0), (42.0, 10.0), (42.0, 42.0), (10.0, 42.0)]);
        let cells = build_collider_cells(&offset, 16.0);
        assert!(cells
            .iter()
            .all(|cell| cell.x % 16.0 == 0.0 && cell.y % 16.0 == 0.0));
        assert_eq!(
            cells.iter().map(ColliderCell::center).collect::<Vec<_>>(),
            vec![
                Vec2::new(24.0, 24.0),
                Vec2::new(40.0, 24.0),
                Vec2::new(24.0, 40.0),
                Vec2::new(40.0, 40.0),
            ]
        );
    }

    #[test]
    fn registry_merges_overlaps_and_skips_non_collidable() {
        let a = polygon(&[(0.0, 0.0), (32.0, 0.0), (32.0, 32.0), (0.0, 32.0)]);
        let b = polygon(&[(16.0, 0.0), (48.0, 0.0), (48.0, 16.0), (16.0, 16.0)]);
        let mut decor = polygon(&[(100.0, 100.0), (200.0, 100.0), (200.0, 200.0)]);
        decor.collidable = false;

        let registry = StaticColliderRegistry::build(&[a, b, decor], 16.0);
        let centers = registry
            .cells()
            .iter()
            .map(ColliderCell::center)
            .collect::<Vec<_>>();
        assert_eq!(
            centers,
            vec![
                Vec2::new(8.0, 8.0),
                Vec2::new(24.0, 8.0),
                Vec2::new(40.0, 8.0),
                Vec2::new(8.0, 24.0),
                Vec2::new(24.0, 24.0),
            ]
        );
    }

    #[test]
    fn registry_overlap_query_excludes_touching_cells() {
        let registry = StaticColliderRegistry::build(
            &[polygon(&[(0.0, 0.0), (32.0, 0.0), (32.0, 32.0), (0.0, 32.0)])],
            16.0,
        );
        let touching = Rect::new(32.0, 0.0, 8.0, 8.0);
        assert!(registry.overlapping(&touching).is_empty());

        let straddling = Rect::new(12.0, 12.0, 8.0, 8.0);
        assert_eq!(registry.overlapping(&straddling).len(), 4);
    }

    #[test]
    fn registry_overlap_query_handles_huge_rects() {
        let registry = StaticColliderRegistry::build(
            &[polygon(&[(0.0, 0.0), (32.0, 0.0), (32.0, 32.0), (0.0, 32.0)])],
            16.0,
        );
        let everything = Rect::new(-1.0e38, -1.0e38, 2.0e38, 2.0e38);
        assert_eq!(registry.overlapping(&everything).len(), 4);

        let far_away = Rect::new(1.0e30, 1.0e30, 1.0e20, 1.0e20);
        assert!(registry.overlapping(&far_away).is_empty());
    }

    #[test]
    fn registry_from_cells_drops_mismatched_sizes_and_duplicates() {
        let registry = StaticColliderRegistry::from_cells(vec![
            ColliderCell::new(0.0, 0.0, 8.0),
            ColliderCell::new(0.0, 0.0, 8.0),
            ColliderCell::new(8.0, 0.0, 16.0),
            ColliderCell::new(8.0, 0.0, 8.0),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolution(), 8.0);
    }
}
