use crate::app::{Rect, Vec2};

/// Author-drawn closed polygon in world pixels. The last point connects back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub name: String,
    pub points: Vec<Vec2>,
    pub collidable: bool,
}

impl Polygon {
    pub fn new(name: impl Into<String>, points: Vec<Vec2>, collidable: bool) -> Self {
        Self {
            name: name.into(),
            points,
            collidable,
        }
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        bounding_box(&self.points)
    }

    pub fn area(&self) -> f32 {
        signed_area(&self.points).abs()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point_in_polygon(&self.points, point)
    }
}

pub fn bounding_box(points: &[Vec2]) -> Option<Rect> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for point in &points[1..] {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    Some(Rect::from_min_max(min, max))
}

/// Shoelace formula; sign depends on winding.
pub fn signed_area(points: &[Vec2]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for (i, pi) in points.iter().enumerate() {
        let pj = points[(i + 1) % points.len()];
        twice_area += pi.x as f64 * pj.y as f64 - pj.x as f64 * pi.y as f64;
    }
    (twice_area * 0.5) as f32
}

/// Even-odd crossing rule against a horizontal ray towards +x.
pub fn point_in_polygon(points: &[Vec2], point: Vec2) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let pi = points[i];
        let pj = points[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let crossing_x = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
