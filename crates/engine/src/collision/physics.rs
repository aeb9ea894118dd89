use super::builder::StaticColliderRegistry;
use crate::app::{Rect, Tilemap, Vec2};

/// Solid tiles of a level. Anything outside the map counts as solid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBlockingMask {
    width: u32,
    height: u32,
    tile_width: f32,
    tile_height: f32,
    blocked: Vec<bool>,
}

impl TileBlockingMask {
    /// `blocking_tile == 0` marks no tile as solid (gid 0 is the empty tile).
    pub fn from_tilemap(tilemap: &Tilemap, blocking_tile: u32) -> Self {
        let blocked = tilemap
            .tiles()
            .iter()
            .map(|&gid| blocking_tile != 0 && gid == blocking_tile)
            .collect();
        Self {
            width: tilemap.width(),
            height: tilemap.height(),
            tile_width: tilemap.tile_width() as f32,
            tile_height: tilemap.tile_height() as f32,
            blocked,
        }
    }

    pub fn is_blocked(&self, tile_x: i64, tile_y: i64) -> bool {
        if tile_x < 0 || tile_y < 0 || tile_x >= self.width as i64 || tile_y >= self.height as i64 {
            return true;
        }
        self.blocked[tile_y as usize * self.width as usize + tile_x as usize]
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|blocked| **blocked).count()
    }

    fn push_overlapping(&self, rect: &Rect, out: &mut Vec<Rect>) {
        let x_min = (rect.left() / self.tile_width).floor() as i64;
        let x_max = (rect.right() / self.tile_width).ceil() as i64;
        let y_min = (rect.top() / self.tile_height).floor() as i64;
        let y_max = (rect.bottom() / self.tile_height).ceil() as i64;
        for ty in y_min..y_max {
            for tx in x_min..x_max {
                if !self.is_blocked(tx, ty) {
                    continue;
                }
                let tile = Rect::new(
                    tx as f32 * self.tile_width,
                    ty as f32 * self.tile_height,
                    self.tile_width,
                    self.tile_height,
                );
                if tile.overlaps(rect) {
                    out.push(tile);
                }
            }
        }
    }
}

/// Axis-aligned hitbox centered on `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    pub position: Vec2,
    pub half_extents: Vec2,
}

impl KinematicBody {
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position.x - self.half_extents.x,
            self.position.y - self.half_extents.y,
            self.half_extents.x * 2.0,
            self.half_extents.y * 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub blocked_x: bool,
    pub blocked_y: bool,
}

/// Static obstacles the actor resolves against: collider cells plus the tile mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsWorld<'a> {
    colliders: Option<&'a StaticColliderRegistry>,
    mask: Option<&'a TileBlockingMask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl<'a> PhysicsWorld<'a> {
    pub fn new(
        colliders: Option<&'a StaticColliderRegistry>,
        mask: Option<&'a TileBlockingMask>,
    ) -> Self {
        Self { colliders, mask }
    }

    /// Integrates X then Y. On each axis an overlapping obstacle snaps the body flush
    /// against it and zeroes that velocity component.
    pub fn step(
        &self,
        body: &mut KinematicBody,
        velocity: &mut Vec2,
        dt_seconds: f32,
    ) -> StepOutcome {
        let mut obstacles = Vec::new();
        StepOutcome {
            blocked_x: self.move_axis(body, velocity, dt_seconds, Axis::X, &mut obstacles),
            blocked_y: self.move_axis(body, velocity, dt_seconds, Axis::Y, &mut obstacles),
        }
    }

    pub fn overlaps_any(&self, rect: &Rect) -> bool {
        let mut obstacles = Vec::new();
        self.collect_obstacles(rect, &mut obstacles);
        !obstacles.is_empty()
    }

    fn move_axis(
        &self,
        body: &mut KinematicBody,
        velocity: &mut Vec2,
        dt_seconds: f32,
        axis: Axis,
        obstacles: &mut Vec<Rect>,
    ) -> bool {
        let speed = match axis {
            Axis::X => velocity.x,
            Axis::Y => velocity.y,
        };
        if speed == 0.0 || !speed.is_finite() {
            return false;
        }
        match axis {
            Axis::X => body.position.x += speed * dt_seconds,
            Axis::Y => body.position.y += speed * dt_seconds,
        }

        obstacles.clear();
        self.collect_obstacles(&body.rect(), obstacles);
        if obstacles.is_empty() {
            return false;
        }

        for obstacle in obstacles.iter() {
            match (axis, speed > 0.0) {
                (Axis::X, true) => {
                    body.position.x = body.position.x.min(obstacle.left() - body.half_extents.x)
                }
                (Axis::X, false) => {
                    body.position.x = body.position.x.max(obstacle.right() + body.half_extents.x)
                }
                (Axis::Y, true) => {
                    body.position.y = body.position.y.min(obstacle.top() - body.half_extents.y)
                }
                (Axis::Y, false) => {
                    body.position.y = body.position.y.max(obstacle.bottom() + body.half_extents.y)
                }
            }
        }
        match axis {
            Axis::X => velocity.x = 0.0,
            Axis::Y => velocity.y = 0.0,
        }
        true
    }

    fn collect_obstacles(&self, rect: &Rect, out: &mut Vec<Rect>) {
        if let Some(colliders) = self.colliders {
            out.extend(colliders.overlapping(rect).iter().map(|cell| cell.rect()));
        }
        if let Some(mask) = self.mask {
            mask.push_overlapping(rect, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{ColliderCell, Polygon};

    const DT: f32 = 1.0 / 60.0;

    fn open_mask(width: u32, height: u32) -> TileBlockingMask {
        let tilemap = Tilemap::new(width, height, 16, 16, vec![1; (width * height) as usize])
            .expect("tilemap");
        TileBlockingMask::from_tilemap(&tilemap, 2)
    }

    fn body_at(x: f32, y: f32) -> KinematicBody {
        KinematicBody {
            position: Vec2::new(x, y),
            half_extents: Vec2::new(4.0, 4.0),
        }
    }

    #[test]
    fn mask_marks_blocking_gid_and_outside_as_solid() {
        let tilemap = Tilemap::new(2, 2, 16, 16, vec![1, 2, 1, 1]).expect("tilemap");
        let mask = TileBlockingMask::from_tilemap(&tilemap, 2);
        assert!(mask.is_blocked(1, 0));
        assert!(!mask.is_blocked(0, 0));
        assert!(mask.is_blocked(-1, 0));
        assert!(mask.is_blocked(0, 2));
        assert_eq!(mask.blocked_count(), 1);
    }

    #[test]
    fn zero_blocking_tile_blocks_only_outside() {
        let tilemap = Tilemap::new(2, 1, 16, 16, vec![0, 0]).expect("tilemap");
        let mask = TileBlockingMask::from_tilemap(&tilemap, 0);
        assert_eq!(mask.blocked_count(), 0);
        assert!(mask.is_blocked(2, 0));
    }

    #[test]
    fn free_movement_integrates_velocity() {
        let mask = open_mask(10, 10);
        let world = PhysicsWorld::new(None, Some(&mask));
        let mut body = body_at(80.0, 80.0);
        let mut velocity = Vec2::new(60.0, -60.0);
        let outcome = world.step(&mut body, &mut velocity, DT);
        assert_eq!(outcome, StepOutcome::default());
        assert!((body.position.x - 81.0).abs() < 0.001);
        assert!((body.position.y - 79.0).abs() < 0.001);
        assert_eq!(velocity, Vec2::new(60.0, -60.0));
    }

    #[test]
    fn collider_cell_stops_motion_on_blocked_axis_only() {
        let registry =
            StaticColliderRegistry::from_cells(vec![ColliderCell::new(48.0, 32.0, 16.0)]);
        let mask = open_mask(10, 10);
        let world = PhysicsWorld::new(Some(&registry), Some(&mask));
        let mut body = body_at(43.5, 40.0);
        let mut velocity = Vec2::new(60.0, 30.0);

        let outcome = world.step(&mut body, &mut velocity, DT);

        assert!(outcome.blocked_x);
        assert!((body.position.x - 44.0).abs() < 0.001);
        assert_eq!(velocity.x, 0.0);
        assert!(!outcome.blocked_y);
        assert!((body.position.y - 40.5).abs() < 0.001);
        assert!(!world.overlaps_any(&body.rect()));
    }

    #[test]
    fn blocking_tile_pushes_back_moving_up() {
        let tilemap = Tilemap::new(3, 3, 16, 16, vec![2, 2, 2, 1, 1, 1, 1, 1, 1]).expect("tilemap");
        let mask = TileBlockingMask::from_tilemap(&tilemap, 2);
        let world = PhysicsWorld::new(None, Some(&mask));
        let mut body = body_at(24.0, 20.5);
        let mut velocity = Vec2::new(0.0, -90.0);

        let outcome = world.step(&mut body, &mut velocity, DT);

        assert!(outcome.blocked_y);
        assert!((body.position.y - 20.0).abs() < 0.001);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn map_edge_is_solid() {
        let mask = open_mask(4, 4);
        let world = PhysicsWorld::new(None, Some(&mask));
        let mut body = body_at(4.5, 30.0);
        let mut velocity = Vec2::new(-120.0, 0.0);
        world.step(&mut body, &mut velocity, DT);
        assert!((body.position.x - 4.0).abs() < 0.001);
    }

    #[test]
    fn registry_built_from_polygon_blocks_body() {
        let wall = Polygon::new(
            "wall",
            vec![
                Vec2::new(64.0, 0.0),
                Vec2::new(80.0, 0.0),
                Vec2::new(80.0, 160.0),
                Vec2::new(64.0, 160.0),
            ],
            true,
        );
        let registry = StaticColliderRegistry::build(&[wall], 16.0);
        let world = PhysicsWorld::new(Some(&registry), None);
        let mut body = body_at(50.0, 50.0);
        for _ in 0..60 {
            let mut velocity = Vec2::new(120.0, 0.0);
            world.step(&mut body, &mut velocity, DT);
        }
        assert!((body.position.x - 60.0).abs() < 0.001);
    }
}
