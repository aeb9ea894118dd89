mod builder;
mod physics;
mod polygon;

pub use builder::{build_collider_cells, ColliderCell, StaticColliderRegistry};
pub use physics::{KinematicBody, PhysicsWorld, StepOutcome, TileBlockingMask};
pub use polygon::{bounding_box, point_in_polygon, signed_area, Polygon};
