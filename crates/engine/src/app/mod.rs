mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    screen_to_world, visible_world_rect, world_rect_to_screen, world_to_screen,
    world_to_screen_px, Renderer, ScreenRect, Viewport,
};
pub use scene::{
    Camera2D, InputSnapshot, Rect, Scene, SceneCommand, SceneWorld, Tilemap, TilemapError, Vec2,
};
