mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{
    screen_to_world, visible_world_rect, world_rect_to_screen, world_to_screen,
    world_to_screen_px, ScreenRect, Viewport,
};
